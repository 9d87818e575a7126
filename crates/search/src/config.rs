//! Environment-sourced configuration for the search gateway.

use crate::rate_limit::RateBudget;

pub const DEFAULT_BASE_URL: &str = "https://api.search.brave.com/res/v1";

/// Search gateway configuration.
///
/// A missing API key is not a startup error: requests simply go out without
/// the subscription header and fail at the upstream with an auth error.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Base URL of the search API (overridable so tests can point the
    /// gateway at a stub server).
    pub base_url: String,
    pub api_key: Option<String>,
    /// `country` query parameter sent with web searches.
    pub country: String,
    /// `search_lang` query parameter sent with every search.
    pub search_lang: String,
    pub budget: RateBudget,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            country: "JP".to_string(),
            search_lang: "jp".to_string(),
            budget: RateBudget::default(),
        }
    }
}

impl SearchConfig {
    /// Read configuration from the environment: `BRAVE_API_KEY`,
    /// `BRAVE_SEARCH_COUNTRY`, `BRAVE_SEARCH_LANG`, and the budget
    /// overrides `BRAVE_RATE_PER_SECOND` / `BRAVE_RATE_PER_MONTH`.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: defaults.base_url,
            api_key: std::env::var("BRAVE_API_KEY").ok().filter(|k| !k.is_empty()),
            country: std::env::var("BRAVE_SEARCH_COUNTRY").unwrap_or(defaults.country),
            search_lang: std::env::var("BRAVE_SEARCH_LANG").unwrap_or(defaults.search_lang),
            budget: RateBudget {
                per_second: env_u32("BRAVE_RATE_PER_SECOND")
                    .unwrap_or(defaults.budget.per_second),
                per_period: env_u32("BRAVE_RATE_PER_MONTH").unwrap_or(defaults.budget.per_period),
            },
        }
    }
}

fn env_u32(name: &str) -> Option<u32> {
    std::env::var(name).ok()?.parse().ok()
}
