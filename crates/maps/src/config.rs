//! Environment-sourced configuration for the maps gateway.

pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api";

/// Maps gateway configuration.
///
/// As with the search gateway, a missing API key is not a startup error;
/// calls go out without the `key` parameter and fail upstream.
#[derive(Debug, Clone)]
pub struct MapsConfig {
    /// Base URL of the maps API (overridable for tests).
    pub base_url: String,
    pub api_key: Option<String>,
    /// `language` query parameter sent with every call.
    pub language: String,
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            language: "ja".to_string(),
        }
    }
}

impl MapsConfig {
    /// Read configuration from `GOOGLEMAP_API_KEY` and
    /// `GOOGLEMAP_LANGUAGE`.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: defaults.base_url,
            api_key: std::env::var("GOOGLEMAP_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            language: std::env::var("GOOGLEMAP_LANGUAGE").unwrap_or(defaults.language),
        }
    }
}
