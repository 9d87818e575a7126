//! Web and local search over the upstream search API.

use crate::config::SearchConfig;
use crate::rate_limit::{RateLimitError, RateLimiter};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use waypost_http_call::{HttpCallError, HttpCallSpec, HttpCaller, ResponseKind};

/// Upstream cap on results per request.
const MAX_RESULTS: u32 = 20;

const SUBSCRIPTION_HEADER: &str = "X-Subscription-Token";

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),
    #[error(transparent)]
    Http(#[from] HttpCallError),
    #[error("unexpected response shape: {0}")]
    Shape(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SearchError>;

/// One normalized web search result. Missing upstream fields become empty
/// strings, never formatting failures.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResultItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
struct WebSearchResponse {
    #[serde(default)]
    web: WebResults,
}

#[derive(Debug, Default, Deserialize)]
struct WebResults {
    #[serde(default)]
    results: Vec<SearchResultItem>,
}

#[derive(Debug, Default, Deserialize)]
struct LocalSearchResponse {
    #[serde(default)]
    locations: LocationResults,
}

#[derive(Debug, Default, Deserialize)]
struct LocationResults {
    #[serde(default)]
    results: Vec<LocationRef>,
}

#[derive(Debug, Deserialize)]
struct LocationRef {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PoisResponse {
    #[serde(default)]
    results: Vec<Poi>,
}

#[derive(Debug, Default, Deserialize)]
struct Poi {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    address: PoiAddress,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    rating: Option<PoiRating>,
    #[serde(default, rename = "priceRange")]
    price_range: Option<String>,
    #[serde(default, rename = "openingHours")]
    opening_hours: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PoiAddress {
    #[serde(default, rename = "streetAddress")]
    street: String,
    #[serde(default, rename = "addressLocality")]
    locality: String,
    #[serde(default, rename = "addressRegion")]
    region: String,
    #[serde(default, rename = "postalCode")]
    postal_code: String,
}

#[derive(Debug, Default, Deserialize)]
struct PoiRating {
    #[serde(default, rename = "ratingValue")]
    value: Option<f64>,
    #[serde(default, rename = "ratingCount")]
    count: u64,
}

#[derive(Debug, Default, Deserialize)]
struct DescriptionsResponse {
    #[serde(default)]
    descriptions: HashMap<String, String>,
}

/// Search operations over the upstream API, metered by an injected
/// [`RateLimiter`].
pub struct SearchGateway {
    config: SearchConfig,
    caller: HttpCaller,
    limiter: Arc<RateLimiter>,
}

impl SearchGateway {
    #[must_use]
    pub fn new(config: SearchConfig, caller: HttpCaller, limiter: Arc<RateLimiter>) -> Self {
        Self {
            config,
            caller,
            limiter,
        }
    }

    /// Web search. Results are formatted as three-line text blocks
    /// (`Title:` / `Description:` / `URL:`) joined by blank lines; zero
    /// upstream results yield an empty string, not an error.
    ///
    /// # Errors
    ///
    /// Fails when the rate budget is spent, the upstream call fails, or
    /// the response cannot be decoded.
    pub async fn web_search(&self, query: &str, count: u32, offset: u32) -> Result<String> {
        self.limiter.admit()?;

        let spec = self
            .authorized(HttpCallSpec::get(format!("{}/web/search", self.config.base_url)))
            .query("q", query)
            .query("country", self.config.country.as_str())
            .query("search_lang", self.config.search_lang.as_str())
            .query("count", count.min(MAX_RESULTS))
            .query("offset", offset)
            .response(ResponseKind::Json);

        let body = self.caller.execute(spec).await?.into_json()?;
        let parsed: WebSearchResponse = serde_json::from_value(body)?;
        debug!(query, results = parsed.web.results.len(), "web search");

        Ok(format_web_results(&parsed.web.results))
    }

    /// Local search: resolve location ids, then fetch POI details and
    /// descriptions concurrently and format one multi-line record per POI,
    /// joined by `---` lines. When zero non-null location ids resolve, the
    /// query falls back to [`Self::web_search`] and returns its result.
    ///
    /// # Errors
    ///
    /// Fails when the rate budget is spent, any upstream call fails, or a
    /// response cannot be decoded. If either of the two concurrent POI
    /// fetches fails, the whole operation fails.
    pub async fn local_search(&self, query: &str, count: u32) -> Result<String> {
        self.limiter.admit()?;

        let spec = self
            .authorized(HttpCallSpec::get(format!("{}/web/search", self.config.base_url)))
            .query("q", query)
            .query("search_lang", self.config.search_lang.as_str())
            .query("result_filter", "locations")
            .query("count", count.min(MAX_RESULTS))
            .response(ResponseKind::Json);

        let body = self.caller.execute(spec).await?.into_json()?;
        let parsed: LocalSearchResponse = serde_json::from_value(body)?;
        let ids: Vec<String> = parsed
            .locations
            .results
            .into_iter()
            .filter_map(|r| r.id)
            .collect();

        if ids.is_empty() {
            debug!(query, "no local results, falling back to web search");
            return self.web_search(query, count, 0).await;
        }
        debug!(query, locations = ids.len(), "local search");

        let (pois, descriptions) =
            tokio::try_join!(self.fetch_pois(&ids), self.fetch_descriptions(&ids))?;
        Ok(format_local_results(&pois, &descriptions))
    }

    async fn fetch_pois(&self, ids: &[String]) -> Result<PoisResponse> {
        let mut spec = self
            .authorized(HttpCallSpec::get(format!("{}/local/pois", self.config.base_url)))
            .header("Accept", "application/json")
            .response(ResponseKind::Json);
        for id in ids {
            spec = spec.query("ids", id.as_str());
        }
        let body = self.caller.execute(spec).await?.into_json()?;
        Ok(serde_json::from_value(body)?)
    }

    async fn fetch_descriptions(&self, ids: &[String]) -> Result<DescriptionsResponse> {
        let mut spec = self
            .authorized(HttpCallSpec::get(format!(
                "{}/local/descriptions",
                self.config.base_url
            )))
            .header("Accept", "application/json")
            .response(ResponseKind::Json);
        for id in ids {
            spec = spec.query("ids", id.as_str());
        }
        let body = self.caller.execute(spec).await?.into_json()?;
        Ok(serde_json::from_value(body)?)
    }

    fn authorized(&self, spec: HttpCallSpec) -> HttpCallSpec {
        match &self.config.api_key {
            Some(key) => spec.header(SUBSCRIPTION_HEADER, key.clone()),
            None => spec,
        }
    }
}

fn format_web_results(items: &[SearchResultItem]) -> String {
    items
        .iter()
        .map(|r| format!("Title: {}\nDescription: {}\nURL: {}", r.title, r.description, r.url))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_local_results(pois: &PoisResponse, descriptions: &DescriptionsResponse) -> String {
    if pois.results.is_empty() {
        return "No local results found".to_string();
    }

    pois.results
        .iter()
        .map(|poi| format_poi(poi, descriptions))
        .collect::<Vec<_>>()
        .join("\n---\n")
}

fn format_poi(poi: &Poi, descriptions: &DescriptionsResponse) -> String {
    let address = [
        &poi.address.street,
        &poi.address.locality,
        &poi.address.region,
        &poi.address.postal_code,
    ]
    .into_iter()
    .filter(|part| !part.is_empty())
    .map(String::as_str)
    .collect::<Vec<_>>()
    .join(", ");
    let address = if address.is_empty() { "N/A" } else { &address };

    let phone = poi.phone.as_deref().filter(|p| !p.is_empty()).unwrap_or("N/A");
    let (rating, reviews) = match &poi.rating {
        Some(r) => (
            r.value.map_or_else(|| "N/A".to_string(), |v| v.to_string()),
            r.count,
        ),
        None => ("N/A".to_string(), 0),
    };
    let price_range = poi
        .price_range
        .as_deref()
        .filter(|p| !p.is_empty())
        .unwrap_or("N/A");
    let hours = if poi.opening_hours.is_empty() {
        "N/A".to_string()
    } else {
        poi.opening_hours.join(", ")
    };
    let description = poi
        .id
        .as_ref()
        .and_then(|id| descriptions.descriptions.get(id))
        .map(String::as_str)
        .filter(|d| !d.is_empty())
        .unwrap_or("No description available");

    format!(
        "Name: {}\nAddress: {}\nPhone: {}\nRating: {} ({} reviews)\nPrice Range: {}\nHours: {}\nDescription: {}\n",
        poi.name, address, phone, rating, reviews, price_range, hours, description
    )
}
