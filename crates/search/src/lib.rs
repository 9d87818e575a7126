//! Rate-limited search gateway.
//!
//! [`gateway::SearchGateway`] exposes two operations over a Brave-style
//! search API — [`gateway::SearchGateway::web_search`] and
//! [`gateway::SearchGateway::local_search`] (POI details + descriptions,
//! with automatic fallback to web search) — with every operation admitted
//! through an explicitly injected [`rate_limit::RateLimiter`].

pub mod config;
pub mod gateway;
pub mod rate_limit;

pub use config::SearchConfig;
pub use gateway::{SearchError, SearchGateway};
pub use rate_limit::{RateBudget, RateLimitError, RateLimiter};
