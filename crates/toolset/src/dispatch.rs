//! Argument validation, operation dispatch, and the result envelope.

use crate::registry;
use rmcp::model::{CallToolResult, Content};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;
use waypost_http_call::HttpCaller;
use waypost_maps::{LatLng, MapsConfig, MapsGateway, TravelMode};
use waypost_search::{RateLimiter, SearchConfig, SearchGateway};

/// Errors at the collaborator boundary. Everything else — validation
/// failures, rate limiting, upstream errors — is reported *inside* the
/// returned envelope, never as an `Err`.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

/// A failed tool operation, formatted into the error envelope.
#[derive(Debug, Error)]
enum ToolError {
    #[error(transparent)]
    Search(#[from] waypost_search::SearchError),
    #[error(transparent)]
    Maps(#[from] waypost_maps::MapsError),
    #[error("invalid arguments: {0}")]
    Args(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct WebSearchArgs {
    query: String,
    #[serde(default = "default_web_count")]
    count: u32,
    #[serde(default)]
    offset: u32,
}

fn default_web_count() -> u32 {
    10
}

#[derive(Debug, Deserialize)]
struct LocalSearchArgs {
    query: String,
    #[serde(default = "default_local_count")]
    count: u32,
}

fn default_local_count() -> u32 {
    5
}

#[derive(Debug, Deserialize)]
struct GeocodeArgs {
    address: String,
}

#[derive(Debug, Deserialize)]
struct ReverseGeocodeArgs {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct SearchPlacesArgs {
    query: String,
    #[serde(default)]
    location: Option<LatLng>,
    #[serde(default)]
    radius: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct PlaceDetailsArgs {
    place_id: String,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixArgs {
    origins: Vec<String>,
    destinations: Vec<String>,
    #[serde(default)]
    mode: TravelMode,
}

#[derive(Debug, Deserialize)]
struct ElevationArgs {
    locations: Vec<LatLng>,
}

/// The composed tool surface: one search gateway (with its injected rate
/// limiter) and one maps gateway.
pub struct Toolset {
    search: SearchGateway,
    maps: MapsGateway,
}

impl Toolset {
    #[must_use]
    pub fn new(search: SearchGateway, maps: MapsGateway) -> Self {
        Self { search, maps }
    }

    /// Compose the toolset from environment configuration. Both gateways
    /// share one HTTP client; the search gateway gets its own limiter
    /// sized by the configured budget.
    #[must_use]
    pub fn from_env() -> Self {
        let caller = HttpCaller::new();
        let search_config = SearchConfig::from_env();
        let limiter = Arc::new(RateLimiter::new(search_config.budget));
        let search = SearchGateway::new(search_config, caller.clone(), limiter);
        let maps = MapsGateway::new(MapsConfig::from_env(), caller);
        Self { search, maps }
    }

    /// Advertised tool list for the agent runtime.
    #[must_use]
    pub fn list_tools() -> Vec<rmcp::model::Tool> {
        registry::list_tools()
    }

    /// Validate `raw_args` against the tool's declared schema, run the
    /// matching gateway operation, and wrap the outcome in the result
    /// envelope. Validation failures and operation failures both come back
    /// as `is_error: true` results carrying a text block — never as an
    /// `Err` and never as a process fault.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownTool`] for a name this toolset does
    /// not own; the registry that routes names is the caller's concern.
    pub async fn dispatch(
        &self,
        tool_name: &str,
        raw_args: Value,
    ) -> Result<CallToolResult, DispatchError> {
        let Some(schema) = registry::input_schema(tool_name) else {
            return Err(DispatchError::UnknownTool(tool_name.to_string()));
        };
        if let Err(message) = validate_arguments(&schema, &raw_args) {
            warn!(tool = tool_name, %message, "rejected tool arguments");
            return Ok(error_result(message));
        }

        let outcome: Result<String, ToolError> = match tool_name {
            registry::BRAVE_WEB_SEARCH => {
                async {
                    let args: WebSearchArgs = parse_args(raw_args)?;
                    Ok(self
                        .search
                        .web_search(&args.query, args.count, args.offset)
                        .await?)
                }
                .await
            }
            registry::BRAVE_LOCAL_SEARCH => {
                async {
                    let args: LocalSearchArgs = parse_args(raw_args)?;
                    Ok(self.search.local_search(&args.query, args.count).await?)
                }
                .await
            }
            registry::MAPS_GEOCODE => {
                async {
                    let args: GeocodeArgs = parse_args(raw_args)?;
                    Ok(pretty(self.maps.geocode(&args.address).await?))
                }
                .await
            }
            registry::MAPS_REVERSE_GEOCODE => {
                async {
                    let args: ReverseGeocodeArgs = parse_args(raw_args)?;
                    let location = LatLng {
                        latitude: args.latitude,
                        longitude: args.longitude,
                    };
                    Ok(pretty(self.maps.reverse_geocode(location).await?))
                }
                .await
            }
            registry::MAPS_SEARCH_PLACES => {
                async {
                    let args: SearchPlacesArgs = parse_args(raw_args)?;
                    Ok(pretty(
                        self.maps
                            .search_places(&args.query, args.location, args.radius)
                            .await?,
                    ))
                }
                .await
            }
            registry::MAPS_PLACE_DETAILS => {
                async {
                    let args: PlaceDetailsArgs = parse_args(raw_args)?;
                    Ok(pretty(self.maps.place_details(&args.place_id).await?))
                }
                .await
            }
            registry::MAPS_DISTANCE_MATRIX => {
                async {
                    let args: DistanceMatrixArgs = parse_args(raw_args)?;
                    Ok(pretty(
                        self.maps
                            .distance_matrix(&args.origins, &args.destinations, args.mode)
                            .await?,
                    ))
                }
                .await
            }
            registry::MAPS_ELEVATION => {
                async {
                    let args: ElevationArgs = parse_args(raw_args)?;
                    Ok(pretty(self.maps.elevation(&args.locations).await?))
                }
                .await
            }
            other => return Err(DispatchError::UnknownTool(other.to_string())),
        };

        Ok(into_result(tool_name, outcome))
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(ToolError::Args)
}

fn pretty(value: Value) -> String {
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}

/// The one place operation outcomes become envelopes: success turns into a
/// single text content block, failure into an `Error: ...` text block with
/// `is_error` set. Only the error's message crosses the boundary.
fn into_result(tool_name: &str, outcome: Result<String, ToolError>) -> CallToolResult {
    match outcome {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(e) => {
            warn!(tool = tool_name, error = %e, "tool call failed");
            error_result(format!("Error: {e}"))
        }
    }
}

fn error_result(message: impl Into<String>) -> CallToolResult {
    CallToolResult {
        content: vec![Content::text(message.into())],
        structured_content: None,
        is_error: Some(true),
        meta: None,
    }
}

/// Check arguments against the declared schema: missing required fields
/// are reported first with a direct message, then type/range/enum
/// constraints via the compiled schema.
fn validate_arguments(schema: &Value, args: &Value) -> Result<(), String> {
    let Some(args_obj) = args.as_object() else {
        return Err("arguments must be a JSON object".to_string());
    };

    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .collect();
    let missing: Vec<&str> = required
        .into_iter()
        .filter(|name| !args_obj.contains_key(*name))
        .collect();
    if !missing.is_empty() {
        return Err(format!(
            "missing required argument(s): {}",
            missing.join(", ")
        ));
    }

    let validator = jsonschema::validator_for(schema)
        .map_err(|e| format!("tool schema failed to compile: {e}"))?;
    let violations: Vec<String> = validator
        .iter_errors(args)
        .map(|e| {
            let path = e.instance_path().to_string();
            if path.is_empty() {
                e.to_string()
            } else {
                format!("{path}: {e}")
            }
        })
        .collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(format!("invalid arguments: {}", violations.join("; ")))
    }
}
