//! Tool declarations: names, descriptions, and input schemas.
//!
//! The schemas double as the validation contract: `dispatch` checks
//! incoming arguments against them before touching a gateway, so ranges
//! and enums declared here are enforced, not advisory.

use rmcp::model::{Tool, ToolAnnotations};
use serde_json::{Value, json};
use std::sync::Arc;

pub const BRAVE_WEB_SEARCH: &str = "brave_web_search";
pub const BRAVE_LOCAL_SEARCH: &str = "brave_local_search";
pub const MAPS_GEOCODE: &str = "maps_geocode";
pub const MAPS_REVERSE_GEOCODE: &str = "maps_reverse_geocode";
pub const MAPS_SEARCH_PLACES: &str = "maps_search_places";
pub const MAPS_PLACE_DETAILS: &str = "maps_place_details";
pub const MAPS_DISTANCE_MATRIX: &str = "maps_distance_matrix";
pub const MAPS_ELEVATION: &str = "maps_elevation";

struct ToolDef {
    name: &'static str,
    description: &'static str,
    input_schema: fn() -> Value,
}

const TOOLS: &[ToolDef] = &[
    ToolDef {
        name: BRAVE_WEB_SEARCH,
        description: "Performs a web search using the Brave Search API, ideal for general \
            queries, news, articles, and online content. Supports pagination via offset. \
            Maximum 20 results per request.",
        input_schema: web_search_schema,
    },
    ToolDef {
        name: BRAVE_LOCAL_SEARCH,
        description: "Searches for local businesses and places using Brave's Local Search \
            API. Returns names, addresses, ratings, review counts, phone numbers and \
            opening hours. Automatically falls back to web search if no local results \
            are found.",
        input_schema: local_search_schema,
    },
    ToolDef {
        name: MAPS_GEOCODE,
        description: "Convert an address into geographic coordinates",
        input_schema: geocode_schema,
    },
    ToolDef {
        name: MAPS_REVERSE_GEOCODE,
        description: "Convert coordinates into an address",
        input_schema: reverse_geocode_schema,
    },
    ToolDef {
        name: MAPS_SEARCH_PLACES,
        description: "Search for places using a text query, optionally biased around a \
            center point",
        input_schema: search_places_schema,
    },
    ToolDef {
        name: MAPS_PLACE_DETAILS,
        description: "Get detailed information about a specific place",
        input_schema: place_details_schema,
    },
    ToolDef {
        name: MAPS_DISTANCE_MATRIX,
        description: "Calculate travel distance and time for multiple origins and \
            destinations",
        input_schema: distance_matrix_schema,
    },
    ToolDef {
        name: MAPS_ELEVATION,
        description: "Get elevation data for locations on the earth",
        input_schema: elevation_schema,
    },
];

/// The declared input schema for a tool, or `None` for an unknown name.
#[must_use]
pub fn input_schema(name: &str) -> Option<Value> {
    TOOLS
        .iter()
        .find(|def| def.name == name)
        .map(|def| (def.input_schema)())
}

/// Advertised tool list for the agent runtime.
#[must_use]
pub fn list_tools() -> Vec<Tool> {
    TOOLS
        .iter()
        .map(|def| {
            let schema = (def.input_schema)()
                .as_object()
                .cloned()
                .unwrap_or_default();
            let mut tool = Tool::new(def.name, def.description, Arc::new(schema));
            tool.annotations = Some(read_only_annotations());
            tool
        })
        .collect()
}

// Every tool is a GET-backed read against an external system.
fn read_only_annotations() -> ToolAnnotations {
    ToolAnnotations {
        title: None,
        read_only_hint: Some(true),
        destructive_hint: Some(false),
        idempotent_hint: Some(true),
        open_world_hint: Some(true),
    }
}

fn web_search_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "Search query (max 400 chars, 50 words)"
            },
            "count": {
                "type": "integer",
                "minimum": 1,
                "maximum": 20,
                "default": 10,
                "description": "Number of results (1-20, default 10)"
            },
            "offset": {
                "type": "integer",
                "minimum": 0,
                "maximum": 9,
                "default": 0,
                "description": "Pagination offset (max 9, default 0)"
            }
        },
        "required": ["query"]
    })
}

fn local_search_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "Local search query (e.g. 'pizza near Central Park')"
            },
            "count": {
                "type": "integer",
                "minimum": 1,
                "maximum": 20,
                "default": 5,
                "description": "Number of results (1-20, default 5)"
            }
        },
        "required": ["query"]
    })
}

fn geocode_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "address": {
                "type": "string",
                "description": "The address to geocode"
            }
        },
        "required": ["address"]
    })
}

fn latlng_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "description": description,
        "properties": {
            "latitude": {"type": "number"},
            "longitude": {"type": "number"}
        },
        "required": ["latitude", "longitude"]
    })
}

fn reverse_geocode_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "latitude": {"type": "number", "description": "latitude"},
            "longitude": {"type": "number", "description": "longitude"}
        },
        "required": ["latitude", "longitude"]
    })
}

fn search_places_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "Search query"
            },
            "location": latlng_schema("Optional center point for the search"),
            "radius": {
                "type": "integer",
                "minimum": 1,
                "maximum": 50_000,
                "description": "Search radius in meters (max 50000)"
            }
        },
        "required": ["query"]
    })
}

fn place_details_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "place_id": {
                "type": "string",
                "description": "The place ID to get details for"
            }
        },
        "required": ["place_id"]
    })
}

fn distance_matrix_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "origins": {
                "type": "array",
                "items": {"type": "string"},
                "minItems": 1,
                "description": "Array of origin addresses or coordinates"
            },
            "destinations": {
                "type": "array",
                "items": {"type": "string"},
                "minItems": 1,
                "description": "Array of destination addresses or coordinates"
            },
            "mode": {
                "type": "string",
                "enum": ["driving", "walking", "bicycling", "transit"],
                "default": "driving",
                "description": "Travel mode"
            }
        },
        "required": ["origins", "destinations"]
    })
}

fn elevation_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "locations": {
                "type": "array",
                "items": latlng_schema("A location to sample"),
                "minItems": 1,
                "description": "Array of locations to get elevation for"
            }
        },
        "required": ["locations"]
    })
}
