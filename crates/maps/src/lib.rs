//! Maps gateway: geocoding, places, routing, elevation.
//!
//! Every operation issues one `GET` against the upstream maps API and
//! normalizes the response into the JSON subset agents consume. The
//! upstream reports failures in-band via a `status` field; anything other
//! than `"OK"` is treated the same as an HTTP-level error.

pub mod client;
pub mod config;

pub use client::{LatLng, MapsError, MapsGateway, TravelMode};
pub use config::MapsConfig;
