//! The maps operations.

use crate::config::MapsConfig;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;
use waypost_http_call::{HttpCallError, HttpCallSpec, HttpCaller, ResponseKind};

#[derive(Debug, Error)]
pub enum MapsError {
    #[error(transparent)]
    Http(#[from] HttpCallError),
    /// The upstream answered 2xx but reported a non-`OK` status in-band.
    #[error("upstream status is not OK: {0}")]
    Status(String),
    /// The response parsed but is missing something the operation needs.
    #[error("unexpected response shape: {0}")]
    Shape(String),
}

pub type Result<T> = std::result::Result<T, MapsError>;

/// A geographic coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLng {
    fn as_param(self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

/// Travel mode for distance-matrix queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Driving,
    Walking,
    Bicycling,
    Transit,
}

impl TravelMode {
    #[must_use]
    pub fn as_param(self) -> &'static str {
        match self {
            Self::Driving => "driving",
            Self::Walking => "walking",
            Self::Bicycling => "bicycling",
            Self::Transit => "transit",
        }
    }
}

/// Maps operations over the upstream API. Not metered: the upstream quota
/// model differs from the search provider's, so no limiter is composed in.
pub struct MapsGateway {
    config: MapsConfig,
    caller: HttpCaller,
}

impl MapsGateway {
    #[must_use]
    pub fn new(config: MapsConfig, caller: HttpCaller) -> Self {
        Self { config, caller }
    }

    /// Convert an address into geographic coordinates.
    ///
    /// # Errors
    ///
    /// Fails on transport/HTTP errors, a non-`OK` upstream status, or an
    /// empty result list.
    pub async fn geocode(&self, address: &str) -> Result<Value> {
        let body = self
            .call("/geocode/json", vec![("address", json!(address))])
            .await?;
        let first = first_result(&body, "geocode")?;
        Ok(json!({
            "location": first.pointer("/geometry/location"),
            "formatted_address": first.get("formatted_address"),
            "place_id": first.get("place_id"),
        }))
    }

    /// Convert coordinates into an address.
    ///
    /// # Errors
    ///
    /// Fails on transport/HTTP errors, a non-`OK` upstream status, or an
    /// empty result list.
    pub async fn reverse_geocode(&self, location: LatLng) -> Result<Value> {
        let body = self
            .call("/geocode/json", vec![("latlng", json!(location.as_param()))])
            .await?;
        let first = first_result(&body, "reverse geocode")?;
        Ok(json!({
            "formatted_address": first.get("formatted_address"),
            "place_id": first.get("place_id"),
            "address_components": first.get("address_components"),
        }))
    }

    /// Text search for places, optionally biased around a center point.
    ///
    /// # Errors
    ///
    /// Fails on transport/HTTP errors or a non-`OK` upstream status.
    pub async fn search_places(
        &self,
        query: &str,
        location: Option<LatLng>,
        radius: Option<u32>,
    ) -> Result<Value> {
        let mut params = vec![("query", json!(query))];
        if let Some(center) = location {
            params.push(("location", json!(center.as_param())));
        }
        if let Some(radius) = radius {
            params.push(("radius", json!(radius)));
        }
        let body = self.call("/place/textsearch/json", params).await?;

        let places: Vec<Value> = body
            .get("results")
            .and_then(Value::as_array)
            .map(|results| {
                results
                    .iter()
                    .map(|place| {
                        json!({
                            "name": place.get("name"),
                            "formatted_address": place.get("formatted_address"),
                            "location": place.pointer("/geometry/location"),
                            "place_id": place.get("place_id"),
                            "rating": place.get("rating"),
                            "types": place.get("types"),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(json!({ "places": places }))
    }

    /// Detailed information about one place.
    ///
    /// # Errors
    ///
    /// Fails on transport/HTTP errors, a non-`OK` upstream status, or a
    /// response missing the `result` payload.
    pub async fn place_details(&self, place_id: &str) -> Result<Value> {
        let body = self
            .call("/place/details/json", vec![("place_id", json!(place_id))])
            .await?;
        let result = body
            .get("result")
            .ok_or_else(|| MapsError::Shape("place details response has no result".to_string()))?;
        Ok(json!({
            "name": result.get("name"),
            "formatted_address": result.get("formatted_address"),
            "location": result.pointer("/geometry/location"),
            "formatted_phone_number": result.get("formatted_phone_number"),
            "website": result.get("website"),
            "rating": result.get("rating"),
            "reviews": result.get("reviews"),
            "opening_hours": result.get("opening_hours"),
        }))
    }

    /// Travel distance and time for every origin/destination pair.
    /// Origins and destinations are pipe-joined into single parameters.
    ///
    /// # Errors
    ///
    /// Fails on transport/HTTP errors or a non-`OK` upstream status.
    pub async fn distance_matrix(
        &self,
        origins: &[String],
        destinations: &[String],
        mode: TravelMode,
    ) -> Result<Value> {
        let body = self
            .call(
                "/distancematrix/json",
                vec![
                    ("origins", json!(origins.join("|"))),
                    ("destinations", json!(destinations.join("|"))),
                    ("mode", json!(mode.as_param())),
                ],
            )
            .await?;

        let rows: Vec<Value> = body
            .get("rows")
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .map(|row| {
                        let elements: Vec<Value> = row
                            .get("elements")
                            .and_then(Value::as_array)
                            .map(|elements| {
                                elements
                                    .iter()
                                    .map(|element| {
                                        json!({
                                            "status": element.get("status"),
                                            "duration": element.get("duration"),
                                            "distance": element.get("distance"),
                                        })
                                    })
                                    .collect()
                            })
                            .unwrap_or_default();
                        json!({ "elements": elements })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(json!({
            "origin_addresses": body.get("origin_addresses"),
            "destination_addresses": body.get("destination_addresses"),
            "results": rows,
        }))
    }

    /// Elevation samples for the given locations (pipe-joined `lat,lng`).
    ///
    /// # Errors
    ///
    /// Fails on transport/HTTP errors or a non-`OK` upstream status.
    pub async fn elevation(&self, locations: &[LatLng]) -> Result<Value> {
        let joined = locations
            .iter()
            .map(|l| l.as_param())
            .collect::<Vec<_>>()
            .join("|");
        let body = self
            .call("/elevation/json", vec![("locations", json!(joined))])
            .await?;

        let results: Vec<Value> = body
            .get("results")
            .and_then(Value::as_array)
            .map(|results| {
                results
                    .iter()
                    .map(|sample| {
                        json!({
                            "elevation": sample.get("elevation"),
                            "location": sample.get("location"),
                            "resolution": sample.get("resolution"),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(json!({ "results": results }))
    }

    /// One upstream `GET`: append the operation parameters plus `key` and
    /// `language`, decode JSON, and enforce the in-band `status` field.
    async fn call(&self, path: &str, params: Vec<(&str, Value)>) -> Result<Value> {
        let mut spec = HttpCallSpec::get(format!("{}{}", self.config.base_url, path))
            .response(ResponseKind::Json);
        for (name, value) in params {
            spec = spec.query(name, value);
        }
        if let Some(key) = &self.config.api_key {
            spec = spec.query("key", key.as_str());
        }
        spec = spec.query("language", self.config.language.as_str());

        let body = self.caller.execute(spec).await?.into_json()?;
        let status = body.get("status").and_then(Value::as_str).unwrap_or("");
        if status != "OK" {
            debug!(path, status, "maps call rejected upstream");
            return Err(MapsError::Status(status.to_string()));
        }
        Ok(body)
    }
}

fn first_result<'a>(body: &'a Value, operation: &str) -> Result<&'a Value> {
    body.get("results")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
        .ok_or_else(|| MapsError::Shape(format!("{operation} returned no results")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::Query;
    use axum::routing::get;
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    struct StubServer {
        base_url: String,
        shutdown: Option<tokio::sync::oneshot::Sender<()>>,
        handle: tokio::task::JoinHandle<std::io::Result<()>>,
    }

    impl StubServer {
        async fn start(app: Router) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
            let addr = listener.local_addr().expect("local_addr");
            let (tx, rx) = tokio::sync::oneshot::channel::<()>();
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = rx.await;
            });
            let handle = tokio::spawn(async move { server.await });
            Self {
                base_url: format!("http://{addr}"),
                shutdown: Some(tx),
                handle,
            }
        }

        async fn stop(mut self) {
            if let Some(tx) = self.shutdown.take() {
                let _ = tx.send(());
            }
            let _ = self.handle.await;
        }
    }

    fn gateway(base_url: &str) -> MapsGateway {
        let config = MapsConfig {
            base_url: base_url.to_string(),
            api_key: Some("maps-key".to_string()),
            ..MapsConfig::default()
        };
        MapsGateway::new(config, HttpCaller::new())
    }

    #[tokio::test]
    async fn geocode_maps_the_first_result() {
        async fn handler(Query(params): Query<HashMap<String, String>>) -> axum::Json<Value> {
            assert_eq!(params.get("address").map(String::as_str), Some("Tokyo Tower"));
            assert_eq!(params.get("key").map(String::as_str), Some("maps-key"));
            assert_eq!(params.get("language").map(String::as_str), Some("ja"));
            axum::Json(json!({
                "status": "OK",
                "results": [{
                    "geometry": {"location": {"lat": 35.6586, "lng": 139.7454}},
                    "formatted_address": "4 Chome-2-8 Shibakoen, Minato City, Tokyo",
                    "place_id": "ChIJCewJkL2LGGAR3Qmk0vCTGkg",
                    "extra_field": "dropped"
                }]
            }))
        }
        let app = Router::new().route("/geocode/json", get(handler));
        let server = StubServer::start(app).await;

        let out = gateway(&server.base_url)
            .geocode("Tokyo Tower")
            .await
            .expect("geocode");
        assert_eq!(
            out,
            json!({
                "location": {"lat": 35.6586, "lng": 139.7454},
                "formatted_address": "4 Chome-2-8 Shibakoen, Minato City, Tokyo",
                "place_id": "ChIJCewJkL2LGGAR3Qmk0vCTGkg",
            })
        );

        server.stop().await;
    }

    #[tokio::test]
    async fn non_ok_status_is_an_error() {
        let app = Router::new().route(
            "/geocode/json",
            get(|| async { axum::Json(json!({"status": "REQUEST_DENIED", "results": []})) }),
        );
        let server = StubServer::start(app).await;

        let err = gateway(&server.base_url)
            .geocode("nowhere")
            .await
            .expect_err("should fail");
        match err {
            MapsError::Status(status) => assert_eq!(status, "REQUEST_DENIED"),
            other => panic!("unexpected error: {other}"),
        }

        server.stop().await;
    }

    #[tokio::test]
    async fn distance_matrix_pipe_joins_origins_and_destinations() {
        async fn handler(Query(params): Query<HashMap<String, String>>) -> axum::Json<Value> {
            axum::Json(json!({
                "status": "OK",
                "origin_addresses": [params.get("origins")],
                "destination_addresses": [params.get("destinations")],
                "rows": [{
                    "elements": [{
                        "status": "OK",
                        "duration": {"text": "24 mins", "value": 1440},
                        "distance": {"text": "12 km", "value": 12000},
                        "fare": "dropped"
                    }]
                }]
            }))
        }
        let app = Router::new().route("/distancematrix/json", get(handler));
        let server = StubServer::start(app).await;

        let out = gateway(&server.base_url)
            .distance_matrix(
                &["Shibuya".to_string(), "Ueno".to_string()],
                &["Narita Airport".to_string()],
                TravelMode::Transit,
            )
            .await
            .expect("distance_matrix");
        assert_eq!(out["origin_addresses"], json!(["Shibuya|Ueno"]));
        assert_eq!(out["destination_addresses"], json!(["Narita Airport"]));
        assert_eq!(
            out["results"],
            json!([{"elements": [{
                "status": "OK",
                "duration": {"text": "24 mins", "value": 1440},
                "distance": {"text": "12 km", "value": 12000},
            }]}])
        );

        server.stop().await;
    }

    #[tokio::test]
    async fn elevation_joins_locations_and_maps_samples() {
        async fn handler(Query(params): Query<HashMap<String, String>>) -> axum::Json<Value> {
            assert_eq!(
                params.get("locations").map(String::as_str),
                Some("35.1,139.2|36.5,138.0")
            );
            axum::Json(json!({
                "status": "OK",
                "results": [
                    {"elevation": 12.5, "location": {"lat": 35.1, "lng": 139.2}, "resolution": 9.5},
                    {"elevation": 800.0, "location": {"lat": 36.5, "lng": 138.0}, "resolution": 9.5}
                ]
            }))
        }
        let app = Router::new().route("/elevation/json", get(handler));
        let server = StubServer::start(app).await;

        let out = gateway(&server.base_url)
            .elevation(&[
                LatLng {
                    latitude: 35.1,
                    longitude: 139.2,
                },
                LatLng {
                    latitude: 36.5,
                    longitude: 138.0,
                },
            ])
            .await
            .expect("elevation");
        assert_eq!(out["results"].as_array().map(Vec::len), Some(2));
        assert_eq!(out["results"][1]["elevation"], json!(800.0));

        server.stop().await;
    }

    #[tokio::test]
    async fn place_details_maps_the_result_payload() {
        async fn handler(Query(params): Query<HashMap<String, String>>) -> axum::Json<Value> {
            assert_eq!(params.get("place_id").map(String::as_str), Some("pid-1"));
            axum::Json(json!({
                "status": "OK",
                "result": {
                    "name": "Sushi Aoki",
                    "formatted_address": "Ginza, Tokyo",
                    "geometry": {"location": {"lat": 35.67, "lng": 139.76}},
                    "formatted_phone_number": "03-1234-5678",
                    "website": "https://example.com",
                    "rating": 4.2,
                    "reviews": [],
                    "opening_hours": {"open_now": true}
                }
            }))
        }
        let app = Router::new().route("/place/details/json", get(handler));
        let server = StubServer::start(app).await;

        let out = gateway(&server.base_url)
            .place_details("pid-1")
            .await
            .expect("place_details");
        assert_eq!(out["name"], json!("Sushi Aoki"));
        assert_eq!(out["location"], json!({"lat": 35.67, "lng": 139.76}));
        assert_eq!(out["opening_hours"], json!({"open_now": true}));

        server.stop().await;
    }
}
