//! Directions provider backed by the Google Directions API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::debug;

use binroute_core::{
    model::Coordinates,
    ports::{Directions, DirectionsPort, PathSegment, PortError, RouteRequest},
};

const BASE_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";

/// Response from /directions/json
#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,

    #[serde(default)]
    error_message: Option<String>,

    #[serde(default)]
    routes: Vec<RouteEntry>,
}

/// Single route alternative
#[derive(Debug, Deserialize)]
struct RouteEntry {
    #[serde(default)]
    legs: Vec<Leg>,

    // only present when waypoints were optimized
    #[serde(default)]
    waypoint_order: Vec<usize>,
}

/// Leg between two consecutive stops
#[derive(Debug, Deserialize)]
struct Leg {
    #[serde(default)]
    steps: Vec<Step>,
}

/// Turn-by-turn step
#[derive(Debug, Deserialize)]
struct Step {
    start_location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

/// Directions port calling the Google Directions API.
pub struct GoogleDirections {
    client: Client,
    api_key: String,
}

impl GoogleDirections {
    /// Create a directions port bound to the given HTTP client and API key.
    #[must_use]
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl DirectionsPort for GoogleDirections {
    async fn route(&self, request: &RouteRequest) -> Result<Directions, PortError> {
        let query = query_params(request);
        debug!(
            origin = %request.origin,
            destination = %request.destination,
            waypoints = request.waypoints.len(),
            "requesting directions"
        );

        let req = self
            .client
            .get(BASE_URL)
            .query(&query)
            .query(&[("key", self.api_key.as_str())]);

        let body = fetch_text(req).await?;
        parse_directions(&body)
    }
}

/// Query parameters for a request, without the API key.
///
/// Waypoints are passed with `optimize:true` so Google picks the stop order.
#[must_use]
pub fn query_params(request: &RouteRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("origin", request.origin.to_string()),
        ("destination", request.destination.to_string()),
        ("mode", request.mode.as_str().to_owned()),
    ];

    if !request.waypoints.is_empty() {
        let stops = request
            .waypoints
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("|");
        params.push(("waypoints", format!("optimize:true|{stops}")));
    }

    params
}

/// Decode a Directions API body into path segments.
///
/// # Errors
///
/// Returns [`PortError::MalformedPayload`] for undecodable bodies and
/// [`PortError::Directions`] when Google reports a status other than `OK` or returns no
/// route.
pub fn parse_directions(body: &str) -> Result<Directions, PortError> {
    let response: DirectionsResponse =
        serde_json::from_str(body).map_err(|err| PortError::MalformedPayload(err.to_string()))?;

    if response.status != "OK" {
        let detail = match response.error_message {
            Some(message) => format!("{}: {message}", response.status),
            None => response.status,
        };
        return Err(PortError::Directions(detail));
    }

    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| PortError::Directions("no route returned".to_owned()))?;

    let segments = route
        .legs
        .into_iter()
        .flat_map(|leg| leg.steps)
        .map(|step| PathSegment {
            start: Coordinates::new(step.start_location.lat, step.start_location.lng),
        })
        .collect();

    Ok(Directions {
        segments,
        waypoint_order: route.waypoint_order,
    })
}

// Small helper to fetch a body with status handling.
async fn fetch_text(req: RequestBuilder) -> Result<String, PortError> {
    req.send()
        .await
        .map_err(PortError::from)?
        .error_for_status()
        .map_err(PortError::from)?
        .text()
        .await
        .map_err(PortError::from)
}

#[cfg(test)]
mod tests {
    use binroute_core::model::TravelMode;

    use super::*;

    #[test]
    fn waypoints_are_optimized_and_pipe_separated() {
        let request = RouteRequest {
            origin: Coordinates::new(28.7, 77.2),
            destination: Coordinates::new(28.75, 77.25),
            waypoints: vec![Coordinates::new(28.71, 77.21), Coordinates::new(28.72, 77.22)],
            mode: TravelMode::Driving,
        };

        let params = query_params(&request);
        assert!(params.contains(&("origin", "28.7,77.2".to_owned())));
        assert!(params.contains(&("destination", "28.75,77.25".to_owned())));
        assert!(params.contains(&("mode", "driving".to_owned())));
        assert!(params.contains(&(
            "waypoints",
            "optimize:true|28.71,77.21|28.72,77.22".to_owned()
        )));
    }

    #[test]
    fn no_waypoints_parameter_for_single_stop() {
        let request = RouteRequest {
            origin: Coordinates::new(28.7, 77.2),
            destination: Coordinates::new(28.75, 77.25),
            waypoints: Vec::new(),
            mode: TravelMode::Walking,
        };
        let params = query_params(&request);
        assert!(params.iter().all(|(name, _)| *name != "waypoints"));
        assert!(params.contains(&("mode", "walking".to_owned())));
    }

    #[test]
    fn ok_response_yields_step_starts_across_legs() {
        let body = r#"{
            "status": "OK",
            "routes": [{
                "waypoint_order": [1, 0],
                "legs": [
                    {"steps": [
                        {"start_location": {"lat": 28.70, "lng": 77.20}},
                        {"start_location": {"lat": 28.705, "lng": 77.204}}
                    ]},
                    {"steps": [
                        {"start_location": {"lat": 28.72, "lng": 77.22}}
                    ]}
                ]
            }]
        }"#;

        let directions = parse_directions(body).expect("valid response");
        let starts: Vec<Coordinates> = directions
            .segments
            .iter()
            .map(|segment| segment.start)
            .collect();
        assert_eq!(
            starts,
            [
                Coordinates::new(28.70, 77.20),
                Coordinates::new(28.705, 77.204),
                Coordinates::new(28.72, 77.22),
            ]
        );
        assert_eq!(directions.waypoint_order, [1, 0]);
    }

    #[test]
    fn error_status_carries_google_message() {
        let body = r#"{"status": "REQUEST_DENIED", "error_message": "The provided API key is invalid.", "routes": []}"#;
        let err = parse_directions(body).expect_err("denied");
        assert!(
            matches!(&err, PortError::Directions(detail) if detail == "REQUEST_DENIED: The provided API key is invalid."),
            "{err}"
        );
    }

    #[test]
    fn zero_results_without_message_keeps_status() {
        let err = parse_directions(r#"{"status": "ZERO_RESULTS", "routes": []}"#).expect_err("no route");
        assert!(matches!(&err, PortError::Directions(detail) if detail == "ZERO_RESULTS"), "{err}");
    }

    #[test]
    fn garbage_body_is_malformed() {
        let err = parse_directions("<html>").expect_err("not json");
        assert!(matches!(err, PortError::MalformedPayload(_)));
    }
}
