//! Traits describing the external collaborators and shared request types.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Error as ReqwestError;

use crate::model::{Bin, BinId, Coordinates, TravelMode, Van};
use crate::record::TelemetryBatch;

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to external services.
pub enum PortError {
    /// Network layer failed.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// The telemetry store could not be reached or refused the request.
    #[error("Telemetry store unavailable: {0}")]
    TelemetryUnavailable(String),
    /// A response body could not be decoded at all.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
    /// The directions provider rejected or failed a request.
    #[error("Directions provider error: {0}")]
    Directions(String),
    /// A route request did not finish in time.
    #[error("Route request timed out after {0:?}")]
    RouteTimeout(Duration),
    /// A notification could not be delivered.
    #[error("Notification delivery failed: {0}")]
    Notification(String),
    /// No notification backend is configured.
    #[error("Notifications are not configured")]
    NotificationsDisabled,
    /// No strategy is registered under the requested name.
    #[error("Unknown assignment strategy: {0}")]
    UnknownStrategy(String),
    /// The bin is not part of the current snapshot.
    #[error("Unknown bin: {0}")]
    UnknownBin(BinId),
    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, PartialEq)]
/// Parameters of a single directions request.
pub struct RouteRequest {
    /// Starting point, the van's position.
    pub origin: Coordinates,
    /// Final stop.
    pub destination: Coordinates,
    /// Stops between origin and destination; the provider may reorder them.
    pub waypoints: Vec<Coordinates>,
    /// Travel mode.
    pub mode: TravelMode,
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// One step of a routed path.
pub struct PathSegment {
    /// Where the step begins.
    pub start: Coordinates,
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Path returned by a directions provider.
pub struct Directions {
    /// Steps in driving order.
    pub segments: Vec<PathSegment>,
    /// Optimized order of the request's waypoints, as indices into it. Empty when the
    /// provider did not reorder.
    pub waypoint_order: Vec<usize>,
}

#[async_trait]
/// Read access to the current bin and van snapshot.
pub trait TelemetryPort: Send + Sync {
    /// Human-readable name of the backing store.
    fn source(&self) -> &str;

    /// Fetch every bin.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::TelemetryUnavailable`] when the store cannot be reached and
    /// [`PortError::MalformedPayload`] when the response cannot be decoded. Individual
    /// broken records are reported in the batch instead.
    async fn bins(&self) -> Result<TelemetryBatch<Bin>, PortError>;

    /// Fetch every van.
    ///
    /// # Errors
    ///
    /// Same as [`TelemetryPort::bins`].
    async fn vans(&self) -> Result<TelemetryBatch<Van>, PortError>;
}

#[async_trait]
/// Turn-by-turn routing backend.
pub trait DirectionsPort: Send + Sync {
    /// Request a path for one van.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails or the provider reports an error.
    async fn route(&self, request: &RouteRequest) -> Result<Directions, PortError>;
}

#[async_trait]
/// Message delivery to field workers.
pub trait NotificationPort: Send + Sync {
    /// Send `message` to `recipient`.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Notification`] or [`PortError::Network`] when delivery fails.
    async fn send(&self, recipient: &str, message: &str) -> Result<(), PortError>;
}
