//! Core types and service wiring for the binroute collection planner.

/// Per-cycle aggregates for reporting.
pub mod analytics;
/// Strategies mapping bins to vans.
pub mod assignment;
/// Field workers and task notifications.
pub mod dispatch;
/// Domain models and identifiers shared by all providers.
pub mod model;
/// Registry of assignment strategies.
pub mod plugin;
/// Traits describing the external collaborators.
pub mod ports;
/// Bin priority scoring.
pub mod priority;
/// Raw records and their validation.
pub mod record;
/// Route planning and provider fan-out.
pub mod routing;
/// High-level service facade used by clients.
pub mod service;

pub use analytics::*;
pub use assignment::*;
pub use dispatch::*;
pub use model::*;
pub use plugin::*;
pub use ports::*;
pub use record::*;
pub use routing::*;
pub use service::*;
