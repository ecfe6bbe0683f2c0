//! Field workers and task notifications.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::model::{ScoredBin, VanAssignment};
use crate::ports::{NotificationPort, PortError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Identifier of a field worker.
pub struct WorkerId(pub u32);

impl fmt::Display for WorkerId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Person who receives collection tasks.
pub struct FieldWorker {
    /// Unique identifier.
    pub id: WorkerId,
    /// Display name.
    pub name: String,
    /// Zone the worker covers.
    pub zone: String,
    /// Phone number in E.164 format, the only address a task is sent to.
    pub phone: String,
}

/// Text sent to a worker for a bin.
#[must_use]
pub fn task_message(bin: &ScoredBin, van: &VanAssignment) -> String {
    let location = bin.bin.location;
    let van_note = match van {
        VanAssignment::Assigned(van) => format!("van {van}"),
        VanAssignment::Unassigned => "no van assigned yet".to_owned(),
    };
    format!(
        "Collect bin {} at {:.5},{:.5}: fill {:.0}%, priority {:.2}, {van_note}.",
        bin.bin.id,
        location.latitude,
        location.longitude,
        bin.bin.telemetry.fill_level,
        bin.priority,
    )
}

/// Sends task notifications to field workers.
#[derive(Clone, Default)]
pub struct Dispatcher {
    notifier: Option<Arc<dyn NotificationPort>>,
}

impl Dispatcher {
    /// Dispatcher delivering through `notifier`.
    #[must_use]
    pub fn new(notifier: Arc<dyn NotificationPort>) -> Self {
        Self {
            notifier: Some(notifier),
        }
    }

    /// Dispatcher that refuses every send.
    #[must_use]
    pub fn disabled() -> Self {
        Self { notifier: None }
    }

    /// Whether a notification backend is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.notifier.is_some()
    }

    /// Tell `worker` to collect `bin`.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::NotificationsDisabled`] without a backend, or the backend's
    /// error when delivery fails. Failures are logged here; callers decide whether to
    /// show them.
    pub async fn notify(
        &self,
        worker: &FieldWorker,
        bin: &ScoredBin,
        van: &VanAssignment,
    ) -> Result<(), PortError> {
        let notifier = self
            .notifier
            .as_ref()
            .ok_or(PortError::NotificationsDisabled)?;
        let message = task_message(bin, van);

        match notifier.send(&worker.phone, &message).await {
            Ok(()) => {
                info!(worker = %worker.id, bin = %bin.bin.id, "task notification sent");
                Ok(())
            }
            Err(err) => {
                warn!(worker = %worker.id, bin = %bin.bin.id, error = %err, "task notification failed");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bin, BinId, Coordinates, Telemetry, VanId};

    fn scored() -> ScoredBin {
        ScoredBin {
            bin: Bin {
                id: BinId("17".to_owned()),
                location: Coordinates::new(28.7041, 77.1025),
                telemetry: Telemetry {
                    fill_level: 92.4,
                    tilt: 1.0,
                    temperature: 38.0,
                    humidity: 70.0,
                },
            },
            priority: 6.308,
        }
    }

    #[test]
    fn message_mentions_bin_fill_and_van() {
        let message = task_message(&scored(), &VanAssignment::Assigned(VanId("V2".to_owned())));
        assert_eq!(
            message,
            "Collect bin 17 at 28.70410,77.10250: fill 92%, priority 6.31, van V2."
        );
    }

    #[test]
    fn message_for_unassigned_bin_says_so() {
        let message = task_message(&scored(), &VanAssignment::Unassigned);
        assert!(message.ends_with("no van assigned yet."), "{message}");
    }
}
