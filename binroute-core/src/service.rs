//! High-level service facade running collection cycles.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::analytics::{self, Analytics};
use crate::assignment::{AssignmentStrategy, StrategyId};
use crate::dispatch::{Dispatcher, FieldWorker};
use crate::model::{Assignment, BinId, RouteOutcome, ScoredBin, Van, VanAssignment, VanRoute};
use crate::ports::{PortError, TelemetryPort};
use crate::priority;
use crate::record::RecordIssue;
use crate::routing::RouteBuilder;

#[derive(Debug, Clone, Serialize)]
/// Everything one cycle produced, ready for presentation.
pub struct CycleSnapshot {
    /// When the telemetry was fetched.
    pub fetched_at: DateTime<Utc>,
    /// Strategy used for the assignment.
    pub strategy: StrategyId,
    /// Valid bins, highest priority first.
    pub bins: Vec<ScoredBin>,
    /// Valid vans, in store order.
    pub vans: Vec<Van>,
    /// Van per bin.
    pub assignment: Assignment,
    /// Route result per van, in van order.
    pub routes: Vec<VanRoute>,
    /// Records skipped during validation.
    pub issues: Vec<RecordIssue>,
    /// Totals for the analytics panel.
    pub analytics: Analytics,
}

impl CycleSnapshot {
    /// Find a bin by id.
    #[must_use]
    pub fn bin(&self, id: &BinId) -> Option<&ScoredBin> {
        self.bins.iter().find(|scored| &scored.bin.id == id)
    }

    /// Van serving a bin; bins outside the snapshot count as unassigned.
    #[must_use]
    pub fn van_for(&self, id: &BinId) -> VanAssignment {
        self.assignment
            .van_for(id)
            .cloned()
            .unwrap_or(VanAssignment::Unassigned)
    }

    /// Vans whose route request failed, with the reason.
    pub fn failed_routes(&self) -> impl Iterator<Item = (&VanRoute, &str)> {
        self.routes.iter().filter_map(|route| match &route.outcome {
            RouteOutcome::Failed(reason) => Some((route, reason.as_str())),
            RouteOutcome::Routed(_) | RouteOutcome::Idle => None,
        })
    }
}

/// Public entry point running Fetch → Score → Assign → Route.
pub struct CollectionService {
    telemetry: Arc<dyn TelemetryPort>,
    strategy: Arc<dyn AssignmentStrategy>,
    routes: RouteBuilder,
    dispatcher: Dispatcher,
}

impl CollectionService {
    /// Create a service from its collaborators. Notifications start disabled.
    #[must_use]
    pub fn new(
        telemetry: Arc<dyn TelemetryPort>,
        strategy: Arc<dyn AssignmentStrategy>,
        routes: RouteBuilder,
    ) -> Self {
        Self {
            telemetry,
            strategy,
            routes,
            dispatcher: Dispatcher::disabled(),
        }
    }

    /// Attach a dispatcher for task notifications.
    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Identifier of the active assignment strategy.
    #[must_use]
    pub fn strategy(&self) -> StrategyId {
        self.strategy.id()
    }

    /// Name of the telemetry source.
    #[must_use]
    pub fn source(&self) -> &str {
        self.telemetry.source()
    }

    /// Whether task notifications can be sent.
    #[must_use]
    pub fn notifications_enabled(&self) -> bool {
        self.dispatcher.is_enabled()
    }

    /// Run one full cycle on a fresh snapshot.
    ///
    /// # Errors
    ///
    /// Returns the telemetry error when bins or vans cannot be fetched; that is the
    /// only condition that aborts a cycle. Broken records and route failures are
    /// reported inside the snapshot.
    pub async fn run_cycle(&self) -> Result<CycleSnapshot, PortError> {
        let fetched_at = Utc::now();
        let (bins, vans) = tokio::join!(self.telemetry.bins(), self.telemetry.vans());
        let bins = bins.inspect_err(|err| warn!(error = %err, "bin fetch failed"))?;
        let vans = vans.inspect_err(|err| warn!(error = %err, "van fetch failed"))?;

        let mut issues = bins.rejected;
        issues.extend(vans.rejected);
        for issue in &issues {
            warn!(%issue, "skipping record");
        }

        let ranked = priority::rank(bins.records);
        let vans = vans.records;

        let assignment = self.strategy.assign(&ranked, &vans);
        if vans.is_empty() && !ranked.is_empty() {
            warn!(bins = ranked.len(), "no vans available, every bin is unassigned");
        }

        let routes = self.routes.build(&vans, &ranked, &assignment).await;
        let analytics = analytics::summarize(&ranked, &vans, &assignment);

        let snapshot = CycleSnapshot {
            fetched_at,
            strategy: self.strategy.id(),
            bins: ranked,
            vans,
            assignment,
            routes,
            issues,
            analytics,
        };

        info!(
            bins = snapshot.bins.len(),
            vans = snapshot.vans.len(),
            rejected = snapshot.issues.len(),
            unassigned = snapshot.analytics.unassigned,
            failed_routes = snapshot.failed_routes().count(),
            strategy = %snapshot.strategy,
            "collection cycle finished"
        );

        Ok(snapshot)
    }

    /// Notify `worker` about `bin` from `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::UnknownBin`] when the bin is not in the snapshot, and the
    /// dispatcher's error when notifications are disabled or delivery fails.
    pub async fn dispatch_task(
        &self,
        snapshot: &CycleSnapshot,
        bin: &BinId,
        worker: &FieldWorker,
    ) -> Result<(), PortError> {
        let scored = snapshot
            .bin(bin)
            .ok_or_else(|| PortError::UnknownBin(bin.clone()))?;
        self.dispatcher
            .notify(worker, scored, &snapshot.van_for(bin))
            .await
    }
}
