//! Route requests per van and their bounded fan-out to the directions provider.

use std::collections::HashMap;
use std::mem;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::{Id as TaskId, JoinSet};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::model::{
    Assignment, BinId, Coordinates, Route, RouteColor, RouteOutcome, ScoredBin, TravelMode, Van,
    VanId, VanRoute,
};
use crate::ports::{Directions, DirectionsPort, PortError, RouteRequest};

/// Directions requests allowed in flight at once.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;
/// Time a single directions request may take.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
/// Request for one van plus the bins it covers.
pub struct PlannedRoute {
    /// Bins in request order: the waypoints, then the destination.
    pub stops: Vec<BinId>,
    /// Request sent to the provider.
    pub request: RouteRequest,
}

impl PlannedRoute {
    /// Build the request for a van at `origin` covering `stops`.
    ///
    /// The last stop becomes the destination and the others the waypoints. Returns
    /// `None` when there is nothing to visit.
    #[must_use]
    pub fn new(origin: Coordinates, stops: Vec<(BinId, Coordinates)>, mode: TravelMode) -> Option<Self> {
        let ((_, destination), intermediate) = stops.split_last()?;
        let request = RouteRequest {
            origin,
            destination: *destination,
            waypoints: intermediate.iter().map(|(_, location)| *location).collect(),
            mode,
        };

        Some(Self {
            stops: stops.into_iter().map(|(id, _)| id).collect(),
            request,
        })
    }

    /// Combine the plan with the provider's answer.
    #[must_use]
    pub fn into_route(self, directions: Directions) -> Route {
        Route {
            stops: visiting_order(self.stops, &directions.waypoint_order),
            polyline: directions
                .segments
                .iter()
                .map(|segment| segment.start)
                .collect(),
        }
    }
}

/// Builds routes for all vans of a cycle.
#[derive(Clone)]
pub struct RouteBuilder {
    directions: Arc<dyn DirectionsPort>,
    max_in_flight: usize,
    request_timeout: Duration,
    mode: TravelMode,
}

impl RouteBuilder {
    /// Create a builder with default limits and driving mode.
    #[must_use]
    pub fn new(directions: Arc<dyn DirectionsPort>) -> Self {
        Self {
            directions,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            request_timeout: DEFAULT_TIMEOUT,
            mode: TravelMode::Driving,
        }
    }

    /// Limit concurrent provider requests. Zero is treated as one.
    #[must_use]
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Set the travel mode.
    #[must_use]
    pub fn with_mode(mut self, mode: TravelMode) -> Self {
        self.mode = mode;
        self
    }

    /// Plan one request per van, `None` for vans without bins.
    ///
    /// Bins keep their ranked order inside each plan.
    #[must_use]
    pub fn plan(
        &self,
        vans: &[Van],
        bins: &[ScoredBin],
        assignment: &Assignment,
    ) -> Vec<Option<PlannedRoute>> {
        let locations: HashMap<&BinId, Coordinates> = bins
            .iter()
            .map(|scored| (&scored.bin.id, scored.bin.location))
            .collect();
        let groups = assignment.by_van();

        vans.iter()
            .map(|van| {
                let stops = groups
                    .get(&van.id)
                    .map(|ids| {
                        ids.iter()
                            .filter_map(|id| {
                                locations.get(*id).map(|location| ((*id).clone(), *location))
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                PlannedRoute::new(van.location, stops, self.mode)
            })
            .collect()
    }

    /// Request routes for every van with bins.
    ///
    /// Requests run concurrently up to the configured limit. A failed, timed out, or
    /// panicking request only marks its own van as failed. Output follows van order.
    pub async fn build(
        &self,
        vans: &[Van],
        bins: &[ScoredBin],
        assignment: &Assignment,
    ) -> Vec<VanRoute> {
        let plans = self.plan(vans, bins, assignment);
        let semaphore = Arc::new(Semaphore::new(self.max_in_flight));
        let mut tasks = JoinSet::new();
        let mut task_vans: HashMap<TaskId, usize> = HashMap::new();
        let mut outcomes: Vec<Option<RouteOutcome>> = vec![None; vans.len()];

        for (index, (van, plan)) in vans.iter().zip(plans).enumerate() {
            let Some(plan) = plan else {
                if let Some(slot) = outcomes.get_mut(index) {
                    *slot = Some(RouteOutcome::Idle);
                }
                continue;
            };

            let directions = Arc::clone(&self.directions);
            let semaphore = Arc::clone(&semaphore);
            let limit = self.request_timeout;
            let van_id = van.id.clone();

            let handle = tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return RouteOutcome::Failed("route scheduler shut down".to_owned());
                };
                request_route(directions.as_ref(), &van_id, plan, limit).await
            });
            task_vans.insert(handle.id(), index);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            let (task, outcome) = match joined {
                Ok(finished) => finished,
                Err(err) => {
                    warn!(error = %err, "route task aborted");
                    (
                        err.id(),
                        RouteOutcome::Failed(format!("route task aborted: {err}")),
                    )
                }
            };
            if let Some(slot) = task_vans
                .get(&task)
                .and_then(|index| outcomes.get_mut(*index))
            {
                *slot = Some(outcome);
            }
        }

        vans.iter()
            .zip(outcomes)
            .enumerate()
            .map(|(index, (van, outcome))| VanRoute {
                van: van.id.clone(),
                origin: van.location,
                color: RouteColor::for_index(index),
                outcome: outcome.unwrap_or_else(|| {
                    RouteOutcome::Failed("route task did not report".to_owned())
                }),
            })
            .collect()
    }
}

async fn request_route(
    directions: &dyn DirectionsPort,
    van: &VanId,
    plan: PlannedRoute,
    limit: Duration,
) -> RouteOutcome {
    debug!(van = %van, stops = plan.stops.len(), "requesting route");

    let result = timeout(limit, directions.route(&plan.request)).await;
    match result {
        Ok(Ok(response)) => RouteOutcome::Routed(plan.into_route(response)),
        Ok(Err(err)) => {
            warn!(van = %van, error = %err, "route request failed");
            RouteOutcome::Failed(err.to_string())
        }
        Err(_elapsed) => {
            let err = PortError::RouteTimeout(limit);
            warn!(van = %van, error = %err, "route request failed");
            RouteOutcome::Failed(err.to_string())
        }
    }
}

/// Apply the provider's waypoint order; the destination always stays last.
///
/// Anything that is not a permutation of the waypoint indices is ignored.
fn visiting_order(stops: Vec<BinId>, order: &[usize]) -> Vec<BinId> {
    let waypoints = stops.len().saturating_sub(1);
    if order.len() != waypoints || !is_permutation(order) {
        return stops;
    }

    let mut slots: Vec<Option<BinId>> = stops.into_iter().map(Some).collect();
    let mut ordered = Vec::with_capacity(slots.len());
    for index in order {
        if let Some(stop) = slots.get_mut(*index).and_then(Option::take) {
            ordered.push(stop);
        }
    }
    ordered.extend(slots.into_iter().flatten());
    ordered
}

fn is_permutation(order: &[usize]) -> bool {
    let mut seen = vec![false; order.len()];
    order.iter().all(|index| {
        seen.get_mut(*index)
            .is_some_and(|slot| !mem::replace(slot, true))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PathSegment;

    fn stop(id: &str, latitude: f64) -> (BinId, Coordinates) {
        (BinId(id.to_owned()), Coordinates::new(latitude, 77.2))
    }

    fn ids(stops: &[BinId]) -> Vec<&str> {
        stops.iter().map(|id| id.0.as_str()).collect()
    }

    #[test]
    fn last_bin_is_destination_and_the_rest_are_waypoints() {
        let origin = Coordinates::new(28.5, 77.0);
        let plan = PlannedRoute::new(
            origin,
            vec![stop("a", 28.6), stop("b", 28.7), stop("c", 28.8)],
            TravelMode::Driving,
        )
        .expect("three stops");

        assert_eq!(plan.request.origin, origin);
        assert_eq!(plan.request.destination, Coordinates::new(28.8, 77.2));
        assert_eq!(
            plan.request.waypoints,
            [Coordinates::new(28.6, 77.2), Coordinates::new(28.7, 77.2)]
        );
        assert_eq!(ids(&plan.stops), ["a", "b", "c"]);
    }

    #[test]
    fn single_bin_has_no_waypoints() {
        let plan = PlannedRoute::new(
            Coordinates::new(0.0, 0.0),
            vec![stop("only", 1.0)],
            TravelMode::Driving,
        )
        .expect("one stop");
        assert!(plan.request.waypoints.is_empty());
        assert_eq!(plan.request.destination, Coordinates::new(1.0, 77.2));
    }

    #[test]
    fn no_bins_means_no_request() {
        assert!(PlannedRoute::new(Coordinates::new(0.0, 0.0), Vec::new(), TravelMode::Driving).is_none());
    }

    #[test]
    fn provider_order_reorders_waypoints_only() {
        let plan = PlannedRoute::new(
            Coordinates::new(0.0, 0.0),
            vec![stop("a", 1.0), stop("b", 2.0), stop("c", 3.0), stop("d", 4.0)],
            TravelMode::Driving,
        )
        .expect("four stops");
        let route = plan.into_route(Directions {
            segments: vec![PathSegment {
                start: Coordinates::new(0.0, 0.0),
            }],
            waypoint_order: vec![2, 0, 1],
        });
        assert_eq!(ids(&route.stops), ["c", "a", "b", "d"]);
        assert_eq!(route.polyline, [Coordinates::new(0.0, 0.0)]);
    }

    #[test]
    fn invalid_provider_order_is_ignored() {
        let stops = vec![
            BinId("a".to_owned()),
            BinId("b".to_owned()),
            BinId("c".to_owned()),
        ];
        assert_eq!(ids(&visiting_order(stops.clone(), &[1, 1])), ["a", "b", "c"]);
        assert_eq!(ids(&visiting_order(stops.clone(), &[0, 5])), ["a", "b", "c"]);
        assert_eq!(ids(&visiting_order(stops, &[])), ["a", "b", "c"]);
    }
}
