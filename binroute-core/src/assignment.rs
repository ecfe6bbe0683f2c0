//! Strategies mapping each bin to a van.
//!
//! Every strategy is a pure function of the ranked bins and the van list. Vans are
//! scanned in slice order and distance ties go to the earlier van, so the same
//! snapshot always produces the same assignment.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{Assignment, AssignmentEntry, Coordinates, ScoredBin, Van, VanAssignment};

/// Built-in assignment strategies.
pub enum Strategies {
    /// Nearest van, no capacity or balancing.
    Nearest,
    /// Nearest van that still has room.
    Capacity,
    /// Nearest van below an even share of the bins.
    Balanced,
}

impl fmt::Display for Strategies {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slug = match self {
            Strategies::Nearest => "nearest",
            Strategies::Capacity => "capacity",
            Strategies::Balanced => "balanced",
        };
        write!(formatter, "{slug}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Identifier under which a strategy is registered.
pub struct StrategyId(pub String);

impl From<Strategies> for StrategyId {
    fn from(strategy: Strategies) -> Self {
        StrategyId(strategy.to_string())
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Assigns bins to vans for one cycle.
pub trait AssignmentStrategy: Send + Sync {
    /// Registry identifier.
    fn id(&self) -> StrategyId;

    /// Short human-readable description.
    fn describe(&self) -> &'static str;

    /// Produce one entry per bin, in the order of `bins`.
    ///
    /// With no vans every entry is [`VanAssignment::Unassigned`].
    fn assign(&self, bins: &[ScoredBin], vans: &[Van]) -> Assignment;
}

/// Greedy nearest-van matching.
///
/// Each bin independently picks the closest van. Loads are not balanced, so a van
/// parked in a dense area can end up with most of the bins.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestVan;

impl AssignmentStrategy for NearestVan {
    fn id(&self) -> StrategyId {
        Strategies::Nearest.into()
    }

    fn describe(&self) -> &'static str {
        "nearest van per bin"
    }

    fn assign(&self, bins: &[ScoredBin], vans: &[Van]) -> Assignment {
        bins.iter()
            .map(|scored| {
                let van = nearest_van(scored.bin.location, vans, |_| true);
                entry(scored, van.and_then(|index| vans.get(index)))
            })
            .collect::<Vec<_>>()
            .into()
    }
}

/// Nearest van that has not reached its capacity.
///
/// Bins are taken in priority order, so urgent bins claim capacity first. Vans
/// without a capacity take any number of bins.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapacityAware;

impl AssignmentStrategy for CapacityAware {
    fn id(&self) -> StrategyId {
        Strategies::Capacity.into()
    }

    fn describe(&self) -> &'static str {
        "nearest van with free capacity"
    }

    fn assign(&self, bins: &[ScoredBin], vans: &[Van]) -> Assignment {
        let limits: Vec<Option<usize>> = vans.iter().map(|van| van.capacity).collect();
        assign_with_limits(bins, vans, &limits)
    }
}

/// Nearest van among those holding fewer than `ceil(bins / vans)` bins.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadBalanced;

impl AssignmentStrategy for LoadBalanced {
    fn id(&self) -> StrategyId {
        Strategies::Balanced.into()
    }

    fn describe(&self) -> &'static str {
        "nearest van under an even share"
    }

    fn assign(&self, bins: &[ScoredBin], vans: &[Van]) -> Assignment {
        let share = if vans.is_empty() {
            0
        } else {
            bins.len().div_ceil(vans.len())
        };
        let limits = vec![Some(share); vans.len()];
        assign_with_limits(bins, vans, &limits)
    }
}

impl From<Vec<AssignmentEntry>> for Assignment {
    fn from(entries: Vec<AssignmentEntry>) -> Self {
        Assignment::new(entries)
    }
}

/// Index of the van closest to `location` among those `eligible` accepts.
///
/// Uses a strict comparison, so the first van wins a tie.
pub fn nearest_van<F>(location: Coordinates, vans: &[Van], mut eligible: F) -> Option<usize>
where
    F: FnMut(usize) -> bool,
{
    let mut best: Option<(usize, f64)> = None;

    for (index, van) in vans.iter().enumerate() {
        if !eligible(index) {
            continue;
        }
        let distance = location.planar_distance(van.location);
        if best.is_none_or(|(_, best_distance)| distance < best_distance) {
            best = Some((index, distance));
        }
    }

    best.map(|(index, _)| index)
}

fn assign_with_limits(bins: &[ScoredBin], vans: &[Van], limits: &[Option<usize>]) -> Assignment {
    let mut loads = vec![0_usize; vans.len()];
    let mut entries = Vec::with_capacity(bins.len());

    for scored in bins {
        let chosen = nearest_van(scored.bin.location, vans, |index| {
            let load = loads.get(index).copied().unwrap_or(0);
            limits
                .get(index)
                .copied()
                .flatten()
                .is_none_or(|limit| load < limit)
        });

        if let Some(load) = chosen.and_then(|index| loads.get_mut(index)) {
            *load += 1;
        }
        entries.push(entry(scored, chosen.and_then(|index| vans.get(index))));
    }

    entries.into()
}

fn entry(scored: &ScoredBin, van: Option<&Van>) -> AssignmentEntry {
    AssignmentEntry {
        bin: scored.bin.id.clone(),
        van: van.map_or(VanAssignment::Unassigned, |van| {
            VanAssignment::Assigned(van.id.clone())
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bin, BinId, Telemetry, VanId};

    fn scored(id: &str, latitude: f64, longitude: f64) -> ScoredBin {
        ScoredBin {
            bin: Bin {
                id: BinId(id.to_owned()),
                location: Coordinates::new(latitude, longitude),
                telemetry: Telemetry {
                    fill_level: 50.0,
                    tilt: 0.0,
                    temperature: 20.0,
                    humidity: 40.0,
                },
            },
            priority: 1.6,
        }
    }

    fn van(id: &str, latitude: f64, longitude: f64, capacity: Option<usize>) -> Van {
        Van {
            id: VanId(id.to_owned()),
            location: Coordinates::new(latitude, longitude),
            capacity,
        }
    }

    fn assigned(assignment: &Assignment, bin: &str) -> Option<String> {
        assignment
            .van_for(&BinId(bin.to_owned()))
            .and_then(VanAssignment::van)
            .map(|van| van.0.clone())
    }

    #[test]
    fn nearest_picks_the_closer_van() {
        let bins = [scored("1", 28.70, 77.20)];
        let vans = [van("V1", 28.701, 77.201, None), van("V2", 30.0, 80.0, None)];
        let assignment = NearestVan.assign(&bins, &vans);
        assert_eq!(assigned(&assignment, "1").as_deref(), Some("V1"));
    }

    #[test]
    fn distance_tie_goes_to_first_van() {
        let bins = [scored("1", 0.0, 0.0)];
        let vans = [van("east", 0.0, 1.0, None), van("west", 0.0, -1.0, None)];
        let assignment = NearestVan.assign(&bins, &vans);
        assert_eq!(assigned(&assignment, "1").as_deref(), Some("east"));
    }

    #[test]
    fn no_vans_leaves_every_bin_unassigned() {
        let bins = [scored("1", 0.0, 0.0), scored("2", 1.0, 1.0)];
        let strategies: [&dyn AssignmentStrategy; 3] = [&NearestVan, &CapacityAware, &LoadBalanced];
        for strategy in strategies {
            let assignment = strategy.assign(&bins, &[]);
            assert_eq!(assignment.len(), 2, "{} keeps one entry per bin", strategy.id());
            assert!(
                assignment
                    .entries()
                    .iter()
                    .all(|entry| entry.van == VanAssignment::Unassigned),
                "{} must use the sentinel",
                strategy.id()
            );
        }
    }

    #[test]
    fn nearest_ignores_load() {
        let bins = [scored("1", 0.0, 0.1), scored("2", 0.0, 0.2), scored("3", 0.0, 0.3)];
        let vans = [van("near", 0.0, 0.0, Some(1)), van("far", 5.0, 5.0, None)];
        let assignment = NearestVan.assign(&bins, &vans);
        assert_eq!(assignment.bins_for(&VanId("near".to_owned())).count(), 3);
    }

    #[test]
    fn capacity_spills_to_next_nearest_van() {
        let bins = [scored("1", 0.0, 0.1), scored("2", 0.0, 0.2), scored("3", 0.0, 0.3)];
        let vans = [van("near", 0.0, 0.0, Some(2)), van("far", 5.0, 5.0, None)];
        let assignment = CapacityAware.assign(&bins, &vans);
        assert_eq!(assigned(&assignment, "1").as_deref(), Some("near"));
        assert_eq!(assigned(&assignment, "2").as_deref(), Some("near"));
        assert_eq!(assigned(&assignment, "3").as_deref(), Some("far"));
    }

    #[test]
    fn capacity_exhausted_means_unassigned() {
        let bins = [scored("1", 0.0, 0.1), scored("2", 0.0, 0.2)];
        let vans = [van("only", 0.0, 0.0, Some(1))];
        let assignment = CapacityAware.assign(&bins, &vans);
        assert_eq!(assigned(&assignment, "1").as_deref(), Some("only"));
        assert_eq!(
            assignment.unassigned().collect::<Vec<_>>(),
            [&BinId("2".to_owned())]
        );
    }

    #[test]
    fn balanced_caps_each_van_at_an_even_share() {
        let bins: Vec<ScoredBin> = (0..5)
            .map(|index| scored(&index.to_string(), 0.0, f64::from(index) * 0.01))
            .collect();
        let vans = [van("near", 0.0, 0.0, None), van("far", 1.0, 1.0, None)];
        let assignment = LoadBalanced.assign(&bins, &vans);

        let near = assignment.bins_for(&VanId("near".to_owned())).count();
        let far = assignment.bins_for(&VanId("far".to_owned())).count();
        assert_eq!((near, far), (3, 2));
        assert_eq!(assignment.unassigned().count(), 0);
    }

    #[test]
    fn entries_follow_bin_order() {
        let bins = [scored("b", 0.0, 0.0), scored("a", 1.0, 1.0)];
        let vans = [van("V1", 0.0, 0.0, None)];
        let assignment = NearestVan.assign(&bins, &vans);
        let order: Vec<&str> = assignment
            .entries()
            .iter()
            .map(|entry| entry.bin.0.as_str())
            .collect();
        assert_eq!(order, ["b", "a"]);
    }
}
