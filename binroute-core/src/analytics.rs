//! Aggregates shown on the analytics panel.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::{Assignment, BinId, ScoredBin, Van, VanId};

/// Estimated kg of CO2 per percent of fill level.
pub const CARBON_KG_PER_FILL_PERCENT: f64 = 0.02;

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Environmental estimate for one bin.
pub struct BinImpact {
    /// Bin.
    pub bin: BinId,
    /// Fill level in percent.
    pub fill_level: f64,
    /// Estimated carbon footprint in kg CO2.
    pub carbon_kg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// How much work a van received.
pub struct VanLoad {
    /// Van.
    pub van: VanId,
    /// Number of bins assigned.
    pub bins: usize,
    /// Sum of the assigned bins' fill levels.
    pub total_fill: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
/// Totals over one cycle.
pub struct Analytics {
    /// Sum of all fill levels.
    pub total_fill: f64,
    /// Mean carbon estimate per bin, `None` without bins.
    pub average_carbon_kg: Option<f64>,
    /// Per-bin estimates, in ranked order.
    pub per_bin: Vec<BinImpact>,
    /// Per-van totals, in van order.
    pub van_loads: Vec<VanLoad>,
    /// Bins without a van.
    pub unassigned: usize,
}

/// Carbon estimate for a fill level.
#[must_use]
pub fn carbon_footprint(fill_level: f64) -> f64 {
    fill_level * CARBON_KG_PER_FILL_PERCENT
}

/// Aggregate one cycle's results.
#[must_use]
pub fn summarize(bins: &[ScoredBin], vans: &[Van], assignment: &Assignment) -> Analytics {
    let per_bin: Vec<BinImpact> = bins
        .iter()
        .map(|scored| BinImpact {
            bin: scored.bin.id.clone(),
            fill_level: scored.bin.telemetry.fill_level,
            carbon_kg: carbon_footprint(scored.bin.telemetry.fill_level),
        })
        .collect();

    let total_fill: f64 = per_bin.iter().map(|impact| impact.fill_level).sum();
    let average_carbon_kg = mean(per_bin.iter().map(|impact| impact.carbon_kg));

    let fill_by_bin: HashMap<&BinId, f64> = per_bin
        .iter()
        .map(|impact| (&impact.bin, impact.fill_level))
        .collect();
    let mut loads: HashMap<&VanId, (usize, f64)> = HashMap::new();
    for entry in assignment.entries() {
        if let (Some(van), Some(fill)) = (entry.van.van(), fill_by_bin.get(&entry.bin)) {
            let (count, total) = loads.entry(van).or_insert((0, 0.0));
            *count += 1;
            *total += fill;
        }
    }

    let van_loads = vans
        .iter()
        .map(|van| {
            let (count, total) = loads.get(&van.id).copied().unwrap_or((0, 0.0));
            VanLoad {
                van: van.id.clone(),
                bins: count,
                total_fill: total,
            }
        })
        .collect();

    Analytics {
        total_fill,
        average_carbon_kg,
        per_bin,
        van_loads,
        unassigned: assignment.unassigned().count(),
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "bin counts stay far below 2^52"
)]
fn mean<I>(values: I) -> Option<f64>
where
    I: Iterator<Item = f64>,
{
    let (count, total) = values.fold((0_usize, 0.0), |(count, total), value| (count + 1, total + value));
    (count > 0).then(|| total / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AssignmentEntry, Bin, Coordinates, Telemetry, VanAssignment};

    fn scored(id: &str, fill_level: f64) -> ScoredBin {
        ScoredBin {
            bin: Bin {
                id: BinId(id.to_owned()),
                location: Coordinates::new(0.0, 0.0),
                telemetry: Telemetry {
                    fill_level,
                    tilt: 0.0,
                    temperature: 20.0,
                    humidity: 30.0,
                },
            },
            priority: 0.0,
        }
    }

    fn close(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-9
    }

    #[test]
    fn totals_and_average_carbon() {
        let bins = [scored("1", 90.0), scored("2", 40.0), scored("3", 20.0)];
        let van = Van {
            id: VanId("V1".to_owned()),
            location: Coordinates::new(0.0, 0.0),
            capacity: None,
        };
        let assignment = Assignment::new(vec![
            AssignmentEntry {
                bin: BinId("1".to_owned()),
                van: VanAssignment::Assigned(VanId("V1".to_owned())),
            },
            AssignmentEntry {
                bin: BinId("2".to_owned()),
                van: VanAssignment::Assigned(VanId("V1".to_owned())),
            },
            AssignmentEntry {
                bin: BinId("3".to_owned()),
                van: VanAssignment::Unassigned,
            },
        ]);

        let analytics = summarize(&bins, &[van], &assignment);

        assert!(close(analytics.total_fill, 150.0), "total {}", analytics.total_fill);
        assert!(
            analytics.average_carbon_kg.is_some_and(|average| close(average, 1.0)),
            "average {:?}",
            analytics.average_carbon_kg
        );
        assert_eq!(analytics.unassigned, 1);
        let load = analytics.van_loads.first().expect("one van");
        assert_eq!(load.bins, 2);
        assert!(close(load.total_fill, 130.0), "load {}", load.total_fill);
    }

    #[test]
    fn van_loads_cover_a_large_cycle() {
        let bins: Vec<ScoredBin> = (0..3_000).map(|n| scored(&n.to_string(), 10.0)).collect();
        let vans: Vec<Van> = (0..3)
            .map(|n| Van {
                id: VanId(format!("V{n}")),
                location: Coordinates::new(0.0, 0.0),
                capacity: None,
            })
            .collect();
        let assignment = Assignment::new(
            (0..3_000)
                .map(|n| AssignmentEntry {
                    bin: BinId(n.to_string()),
                    van: if n % 4 == 3 {
                        VanAssignment::Unassigned
                    } else {
                        VanAssignment::Assigned(VanId(format!("V{}", n % 4)))
                    },
                })
                .collect(),
        );

        let analytics = summarize(&bins, &vans, &assignment);

        assert_eq!(analytics.unassigned, 750);
        for load in &analytics.van_loads {
            assert_eq!(load.bins, 750, "van {}", load.van);
            assert!(close(load.total_fill, 7_500.0), "load {}", load.total_fill);
        }
    }

    #[test]
    fn no_bins_has_no_average() {
        let analytics = summarize(&[], &[], &Assignment::default());
        assert!(analytics.average_carbon_kg.is_none());
        assert!(close(analytics.total_fill, 0.0));
    }

    #[test]
    fn carbon_is_two_hundredths_of_fill() {
        assert!(close(carbon_footprint(75.0), 1.5));
    }
}
