//! Urgency scoring and ranking of bins.

use std::cmp::Ordering;

use crate::model::{Bin, ScoredBin, Telemetry};

/// Weight applied to the fill level after scaling it to 0..=1.
pub const FILL_WEIGHT: f64 = 2.0;
/// Weight applied to the tilt flag.
pub const TILT_WEIGHT: f64 = 3.0;
/// Temperature in Celsius is divided by this.
pub const TEMPERATURE_DIVISOR: f64 = 50.0;
/// Humidity in percent is divided by this.
pub const HUMIDITY_DIVISOR: f64 = 100.0;

/// Compute the priority of a single bin.
///
/// `(fill / 100) * 2 + tilt * 3 + temperature / 50 + humidity / 100`. Fill and tilt
/// dominate; heat and moisture nudge the score upwards.
#[must_use]
pub fn score(telemetry: &Telemetry) -> f64 {
    (telemetry.fill_level / 100.0) * FILL_WEIGHT
        + telemetry.tilt * TILT_WEIGHT
        + telemetry.temperature / TEMPERATURE_DIVISOR
        + telemetry.humidity / HUMIDITY_DIVISOR
}

/// Score every bin and sort by non-increasing priority.
///
/// The sort is stable, so bins with equal scores keep their input order.
#[must_use]
pub fn rank(bins: Vec<Bin>) -> Vec<ScoredBin> {
    let mut scored: Vec<ScoredBin> = bins
        .into_iter()
        .map(|bin| ScoredBin {
            priority: score(&bin.telemetry),
            bin,
        })
        .collect();

    scored.sort_by(|left, right| {
        right
            .priority
            .partial_cmp(&left.priority)
            .unwrap_or(Ordering::Equal)
    });

    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BinId, Coordinates};

    fn bin(id: &str, fill_level: f64, tilt: f64, temperature: f64, humidity: f64) -> Bin {
        Bin {
            id: BinId(id.to_owned()),
            location: Coordinates::new(28.7, 77.2),
            telemetry: Telemetry {
                fill_level,
                tilt,
                temperature,
                humidity,
            },
        }
    }

    fn ids(ranked: &[ScoredBin]) -> Vec<&str> {
        ranked.iter().map(|scored| scored.bin.id.0.as_str()).collect()
    }

    #[test]
    fn reference_reading_scores_five_point_seven() {
        let priority = score(&bin("1", 80.0, 1.0, 30.0, 50.0).telemetry);
        assert!((priority - 5.7).abs() < 1e-9, "got {priority}");
    }

    #[test]
    fn empty_upright_cold_dry_bin_scores_zero() {
        let priority = score(&bin("1", 0.0, 0.0, 0.0, 0.0).telemetry);
        assert!(priority.abs() < 1e-12, "got {priority}");
    }

    #[test]
    fn tilt_outweighs_a_full_bin() {
        let tipped = score(&bin("tipped", 10.0, 1.0, 20.0, 30.0).telemetry);
        let full = score(&bin("full", 100.0, 0.0, 20.0, 30.0).telemetry);
        assert!(tipped > full, "tipped {tipped} should beat full {full}");
    }

    #[test]
    fn ranking_is_non_increasing() {
        let bins = vec![
            bin("a", 10.0, 0.0, 20.0, 30.0),
            bin("b", 95.0, 1.0, 35.0, 80.0),
            bin("c", 50.0, 0.0, -5.0, 10.0),
            bin("d", 70.0, 0.5, 25.0, 60.0),
            bin("e", 0.0, 0.0, 0.0, 0.0),
        ];
        let ranked = rank(bins);

        assert_eq!(ranked.len(), 5);
        assert!(
            ranked
                .windows(2)
                .all(|pair| matches!(pair, [first, second] if first.priority >= second.priority)),
            "priorities must not increase: {:?}",
            ranked.iter().map(|scored| scored.priority).collect::<Vec<_>>()
        );
        assert_eq!(ranked.first().map(|scored| scored.bin.id.0.as_str()), Some("b"));
    }

    #[test]
    fn equal_scores_keep_input_order() {
        let bins = vec![
            bin("first", 40.0, 0.0, 25.0, 50.0),
            bin("urgent", 100.0, 1.0, 40.0, 90.0),
            bin("second", 40.0, 0.0, 25.0, 50.0),
            bin("third", 40.0, 0.0, 25.0, 50.0),
        ];
        let ranked = rank(bins);
        assert_eq!(ids(&ranked), ["urgent", "first", "second", "third"]);
    }

    #[test]
    fn ranking_twice_is_identical() {
        let bins = vec![
            bin("x", 33.0, 0.0, 21.0, 44.0),
            bin("y", 66.0, 1.0, 12.0, 55.0),
            bin("z", 33.0, 0.0, 21.0, 44.0),
        ];
        assert_eq!(rank(bins.clone()), rank(bins));
    }
}
