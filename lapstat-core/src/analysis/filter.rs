//! Outlier filter
//!
//! Source timing data contains laps that are slow for reasons unrelated to
//! pace (formation laps, pit laps, data-entry glitches). The filter drops a
//! fixed number of each driver's slowest laps and returns the rest in lap
//! order.

use crate::model::{LapRecord, LapSeries};

/// Slowest laps removed from every driver
pub const SLOWEST_LAPS_DROPPED: usize = 3;

/// Drop the `count` slowest laps and return the remainder ordered by lap
/// number, or `None` when nothing remains.
///
/// Laps with equal times keep their relative source order (stable sort).
pub fn trim_slowest(laps: &[LapRecord], count: usize) -> Option<Vec<LapRecord>> {
    let keep = laps.len().saturating_sub(count);
    if keep == 0 {
        return None;
    }

    let mut kept = laps.to_vec();
    kept.sort_by(|a, b| a.lap_time.0.total_cmp(&b.lap_time.0));
    kept.truncate(keep);
    kept.sort_by_key(|lap| lap.lap_number);
    Some(kept)
}

/// Apply [`trim_slowest`] with [`SLOWEST_LAPS_DROPPED`] to every driver
///
/// Drivers left without laps are omitted from the result.
pub fn filter_outliers(series: &LapSeries) -> LapSeries {
    filter_outliers_by(series, SLOWEST_LAPS_DROPPED)
}

/// Like [`filter_outliers`] with a custom drop count
pub fn filter_outliers_by(series: &LapSeries, count: usize) -> LapSeries {
    series
        .iter()
        .filter_map(|(driver, laps)| trim_slowest(laps, count).map(|kept| (driver.clone(), kept)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DriverIdentity, LapValidity};
    use crate::units::{KilometersPerHour, Seconds};
    use proptest::prelude::*;

    fn lap(lap_number: u32, time: f64) -> LapRecord {
        LapRecord {
            lap_number,
            lap_time: Seconds(time),
            validity: LapValidity::Valid,
            top_speed: KilometersPerHour(260.0),
        }
    }

    fn laps_from_times(times: &[f64]) -> Vec<LapRecord> {
        times
            .iter()
            .enumerate()
            .map(|(i, t)| lap(i as u32 + 1, *t))
            .collect()
    }

    #[test]
    fn test_trim_drops_three_slowest_and_restores_lap_order() {
        let laps = laps_from_times(&[120.0, 93.1, 92.8, 99.0, 93.5, 92.9, 110.0]);
        let kept = trim_slowest(&laps, SLOWEST_LAPS_DROPPED).unwrap();

        let numbers: Vec<u32> = kept.iter().map(|l| l.lap_number).collect();
        assert_eq!(numbers, vec![2, 3, 5, 6]);
    }

    #[test]
    fn test_trim_with_exactly_three_laps_is_empty() {
        let laps = laps_from_times(&[90.0, 91.0, 92.0]);
        assert!(trim_slowest(&laps, SLOWEST_LAPS_DROPPED).is_none());
    }

    #[test]
    fn test_trim_with_fewer_than_three_laps_is_empty() {
        let laps = laps_from_times(&[90.0]);
        assert!(trim_slowest(&laps, SLOWEST_LAPS_DROPPED).is_none());
        assert!(trim_slowest(&[], SLOWEST_LAPS_DROPPED).is_none());
    }

    #[test]
    fn test_filter_omits_emptied_drivers() {
        let fast = DriverIdentity::new("Fast Driver: Car", "FST");
        let short = DriverIdentity::new("Short Stint: Car", "SHT");

        let mut series = LapSeries::new();
        series.insert(fast.clone(), laps_from_times(&[90.0, 91.0, 92.0, 93.0, 94.0]));
        series.insert(short.clone(), laps_from_times(&[90.0, 91.0]));

        let filtered = filter_outliers(&series);
        assert!(filtered.contains(&fast));
        assert!(!filtered.contains(&short));
        assert_eq!(filtered.get(&fast).unwrap().len(), 2);
    }

    #[test]
    fn test_filter_does_not_mutate_input() {
        let driver = DriverIdentity::new("A B: Car", "ABC");
        let mut series = LapSeries::new();
        series.insert(driver.clone(), laps_from_times(&[95.0, 90.0, 91.0, 92.0, 93.0]));
        let before = series.clone();

        let _ = filter_outliers(&series);
        assert_eq!(series, before);
    }

    #[test]
    fn test_filter_with_zero_count_only_sorts() {
        let driver = DriverIdentity::new("A B: Car", "ABC");
        let mut series = LapSeries::new();
        series.insert(driver.clone(), vec![lap(3, 90.0), lap(1, 92.0), lap(2, 91.0)]);

        let filtered = filter_outliers_by(&series, 0);
        let numbers: Vec<u32> = filtered
            .get(&driver)
            .unwrap()
            .iter()
            .map(|l| l.lap_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_trim_is_sorted_and_sized(
            times in proptest::collection::vec(60.0f64..200.0, 0..40),
        ) {
            let laps = laps_from_times(&times);
            let expected_len = times.len().saturating_sub(SLOWEST_LAPS_DROPPED);

            match trim_slowest(&laps, SLOWEST_LAPS_DROPPED) {
                None => prop_assert_eq!(expected_len, 0),
                Some(kept) => {
                    prop_assert_eq!(kept.len(), expected_len);
                    prop_assert!(kept.windows(2).all(|w| w[0].lap_number < w[1].lap_number));
                }
            }
        }

        #[test]
        fn prop_trim_removes_the_largest_times(
            times in proptest::collection::vec(60.0f64..200.0, 4..40),
        ) {
            let laps = laps_from_times(&times);
            let kept = trim_slowest(&laps, SLOWEST_LAPS_DROPPED).unwrap();

            let mut kept_times: Vec<f64> = kept.iter().map(|l| l.lap_time.0).collect();
            kept_times.sort_by(f64::total_cmp);

            let mut expected: Vec<f64> = times.clone();
            expected.sort_by(f64::total_cmp);
            expected.truncate(times.len() - SLOWEST_LAPS_DROPPED);

            prop_assert_eq!(kept_times, expected);
        }
    }
}
