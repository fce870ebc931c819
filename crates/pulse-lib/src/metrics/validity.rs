//! Artifact rejection on inter-beat intervals.
//!
//! Beats are judged through the interval that ends at them: an implausible interval
//! always invalidates its later beat, never the earlier one.

use crate::metrics::hrv::mean;
use crate::signal::{Events, RRSeries};

/// Lower bound on the half width of the accepted interval band (ms).
pub const MIN_BAND_HALF_WIDTH_MS: f64 = 300.0;
/// Relative half width of the accepted interval band.
pub const BAND_FRACTION: f64 = 0.3;
/// A first beat at or before this offset from the buffer start is discarded (ms).
pub const STARTUP_WINDOW_MS: f64 = 150.0;

/// Accepted interval band `(lower, upper)`; intervals on either bound are rejected.
pub fn interval_band(rr: &RRSeries) -> (f64, f64) {
    let mu = mean(&rr.rr);
    let half = MIN_BAND_HALF_WIDTH_MS.max(BAND_FRACTION * mu);
    (mu - half, mu + half)
}

/// Per-beat validity for the `rr.len() + 1` beats bounding the intervals.
pub fn validate_intervals(rr: &RRSeries) -> Vec<bool> {
    let mut mask = vec![true; rr.len() + 1];
    if rr.is_empty() {
        return mask;
    }
    let (lower, upper) = interval_band(rr);
    for (i, &interval) in rr.rr.iter().enumerate() {
        if interval <= lower || interval >= upper {
            mask[i + 1] = false;
        }
    }
    mask
}

/// Keep `rr[i]` only when both of its beats are valid.
pub fn correct_intervals(rr: &RRSeries, mask: &[bool]) -> RRSeries {
    let rr = rr
        .rr
        .iter()
        .enumerate()
        .filter(|(i, _)| interval_kept(mask, *i))
        .map(|(_, &v)| v)
        .collect();
    RRSeries { rr }
}

/// Per interval, `true` when the corrector drops it.
pub fn interval_rejections(rr: &RRSeries, mask: &[bool]) -> Vec<bool> {
    (0..rr.len()).map(|i| !interval_kept(mask, i)).collect()
}

/// Sample indices of the beats flagged invalid.
pub fn removed_beats(events: &Events, mask: &[bool]) -> Vec<usize> {
    events
        .indices
        .iter()
        .zip(mask)
        .filter(|(_, &valid)| !valid)
        .map(|(&idx, _)| idx)
        .collect()
}

/// Drop the first beat when it sits inside the startup window. Only the first beat is
/// ever affected.
pub fn drop_startup_beat(events: &Events, fs: f64) -> Events {
    let limit = fs / 1000.0 * STARTUP_WINDOW_MS;
    match events.indices.first() {
        Some(&first) if first as f64 <= limit => {
            Events::from_indices(events.indices[1..].to_vec())
        }
        _ => events.clone(),
    }
}

fn interval_kept(mask: &[bool], i: usize) -> bool {
    matches!((mask.get(i), mask.get(i + 1)), (Some(true), Some(true)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(rr: &[f64]) -> RRSeries {
        RRSeries { rr: rr.to_vec() }
    }

    #[test]
    fn steady_intervals_are_all_valid() {
        let rr = series(&[800.0, 850.0, 820.0, 790.0, 830.0]);
        let (lower, upper) = interval_band(&rr);
        assert!((lower - 518.0).abs() < 1e-9);
        assert!((upper - 1118.0).abs() < 1e-9);
        let mask = validate_intervals(&rr);
        assert_eq!(mask, vec![true; 6]);
        assert_eq!(correct_intervals(&rr, &mask), rr);
        assert_eq!(interval_rejections(&rr, &mask), vec![false; 5]);
    }

    #[test]
    fn outlier_invalidates_later_beat_and_drops_two_intervals() {
        let rr = series(&[800.0, 810.0, 42.7, 790.0, 805.0, 815.0]);
        let mask = validate_intervals(&rr);
        assert_eq!(mask, vec![true, true, true, false, true, true, true]);
        let corrected = correct_intervals(&rr, &mask);
        assert_eq!(corrected.rr, vec![800.0, 810.0, 805.0, 815.0]);
        assert_eq!(
            interval_rejections(&rr, &mask),
            vec![false, false, true, true, false, false]
        );
        let events = Events::from_indices(vec![10, 90, 171, 175, 254, 335, 416]);
        assert_eq!(removed_beats(&events, &mask), vec![175]);
    }

    #[test]
    fn band_bounds_themselves_are_invalid() {
        // mean 1000, half width 300: 700 and 1300 sit exactly on the bounds
        let rr = series(&[700.0, 1000.0, 1300.0, 1000.0]);
        let mask = validate_intervals(&rr);
        assert_eq!(mask, vec![true, false, true, false, true]);
    }

    #[test]
    fn wide_band_uses_thirty_percent_of_mean() {
        // mean 1500, 0.3 * 1500 = 450 > 300
        let rr = series(&[1500.0, 1500.0, 1500.0, 1500.0]);
        let (lower, upper) = interval_band(&rr);
        assert!((lower - 1050.0).abs() < 1e-9);
        assert!((upper - 1950.0).abs() < 1e-9);
    }

    #[test]
    fn empty_intervals_give_single_valid_beat() {
        let rr = series(&[]);
        assert_eq!(validate_intervals(&rr), vec![true]);
        assert!(correct_intervals(&rr, &[true]).is_empty());
    }

    #[test]
    fn corrected_is_ordered_subsequence() {
        let rr = series(&[900.0, 20.0, 910.0, 2500.0, 905.0, 895.0]);
        let mask = validate_intervals(&rr);
        let corrected = correct_intervals(&rr, &mask);
        let mut it = rr.rr.iter();
        for v in &corrected.rr {
            assert!(it.any(|x| x == v));
        }
        assert!(corrected.len() <= rr.len());
    }

    #[test]
    fn startup_filter_removes_only_an_early_first_beat() {
        // 150 ms at 100 Hz is 15 samples
        let early = Events::from_indices(vec![15, 16, 110]);
        assert_eq!(drop_startup_beat(&early, 100.0).indices, vec![16, 110]);
        let late = Events::from_indices(vec![16, 110]);
        assert_eq!(drop_startup_beat(&late, 100.0).indices, vec![16, 110]);
        assert!(drop_startup_beat(&Events::default(), 100.0).is_empty());
    }
}
