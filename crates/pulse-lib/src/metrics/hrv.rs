use crate::signal::RRSeries;
use serde::{Deserialize, Serialize};

/// Time-domain HRV measures over corrected intervals (milliseconds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HRVTime {
    pub n: usize,
    pub bpm: f64,
    pub ibi: f64,
    pub sdnn: f64,
    pub sdsd: f64,
    pub rmssd: f64,
    pub pnn20: f64,
    pub pnn50: f64,
    pub hr_mad: f64,
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with divisor `n`. Used both to rank margin candidates and for SDNN.
pub fn population_sd(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Time-domain measures; `None` with fewer than two intervals.
pub fn hrv_time(rr: &RRSeries) -> Option<HRVTime> {
    let n = rr.rr.len();
    if n < 2 {
        return None;
    }
    let ibi = mean(&rr.rr);
    let diffs: Vec<f64> = rr.rr.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    let rmssd = (diffs.iter().map(|d| d * d).sum::<f64>() / diffs.len() as f64).sqrt();
    let nn20 = diffs.iter().filter(|&&d| d > 20.0).count();
    let nn50 = diffs.iter().filter(|&&d| d > 50.0).count();
    let hr_mad = rr.rr.iter().map(|x| (x - ibi).abs()).sum::<f64>() / n as f64;

    Some(HRVTime {
        n,
        bpm: 60000.0 / ibi,
        ibi,
        sdnn: population_sd(&rr.rr),
        sdsd: population_sd(&diffs),
        rmssd,
        pnn20: nn20 as f64 / diffs.len() as f64,
        pnn50: nn50 as f64 / diffs.len() as f64,
        hr_mad,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "expected {expected}, got {actual} (diff {diff} > tol {tol})"
        );
    }

    #[test]
    fn population_sd_divides_by_n() {
        assert_close(population_sd(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.0, 1e-12);
        assert_eq!(population_sd(&[]), 0.0);
        assert_eq!(population_sd(&[800.0]), 0.0);
    }

    #[test]
    fn time_domain_snapshot() {
        let rr = RRSeries {
            rr: vec![800.0, 850.0, 820.0, 790.0, 830.0],
        };
        let m = hrv_time(&rr).expect("enough intervals");
        assert_eq!(m.n, 5);
        assert_close(m.ibi, 818.0, 1e-9);
        assert_close(m.bpm, 60000.0 / 818.0, 1e-9);
        // deviations: -18, 32, 2, -28, 12
        assert_close(m.sdnn, (2280.0f64 / 5.0).sqrt(), 1e-9);
        // |diffs|: 50, 30, 30, 40
        assert_close(m.rmssd, (5900.0f64 / 4.0).sqrt(), 1e-9);
        assert_close(m.sdsd, (275.0f64 / 4.0).sqrt(), 1e-9);
        assert_close(m.pnn20, 1.0, 1e-12);
        assert_close(m.pnn50, 0.0, 1e-12);
        assert_close(m.hr_mad, 92.0 / 5.0, 1e-9);
    }

    #[test]
    fn pnn_thresholds_are_strict() {
        let rr = RRSeries {
            rr: vec![800.0, 850.0, 870.0, 941.0],
        };
        let m = hrv_time(&rr).unwrap();
        // diffs 50, 20, 71: only 71 exceeds 50, 50 and 71 exceed 20
        assert_close(m.pnn50, 1.0 / 3.0, 1e-12);
        assert_close(m.pnn20, 2.0 / 3.0, 1e-12);
    }

    #[test]
    fn too_few_intervals_yield_none() {
        assert!(hrv_time(&RRSeries { rr: vec![] }).is_none());
        assert!(hrv_time(&RRSeries { rr: vec![900.0] }).is_none());
    }
}
