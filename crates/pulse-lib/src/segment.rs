use crate::{
    config::{DetectorConfig, SegmentConfig},
    detectors::adaptive::{run_pipeline, PeakPipelineResult},
    error::DetectError,
    signal::TimeSeries,
};
use anyhow::{bail, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pipeline outcome for one window of the recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentResult {
    pub start: usize,
    pub end: usize,
    pub result: Option<PeakPipelineResult>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentwiseResult {
    pub segments: Vec<SegmentResult>,
    /// Each time-domain measure collected across the segments that produced one.
    pub measures: BTreeMap<String, Vec<f64>>,
}

/// `(start, end)` sample ranges covering `len` samples.
pub fn make_windows(len: usize, fs: f64, seg: &SegmentConfig) -> Result<Vec<(usize, usize)>> {
    if !(0.0..1.0).contains(&seg.overlap) {
        bail!("segment overlap must be in [0, 1), got {}", seg.overlap);
    }
    let window = (seg.width_s * fs) as usize;
    let step = ((1.0 - seg.overlap) * window as f64) as usize;
    let min_size = (seg.min_size_s * fs) as usize;
    if window == 0 || step == 0 {
        bail!("segment width {} s is too short at {} Hz", seg.width_s, fs);
    }

    let mut windows = Vec::new();
    let mut start = 0;
    let mut end = window;
    while end < len {
        windows.push((start, end));
        start += step;
        end += step;
    }
    if len.saturating_sub(start) >= min_size {
        windows.push((start, len));
    }
    Ok(windows)
}

/// Run the detector independently over each window.
pub fn run_segmentwise(
    ts: &TimeSeries,
    cfg: &DetectorConfig,
    seg: &SegmentConfig,
) -> Result<SegmentwiseResult> {
    if let Err(err @ DetectError::InvalidSampleRate(_)) = ts.validate() {
        return Err(err.into());
    }
    let windows = make_windows(ts.len(), ts.fs, seg)?;
    let mut segments = Vec::with_capacity(windows.len());
    let mut measures: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for (start, end) in windows {
        let part = ts.slice(start, end);
        match run_pipeline(&part, cfg) {
            Ok(result) => {
                if let Some(hrv) = &result.hrv {
                    for (key, value) in [
                        ("bpm", hrv.bpm),
                        ("ibi", hrv.ibi),
                        ("sdnn", hrv.sdnn),
                        ("sdsd", hrv.sdsd),
                        ("rmssd", hrv.rmssd),
                        ("pnn20", hrv.pnn20),
                        ("pnn50", hrv.pnn50),
                        ("hr_mad", hrv.hr_mad),
                    ] {
                        measures.entry(key.to_string()).or_default().push(value);
                    }
                }
                segments.push(SegmentResult {
                    start,
                    end,
                    result: Some(result),
                    error: None,
                });
            }
            Err(err) => {
                warn!("segment {start}..{end} skipped: {err}");
                segments.push(SegmentResult {
                    start,
                    end,
                    result: None,
                    error: Some(err.to_string()),
                });
            }
        }
    }
    Ok(SegmentwiseResult { segments, measures })
}
