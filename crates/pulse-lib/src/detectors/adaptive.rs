use crate::{
    config::DetectorConfig,
    error::DetectError,
    metrics::{
        hrv::{hrv_time, population_sd, HRVTime},
        validity::{
            correct_intervals, drop_startup_beat, interval_rejections, removed_beats,
            validate_intervals,
        },
    },
    signal::{Events, RRSeries, TimeSeries},
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Fewest beats a margin candidate needs to be considered.
pub const MIN_BEATS: usize = 10;
/// Candidates whose interval dispersion is at or below this are flatlines (ms).
pub const MIN_DISPERSION_MS: f64 = 0.1;
/// Margin scanned when no ladder entry is accepted.
pub const FALLBACK_MARGIN: f64 = 20.0;

/// Why a margin candidate was kept or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarginVerdict {
    Accepted,
    TooFewBeats,
    RateOutOfRange,
    Degenerate,
}

/// One rung of the margin ladder after scanning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginCandidate {
    pub margin: f64,
    pub beats: usize,
    pub bpm: f64,
    pub dispersion: Option<f64>,
    pub verdict: MarginVerdict,
}

/// Outcome of margin selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginFit {
    pub margin: f64,
    pub events: Events,
    pub dispersion: f64,
    pub fallback: bool,
    pub candidates: Vec<MarginCandidate>,
}

/// Everything the detector derives from one buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakPipelineResult {
    pub fs: f64,
    pub sample_count: usize,
    /// Rolling mean window (samples).
    pub window: usize,
    pub margin: f64,
    pub fallback: bool,
    pub events: Events,
    pub rr: RRSeries,
    /// Per-beat validity, same length as `events`.
    pub mask: Vec<bool>,
    pub removed_beats: Vec<usize>,
    /// Per interval, `true` when dropped from `rr_corrected`.
    pub rr_mask: Vec<bool>,
    pub rr_corrected: RRSeries,
    /// Population standard deviation of `rr` (ms).
    pub dispersion: f64,
    pub hrv: Option<HRVTime>,
    pub candidates: Vec<MarginCandidate>,
}

/// Detect beats, derive intervals, reject artifacts and summarise the corrected intervals.
pub fn run_pipeline(
    ts: &TimeSeries,
    cfg: &DetectorConfig,
) -> Result<PeakPipelineResult, DetectError> {
    ts.validate()?;
    let window = cfg.window_samples(ts.fs);
    let rol_mean = rolling_mean(&ts.data, window);

    let fit = match cfg.margin {
        Some(margin) => fixed_margin(ts, &rol_mean, margin)?,
        None => optimize_margin(ts, &rol_mean, cfg)?,
    };

    let events = drop_startup_beat(&fit.events, ts.fs);
    if events.is_empty() {
        return Err(DetectError::NoPeaksDetected { margin: fit.margin });
    }
    let rr = RRSeries::from_events(&events, ts.fs);
    let mask = validate_intervals(&rr);
    let rr_corrected = correct_intervals(&rr, &mask);
    let hrv = hrv_time(&rr_corrected);

    info!(
        "margin {}%: {} beats, {} of {} intervals kept",
        fit.margin,
        events.len(),
        rr_corrected.len(),
        rr.len()
    );

    Ok(PeakPipelineResult {
        fs: ts.fs,
        sample_count: ts.len(),
        window,
        margin: fit.margin,
        fallback: fit.fallback,
        removed_beats: removed_beats(&events, &mask),
        rr_mask: interval_rejections(&rr, &mask),
        dispersion: population_sd(&rr.rr),
        events,
        rr,
        mask,
        rr_corrected,
        hrv,
        candidates: fit.candidates,
    })
}

/// Centered moving average with edge extension.
///
/// Positions closer than `window / 2` to either end see the boundary sample repeated, so
/// every output divides by the full window. A window of zero returns the input unchanged;
/// windows longer than the data shrink to the data length.
pub fn rolling_mean(data: &[f64], window: usize) -> Vec<f64> {
    if data.is_empty() {
        return Vec::new();
    }
    if window == 0 {
        return data.to_vec();
    }
    let window = window.min(data.len());
    let radius = window / 2;
    let last = data.len() - 1;
    (0..data.len())
        .map(|i| {
            let mut acc = 0.0;
            for k in 0..window {
                acc += data[(i + k).saturating_sub(radius).min(last)];
            }
            acc / window as f64
        })
        .collect()
}

/// Run of consecutive above-threshold samples.
struct CandidateRun {
    last: usize,
    peak: usize,
    peak_value: f64,
}

/// Beat candidates for a single margin: the highest sample of every run that clears
/// `rol_mean + mean(rol_mean) * margin / 100`.
pub fn scan_threshold(
    data: &[f64],
    rol_mean: &[f64],
    margin: f64,
) -> Result<Vec<usize>, DetectError> {
    if data.len() != rol_mean.len() {
        return Err(DetectError::MismatchedLengths {
            signal: data.len(),
            rolling_mean: rol_mean.len(),
        });
    }
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let offset =
        rol_mean.iter().map(|m| m / 100.0).sum::<f64>() / rol_mean.len() as f64 * margin;

    let mut peaks = Vec::new();
    let mut run: Option<CandidateRun> = None;
    for (i, (&x, &m)) in data.iter().zip(rol_mean).enumerate() {
        let above = x > m + offset;
        if !above {
            continue;
        }
        match run.as_mut() {
            Some(current) if i == current.last + 1 => {
                current.last = i;
                // strict: ties keep the earliest sample
                if x > current.peak_value {
                    current.peak = i;
                    current.peak_value = x;
                }
            }
            _ => {
                if let Some(done) = run.take() {
                    peaks.push(done.peak);
                }
                run = Some(CandidateRun {
                    last: i,
                    peak: i,
                    peak_value: x,
                });
            }
        }
    }
    if let Some(done) = run {
        peaks.push(done.peak);
    }
    Ok(peaks)
}

/// Search the margin ladder for the candidate with the steadiest plausible rhythm.
pub fn optimize_margin(
    ts: &TimeSeries,
    rol_mean: &[f64],
    cfg: &DetectorConfig,
) -> Result<MarginFit, DetectError> {
    let evaluated = cfg
        .ladder
        .iter()
        .map(|&margin| evaluate_margin(ts, rol_mean, margin, cfg))
        .collect::<Result<Vec<_>, _>>()?;

    let best = evaluated
        .iter()
        .filter(|(candidate, _)| candidate.verdict == MarginVerdict::Accepted)
        .fold(None, |best: Option<&(MarginCandidate, Vec<usize>)>, entry| {
            match best {
                Some(current) if current.0.dispersion <= entry.0.dispersion => Some(current),
                _ => Some(entry),
            }
        })
        .cloned();

    let candidates: Vec<MarginCandidate> = evaluated.iter().map(|(c, _)| c.clone()).collect();

    if let Some((candidate, peaks)) = best {
        info!(
            "selected margin {}% ({} beats, dispersion {:.3} ms)",
            candidate.margin,
            candidate.beats,
            candidate.dispersion.unwrap_or_default()
        );
        return Ok(MarginFit {
            margin: candidate.margin,
            events: Events::from_indices(peaks),
            dispersion: candidate.dispersion.unwrap_or_default(),
            fallback: false,
            candidates,
        });
    }

    warn!(
        "no margin in ladder accepted, falling back to {}%",
        FALLBACK_MARGIN
    );
    let mut fit = fixed_margin(ts, rol_mean, FALLBACK_MARGIN)?;
    fit.fallback = true;
    fit.candidates = candidates;
    Ok(fit)
}

/// Scan once at `margin`; zero beats is an error.
pub fn fixed_margin(
    ts: &TimeSeries,
    rol_mean: &[f64],
    margin: f64,
) -> Result<MarginFit, DetectError> {
    let peaks = scan_threshold(&ts.data, rol_mean, margin)?;
    if peaks.is_empty() {
        return Err(DetectError::NoPeaksDetected { margin });
    }
    let events = Events::from_indices(peaks);
    let dispersion = population_sd(&RRSeries::from_events(&events, ts.fs).rr);
    Ok(MarginFit {
        margin,
        events,
        dispersion,
        fallback: false,
        candidates: Vec::new(),
    })
}

fn evaluate_margin(
    ts: &TimeSeries,
    rol_mean: &[f64],
    margin: f64,
    cfg: &DetectorConfig,
) -> Result<(MarginCandidate, Vec<usize>), DetectError> {
    let peaks = scan_threshold(&ts.data, rol_mean, margin)?;
    let beats = peaks.len();
    let bpm = beats as f64 / ts.duration() * 60.0;

    let (dispersion, verdict) = if beats < MIN_BEATS {
        (None, MarginVerdict::TooFewBeats)
    } else if bpm < cfg.bpm_min || bpm > cfg.bpm_max {
        (None, MarginVerdict::RateOutOfRange)
    } else {
        let rr = RRSeries::from_events(&Events::from_indices(peaks.clone()), ts.fs);
        let sd = population_sd(&rr.rr);
        if sd <= MIN_DISPERSION_MS {
            (Some(sd), MarginVerdict::Degenerate)
        } else {
            (Some(sd), MarginVerdict::Accepted)
        }
    };
    debug!(
        "margin {}%: {} beats, {:.1} bpm, {:?}",
        margin, beats, bpm, verdict
    );

    Ok((
        MarginCandidate {
            margin,
            beats,
            bpm,
            dispersion,
            verdict,
        },
        peaks,
    ))
}
