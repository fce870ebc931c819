use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Margin percentages tried by the threshold search, in order.
pub const DEFAULT_MARGIN_LADDER: [f64; 18] = [
    5.0, 10.0, 15.0, 20.0, 25.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0, 110.0, 120.0,
    150.0, 200.0, 300.0,
];

/// Configurable parameters for the adaptive-threshold beat detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Rolling mean window (seconds).
    pub window_s: f64,
    /// Lowest plausible heart rate for a margin candidate (beats per minute).
    pub bpm_min: f64,
    /// Highest plausible heart rate for a margin candidate (beats per minute).
    pub bpm_max: f64,
    /// Fixed margin percentage; skips the ladder search when set.
    pub margin: Option<f64>,
    /// Margin percentages searched when `margin` is unset.
    pub ladder: Vec<f64>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_s: 0.75,
            bpm_min: 40.0,
            bpm_max: 180.0,
            margin: None,
            ladder: DEFAULT_MARGIN_LADDER.to_vec(),
        }
    }
}

impl DetectorConfig {
    /// Rolling mean window in samples for the given sample rate.
    pub fn window_samples(&self, fs: f64) -> usize {
        (self.window_s * fs).max(0.0) as usize
    }
}

/// Windowing for segmentwise analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Segment width (seconds).
    pub width_s: f64,
    /// Fraction of each segment shared with the next one, in `[0, 1)`.
    pub overlap: f64,
    /// Trailing data shorter than this is dropped (seconds).
    pub min_size_s: f64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            width_s: 120.0,
            overlap: 0.0,
            min_size_s: 20.0,
        }
    }
}

/// On-disk TOML layout: optional `[detector]` and `[segment]` tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseConfig {
    pub detector: DetectorConfig,
    pub segment: SegmentConfig,
}

impl PulseConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("parsing pulse config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing config {}", path.display()))
    }
}
