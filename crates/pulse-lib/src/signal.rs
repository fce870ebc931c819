use crate::error::DetectError;
use serde::{Deserialize, Serialize};

/// Fewest samples the detector accepts.
pub const MIN_SAMPLES: usize = 11;

/// Basic typed time series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Uniform sampling frequency in Hz
    pub fs: f64,
    /// Samples
    pub data: Vec<f64>,
}

impl TimeSeries {
    pub fn new(fs: f64, data: Vec<f64>) -> Self {
        Self { fs, data }
    }
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.fs
    }

    /// Check the preconditions beat detection relies on.
    pub fn validate(&self) -> Result<(), DetectError> {
        if !self.fs.is_finite() || self.fs <= 0.0 {
            return Err(DetectError::InvalidSampleRate(self.fs));
        }
        if self.data.len() < MIN_SAMPLES {
            return Err(DetectError::InsufficientSamples {
                found: self.data.len(),
                required: MIN_SAMPLES,
            });
        }
        Ok(())
    }

    /// Copy of the samples in `[start, end)`, keeping the sample rate.
    pub fn slice(&self, start: usize, end: usize) -> TimeSeries {
        let end = end.min(self.data.len());
        let start = start.min(end);
        TimeSeries {
            fs: self.fs,
            data: self.data[start..end].to_vec(),
        }
    }
}

/// Point events on a timeline (e.g., beat indices)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Events {
    pub indices: Vec<usize>,
}

impl Events {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }
    pub fn len(&self) -> usize {
        self.indices.len()
    }
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Inter-beat intervals (milliseconds)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RRSeries {
    pub rr: Vec<f64>,
}

impl RRSeries {
    /// `rr[i]` is the time between beat `i` and beat `i + 1`. Fewer than two beats give an
    /// empty series.
    pub fn from_events(events: &Events, fs: f64) -> Self {
        let rr = events
            .indices
            .windows(2)
            .map(|w| (w[1] as f64 - w[0] as f64) / fs * 1000.0)
            .collect();
        Self { rr }
    }
    pub fn len(&self) -> usize {
        self.rr.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rr.is_empty()
    }
}
