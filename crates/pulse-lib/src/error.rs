use thiserror::Error;

/// Failures surfaced by the beat detection pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectError {
    #[error("sample rate must be positive, got {0}")]
    InvalidSampleRate(f64),

    #[error("need at least {required} samples, got {found}")]
    InsufficientSamples { found: usize, required: usize },

    #[error("signal has {signal} samples but rolling mean has {rolling_mean}")]
    MismatchedLengths { signal: usize, rolling_mean: usize },

    #[error("no peaks detected (fallback margin {margin}%)")]
    NoPeaksDetected { margin: f64 },
}

/// Failures reading or writing an interchange document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{key} holds a non-finite number, which JSON cannot represent")]
    NonFinite { key: String },

    #[error("failed to persist document: {0}")]
    Persist(#[from] tempfile::PersistError),
}
