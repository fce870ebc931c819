pub mod adaptive;

pub use adaptive::{run_pipeline, PeakPipelineResult};
