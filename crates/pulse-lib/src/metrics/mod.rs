pub mod hrv;
pub mod validity;

pub use hrv::{hrv_time, HRVTime};
