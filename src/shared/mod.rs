//! Cross-cutting pieces: configuration, request throttling, progress estimation.

pub mod config;
pub mod progress;
pub mod rate_limit;

pub use config::{AppConfig, Tuning};
pub use progress::{ProgressEstimator, ProgressMode};
pub use rate_limit::RateLimiter;
