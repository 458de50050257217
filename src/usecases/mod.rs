//! Application use cases. Orchestrate domain logic via ports.

pub mod export_service;
pub mod paginator;
pub mod summarize_service;

pub use export_service::{ExportOutcome, ExportRequest, ExportService};
pub use paginator::Paginator;
pub use summarize_service::{RollingSummarizer, SummarizeRequest, resolve_since};
