//! Core domain layer. No external I/O dependencies.
//!
//! Entities, formatting and batch planning live here. Dependencies flow inward.

pub mod batching;
pub mod entities;
pub mod errors;
pub mod format;
pub mod text;

pub use entities::{
    Batch, FetchOptions, FetchResult, MediaInfo, MediaKind, Message, PageProgress, ProgressEvent,
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use errors::{DomainError, PartialFetch};
