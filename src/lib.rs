//! tg-digest: Telegram chat history fetcher with rolling summarization and text export.
//! Hexagonal layout: domain and ports at the core, adapters at the edges.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
