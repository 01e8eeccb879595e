//! Queue and summary store for the brand orchestrator.
//!
//! Producers push chunk results onto Redis lists; the orchestrator drains
//! them, quarantines bad payloads into per-brand failed lists and writes
//! summaries with a TTL. Components depend on the [`BrandStore`] trait so
//! tests can swap in an in-memory store.

pub mod client;
pub mod config;
pub mod health;
pub mod store;

pub use client::*;
pub use config::*;
pub use store::*;
