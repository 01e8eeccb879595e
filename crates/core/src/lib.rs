//! Core types, validation and aggregation logic for the brand orchestrator.
//!
//! Everything in this crate is pure: no I/O, no clocks except where a
//! timestamp is passed in.

pub mod aggregate;
pub mod brand;
pub mod chunk;
pub mod error;
pub mod merge;
pub mod summary;
pub mod validation;

pub use aggregate::*;
pub use brand::*;
pub use chunk::*;
pub use error::{ChunkErrorCode, Error, Result, StoreErrorCode};
pub use merge::*;
pub use summary::*;
pub use validation::*;
