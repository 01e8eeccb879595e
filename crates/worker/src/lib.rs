//! Brand pipeline workers.
//!
//! - Drainer (result queue → validated chunks, bad payloads quarantined)
//! - Publisher (brand summary → store with TTL)
//! - Pipeline (drain → aggregate → publish for one brand)
//! - Scheduler (periodic bounded fan-out over all brands, heartbeat)

pub mod config;
pub mod drainer;
pub mod pipeline;
pub mod publisher;
pub mod registry;
pub mod retry;
pub mod scheduler;

pub use config::*;
pub use drainer::*;
pub use pipeline::*;
pub use publisher::*;
pub use registry::*;
pub use retry::*;
pub use scheduler::*;
