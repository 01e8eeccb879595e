//! Telemetry for the brand orchestrator: structured logging, in-process
//! metrics, health state and resource sampling.

pub mod health;
pub mod metrics;
pub mod resources;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use resources::*;
pub use tracing_setup::*;
