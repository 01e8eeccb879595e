//! Operator HTTP surface: health probes, metrics and summary lookup.

pub mod response;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
