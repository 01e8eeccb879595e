//! Application state shared across handlers.

use brand_store::{BrandStore, KeyLayout};
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Summary store (Redis in production, mock in tests)
    pub store: Arc<dyn BrandStore>,
    /// Key layout used to locate summaries
    pub keys: KeyLayout,
}

impl AppState {
    pub fn new(store: Arc<dyn BrandStore>, keys: KeyLayout) -> Self {
        Self { store, keys }
    }
}
