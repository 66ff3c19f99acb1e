//! Shared application state

use std::sync::Arc;
use std::time::Instant;

use engram_core::LtmService;

#[derive(Clone)]
pub struct AppState {
    pub ltm: Arc<LtmService>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(ltm: Arc<LtmService>) -> Self {
        Self {
            ltm,
            started_at: Instant::now(),
        }
    }
}
