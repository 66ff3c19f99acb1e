//! Background forgetting ticker
//!
//! Drives the forgetting engine on a fixed interval. A tick that overlaps a
//! running pass is skipped by the engine itself; a tick that fails is logged
//! and the next one is expected to recover. Client requests are never
//! affected.

use std::sync::Arc;
use std::time::Duration;

use engram_core::ForgettingEngine;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub fn spawn_forgetting_ticker(
    engine: Arc<ForgettingEngine>,
    interval: Duration,
) -> JoinHandle<()> {
    info!(interval_s = interval.as_secs(), "forgetting ticker started");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so startup stays cheap
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match engine.run_tick().await {
                Ok(Some(_report)) => {}
                Ok(None) => {}
                Err(e) => error!(error = %e, "forgetting pass failed; next tick will retry"),
            }
        }
    })
}
