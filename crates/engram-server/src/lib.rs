//! Engram server library
//!
//! The HTTP surface over [`engram_core`]: role-gated endpoints, per-request
//! deadlines, uniform error objects, and the background forgetting ticker.
//! `main.rs` is a thin shell over [`routes::build_router`]; the e2e suite
//! drives the same router directly.

pub mod auth;
pub mod deadline;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod scheduler;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
