//! arena-daemon library target.
//!
//! Exposes the router, state and background tasks for integration tests.
//! The binary `main.rs` depends on this library target.

pub mod adapter;
pub mod api_types;
pub mod feed;
pub mod routes;
pub mod schedule;
pub mod state;
pub mod upsert;
