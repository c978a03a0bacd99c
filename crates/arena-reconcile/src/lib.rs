//! arena-reconcile
//!
//! Match reconciliation for one-vs-one games.
//!
//! Given the document before and after an update, compute the minimal patch
//! that moves the match to its next consistent state:
//! - invitee accepts → auxiliary `toStatus`/`fromStatus` signal
//! - both ready (and not both already ingame) → both ingame
//! - either finished → both finished
//! - both finished, no winner → winner by score, both ended
//!
//! Deterministic, pure logic. No IO, no clock; the caller stamps the
//! update time via [`stamp`].

mod engine;
mod types;

pub use engine::{
    apply_patch, decide_winner, early_termination, invite_accepted, is_forward, mutual_ready_start,
    reconcile, reconcile_report, stamp, winner_resolution,
};
pub use types::*;
