//! arena-schemas
//!
//! Wire types shared by every arena crate: the one-vs-one game document, the
//! field-level patch the reconciler emits, the daily challenge document and
//! the change event delivered by the document store's feed.
//!
//! Field names are a compatibility contract with existing clients; do not
//! rename without a migration.

mod challenge;
mod game;
mod patch;

pub use challenge::{ChallengeDocument, DateKey, InvalidDateKey};
pub use game::{status_is, GameDocument, PlayerStatus, Scores, Winner, DRAW_SENTINEL};
pub use patch::GamePatch;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Collection holding game documents.
pub const GAMES_COLLECTION: &str = "onevone_games";
/// Collection holding one challenge per calendar date.
pub const CHALLENGES_COLLECTION: &str = "daily_challenges";

/// One update notification from the change feed.
///
/// Delivery is at-least-once: the same `event_id` may arrive more than once
/// and consumers must tolerate that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(default = "Uuid::new_v4")]
    pub event_id: Uuid,
    pub game_id: String,
    pub before: GameDocument,
    pub after: GameDocument,
    /// Store version of `after`, when the store tracks versions. Writers use
    /// it for compare-and-set; `None` falls back to last-write-wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_version: Option<i64>,
}

impl ChangeEvent {
    pub fn new(game_id: impl Into<String>, before: GameDocument, after: GameDocument) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            game_id: game_id.into(),
            before,
            after,
            after_version: None,
        }
    }

    pub fn with_version(mut self, after_version: i64) -> Self {
        self.after_version = Some(after_version);
        self
    }
}
