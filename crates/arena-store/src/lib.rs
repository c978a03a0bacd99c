//! arena-store
//!
//! Document store boundary: point reads and writes on the games and
//! challenges collections, compare-and-set patching, atomic create-if-absent
//! and the server clock.
//!
//! Two implementations:
//! - [`MemoryStore`]: in-process, with a broadcast change feed. Every write to
//!   an existing game (external or patch) emits a [`ChangeEvent`].
//! - [`PgStore`]: Postgres via sqlx. Emits nothing itself; change events
//!   arrive through the daemon's webhook route.

mod error;
mod memory;
mod pg;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use pg::{connect, connect_from_env, migrate, status, DbStatus, PgStore, ENV_DB_URL};

use arena_schemas::{ChallengeDocument, ChangeEvent, DateKey, GameDocument, GamePatch};
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

/// A game document together with its store version.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedGame {
    pub doc: GameDocument,
    pub version: i64,
}

/// Result of an atomic create-if-absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

impl CreateOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreateOutcome::Created => "created",
            CreateOutcome::AlreadyExists => "already_exists",
        }
    }
}

#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn get_game(&self, game_id: &str) -> Result<Option<VersionedGame>, StoreError>;

    /// Create a game. Fails with `AlreadyExists` when the id is taken.
    /// Creation is not an update and emits no change event.
    async fn insert_game(&self, doc: GameDocument) -> Result<i64, StoreError>;

    /// Overwrite an existing game as an outside client would. Returns the
    /// change this write caused.
    async fn replace_game(&self, doc: GameDocument) -> Result<ChangeEvent, StoreError>;

    /// Merge `patch` into the game.
    ///
    /// With `expected_version = Some(v)` the write only happens if the stored
    /// version is still `v`, otherwise `VersionConflict`. `None` writes
    /// unconditionally. Returns the change this write caused; its
    /// `after_version` is the new version.
    async fn apply_game_patch(
        &self,
        game_id: &str,
        expected_version: Option<i64>,
        patch: &GamePatch,
    ) -> Result<ChangeEvent, StoreError>;

    async fn get_challenge(&self, key: &DateKey) -> Result<Option<ChallengeDocument>, StoreError>;

    /// Store `doc` under `key` only if nothing is there yet. Atomic: of two
    /// concurrent callers exactly one sees `Created`.
    async fn create_challenge_if_absent(
        &self,
        key: &DateKey,
        doc: &ChallengeDocument,
    ) -> Result<CreateOutcome, StoreError>;

    /// Authoritative "now" for timestamps written to documents.
    async fn server_time(&self) -> Result<DateTime<Utc>, StoreError>;

    /// Subscribe to the store's own change feed, if it has one.
    fn change_feed(&self) -> Option<broadcast::Receiver<ChangeEvent>> {
        None
    }
}
