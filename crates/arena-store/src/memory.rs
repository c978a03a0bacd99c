use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use arena_schemas::{
    ChallengeDocument, ChangeEvent, DateKey, GameDocument, GamePatch, CHALLENGES_COLLECTION,
    GAMES_COLLECTION,
};
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, RwLock};

use crate::{CreateOutcome, DocumentStore, StoreError, VersionedGame};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

const DEFAULT_FEED_CAPACITY: usize = 1024;

/// In-process document store.
///
/// Writes to existing games are published on a broadcast channel, so a
/// subscriber sees every update, including the ones it caused itself.
pub struct MemoryStore {
    games: RwLock<HashMap<String, VersionedGame>>,
    challenges: RwLock<BTreeMap<DateKey, ChallengeDocument>>,
    feed: broadcast::Sender<ChangeEvent>,
    clock: Clock,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }

    pub fn with_capacity(feed_capacity: usize) -> Self {
        let (feed, _rx) = broadcast::channel(feed_capacity.max(1));
        Self {
            games: RwLock::new(HashMap::new()),
            challenges: RwLock::new(BTreeMap::new()),
            feed,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the wall clock behind [`DocumentStore::server_time`].
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }

    fn publish(&self, ev: ChangeEvent) {
        // No subscriber is not an error; the write itself already happened.
        if self.feed.send(ev).is_err() {
            tracing::trace!("change feed has no subscribers");
        }
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get_game(&self, game_id: &str) -> Result<Option<VersionedGame>, StoreError> {
        Ok(self.games.read().await.get(game_id).cloned())
    }

    async fn insert_game(&self, doc: GameDocument) -> Result<i64, StoreError> {
        let mut games = self.games.write().await;
        if games.contains_key(&doc.game_id) {
            return Err(StoreError::AlreadyExists {
                collection: GAMES_COLLECTION,
                key: doc.game_id,
            });
        }
        games.insert(doc.game_id.clone(), VersionedGame { doc, version: 1 });
        Ok(1)
    }

    async fn replace_game(&self, doc: GameDocument) -> Result<ChangeEvent, StoreError> {
        let ev = {
            let mut games = self.games.write().await;
            let slot = games
                .get_mut(&doc.game_id)
                .ok_or_else(|| StoreError::NotFound {
                    collection: GAMES_COLLECTION,
                    key: doc.game_id.clone(),
                })?;
            let before = std::mem::replace(&mut slot.doc, doc);
            slot.version += 1;
            ChangeEvent::new(slot.doc.game_id.clone(), before, slot.doc.clone())
                .with_version(slot.version)
        };
        self.publish(ev.clone());
        Ok(ev)
    }

    async fn apply_game_patch(
        &self,
        game_id: &str,
        expected_version: Option<i64>,
        patch: &GamePatch,
    ) -> Result<ChangeEvent, StoreError> {
        let ev = {
            let mut games = self.games.write().await;
            let slot = games.get_mut(game_id).ok_or_else(|| StoreError::NotFound {
                collection: GAMES_COLLECTION,
                key: game_id.to_string(),
            })?;
            if let Some(expected) = expected_version {
                if slot.version != expected {
                    return Err(StoreError::VersionConflict {
                        expected,
                        actual: slot.version,
                    });
                }
            }
            let before = slot.doc.clone();
            patch.apply_to(&mut slot.doc);
            slot.version += 1;
            ChangeEvent::new(game_id, before, slot.doc.clone()).with_version(slot.version)
        };
        self.publish(ev.clone());
        Ok(ev)
    }

    async fn get_challenge(&self, key: &DateKey) -> Result<Option<ChallengeDocument>, StoreError> {
        Ok(self.challenges.read().await.get(key).cloned())
    }

    async fn create_challenge_if_absent(
        &self,
        key: &DateKey,
        doc: &ChallengeDocument,
    ) -> Result<CreateOutcome, StoreError> {
        let mut challenges = self.challenges.write().await;
        if challenges.contains_key(key) {
            tracing::debug!(collection = CHALLENGES_COLLECTION, %key, "create skipped: present");
            return Ok(CreateOutcome::AlreadyExists);
        }
        challenges.insert(*key, doc.clone());
        Ok(CreateOutcome::Created)
    }

    async fn server_time(&self) -> Result<DateTime<Utc>, StoreError> {
        Ok((self.clock)())
    }

    fn change_feed(&self) -> Option<broadcast::Receiver<ChangeEvent>> {
        Some(self.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_schemas::PlayerStatus;

    #[tokio::test]
    async fn replace_requires_existing_game() {
        let store = MemoryStore::new();
        let err = store
            .replace_game(GameDocument::new("g1", "a", "b"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn insert_twice_is_rejected() {
        let store = MemoryStore::new();
        store.insert_game(GameDocument::new("g1", "a", "b")).await.unwrap();
        let err = store
            .insert_game(GameDocument::new("g1", "a", "b"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let store = MemoryStore::new();
        store.insert_game(GameDocument::new("g1", "a", "b")).await.unwrap();
        let ev = store
            .apply_game_patch("g1", Some(1), &GamePatch::both(PlayerStatus::Ready))
            .await
            .unwrap();
        assert_eq!(ev.after_version, Some(2));
        assert!(ev.after.both_are(&PlayerStatus::Ready));
        assert_eq!(ev.before.inviter_status, None);

        let err = store
            .apply_game_patch("g1", Some(1), &GamePatch::both(PlayerStatus::Ingame))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::VersionConflict { expected: 1, actual: 2 });

        let g = store.get_game("g1").await.unwrap().unwrap();
        assert!(g.doc.both_are(&PlayerStatus::Ready));
    }

    #[tokio::test]
    async fn injected_clock_drives_server_time() {
        let t = DateTime::parse_from_rfc3339("2024-05-01T22:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let store = MemoryStore::new().with_clock(move || t);
        assert_eq!(store.server_time().await.unwrap(), t);
    }
}
