//! Challenge upsert guard: at most one challenge per date key.

use anyhow::{Context, Result};
use arena_challenge::ChallengeStrategy;
use arena_schemas::{ChallengeDocument, DateKey};
use arena_store::{CreateOutcome, DocumentStore};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::info;

use crate::state::{AppState, BusMsg};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// This call stored the document.
    Created(ChallengeDocument),
    /// A challenge was already stored for the key; it was left untouched.
    /// Carries the stored document when it could be read back.
    AlreadyExists(Option<ChallengeDocument>),
}

impl UpsertOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertOutcome::Created(_) => CreateOutcome::Created.as_str(),
            UpsertOutcome::AlreadyExists(_) => CreateOutcome::AlreadyExists.as_str(),
        }
    }

    pub fn document(&self) -> Option<&ChallengeDocument> {
        match self {
            UpsertOutcome::Created(doc) => Some(doc),
            UpsertOutcome::AlreadyExists(doc) => doc.as_ref(),
        }
    }
}

/// Ensure a challenge exists for `key`.
///
/// The pre-read only skips synthesis when the date is already covered; the
/// create itself is an atomic create-if-absent, so concurrent callers for
/// the same key store exactly one document.
pub async fn create_daily_challenge<R: RngCore + Send>(
    store: &dyn DocumentStore,
    strategy: &dyn ChallengeStrategy,
    key: DateKey,
    rng: &mut R,
) -> Result<UpsertOutcome> {
    if let Some(existing) = store
        .get_challenge(&key)
        .await
        .with_context(|| format!("read challenge {key}"))?
    {
        info!(date_key = %key, "challenge for date already exists");
        return Ok(UpsertOutcome::AlreadyExists(Some(existing)));
    }

    let challenge = strategy
        .generate(rng)
        .with_context(|| format!("synthesize challenge {key} ({})", strategy.name()))?;
    let created_at = store.server_time().await.context("server time")?;
    let doc = ChallengeDocument::new(challenge.question, challenge.answer, created_at);

    match store
        .create_challenge_if_absent(&key, &doc)
        .await
        .with_context(|| format!("create challenge {key}"))?
    {
        CreateOutcome::Created => {
            info!(date_key = %key, strategy = strategy.name(), question = %doc.question, "challenge created");
            Ok(UpsertOutcome::Created(doc))
        }
        CreateOutcome::AlreadyExists => {
            // Lost a race with a concurrent writer after the pre-read.
            info!(date_key = %key, "challenge for date already exists");
            let stored = store
                .get_challenge(&key)
                .await
                .with_context(|| format!("read back challenge {key}"))?;
            Ok(UpsertOutcome::AlreadyExists(stored))
        }
    }
}

/// Upsert for `key` with the daemon's store and strategy, then announce the
/// outcome on the bus.
pub async fn run_daily(st: &AppState, key: DateKey) -> Result<UpsertOutcome> {
    let mut rng = StdRng::from_entropy();
    let outcome =
        create_daily_challenge(st.store.as_ref(), st.strategy.as_ref(), key, &mut rng).await?;
    let _ = st.bus.send(BusMsg::ChallengeUpserted {
        date_key: key.to_string(),
        outcome: outcome.as_str().to_string(),
    });
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use arena_challenge::{ChallengeMode, SynthConfig};
    use arena_schemas::{ChangeEvent, GameDocument, GamePatch};
    use arena_store::{StoreError, VersionedGame};
    use chrono::{DateTime, Utc};

    /// Challenge store that reports a concurrent create, then fails every
    /// read after the first.
    #[derive(Default)]
    struct RacingStore {
        reads: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl DocumentStore for RacingStore {
        fn backend_name(&self) -> &'static str {
            "racing"
        }

        async fn get_game(&self, _game_id: &str) -> Result<Option<VersionedGame>, StoreError> {
            Ok(None)
        }

        async fn insert_game(&self, _doc: GameDocument) -> Result<i64, StoreError> {
            Err(StoreError::Backend("unused".to_string()))
        }

        async fn replace_game(&self, _doc: GameDocument) -> Result<ChangeEvent, StoreError> {
            Err(StoreError::Backend("unused".to_string()))
        }

        async fn apply_game_patch(
            &self,
            _game_id: &str,
            _expected_version: Option<i64>,
            _patch: &GamePatch,
        ) -> Result<ChangeEvent, StoreError> {
            Err(StoreError::Backend("unused".to_string()))
        }

        async fn get_challenge(
            &self,
            _key: &DateKey,
        ) -> Result<Option<ChallengeDocument>, StoreError> {
            if self.reads.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(None)
            } else {
                Err(StoreError::Backend("connection reset".to_string()))
            }
        }

        async fn create_challenge_if_absent(
            &self,
            _key: &DateKey,
            _doc: &ChallengeDocument,
        ) -> Result<CreateOutcome, StoreError> {
            Ok(CreateOutcome::AlreadyExists)
        }

        async fn server_time(&self) -> Result<DateTime<Utc>, StoreError> {
            Ok(Utc::now())
        }
    }

    #[tokio::test]
    async fn read_back_failure_after_lost_race_is_an_error() {
        let store = RacingStore::default();
        let strategy = ChallengeMode::Advanced
            .strategy(SynthConfig::default())
            .unwrap();
        let key: DateKey = "2024-05-02".parse().unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let err = create_daily_challenge(&store, strategy.as_ref(), key, &mut rng)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("connection reset"), "{err:#}");
    }
}
