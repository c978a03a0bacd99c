use arena_schemas::{
    ChallengeDocument, ChangeEvent, DateKey, GameDocument, GamePatch, CHALLENGES_COLLECTION,
    GAMES_COLLECTION,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::{CreateOutcome, DocumentStore, StoreError, VersionedGame};

pub const ENV_DB_URL: &str = "ARENA_DATABASE_URL";

pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .map_err(|e| StoreError::Backend(format!("failed to connect to Postgres: {e}")))
}

/// Connect to Postgres using ARENA_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool, StoreError> {
    let url = std::env::var(ENV_DB_URL)
        .map_err(|_| StoreError::Backend(format!("missing env var {ENV_DB_URL}")))?;
    connect(&url, 10).await
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| StoreError::Backend(format!("db migrate failed: {e}")))
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_games_table: bool,
    pub has_challenges_table: bool,
}

/// Connectivity plus schema presence.
pub async fn status(pool: &PgPool) -> Result<DbStatus, StoreError> {
    let (one,): (i32,) = sqlx::query_as("select 1").fetch_one(pool).await?;

    let (games, challenges): (bool, bool) = sqlx::query_as(
        r#"
        select
          exists (select 1 from information_schema.tables
                  where table_schema = 'public' and table_name = 'onevone_games'),
          exists (select 1 from information_schema.tables
                  where table_schema = 'public' and table_name = 'daily_challenges')
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(DbStatus {
        ok: one == 1,
        has_games_table: games,
        has_challenges_table: challenges,
    })
}

/// Postgres-backed store. Game bodies live in a jsonb column; every write
/// bumps `version`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn lock_game(
        tx: &mut Transaction<'_, Postgres>,
        game_id: &str,
    ) -> Result<VersionedGame, StoreError> {
        let row = sqlx::query(
            r#"
            select doc, version
            from onevone_games
            where game_id = $1
            for update
            "#,
        )
        .bind(game_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| StoreError::NotFound {
            collection: GAMES_COLLECTION,
            key: game_id.to_string(),
        })?;
        decode_game(game_id, row.try_get("doc")?, row.try_get("version")?)
    }

    async fn write_game(
        tx: &mut Transaction<'_, Postgres>,
        doc: &GameDocument,
    ) -> Result<i64, StoreError> {
        let (version,): (i64,) = sqlx::query_as(
            r#"
            update onevone_games
            set doc = $2, version = version + 1, updated_at = now()
            where game_id = $1
            returning version
            "#,
        )
        .bind(&doc.game_id)
        .bind(doc.to_json())
        .fetch_one(&mut **tx)
        .await?;
        Ok(version)
    }
}

fn decode_game(game_id: &str, raw: Value, version: i64) -> Result<VersionedGame, StoreError> {
    let mut doc = GameDocument::from_json(raw)?;
    if doc.game_id.is_empty() {
        doc.game_id = game_id.to_string();
    }
    Ok(VersionedGame { doc, version })
}

#[async_trait::async_trait]
impl DocumentStore for PgStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn get_game(&self, game_id: &str) -> Result<Option<VersionedGame>, StoreError> {
        let row = sqlx::query("select doc, version from onevone_games where game_id = $1")
            .bind(game_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(r) => Ok(Some(decode_game(game_id, r.try_get("doc")?, r.try_get("version")?)?)),
            None => Ok(None),
        }
    }

    async fn insert_game(&self, doc: GameDocument) -> Result<i64, StoreError> {
        let res = sqlx::query(
            r#"
            insert into onevone_games (game_id, doc, version)
            values ($1, $2, 1)
            on conflict (game_id) do nothing
            "#,
        )
        .bind(&doc.game_id)
        .bind(doc.to_json())
        .execute(&self.pool)
        .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists {
                collection: GAMES_COLLECTION,
                key: doc.game_id,
            });
        }
        Ok(1)
    }

    async fn replace_game(&self, doc: GameDocument) -> Result<ChangeEvent, StoreError> {
        let mut tx = self.pool.begin().await?;
        let current = Self::lock_game(&mut tx, &doc.game_id).await?;
        let version = Self::write_game(&mut tx, &doc).await?;
        tx.commit().await?;
        Ok(ChangeEvent::new(doc.game_id.clone(), current.doc, doc).with_version(version))
    }

    async fn apply_game_patch(
        &self,
        game_id: &str,
        expected_version: Option<i64>,
        patch: &GamePatch,
    ) -> Result<ChangeEvent, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut current = Self::lock_game(&mut tx, game_id).await?;
        if let Some(expected) = expected_version {
            if current.version != expected {
                // Dropping the transaction rolls it back.
                return Err(StoreError::VersionConflict {
                    expected,
                    actual: current.version,
                });
            }
        }
        let before = current.doc.clone();
        patch.apply_to(&mut current.doc);
        let version = Self::write_game(&mut tx, &current.doc).await?;
        tx.commit().await?;
        Ok(ChangeEvent::new(game_id, before, current.doc).with_version(version))
    }

    async fn get_challenge(&self, key: &DateKey) -> Result<Option<ChallengeDocument>, StoreError> {
        let row = sqlx::query(
            "select question, answer, created_at from daily_challenges where date_key = $1",
        )
        .bind(key.to_string())
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(r) => Ok(Some(ChallengeDocument::new(
                r.try_get::<String, _>("question")?,
                r.try_get::<String, _>("answer")?,
                r.try_get::<DateTime<Utc>, _>("created_at")?,
            ))),
            None => Ok(None),
        }
    }

    async fn create_challenge_if_absent(
        &self,
        key: &DateKey,
        doc: &ChallengeDocument,
    ) -> Result<CreateOutcome, StoreError> {
        let res = sqlx::query(
            r#"
            insert into daily_challenges (date_key, question, answer, created_at)
            values ($1, $2, $3, $4)
            on conflict (date_key) do nothing
            "#,
        )
        .bind(key.to_string())
        .bind(&doc.question)
        .bind(&doc.answer)
        .bind(doc.created_at)
        .execute(&self.pool)
        .await?;
        if res.rows_affected() == 0 {
            tracing::debug!(collection = CHALLENGES_COLLECTION, %key, "create skipped: present");
            Ok(CreateOutcome::AlreadyExists)
        } else {
            Ok(CreateOutcome::Created)
        }
    }

    async fn server_time(&self) -> Result<DateTime<Utc>, StoreError> {
        let (now,): (DateTime<Utc>,) = sqlx::query_as("select now()")
            .fetch_one(&self.pool)
            .await?;
        Ok(now)
    }
}
