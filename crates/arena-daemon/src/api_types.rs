//! Request and response types for all arena-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests. No business logic lives here.

use arena_schemas::{ChallengeDocument, GamePatch};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapter::AdapterOutcome;
use crate::feed::Settled;
use crate::upsert::UpsertOutcome;

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
    pub store: String,
    pub uptime_secs: u64,
    pub config_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// /v1/games
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameResponse {
    /// The stored document in its wire shape.
    pub game: Value,
    pub version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutGameResponse {
    pub created: bool,
    pub version: i64,
    /// Present when the write was reconciled inline.
    pub reconcile: Option<ReconcileResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileResponse {
    /// "no_change" | "applied"
    pub outcome: String,
    pub rules: Vec<String>,
    pub patch: Option<GamePatch>,
    pub version: Option<i64>,
    /// Passes triggered by this write when reconciled inline.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub follow_ups: Vec<ReconcileResponse>,
}

impl From<&AdapterOutcome> for ReconcileResponse {
    fn from(o: &AdapterOutcome) -> Self {
        let (patch, version) = match o {
            AdapterOutcome::Applied { patch, version, .. } => (Some(patch.clone()), Some(*version)),
            AdapterOutcome::NoChange { .. } => (None, None),
        };
        Self {
            outcome: o.as_str().to_string(),
            rules: o.fired().iter().map(|r| r.as_str().to_string()).collect(),
            patch,
            version,
            follow_ups: Vec::new(),
        }
    }
}

impl From<&Settled> for ReconcileResponse {
    fn from(s: &Settled) -> Self {
        let mut head = Self::from(&s.outcome);
        head.follow_ups = s.follow_ups.iter().map(Self::from).collect();
        head
    }
}

// ---------------------------------------------------------------------------
// /v1/challenges
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyChallengeRequest {
    /// `YYYY-MM-DD`; defaults to today in the schedule's zone.
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyChallengeResponse {
    pub date_key: String,
    /// "created" | "already_exists"
    pub outcome: String,
    pub challenge: Option<ChallengeDocument>,
}

impl DailyChallengeResponse {
    pub fn new(date_key: String, o: &UpsertOutcome) -> Self {
        Self {
            date_key,
            outcome: o.as_str().to_string(),
            challenge: o.document().cloned(),
        }
    }
}
