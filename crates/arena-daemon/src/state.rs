//! Shared runtime state for arena-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The store and the
//! strategy are trait objects so tests can run the full router against the
//! in-memory store.

use std::sync::Arc;
use std::time::Duration;

use arena_challenge::{ChallengeMode, ChallengeStrategy, SynthConfig, SynthError};
use arena_store::{DocumentStore, MemoryStore};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::schedule::DailySchedule;

// ---------------------------------------------------------------------------
// BusMsg — SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat {
        ts_millis: i64,
    },
    GameReconciled {
        game_id: String,
        /// "no_change" | "applied"
        outcome: String,
        rules: Vec<String>,
        version: Option<i64>,
    },
    ChallengeUpserted {
        date_key: String,
        /// "created" | "already_exists"
        outcome: String,
    },
}

impl BusMsg {
    pub fn event_name(&self) -> &'static str {
        match self {
            BusMsg::Heartbeat { .. } => "heartbeat",
            BusMsg::GameReconciled { .. } => "game",
            BusMsg::ChallengeUpserted { .. } => "challenge",
        }
    }
}

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    pub store: Arc<dyn DocumentStore>,
    pub strategy: Arc<dyn ChallengeStrategy>,
    pub schedule: DailySchedule,
    /// Hash of the loaded configuration, when one was loaded.
    pub config_hash: Option<String>,
    /// The store publishes no change feed of its own, so writes made through
    /// the HTTP surface are reconciled inline.
    pub inline_dispatch: bool,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        strategy: Arc<dyn ChallengeStrategy>,
        schedule: DailySchedule,
        bus_capacity: usize,
    ) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(bus_capacity.max(1));
        let inline_dispatch = store.change_feed().is_none();
        Self {
            bus,
            build: BuildInfo {
                service: "arena-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            store,
            strategy,
            schedule,
            config_hash: None,
            inline_dispatch,
        }
    }

    /// Memory store, advanced strategy with default parameters, midnight
    /// Berlin.
    pub fn in_memory() -> Result<Self, SynthError> {
        let strategy = ChallengeMode::Advanced.strategy(SynthConfig::default())?;
        Ok(Self::new(
            Arc::new(MemoryStore::new()),
            Arc::from(strategy),
            DailySchedule::default(),
            1024,
        ))
    }

    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }
}

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_messages_carry_their_sse_event_name_and_tag() {
        let cases = [
            (BusMsg::Heartbeat { ts_millis: 1 }, "heartbeat", "heartbeat"),
            (
                BusMsg::GameReconciled {
                    game_id: "g1".to_string(),
                    outcome: "applied".to_string(),
                    rules: vec!["mutual_ready_start".to_string()],
                    version: Some(2),
                },
                "game",
                "game_reconciled",
            ),
            (
                BusMsg::ChallengeUpserted {
                    date_key: "2024-05-02".to_string(),
                    outcome: "created".to_string(),
                },
                "challenge",
                "challenge_upserted",
            ),
        ];
        for (msg, event, tag) in cases {
            assert_eq!(msg.event_name(), event);
            assert_eq!(serde_json::to_value(&msg).unwrap()["type"], tag);
        }
    }
}
