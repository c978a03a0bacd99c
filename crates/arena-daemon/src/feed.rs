//! Change-feed dispatcher: every update event goes through the adapter.

use std::sync::Arc;

use arena_schemas::ChangeEvent;
use arena_store::StoreError;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::adapter::{on_game_update, AdapterOutcome};
use crate::state::{AppState, BusMsg};

/// Follow-up passes allowed per delivered event when dispatching inline.
const MAX_CASCADE: usize = 8;

/// Outcome of the delivered event plus the passes its own writes caused.
#[derive(Debug, Clone, PartialEq)]
pub struct Settled {
    pub outcome: AdapterOutcome,
    pub follow_ups: Vec<AdapterOutcome>,
}

impl Settled {
    pub fn outcomes(&self) -> impl Iterator<Item = &AdapterOutcome> {
        std::iter::once(&self.outcome).chain(self.follow_ups.iter())
    }

    /// Version written by the last pass that wrote, if any did.
    pub fn written_version(&self) -> Option<i64> {
        self.outcomes()
            .filter_map(|o| match o {
                AdapterOutcome::Applied { version, .. } => Some(*version),
                AdapterOutcome::NoChange { .. } => None,
            })
            .last()
    }
}

/// Run the adapter for `event` and announce the outcome on the bus.
pub async fn dispatch(st: &AppState, event: &ChangeEvent) -> Result<AdapterOutcome, StoreError> {
    let outcome = on_game_update(st.store.as_ref(), event).await?;
    let version = match &outcome {
        AdapterOutcome::Applied { version, .. } => Some(*version),
        AdapterOutcome::NoChange { .. } => event.after_version,
    };
    let _ = st.bus.send(BusMsg::GameReconciled {
        game_id: event.game_id.clone(),
        outcome: outcome.as_str().to_string(),
        rules: outcome.fired().iter().map(|r| r.as_str().to_string()).collect(),
        version,
    });
    Ok(outcome)
}

/// Dispatch `event`. When the store has no change feed of its own, the
/// adapter's writes are fed back in here until a pass writes nothing, the
/// way a feed subscriber would see them.
pub async fn settle(st: &AppState, event: &ChangeEvent) -> Result<Settled, StoreError> {
    let outcome = dispatch(st, event).await?;
    let mut follow_ups = Vec::new();
    if st.inline_dispatch {
        let mut next = outcome.caused().cloned();
        while let Some(ev) = next {
            if follow_ups.len() >= MAX_CASCADE {
                warn!(game_id = %event.game_id, passes = follow_ups.len(), "cascade cut short");
                break;
            }
            let o = dispatch(st, &ev).await?;
            next = o.caused().cloned();
            follow_ups.push(o);
        }
    }
    Ok(Settled {
        outcome,
        follow_ups,
    })
}

/// Subscribe to the store's own change feed and dispatch every event.
///
/// Returns `None` when the store has no feed (events then arrive over HTTP).
/// A lagging receiver drops events; that is logged and the loop carries on.
pub fn spawn_change_feed(st: Arc<AppState>) -> Option<JoinHandle<()>> {
    let mut rx = st.store.change_feed()?;
    info!(backend = st.store.backend_name(), "change feed attached");
    Some(tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Err(e) = dispatch(&st, &event).await {
                        error!(game_id = %event.game_id, event_id = %event.event_id, error = %e, "reconcile failed");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "change feed lagged; events dropped");
                }
                Err(RecvError::Closed) => {
                    info!("change feed closed");
                    break;
                }
            }
        }
    }))
}
