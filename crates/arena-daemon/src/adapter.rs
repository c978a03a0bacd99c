//! Change-trigger adapter: one game update in, at most one patch write out.

use arena_reconcile::{decide_winner, reconcile_report, stamp, ReconcileReport, RuleId};
use arena_schemas::{ChangeEvent, GameDocument, GamePatch, PlayerStatus, GAMES_COLLECTION};
use arena_store::{DocumentStore, StoreError};
use tracing::{debug, info, warn};

/// Compare-and-set attempts per event before a conflict is returned.
pub const MAX_WRITE_ATTEMPTS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum AdapterOutcome {
    /// No rule produced a field change; nothing was written.
    NoChange { fired: Vec<RuleId> },
    /// The stamped patch was persisted.
    Applied {
        patch: GamePatch,
        fired: Vec<RuleId>,
        version: i64,
        /// The update this write made to the document.
        caused: ChangeEvent,
    },
}

impl AdapterOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterOutcome::NoChange { .. } => "no_change",
            AdapterOutcome::Applied { .. } => "applied",
        }
    }

    pub fn fired(&self) -> &[RuleId] {
        match self {
            AdapterOutcome::NoChange { fired } | AdapterOutcome::Applied { fired, .. } => fired,
        }
    }

    pub fn caused(&self) -> Option<&ChangeEvent> {
        match self {
            AdapterOutcome::Applied { caused, .. } => Some(caused),
            AdapterOutcome::NoChange { .. } => None,
        }
    }
}

/// Reconcile `event` and persist the resulting patch.
///
/// The write is a compare-and-set on the version the event observed. When
/// the document moved on in between, the rules are re-run from the event's
/// `before` snapshot to the stored document and the write is retried
/// against the stored version, so a transition seen only by this event is
/// never lost. After [`MAX_WRITE_ATTEMPTS`] the conflict is returned.
///
/// An empty patch performs no write, so the feed cannot loop on the
/// adapter's own writes. Other store failures are returned unretried.
pub async fn on_game_update(
    store: &dyn DocumentStore,
    event: &ChangeEvent,
) -> Result<AdapterOutcome, StoreError> {
    let mut current = event.after.clone();
    let mut expected = event.after_version;
    let mut attempt = 1;
    loop {
        let report = reconcile_report(&event.before, &current);
        if winner_unresolvable(&report, &current) {
            warn!(
                game_id = %event.game_id,
                "match finished but the winning side has no player id; winner left unset"
            );
        }
        if !report.requires_write() {
            debug!(game_id = %event.game_id, fired = ?report.fired, "no change");
            return Ok(AdapterOutcome::NoChange {
                fired: report.fired,
            });
        }

        let now = store.server_time().await?;
        let patch = stamp(report.patch, now);

        match store
            .apply_game_patch(&event.game_id, expected, &patch)
            .await
        {
            Ok(caused) => {
                let version = caused.after_version.unwrap_or_default();
                info!(
                    game_id = %event.game_id,
                    fields = ?patch.field_paths(),
                    fired = ?report.fired,
                    version,
                    attempt,
                    "game reconciled"
                );
                return Ok(AdapterOutcome::Applied {
                    patch,
                    fired: report.fired,
                    version,
                    caused,
                });
            }
            Err(StoreError::VersionConflict { expected: seen, actual })
                if attempt < MAX_WRITE_ATTEMPTS =>
            {
                debug!(game_id = %event.game_id, seen, actual, attempt, "document moved; re-reading");
                let latest = store
                    .get_game(&event.game_id)
                    .await?
                    .ok_or_else(|| StoreError::NotFound {
                        collection: GAMES_COLLECTION,
                        key: event.game_id.clone(),
                    })?;
                current = latest.doc;
                expected = Some(latest.version);
                attempt += 1;
            }
            Err(e) => {
                warn!(game_id = %event.game_id, attempt, error = %e, "reconcile write failed");
                return Err(e);
            }
        }
    }
}

/// Both sides finished, no winner recorded, and none can be decided because
/// the leading side has no player id. The match stays `finished`.
fn winner_unresolvable(report: &ReconcileReport, doc: &GameDocument) -> bool {
    report.fired.contains(&RuleId::EarlyTermination)
        && doc.both_are(&PlayerStatus::Finished)
        && doc.scores.winner.is_none()
        && decide_winner(doc).is_none()
}
