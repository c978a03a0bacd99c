use std::fmt;

use arena_schemas::GamePatch;

/// Reconcile rules, in evaluation order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleId {
    /// Invitee moved `pending → accepted`.
    InviteAccepted,
    /// Both players ready and the match is not already live.
    MutualReadyStart,
    /// One side finished; the match ends for both.
    EarlyTermination,
    /// Both finished without a winner; resolve it and end the match.
    WinnerResolution,
}

impl RuleId {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::InviteAccepted => "invite_accepted",
            RuleId::MutualReadyStart => "mutual_ready_start",
            RuleId::EarlyTermination => "early_termination",
            RuleId::WinnerResolution => "winner_resolution",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one reconcile pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Fields to persist. Empty means "do not write".
    pub patch: GamePatch,
    /// Rules whose predicate held, in evaluation order. A rule can fire and
    /// still contribute nothing when its fields already hold the target value.
    pub fired: Vec<RuleId>,
}

impl ReconcileReport {
    pub fn noop() -> Self {
        Self {
            patch: GamePatch::empty(),
            fired: Vec::new(),
        }
    }

    pub fn requires_write(&self) -> bool {
        !self.patch.is_empty()
    }
}
