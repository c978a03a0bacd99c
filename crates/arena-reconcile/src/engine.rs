use arena_schemas::{status_is, GameDocument, GamePatch, PlayerStatus, Winner};
use chrono::{DateTime, Utc};

use crate::{ReconcileReport, RuleId};

type Rule = fn(&GameDocument, &GameDocument) -> Option<GamePatch>;

/// Ordered rule table. Later entries overwrite fields set by earlier ones, so
/// terminal conditions (finished, ended) dominate.
const RULES: [(RuleId, Rule); 4] = [
    (RuleId::InviteAccepted, invite_accepted),
    (RuleId::MutualReadyStart, mutual_ready_start),
    (RuleId::EarlyTermination, early_termination),
    (RuleId::WinnerResolution, winner_resolution),
];

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Rule 1: invitee `pending → accepted` raises the auxiliary signal fields.
pub fn invite_accepted(before: &GameDocument, after: &GameDocument) -> Option<GamePatch> {
    if status_is(&before.invitee_status, &PlayerStatus::Pending)
        && status_is(&after.invitee_status, &PlayerStatus::Accepted)
    {
        Some(GamePatch {
            to_status: Some(PlayerStatus::Accepted),
            from_status: Some(PlayerStatus::Accepted),
            ..GamePatch::default()
        })
    } else {
        None
    }
}

/// Rule 2: both ready → both ingame.
///
/// The guard only suppresses the rule when *both* players were already
/// `ingame` before the change; one side ingame is not enough.
pub fn mutual_ready_start(before: &GameDocument, after: &GameDocument) -> Option<GamePatch> {
    if after.both_are(&PlayerStatus::Ready) && !before.both_are(&PlayerStatus::Ingame) {
        Some(GamePatch::both(PlayerStatus::Ingame))
    } else {
        None
    }
}

/// Rule 3: either side finished → both finished.
pub fn early_termination(_before: &GameDocument, after: &GameDocument) -> Option<GamePatch> {
    if after.either_is(&PlayerStatus::Finished) {
        Some(GamePatch::both(PlayerStatus::Finished))
    } else {
        None
    }
}

/// Rule 4: both finished, winner unset → set winner, both ended.
pub fn winner_resolution(_before: &GameDocument, after: &GameDocument) -> Option<GamePatch> {
    if !after.both_are(&PlayerStatus::Finished) || after.scores.winner.is_some() {
        return None;
    }
    let winner = decide_winner(after)?;
    let mut patch = GamePatch::both(PlayerStatus::Ended);
    patch.winner = Some(winner);
    Some(patch)
}

/// Higher score wins (`user1` is the inviter, `user2` the invitee); equal
/// scores are a draw.
///
/// Returns `None` when the winning side has no player id on the document, so
/// no winner can be recorded.
pub fn decide_winner(doc: &GameDocument) -> Option<Winner> {
    let (s1, s2) = (doc.scores.user1, doc.scores.user2);
    if s1 > s2 {
        doc.inviter_id.clone().map(Winner::Player)
    } else if s2 > s1 {
        doc.invitee_id.clone().map(Winner::Player)
    } else {
        Some(Winner::Draw)
    }
}

// ---------------------------------------------------------------------------
// Fold
// ---------------------------------------------------------------------------

/// Evaluate every rule against `(before, after)` and fold the partial
/// patches left to right.
///
/// The folded patch is then trimmed against `after`: a field already holding
/// its target value is dropped, and a status that would move backward in the
/// lifecycle is dropped. A stable document therefore always yields an empty
/// patch, which is what stops the update trigger from feeding on its own
/// writes.
///
/// Pure and total: never fails, never touches its inputs.
pub fn reconcile_report(before: &GameDocument, after: &GameDocument) -> ReconcileReport {
    let mut patch = GamePatch::empty();
    let mut fired = Vec::new();
    for (id, rule) in RULES.iter() {
        if let Some(partial) = rule(before, after) {
            fired.push(*id);
            patch.merge(partial);
        }
    }
    ReconcileReport {
        patch: forward_only(patch, after),
        fired,
    }
}

/// Patch to persist for the change `before → after`; empty when nothing to do.
pub fn reconcile(before: &GameDocument, after: &GameDocument) -> GamePatch {
    reconcile_report(before, after).patch
}

/// Stamp a non-empty patch with the server-assigned update time. Empty
/// patches stay empty so the caller can skip the write.
pub fn stamp(mut patch: GamePatch, now: DateTime<Utc>) -> GamePatch {
    if !patch.is_empty() {
        patch.updated_at = Some(now);
    }
    patch
}

/// `doc` with `patch` merged in. Fields the patch leaves unset are untouched.
pub fn apply_patch(doc: &GameDocument, patch: &GamePatch) -> GameDocument {
    patch.applied(doc)
}

fn forward_only(mut patch: GamePatch, current: &GameDocument) -> GamePatch {
    patch.to_status = keep_if_advancing(patch.to_status, &current.to_status);
    patch.from_status = keep_if_advancing(patch.from_status, &current.from_status);
    patch.inviter_status = keep_if_advancing(patch.inviter_status, &current.inviter_status);
    patch.invitee_status = keep_if_advancing(patch.invitee_status, &current.invitee_status);
    if current.scores.winner.is_some() {
        patch.winner = None;
    }
    patch
}

fn keep_if_advancing(
    target: Option<PlayerStatus>,
    current: &Option<PlayerStatus>,
) -> Option<PlayerStatus> {
    let target = target?;
    let Some(cur) = current else {
        return Some(target);
    };
    if *cur == target {
        return None;
    }
    match (cur.rank(), target.rank()) {
        (Some(c), Some(t)) if t < c => None,
        _ => Some(target),
    }
}

/// `true` when applying `patch` to `doc` moves no known status backward.
pub fn is_forward(doc: &GameDocument, patch: &GamePatch) -> bool {
    let pairs = [
        (&doc.inviter_status, &patch.inviter_status),
        (&doc.invitee_status, &patch.invitee_status),
        (&doc.to_status, &patch.to_status),
        (&doc.from_status, &patch.from_status),
    ];
    pairs.into_iter().all(|(cur, next)| {
        match (
            cur.as_ref().and_then(PlayerStatus::rank),
            next.as_ref().and_then(PlayerStatus::rank),
        ) {
            (Some(c), Some(n)) => n >= c,
            _ => true,
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
