//! Partial update of a [`GameDocument`].
//!
//! A patch is the only thing the reconciler produces and the only thing the
//! trigger adapter writes. It serializes to a flat field-path map so a store
//! can merge it without reading the document first; the winner lives at the
//! dotted path `scores.winner`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{GameDocument, PlayerStatus, Winner};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamePatch {
    #[serde(rename = "toStatus", default, skip_serializing_if = "Option::is_none")]
    pub to_status: Option<PlayerStatus>,
    #[serde(rename = "fromStatus", default, skip_serializing_if = "Option::is_none")]
    pub from_status: Option<PlayerStatus>,
    #[serde(rename = "inviterStatus", default, skip_serializing_if = "Option::is_none")]
    pub inviter_status: Option<PlayerStatus>,
    #[serde(rename = "inviteeStatus", default, skip_serializing_if = "Option::is_none")]
    pub invitee_status: Option<PlayerStatus>,
    #[serde(rename = "scores.winner", default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Winner>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl GamePatch {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Patch that moves both players to `status`.
    pub fn both(status: PlayerStatus) -> Self {
        Self {
            inviter_status: Some(status.clone()),
            invitee_status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.field_paths().is_empty()
    }

    /// Overlay `later` onto `self`: every field `later` sets wins.
    pub fn merge(&mut self, later: GamePatch) {
        if later.to_status.is_some() {
            self.to_status = later.to_status;
        }
        if later.from_status.is_some() {
            self.from_status = later.from_status;
        }
        if later.inviter_status.is_some() {
            self.inviter_status = later.inviter_status;
        }
        if later.invitee_status.is_some() {
            self.invitee_status = later.invitee_status;
        }
        if later.winner.is_some() {
            self.winner = later.winner;
        }
        if later.updated_at.is_some() {
            self.updated_at = later.updated_at;
        }
    }

    /// Wire paths touched by this patch, in a fixed order.
    pub fn field_paths(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.to_status.is_some() {
            out.push("toStatus");
        }
        if self.from_status.is_some() {
            out.push("fromStatus");
        }
        if self.inviter_status.is_some() {
            out.push("inviterStatus");
        }
        if self.invitee_status.is_some() {
            out.push("inviteeStatus");
        }
        if self.winner.is_some() {
            out.push("scores.winner");
        }
        if self.updated_at.is_some() {
            out.push("updatedAt");
        }
        out
    }

    /// Flat `{ "fieldPath": value }` map for merge-style store updates.
    pub fn to_field_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(m)) => m,
            _ => Map::new(),
        }
    }

    /// Merge this patch into `doc`. Fields the patch leaves unset are untouched.
    pub fn apply_to(&self, doc: &mut GameDocument) {
        if let Some(s) = &self.to_status {
            doc.to_status = Some(s.clone());
        }
        if let Some(s) = &self.from_status {
            doc.from_status = Some(s.clone());
        }
        if let Some(s) = &self.inviter_status {
            doc.inviter_status = Some(s.clone());
        }
        if let Some(s) = &self.invitee_status {
            doc.invitee_status = Some(s.clone());
        }
        if let Some(w) = &self.winner {
            doc.scores.winner = Some(w.clone());
        }
        if let Some(t) = self.updated_at {
            doc.updated_at = Some(t);
        }
    }

    /// Pure variant of [`GamePatch::apply_to`].
    pub fn applied(&self, doc: &GameDocument) -> GameDocument {
        let mut next = doc.clone();
        self.apply_to(&mut next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_patch_has_no_paths() {
        assert!(GamePatch::empty().is_empty());
        assert!(GamePatch::empty().to_field_map().is_empty());
    }

    #[test]
    fn later_fields_win_on_merge() {
        let mut acc = GamePatch::both(PlayerStatus::Finished);
        acc.to_status = Some(PlayerStatus::Accepted);

        let mut later = GamePatch::both(PlayerStatus::Ended);
        later.winner = Some(Winner::Draw);
        acc.merge(later);

        assert_eq!(acc.inviter_status, Some(PlayerStatus::Ended));
        assert_eq!(acc.invitee_status, Some(PlayerStatus::Ended));
        assert_eq!(acc.to_status, Some(PlayerStatus::Accepted));
        assert_eq!(acc.winner, Some(Winner::Draw));
    }

    #[test]
    fn field_map_uses_dotted_winner_path() {
        let mut p = GamePatch::both(PlayerStatus::Ended);
        p.winner = Some(Winner::Player("alice".to_string()));

        let m = p.to_field_map();
        assert_eq!(m.get("scores.winner"), Some(&json!("alice")));
        assert_eq!(m.get("inviterStatus"), Some(&json!("ended")));
        assert!(!m.contains_key("scores"));
        assert_eq!(
            p.field_paths(),
            vec!["inviterStatus", "inviteeStatus", "scores.winner"]
        );
    }

    #[test]
    fn apply_touches_only_patched_fields() {
        let doc = GameDocument::new("g1", "alice", "bob")
            .with_statuses(PlayerStatus::Finished, PlayerStatus::Finished)
            .with_scores(4.0, 9.0);
        let mut p = GamePatch::both(PlayerStatus::Ended);
        p.winner = Some(Winner::Player("bob".to_string()));

        let next = p.applied(&doc);
        assert_eq!(next.inviter_status, Some(PlayerStatus::Ended));
        assert_eq!(next.scores.user2, 9.0);
        assert_eq!(next.scores.winner, Some(Winner::Player("bob".to_string())));
        assert_eq!(next.inviter_id.as_deref(), Some("alice"));
        assert_eq!(next.to_status, None);
    }
}
