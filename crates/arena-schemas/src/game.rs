//! One-vs-one game document as persisted in the `onevone_games` collection.
//!
//! Field names are the wire contract shared with the mobile clients, so every
//! struct here renames to camelCase. Decoding is lenient on purpose: a field
//! of the wrong JSON type decodes as absent (or zero for scores) instead of
//! failing, which keeps the reconciler total over whatever a client wrote.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// PlayerStatus
// ---------------------------------------------------------------------------

/// Per-player lifecycle status.
///
/// Forward order: `pending → accepted → ready → ingame → finished → ended`.
/// Strings outside that set decode as [`PlayerStatus::Unknown`] and never
/// match a reconcile rule.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PlayerStatus {
    Pending,
    Accepted,
    Ready,
    Ingame,
    Finished,
    Ended,
    Unknown(String),
}

impl PlayerStatus {
    /// Parse a wire string. Matching is exact (the clients write lowercase).
    pub fn parse(raw: &str) -> Self {
        match raw {
            "pending" => Self::Pending,
            "accepted" => Self::Accepted,
            "ready" => Self::Ready,
            "ingame" => Self::Ingame,
            "finished" => Self::Finished,
            "ended" => Self::Ended,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Ready => "ready",
            Self::Ingame => "ingame",
            Self::Finished => "finished",
            Self::Ended => "ended",
            Self::Unknown(raw) => raw,
        }
    }

    /// Position in the forward lifecycle; `None` for unknown statuses.
    pub fn rank(&self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Accepted => Some(1),
            Self::Ready => Some(2),
            Self::Ingame => Some(3),
            Self::Finished => Some(4),
            Self::Ended => Some(5),
            Self::Unknown(_) => None,
        }
    }

    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Null => None,
            Value::String(s) => Some(Self::parse(s)),
            other => Some(Self::Unknown(other.to_string())),
        }
    }
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PlayerStatus {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PlayerStatus {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(Self::parse(&raw))
    }
}

/// `true` when `slot` holds exactly `want`. Absent never matches.
pub fn status_is(slot: &Option<PlayerStatus>, want: &PlayerStatus) -> bool {
    slot.as_ref() == Some(want)
}

// ---------------------------------------------------------------------------
// Winner
// ---------------------------------------------------------------------------

pub const DRAW_SENTINEL: &str = "draw";

/// Resolved outcome stored under `scores.winner`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Winner {
    /// Player id of the winning side (inviter or invitee id).
    Player(String),
    /// Equal scores; stored as the sentinel string `"draw"`.
    Draw,
}

impl Winner {
    /// Empty strings mean "unset" on the wire, so they yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "" => None,
            DRAW_SENTINEL => Some(Self::Draw),
            id => Some(Self::Player(id.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Player(id) => id,
            Self::Draw => DRAW_SENTINEL,
        }
    }

    /// Truthiness of the stored value decides whether a winner is set:
    /// `null`, `false`, `0` and `""` all mean unset.
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) => Self::parse(s),
            Value::Number(n) if n.as_f64() == Some(0.0) => None,
            other => Some(Self::Player(other.to_string())),
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Winner {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Winner {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Self::parse(&raw).ok_or_else(|| serde::de::Error::custom("winner must not be empty"))
    }
}

// ---------------------------------------------------------------------------
// Scores
// ---------------------------------------------------------------------------

/// Score map. `user1` belongs to the inviter, `user2` to the invitee.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    #[serde(default, deserialize_with = "de_score", serialize_with = "ser_score")]
    pub user1: f64,
    #[serde(default, deserialize_with = "de_score", serialize_with = "ser_score")]
    pub user2: f64,
    #[serde(
        default,
        deserialize_with = "de_winner",
        skip_serializing_if = "Option::is_none"
    )]
    pub winner: Option<Winner>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Scores {
    pub fn new(user1: f64, user2: f64) -> Self {
        Self {
            user1,
            user2,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// GameDocument
// ---------------------------------------------------------------------------

/// A game record. Unknown top-level fields survive a decode/encode round trip
/// through `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDocument {
    #[serde(default, deserialize_with = "de_id_string", skip_serializing_if = "String::is_empty")]
    pub game_id: String,
    #[serde(default, deserialize_with = "de_opt_id", skip_serializing_if = "Option::is_none")]
    pub inviter_id: Option<String>,
    #[serde(default, deserialize_with = "de_opt_id", skip_serializing_if = "Option::is_none")]
    pub invitee_id: Option<String>,
    #[serde(default, deserialize_with = "de_status", skip_serializing_if = "Option::is_none")]
    pub inviter_status: Option<PlayerStatus>,
    #[serde(default, deserialize_with = "de_status", skip_serializing_if = "Option::is_none")]
    pub invitee_status: Option<PlayerStatus>,
    /// Auxiliary signaling field written on invite acceptance.
    #[serde(default, deserialize_with = "de_status", skip_serializing_if = "Option::is_none")]
    pub to_status: Option<PlayerStatus>,
    /// Auxiliary signaling field written on invite acceptance.
    #[serde(default, deserialize_with = "de_status", skip_serializing_if = "Option::is_none")]
    pub from_status: Option<PlayerStatus>,
    #[serde(default, deserialize_with = "de_scores")]
    pub scores: Scores,
    #[serde(default, deserialize_with = "de_timestamp", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GameDocument {
    /// Fresh invitation: both sides `pending`, zero scores, no winner.
    pub fn new(
        game_id: impl Into<String>,
        inviter_id: impl Into<String>,
        invitee_id: impl Into<String>,
    ) -> Self {
        Self {
            game_id: game_id.into(),
            inviter_id: Some(inviter_id.into()),
            invitee_id: Some(invitee_id.into()),
            inviter_status: Some(PlayerStatus::Pending),
            invitee_status: Some(PlayerStatus::Pending),
            ..Self::default()
        }
    }

    pub fn with_statuses(mut self, inviter: PlayerStatus, invitee: PlayerStatus) -> Self {
        self.inviter_status = Some(inviter);
        self.invitee_status = Some(invitee);
        self
    }

    pub fn with_scores(mut self, user1: f64, user2: f64) -> Self {
        self.scores.user1 = user1;
        self.scores.user2 = user2;
        self
    }

    pub fn with_winner(mut self, winner: Winner) -> Self {
        self.scores.winner = Some(winner);
        self
    }

    /// Both players hold exactly `want`.
    pub fn both_are(&self, want: &PlayerStatus) -> bool {
        status_is(&self.inviter_status, want) && status_is(&self.invitee_status, want)
    }

    /// At least one player holds exactly `want`.
    pub fn either_is(&self, want: &PlayerStatus) -> bool {
        status_is(&self.inviter_status, want) || status_is(&self.invitee_status, want)
    }

    pub fn from_json(v: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(v)
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Lenient field decoders
// ---------------------------------------------------------------------------

fn de_status<'de, D: Deserializer<'de>>(d: D) -> Result<Option<PlayerStatus>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().and_then(PlayerStatus::from_value))
}

fn de_winner<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Winner>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().and_then(Winner::from_value))
}

fn de_score<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.and_then(|v| v.as_f64()).unwrap_or(0.0))
}

fn ser_score<S: Serializer>(score: &f64, s: S) -> Result<S::Ok, S::Error> {
    // Integral scores go back out as integers so clients see the type they wrote.
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if score.is_finite() && score.fract() == 0.0 && score.abs() < MAX_EXACT {
        s.serialize_i64(*score as i64)
    } else {
        s.serialize_f64(*score)
    }
}

fn de_scores<'de, D: Deserializer<'de>>(d: D) -> Result<Scores, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(obj @ Value::Object(_)) => serde_json::from_value(obj).unwrap_or_default(),
        _ => Scores::default(),
    })
}

fn de_opt_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn de_id_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(de_opt_id(d)?.unwrap_or_default())
}

fn de_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        _ => None,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
