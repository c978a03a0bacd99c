//! Daily challenge document, keyed by calendar date.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Calendar date key in `YYYY-MM-DD` form. One challenge exists per key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub const FORMAT: &'static str = "%Y-%m-%d";

    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

/// Rejected date key text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidDateKey {
    pub raw: String,
}

impl fmt::Display for InvalidDateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid date key '{}': expected YYYY-MM-DD", self.raw)
    }
}

impl std::error::Error for InvalidDateKey {}

impl FromStr for DateKey {
    type Err = InvalidDateKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        // chrono accepts unpadded fields; the key must be the zero-padded form.
        if t.len() != 10 {
            return Err(InvalidDateKey { raw: s.to_string() });
        }
        NaiveDate::parse_from_str(t, Self::FORMAT)
            .map(Self)
            .map_err(|_| InvalidDateKey { raw: s.to_string() })
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(Self::FORMAT))
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Stored challenge payload (`daily_challenges/{YYYY-MM-DD}`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeDocument {
    /// Prompt shown to players, e.g. `"Was ist (3 + 4) * 2?"`.
    pub question: String,
    /// Decimal string of the integer result.
    pub answer: String,
    /// Server-assigned creation time; set once.
    pub created_at: DateTime<Utc>,
}

impl ChallengeDocument {
    pub fn new(
        question: impl Into<String>,
        answer: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_key_is_zero_padded() {
        let k = DateKey::new(NaiveDate::from_ymd_opt(2025, 3, 7).unwrap());
        assert_eq!(k.to_string(), "2025-03-07");
        assert_eq!("2025-03-07".parse::<DateKey>().unwrap(), k);
    }

    #[test]
    fn date_key_rejects_other_shapes() {
        for raw in ["2025-3-7", "07.03.2025", "2025-02-30", "", "2025-03-07T00:00"] {
            assert!(raw.parse::<DateKey>().is_err(), "{raw} must be rejected");
        }
    }

    #[test]
    fn challenge_document_wire_names() {
        let created = DateTime::parse_from_rfc3339("2025-03-07T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let doc = ChallengeDocument::new("Was ist 2 + 3?", "5", created);
        let v = serde_json::to_value(&doc).unwrap();
        assert_eq!(v["question"], "Was ist 2 + 3?");
        assert_eq!(v["answer"], "5");
        assert!(v.get("created_at").is_some());
    }
}
