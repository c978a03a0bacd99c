//! Synthesizer parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::SynthError;

/// Binary operator a challenge expression may contain.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
}

impl Operator {
    pub const ALL: [Operator; 4] = [Operator::Add, Operator::Sub, Operator::Mul, Operator::Div];

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "+" => Ok(Operator::Add),
            "-" => Ok(Operator::Sub),
            "*" => Ok(Operator::Mul),
            "/" => Ok(Operator::Div),
            other => Err(format!("unknown operator '{other}'")),
        }
    }
}

impl Serialize for Operator {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.symbol())
    }
}

impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Parameters of the expression synthesizer.
///
/// Defaults are the "Fortgeschritten" level: 2–4 operands in `[1, 20]`, all
/// four operators, a coin flip for outer parentheses, results in `[0, 1000)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Inclusive lower bound of the operand count.
    pub operand_count_min: u32,
    /// Inclusive upper bound of the operand count.
    pub operand_count_max: u32,
    /// Operands are drawn uniformly from `[1, max_value]`.
    pub max_value: u32,
    pub operators: Vec<Operator>,
    /// Chance of wrapping the whole expression in one pair of parentheses.
    pub paren_probability: f64,
    /// Accepted results are strictly below this bound.
    pub upper_bound: u32,
    /// Resampling cap before giving up with `GenerationExhausted`.
    pub max_attempts: u32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            operand_count_min: 2,
            operand_count_max: 4,
            max_value: 20,
            operators: Operator::ALL.to_vec(),
            paren_probability: 0.5,
            upper_bound: 1000,
            max_attempts: 100_000,
        }
    }
}

impl SynthConfig {
    /// Reject parameter sets under which sampling cannot work at all.
    pub fn validate(&self) -> Result<(), SynthError> {
        let bad = |msg: String| Err(SynthError::InvalidConfig(msg));
        if self.operand_count_min == 0 {
            return bad("operand_count_min must be >= 1".to_string());
        }
        if self.operand_count_min > self.operand_count_max {
            return bad(format!(
                "operand_count_min ({}) exceeds operand_count_max ({})",
                self.operand_count_min, self.operand_count_max
            ));
        }
        if self.max_value == 0 {
            return bad("max_value must be >= 1".to_string());
        }
        if self.operators.is_empty() && self.operand_count_max > 1 {
            return bad("operators must not be empty".to_string());
        }
        if !(0.0..=1.0).contains(&self.paren_probability) {
            return bad(format!(
                "paren_probability {} is outside [0, 1]",
                self.paren_probability
            ));
        }
        if self.upper_bound == 0 {
            return bad("upper_bound must be >= 1".to_string());
        }
        if self.max_attempts == 0 {
            return bad("max_attempts must be >= 1".to_string());
        }
        Ok(())
    }
}
