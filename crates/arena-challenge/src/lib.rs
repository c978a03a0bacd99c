//! arena-challenge
//!
//! Daily arithmetic challenge synthesis.
//!
//! - [`evaluate`] computes an expression exactly (rational arithmetic).
//! - [`AdvancedStrategy`] samples random expressions until one evaluates to a
//!   non-negative integer below the configured bound, with a hard attempt cap.
//! - [`ExpertStrategy`] builds addition-only sums that always qualify.
//!
//! No IO. Randomness is injected by the caller so tests can seed it.

mod config;
mod eval;
mod strategy;

pub use config::{Operator, SynthConfig};
pub use eval::{evaluate, EvalError, Ratio};
pub use strategy::{AdvancedStrategy, ChallengeMode, ChallengeStrategy, ExpertStrategy};

use std::fmt;

const QUESTION_PREFIX: &str = "Was ist ";
const QUESTION_SUFFIX: &str = "?";

/// A generated challenge: prompt plus exact integer answer as text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Challenge {
    pub question: String,
    pub answer: String,
}

impl Challenge {
    pub fn new(expression: &str, answer: i128) -> Self {
        Self {
            question: format!("{QUESTION_PREFIX}{expression}{QUESTION_SUFFIX}"),
            answer: answer.to_string(),
        }
    }

    /// The arithmetic expression embedded in the question.
    pub fn expression(&self) -> &str {
        self.question
            .strip_prefix(QUESTION_PREFIX)
            .and_then(|q| q.strip_suffix(QUESTION_SUFFIX))
            .unwrap_or(&self.question)
    }

    /// Re-evaluate the embedded expression and compare with the answer.
    pub fn verify(&self) -> bool {
        match evaluate(self.expression()) {
            Ok(v) => v.to_integer().map(|n| n.to_string()) == Some(self.answer.clone()),
            Err(_) => false,
        }
    }
}

/// Synthesis failures. Sample-level evaluation errors never surface here;
/// they are rejections inside the sampling loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthError {
    /// Parameters under which no sample could ever be drawn.
    InvalidConfig(String),
    /// The attempt cap was reached without an acceptable sample.
    GenerationExhausted { attempts: u32 },
}

impl fmt::Display for SynthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthError::InvalidConfig(msg) => write!(f, "invalid synthesizer config: {msg}"),
            SynthError::GenerationExhausted { attempts } => write!(
                f,
                "challenge generation exhausted after {attempts} attempts without an acceptable sample"
            ),
        }
    }
}

impl std::error::Error for SynthError {}
