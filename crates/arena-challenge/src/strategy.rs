//! Challenge strategies.
//!
//! [`AdvancedStrategy`] is a rejection sampler over random mixed-operator
//! expressions. [`ExpertStrategy`] builds addition-only sums that are always
//! accepted. Both sit behind [`ChallengeStrategy`] so the daily job can hold
//! a `Box<dyn ChallengeStrategy>` chosen from configuration.

use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{evaluate, Challenge, Operator, SynthConfig, SynthError};

/// Produces one challenge per call. Object safe.
pub trait ChallengeStrategy: Send + Sync {
    /// Short name for logs (e.g. `"advanced"`).
    fn name(&self) -> &'static str;

    fn generate(&self, rng: &mut dyn RngCore) -> Result<Challenge, SynthError>;
}

// ---------------------------------------------------------------------------
// Advanced
// ---------------------------------------------------------------------------

/// Mixed-operator rejection sampler.
///
/// Each attempt draws an operand count, operands and operators, optionally
/// wraps the expression in parentheses and evaluates it exactly. The sample
/// is accepted iff the value is a non-negative integer strictly below
/// `upper_bound`. Evaluation errors (division by zero) count as rejections.
#[derive(Clone, Debug)]
pub struct AdvancedStrategy {
    config: SynthConfig,
}

impl AdvancedStrategy {
    pub fn new(config: SynthConfig) -> Result<Self, SynthError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    fn sample_expression(&self, rng: &mut dyn RngCore) -> String {
        let cfg = &self.config;
        let count = rng.gen_range(cfg.operand_count_min..=cfg.operand_count_max);
        let mut expr = String::new();
        for i in 0..count {
            if i > 0 {
                let op = cfg.operators.choose(&mut *rng).copied().unwrap_or(Operator::Add);
                expr.push(' ');
                expr.push_str(op.symbol());
                expr.push(' ');
            }
            expr.push_str(&rng.gen_range(1..=cfg.max_value).to_string());
        }
        if rng.gen_bool(cfg.paren_probability) {
            expr = format!("({expr})");
        }
        expr
    }
}

impl ChallengeStrategy for AdvancedStrategy {
    fn name(&self) -> &'static str {
        "advanced"
    }

    fn generate(&self, rng: &mut dyn RngCore) -> Result<Challenge, SynthError> {
        let bound = i128::from(self.config.upper_bound);
        for attempt in 1..=self.config.max_attempts {
            let expr = self.sample_expression(rng);
            match evaluate(&expr) {
                Ok(v) => match v.to_integer() {
                    Some(n) if (0..bound).contains(&n) => {
                        debug!(attempt, %expr, answer = n, "challenge sample accepted");
                        return Ok(Challenge::new(&expr, n));
                    }
                    _ => trace!(attempt, %expr, value = %v, "challenge sample rejected"),
                },
                Err(e) => trace!(attempt, %expr, error = %e, "challenge sample not evaluable"),
            }
        }
        Err(SynthError::GenerationExhausted {
            attempts: self.config.max_attempts,
        })
    }
}

// ---------------------------------------------------------------------------
// Expert
// ---------------------------------------------------------------------------

/// Addition-only sums. Never resamples: construction requires that the
/// largest possible sum stays below `upper_bound`.
#[derive(Clone, Debug)]
pub struct ExpertStrategy {
    config: SynthConfig,
}

impl ExpertStrategy {
    pub fn new(config: SynthConfig) -> Result<Self, SynthError> {
        config.validate()?;
        let worst = u64::from(config.operand_count_max) * u64::from(config.max_value);
        if worst >= u64::from(config.upper_bound) {
            return Err(SynthError::InvalidConfig(format!(
                "largest sum {worst} is not below upper_bound {}",
                config.upper_bound
            )));
        }
        Ok(Self { config })
    }
}

impl ChallengeStrategy for ExpertStrategy {
    fn name(&self) -> &'static str {
        "expert"
    }

    fn generate(&self, rng: &mut dyn RngCore) -> Result<Challenge, SynthError> {
        let cfg = &self.config;
        let count = rng.gen_range(cfg.operand_count_min..=cfg.operand_count_max);
        let operands: Vec<u32> = (0..count).map(|_| rng.gen_range(1..=cfg.max_value)).collect();
        let sum: i128 = operands.iter().map(|&n| i128::from(n)).sum();
        let expr = operands
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(" + ");
        debug!(%expr, answer = sum, "expert challenge built");
        Ok(Challenge::new(&expr, sum))
    }
}

// ---------------------------------------------------------------------------
// Mode selection
// ---------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeMode {
    #[default]
    Advanced,
    Expert,
}

impl ChallengeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeMode::Advanced => "advanced",
            ChallengeMode::Expert => "expert",
        }
    }

    /// Build the strategy for this mode, validating `config`.
    pub fn strategy(&self, config: SynthConfig) -> Result<Box<dyn ChallengeStrategy>, SynthError> {
        Ok(match self {
            ChallengeMode::Advanced => Box::new(AdvancedStrategy::new(config)?),
            ChallengeMode::Expert => Box::new(ExpertStrategy::new(config)?),
        })
    }
}

impl fmt::Display for ChallengeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChallengeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "advanced" | "fortgeschritten" => Ok(ChallengeMode::Advanced),
            "expert" | "experte" => Ok(ChallengeMode::Expert),
            other => Err(format!("unknown challenge mode '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn advanced_accepts_only_in_range_integers() {
        let s = AdvancedStrategy::new(SynthConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let c = s.generate(&mut rng).unwrap();
            let n: i128 = c.answer.parse().unwrap();
            assert!((0..1000).contains(&n), "answer {n} out of range");
            assert_eq!(evaluate(c.expression()).unwrap().to_integer(), Some(n));
        }
    }

    #[test]
    fn advanced_is_reproducible_for_a_seed() {
        let s = AdvancedStrategy::new(SynthConfig::default()).unwrap();
        let a = s.generate(&mut StdRng::seed_from_u64(42)).unwrap();
        let b = s.generate(&mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unsatisfiable_bound_exhausts_instead_of_spinning() {
        // Every operand is at least 1 and only '+' is allowed, so with two
        // operands the value is >= 2 and can never be below 2.
        let cfg = SynthConfig {
            operators: vec![Operator::Add],
            upper_bound: 2,
            max_attempts: 50,
            ..SynthConfig::default()
        };
        let s = AdvancedStrategy::new(cfg).unwrap();
        let err = s.generate(&mut StdRng::seed_from_u64(1)).unwrap_err();
        assert_eq!(err, SynthError::GenerationExhausted { attempts: 50 });
    }

    #[test]
    fn division_only_config_still_terminates_with_integers() {
        let cfg = SynthConfig {
            operators: vec![Operator::Div],
            ..SynthConfig::default()
        };
        let s = AdvancedStrategy::new(cfg).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let c = s.generate(&mut rng).unwrap();
        assert!(c.expression().contains('/'));
        assert!(c.verify());
    }

    #[test]
    fn expert_builds_plain_sums() {
        let s = ExpertStrategy::new(SynthConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..200 {
            let c = s.generate(&mut rng).unwrap();
            assert!(!c.expression().contains(['-', '*', '/', '(']));
            assert!(c.verify());
        }
    }

    #[test]
    fn expert_rejects_configs_that_could_overflow_the_bound() {
        let cfg = SynthConfig {
            max_value: 500,
            ..SynthConfig::default()
        };
        assert!(matches!(
            ExpertStrategy::new(cfg),
            Err(SynthError::InvalidConfig(_))
        ));
    }

    #[test]
    fn mode_parsing_accepts_level_names() {
        assert_eq!("Experte".parse::<ChallengeMode>(), Ok(ChallengeMode::Expert));
        assert_eq!("advanced".parse::<ChallengeMode>(), Ok(ChallengeMode::Advanced));
        assert!("hard".parse::<ChallengeMode>().is_err());
    }

    #[test]
    fn boxed_strategy_reports_its_name() {
        let s = ChallengeMode::Expert.strategy(SynthConfig::default()).unwrap();
        assert_eq!(s.name(), "expert");
    }
}
