//! Typed view of the merged configuration tree.

use anyhow::{anyhow, Context, Result};
use arena_challenge::{ChallengeMode, SynthConfig};
use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Unknown top-level sections are tolerated here and surfaced by
/// `LoadedConfig::unused_keys`; unknown fields inside a section are errors.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub challenge: ChallengeSection,
    pub schedule: ScheduleSection,
    pub daemon: DaemonSection,
    pub store: StoreSection,
}

impl ArenaConfig {
    pub fn validate(&self) -> Result<()> {
        self.challenge
            .synth
            .validate()
            .map_err(|e| anyhow!("challenge.synth: {e}"))?;
        // Builds the strategy so mode-specific checks (expert bound) run now
        // rather than at the first scheduled tick.
        self.challenge
            .mode
            .strategy(self.challenge.synth.clone())
            .map_err(|e| anyhow!("challenge.mode={}: {e}", self.challenge.mode))?;
        self.schedule.fire_time()?;
        self.schedule.timezone()?;
        if self.store.backend == StoreBackend::Postgres && self.store.database_url_env.trim().is_empty() {
            anyhow::bail!("store.database_url_env must name an env var when backend=postgres");
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChallengeSection {
    pub mode: ChallengeMode,
    pub synth: SynthConfig,
}

/// When the daily challenge is produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleSection {
    /// Wall-clock time of day, `HH:MM`.
    pub at: String,
    /// IANA zone the wall clock and the date key are read in.
    pub timezone: String,
    /// Run one upsert immediately at startup in addition to the schedule.
    pub run_on_start: bool,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            at: "00:00".to_string(),
            timezone: "Europe/Berlin".to_string(),
            run_on_start: false,
        }
    }
}

impl ScheduleSection {
    pub fn fire_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(self.at.trim(), "%H:%M")
            .with_context(|| format!("schedule.at must be HH:MM, got '{}'", self.at))
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .trim()
            .parse::<Tz>()
            .map_err(|e| anyhow!("schedule.timezone '{}': {e}", self.timezone))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonSection {
    /// Listen address; the `ARENA_DAEMON_ADDR` env var wins over this.
    pub addr: String,
    /// Capacity of the in-process event bus.
    pub bus_capacity: usize,
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8899".to_string(),
            bus_capacity: 1024,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    pub backend: StoreBackend,
    /// NAME of the env var holding the database URL, never the URL itself.
    pub database_url_env: String,
    pub max_connections: u32,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            database_url_env: "ARENA_DATABASE_URL".to_string(),
            max_connections: 10,
        }
    }
}
