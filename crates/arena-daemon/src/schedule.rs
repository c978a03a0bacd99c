//! Daily trigger computed on a wall clock in a fixed IANA zone.

use std::sync::Arc;

use anyhow::Result;
use arena_config::ScheduleSection;
use arena_schemas::DateKey;
use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::state::AppState;
use crate::upsert;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    pub at: NaiveTime,
    pub tz: Tz,
}

impl Default for DailySchedule {
    /// Midnight, Central European Time.
    fn default() -> Self {
        Self {
            at: NaiveTime::default(),
            tz: chrono_tz::Europe::Berlin,
        }
    }
}

impl DailySchedule {
    pub fn new(at: NaiveTime, tz: Tz) -> Self {
        Self { at, tz }
    }

    pub fn from_config(section: &ScheduleSection) -> Result<Self> {
        Ok(Self::new(section.fire_time()?, section.timezone()?))
    }

    /// Calendar date of `now` in the schedule's zone.
    pub fn date_key_for(&self, now: DateTime<Utc>) -> DateKey {
        DateKey::new(now.with_timezone(&self.tz).date_naive())
    }

    /// First fire instant strictly after `now`.
    ///
    /// A wall time repeated by a DST fall-back fires on its first occurrence;
    /// a wall time skipped by spring-forward fires an hour later.
    pub fn next_fire_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let mut date = now.with_timezone(&self.tz).date_naive();
        for _ in 0..3 {
            if let Some(t) = self.resolve(date.and_time(self.at)) {
                if t > now {
                    return t;
                }
            }
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }
        now + Duration::days(1)
    }

    fn resolve(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self.tz.from_local_datetime(&local) {
            LocalResult::Single(t) => Some(t.with_timezone(&Utc)),
            LocalResult::Ambiguous(first, _) => Some(first.with_timezone(&Utc)),
            LocalResult::None => match self.tz.from_local_datetime(&(local + Duration::hours(1))) {
                LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => Some(t.with_timezone(&Utc)),
                LocalResult::None => None,
            },
        }
    }
}

/// Run the challenge upsert at every fire instant, forever.
///
/// Failures are logged and the loop waits for the next day; a missed day is
/// not retried.
pub fn spawn_daily(st: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let next = st.schedule.next_fire_after(now);
            let wait = (next - now).to_std().unwrap_or_default();
            info!(next_fire = %next, tz = %st.schedule.tz, "daily challenge scheduled");
            tokio::time::sleep(wait).await;

            let key = st.schedule.date_key_for(next);
            if let Err(e) = upsert::run_daily(&st, key).await {
                error!(date_key = %key, error = %e, "daily challenge upsert failed");
            }
        }
    })
}
