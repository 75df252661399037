// src/trigger.rs

//! Calendar-based run trigger.
//!
//! Each tick creates a fresh run; ticks land on calendar boundaries (UTC
//! midnight for daily, top of the hour for hourly). Because the next tick is
//! always computed from the current wall clock, intervals missed while a run
//! was executing, or while the process was down, are skipped rather than
//! caught up.

use chrono::{DateTime, Days, NaiveTime, Timelike, Utc};

use crate::config::model::ScheduleInterval;

/// The first calendar boundary strictly after `after`.
pub fn next_tick(after: DateTime<Utc>, interval: ScheduleInterval) -> DateTime<Utc> {
    match interval {
        ScheduleInterval::Daily => {
            let next_day = after.date_naive() + Days::new(1);
            next_day.and_time(NaiveTime::MIN).and_utc()
        }
        ScheduleInterval::Hourly => {
            let this_hour = after
                .date_naive()
                .and_hms_opt(after.hour(), 0, 0)
                .unwrap_or_else(|| after.naive_utc());
            (this_hour + chrono::Duration::hours(1)).and_utc()
        }
    }
}

/// Sleep until the given wall-clock instant. Returns immediately if it is
/// already in the past.
pub async fn wait_until(instant: DateTime<Utc>) {
    let now = Utc::now();
    if let Ok(remaining) = (instant - now).to_std() {
        tokio::time::sleep(remaining).await;
    }
}
