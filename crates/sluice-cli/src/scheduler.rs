//! Recurring pipeline runs.
//!
//! A [`Scheduler`] sleeps until the next due time of its [`Cadence`], runs
//! the job on the blocking pool and repeats until its cancellation token
//! fires. A run that is already executing always finishes.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveTime, TimeDelta, TimeZone};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Longest accepted `--every` interval.
const MAX_INTERVAL: Duration = Duration::from_secs(366 * 24 * 60 * 60);

/// When runs are due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Once a day at a local wall-clock time.
    Daily(NaiveTime),
    /// At a fixed interval, starting one interval from now.
    Every(Duration),
}

impl Cadence {
    /// Parse `HH:MM` or `HH:MM:SS`.
    pub fn parse_daily(s: &str) -> Result<Self, String> {
        let s = s.trim();
        NaiveTime::parse_from_str(s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .map(Cadence::Daily)
            .map_err(|_| format!("Invalid time of day: {}. Use HH:MM.", s))
    }

    /// Parse an interval such as `45s`, `30m`, `1h` or `2d`.
    pub fn parse_every(s: &str) -> Result<Self, String> {
        let s = s.trim();
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (digits, unit) = s.split_at(split);
        let amount: u64 = digits
            .parse()
            .map_err(|_| format!("Invalid interval: {}. Use e.g. 30m or 1h.", s))?;
        let unit_secs = match unit {
            "s" => 1,
            "m" => 60,
            "h" => 60 * 60,
            "d" => 24 * 60 * 60,
            _ => return Err(format!("Unknown interval unit in {}. Use s, m, h or d.", s)),
        };
        let interval = Duration::from_secs(amount.saturating_mul(unit_secs));
        if interval.is_zero() || interval > MAX_INTERVAL {
            return Err(format!("Interval out of range: {}", s));
        }
        Ok(Cadence::Every(interval))
    }

    /// First due time strictly after `now`.
    pub fn next_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        match self {
            Cadence::Every(interval) => {
                now.clone() + TimeDelta::from_std(*interval).unwrap_or(TimeDelta::days(1))
            }
            Cadence::Daily(time) => {
                let today = now.date_naive();
                // Skips days where the time falls in a DST gap.
                (0..=2)
                    .filter_map(|offset| today.checked_add_days(chrono::Days::new(offset)))
                    .filter_map(|day| {
                        now.timezone()
                            .from_local_datetime(&day.and_time(*time))
                            .earliest()
                    })
                    .find(|candidate| candidate > now)
                    .unwrap_or_else(|| now.clone() + TimeDelta::days(1))
            }
        }
    }
}

impl FromStr for Cadence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains(':') {
            Self::parse_daily(s)
        } else {
            Self::parse_every(s)
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cadence::Daily(time) => write!(f, "daily at {}", time.format("%H:%M:%S")),
            Cadence::Every(interval) => write!(f, "every {}s", interval.as_secs()),
        }
    }
}

pub struct Scheduler {
    cadence: Cadence,
}

impl Scheduler {
    pub fn new(cadence: Cadence) -> Self {
        Self { cadence }
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// Run `job` on every due time until `cancel` fires.
    ///
    /// Failed and panicking runs are logged and the schedule continues.
    /// Returns the number of runs started.
    pub async fn run<F, E>(&self, job: F, cancel: CancellationToken) -> usize
    where
        F: Fn() -> Result<(), E> + Send + Sync + 'static,
        E: fmt::Display + Send + 'static,
    {
        let job = Arc::new(job);
        let mut runs = 0;

        loop {
            let now = Local::now();
            let next = self.cadence.next_after(&now);
            let delay = (next - now).to_std().unwrap_or(Duration::ZERO);
            info!(
                cadence = %self.cadence,
                next_run = %next.format("%Y-%m-%d %H:%M:%S"),
                "Waiting for next run"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = sleep_until(Instant::now() + delay) => {}
            }

            runs += 1;
            let job = Arc::clone(&job);
            match tokio::task::spawn_blocking(move || job()).await {
                Ok(Ok(())) => info!(run = runs, "Scheduled run complete"),
                Ok(Err(e)) => error!(run = runs, error = %e, "Scheduled run failed"),
                Err(e) => error!(run = runs, error = %e, "Scheduled run panicked"),
            }

            if cancel.is_cancelled() {
                break;
            }
        }

        info!(runs, "Scheduler stopped");
        runs
    }
}
