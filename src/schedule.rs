//! Report schedule matching.
//!
//! A [`ReportSchedule`] describes when a connector's report fires: a time of
//! day in UTC plus a daily, weekly or monthly recurrence. [`ReportSchedule::is_due`]
//! takes the current instant as a parameter so callers (and tests) control
//! the clock; the evaluation loop lives in the scheduler, not here.
//!
//! Matching is minute-exact: an invocation that lands outside the scheduled
//! minute misses that occurrence. There is no catch-up, which keeps the
//! matcher stateless and makes restarts safe against duplicate sends.

use chrono::{DateTime, Datelike, Timelike, Utc};
use thiserror::Error;

use crate::models::connector;

/// Recurrence class of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "daily" => Some(Frequency::Daily),
            "weekly" => Some(Frequency::Weekly),
            "monthly" => Some(Frequency::Monthly),
            _ => None,
        }
    }
}

/// A validated delivery schedule in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSchedule {
    pub frequency: Frequency,
    pub hour: u32,
    pub minute: u32,
    /// 0 = Sunday .. 6 = Saturday; present iff weekly
    pub day_of_week: Option<u32>,
    /// 1..=28; present iff monthly (capped to keep every month unambiguous)
    pub day_of_month: Option<u32>,
}

/// Errors produced when building a schedule from stored fields.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("unknown frequency: {0}")]
    UnknownFrequency(String),
    #[error("invalid time of day: {0}")]
    InvalidTime(String),
    #[error("day_of_week must be 0..=6, got {0}")]
    InvalidDayOfWeek(i64),
    #[error("day_of_week is required for weekly schedules")]
    MissingDayOfWeek,
    #[error("day_of_month must be 1..=28, got {0}")]
    InvalidDayOfMonth(i64),
    #[error("day_of_month is required for monthly schedules")]
    MissingDayOfMonth,
}

impl ReportSchedule {
    /// Build a schedule from its stored representation, enforcing the
    /// frequency-specific field invariants.
    pub fn new(
        frequency: Frequency,
        time: &str,
        day_of_week: Option<i64>,
        day_of_month: Option<i64>,
    ) -> Result<Self, ScheduleError> {
        let (hour, minute) = parse_time(time)?;

        let day_of_week = match (frequency, day_of_week) {
            (Frequency::Weekly, Some(d)) if (0..=6).contains(&d) => Some(d as u32),
            (Frequency::Weekly, Some(d)) => return Err(ScheduleError::InvalidDayOfWeek(d)),
            (Frequency::Weekly, None) => return Err(ScheduleError::MissingDayOfWeek),
            _ => None,
        };

        let day_of_month = match (frequency, day_of_month) {
            (Frequency::Monthly, Some(d)) if (1..=28).contains(&d) => Some(d as u32),
            (Frequency::Monthly, Some(d)) => return Err(ScheduleError::InvalidDayOfMonth(d)),
            (Frequency::Monthly, None) => return Err(ScheduleError::MissingDayOfMonth),
            _ => None,
        };

        Ok(Self {
            frequency,
            hour,
            minute,
            day_of_week,
            day_of_month,
        })
    }

    /// Build a schedule from a stored connector row.
    pub fn from_connector(model: &connector::Model) -> Result<Self, ScheduleError> {
        let frequency = Frequency::parse(&model.frequency)
            .ok_or_else(|| ScheduleError::UnknownFrequency(model.frequency.clone()))?;
        Self::new(
            frequency,
            &model.send_time,
            model.day_of_week.map(i64::from),
            model.day_of_month.map(i64::from),
        )
    }

    /// Whether the schedule fires at `now`, compared at minute granularity.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if now.hour() != self.hour || now.minute() != self.minute {
            return false;
        }

        match self.frequency {
            Frequency::Daily => true,
            // num_days_from_sunday: Sunday = 0 .. Saturday = 6
            Frequency::Weekly => Some(now.weekday().num_days_from_sunday()) == self.day_of_week,
            Frequency::Monthly => Some(now.day()) == self.day_of_month,
        }
    }

    /// The occurrence timestamp for a matching instant: `now` truncated to
    /// the whole minute. This value keys the history ledger.
    pub fn occurrence_for(now: DateTime<Utc>) -> DateTime<Utc> {
        now.with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(now)
    }
}

/// Parse "HH:MM" into hour and minute, validating ranges.
fn parse_time(value: &str) -> Result<(u32, u32), ScheduleError> {
    let invalid = || ScheduleError::InvalidTime(value.to_string());

    let (h, m) = value.split_once(':').ok_or_else(invalid)?;
    let hour: u32 = h.parse().map_err(|_| invalid())?;
    let minute: u32 = m.parse().map_err(|_| invalid())?;

    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok((hour, minute))
}
