//! Retention cutoff computation.

use chrono::{Duration, NaiveDateTime};
use thiserror::Error;

/// Cutoff for one run. Data strictly older than `cutoff_timestamp` is expired.
///
/// Computed once per run so every partition and directory is compared
/// against the same instant. All timestamps are UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionCutoff {
    /// The instant the run started.
    pub now: NaiveDateTime,

    /// `now` minus the retention window.
    pub cutoff_timestamp: NaiveDateTime,

    /// Retention window in days.
    pub retention_days: u32,
}

impl RetentionCutoff {
    /// Cutoff `days` days before `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if `days` is zero or the subtraction leaves the
    /// representable date range.
    pub fn from_days(days: u32, now: NaiveDateTime) -> Result<Self, RetentionPolicyError> {
        if days == 0 {
            return Err(RetentionPolicyError::ZeroRetention);
        }

        let cutoff_timestamp = Duration::try_days(i64::from(days))
            .and_then(|window| now.checked_sub_signed(window))
            .ok_or(RetentionPolicyError::CutoffUnderflow { days, now })?;

        Ok(Self {
            now,
            cutoff_timestamp,
            retention_days: days,
        })
    }

    /// Check if a partition timestamp is expired.
    pub fn is_expired(&self, timestamp: NaiveDateTime) -> bool {
        timestamp < self.cutoff_timestamp
    }

    /// Human-readable representation for logging.
    pub fn display(&self) -> String {
        format!(
            "cutoff={}, period={}d, now={}",
            self.cutoff_timestamp.format("%Y-%m-%dT%H:%M:%S"),
            self.retention_days,
            self.now.format("%Y-%m-%dT%H:%M:%S"),
        )
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RetentionPolicyError {
    #[error("Retention window must be at least one day")]
    ZeroRetention,

    #[error("Cutoff timestamp underflow: {now} minus {days} days")]
    CutoffUnderflow { days: u32, now: NaiveDateTime },
}
