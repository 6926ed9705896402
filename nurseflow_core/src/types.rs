//! Core domain types for NurseFlow.
//!
//! This module defines the fundamental types used throughout the system:
//! - Patients and the medications they own
//! - Frequency policies and their interval resolution
//! - Dose log entries (the immutable administration record)
//! - Due-instants (the alert deduplication key)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Patient
// ============================================================================

/// A patient under care. Owns its medications exclusively: deleting a
/// patient cascades to them.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub room_number: Option<String>,
}

impl Patient {
    pub fn new(name: impl Into<String>, room_number: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            room_number,
        }
    }
}

// ============================================================================
// Frequency policy
// ============================================================================

/// Dosing frequency policy.
///
/// Fixed tiers resolve to a standard hour interval; `Custom` carries its own
/// interval, which must be positive and at most a year to be usable for
/// scheduling.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frequency {
    /// One-time, immediately-due dose. No recurrence.
    Stat,
    /// Twice a day (12h).
    Bd,
    /// Three times a day (8h).
    Tid,
    /// Four times a day (6h).
    Qid,
    /// Once a day (24h).
    Daily,
    /// As needed. Never auto-scheduled.
    Prn,
    /// Recurring at a user-supplied hour interval.
    Custom { interval_hours: i64 },
}

impl Frequency {
    /// Upper bound on a custom interval. Anything beyond a year is a data
    /// entry error, and unbounded values would overflow the duration
    /// arithmetic downstream.
    pub const MAX_CUSTOM_INTERVAL_HOURS: i64 = 24 * 366;

    /// The recurrence interval in hours, if this policy has one.
    ///
    /// `Stat` and `Prn` have no interval: STAT never recurs and PRN is
    /// never scheduled.
    pub fn interval_hours(&self) -> Option<i64> {
        match self {
            Frequency::Stat | Frequency::Prn => None,
            Frequency::Bd => Some(12),
            Frequency::Tid => Some(8),
            Frequency::Qid => Some(6),
            Frequency::Daily => Some(24),
            Frequency::Custom { interval_hours } => Some(*interval_hours),
        }
    }

    /// Whether this policy schedules recurring doses.
    pub fn is_recurring(&self) -> bool {
        !matches!(self, Frequency::Stat | Frequency::Prn)
    }

    /// Validate the policy. A custom interval must be a positive hour count
    /// of at most [`Self::MAX_CUSTOM_INTERVAL_HOURS`].
    pub fn validate(&self) -> crate::Result<()> {
        if let Frequency::Custom { interval_hours } = self {
            if *interval_hours <= 0 {
                return Err(crate::Error::Validation(format!(
                    "custom interval must be a positive hour count, got {}",
                    interval_hours
                )));
            }
            if *interval_hours > Self::MAX_CUSTOM_INTERVAL_HOURS {
                return Err(crate::Error::Validation(format!(
                    "custom interval must be at most {} hours, got {}",
                    Self::MAX_CUSTOM_INTERVAL_HOURS,
                    interval_hours
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Stat => write!(f, "STAT"),
            Frequency::Bd => write!(f, "BD"),
            Frequency::Tid => write!(f, "TID"),
            Frequency::Qid => write!(f, "QID"),
            Frequency::Daily => write!(f, "DAILY"),
            Frequency::Prn => write!(f, "PRN"),
            Frequency::Custom { .. } => write!(f, "CUSTOM"),
        }
    }
}

impl FromStr for Frequency {
    type Err = crate::Error;

    /// Parses `stat`, `bd`, `tid`, `qid`, `daily`, `prn` or `custom:<hours>`.
    fn from_str(s: &str) -> crate::Result<Self> {
        let lower = s.trim().to_lowercase();
        let freq = match lower.as_str() {
            "stat" => Frequency::Stat,
            "bd" => Frequency::Bd,
            "tid" => Frequency::Tid,
            "qid" => Frequency::Qid,
            "daily" => Frequency::Daily,
            "prn" => Frequency::Prn,
            other => {
                let hours = other
                    .strip_prefix("custom:")
                    .and_then(|h| h.parse::<i64>().ok())
                    .ok_or_else(|| {
                        crate::Error::Validation(format!(
                            "unknown frequency '{}' (expected stat, bd, tid, qid, daily, prn or custom:<hours>)",
                            s
                        ))
                    })?;
                Frequency::Custom {
                    interval_hours: hours,
                }
            }
        };
        freq.validate()?;
        Ok(freq)
    }
}

// ============================================================================
// Medication
// ============================================================================

/// A prescribed medication belonging to one patient.
///
/// Scheduling state is the `(frequency, next_due_at, is_completed,
/// last_served_at)` tuple; the schedule engine advances it as doses are
/// logged. `next_due_at` is always `None` for PRN medications and for
/// completed courses.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Medication {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub name: String,
    pub dose: String,
    pub form: Option<String>,
    pub route: String,
    pub frequency: Frequency,
    pub last_served_at: Option<DateTime<Utc>>,
    pub next_due_at: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub notes: Option<String>,
}

// ============================================================================
// Dose log
// ============================================================================

/// Outcome of a logged dose event.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DoseStatus {
    Served,
    Missed,
}

impl fmt::Display for DoseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoseStatus::Served => write!(f, "SERVED"),
            DoseStatus::Missed => write!(f, "MISSED"),
        }
    }
}

/// One administered-or-missed dose event. Immutable once appended:
/// corrections are modelled as new entries, never edits.
///
/// `recorded_at` is the clinically-asserted time of the event, which the
/// user may backdate relative to wall-clock "now".
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DoseLogEntry {
    pub id: Uuid,
    pub medication_id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub status: DoseStatus,
    pub notes: Option<String>,
}

// ============================================================================
// Due-instant (alert dedup key)
// ============================================================================

/// One schedule slot eligible for exactly one alert: a specific medication
/// paired with a specific due time. A new `next_due_at` after a dose is
/// served or missed yields a distinct instant for the same medication.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DueInstant {
    pub medication_id: Uuid,
    pub due_at: DateTime<Utc>,
}
