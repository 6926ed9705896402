//! Schedule engine: pure transitions over a medication's scheduling state.
//!
//! Every operation here is a total function from `(old state, event)` to
//! `(new state, log entry)`: nothing fails once inputs have passed
//! validation, and nothing is mutated in place. The scheduling state is the
//! `(frequency, next_due_at, is_completed, last_served_at)` tuple on
//! [`Medication`].
//!
//! Policy semantics:
//! - **STAT**: due immediately on creation; any logged event (served or
//!   missed) completes the course.
//! - **PRN**: never scheduled; logging records history only.
//! - **Recurring** (fixed tiers and custom): no reminder before the first
//!   logged dose. Serving at asserted time T re-anchors to T + interval.
//!   Missing skips exactly one slot from the *original* due time when one
//!   exists, otherwise anchors to the asserted miss time.

use crate::{DoseLogEntry, DoseStatus, Frequency, Medication, Result};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Result of logging a dose: the advanced medication plus exactly one new
/// log entry carrying the same status and asserted timestamp.
#[derive(Clone, Debug)]
pub struct DoseTransition {
    pub medication: Medication,
    pub entry: DoseLogEntry,
}

/// The due time a medication starts with when first prescribed.
///
/// STAT doses are due the moment they are created; every other policy waits
/// for its first logged dose (PRN waits forever).
pub fn initial_next_due(frequency: Frequency, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match frequency {
        Frequency::Stat => Some(now),
        _ => None,
    }
}

/// Advance a medication's schedule for one dose event asserted at `at`.
///
/// The asserted timestamp is clinical time, not wall-clock time: a nurse may
/// backdate a serve or miss, and the arithmetic below uses the asserted
/// value, never "now".
pub fn record_dose(
    med: &Medication,
    status: DoseStatus,
    at: DateTime<Utc>,
    notes: Option<String>,
) -> DoseTransition {
    let mut updated = med.clone();

    if let Some(hours) = med.frequency.interval_hours() {
        let interval = Duration::hours(hours);
        updated.next_due_at = match status {
            // Served (even late or early): the next dose is one interval
            // from this serve time.
            DoseStatus::Served => Some(at + interval),
            // Missed: skip the current slot, anchored to the schedule. If no
            // slot existed yet, anchor to the asserted miss time instead.
            DoseStatus::Missed => Some(med.next_due_at.unwrap_or(at) + interval),
        };
    } else if med.frequency == Frequency::Stat {
        // One logged event, served or missed, finishes a STAT course.
        updated.next_due_at = None;
        updated.is_completed = true;
    }
    // PRN: scheduling state untouched.

    if status == DoseStatus::Served {
        updated.last_served_at = Some(at);
    }

    let entry = DoseLogEntry {
        id: Uuid::new_v4(),
        medication_id: med.id,
        recorded_at: at,
        status,
        notes,
    };

    DoseTransition {
        medication: updated,
        entry,
    }
}

/// Requested field changes for a medication edit. `None` leaves a field as
/// it was.
#[derive(Clone, Debug, Default)]
pub struct MedicationEdit {
    pub name: Option<String>,
    pub dose: Option<String>,
    pub form: Option<String>,
    pub route: Option<String>,
    pub frequency: Option<Frequency>,
    pub notes: Option<String>,
}

/// Apply an edit, re-anchoring the schedule where the policy changed.
///
/// - Switching to STAT makes the medication immediately due, overriding any
///   prior schedule.
/// - Switching to PRN clears the pending due time.
/// - Changing the interval of a recurring policy after a prior serve
///   re-anchors the due time to `last_served_at + new interval`, without
///   requiring a new dose event. With no prior serve, the pending due time
///   is cleared and the medication waits for its first administration.
pub fn apply_edit(
    med: &Medication,
    edit: &MedicationEdit,
    now: DateTime<Utc>,
) -> Result<Medication> {
    if let Some(freq) = edit.frequency {
        freq.validate()?;
    }

    let mut updated = med.clone();

    if let Some(ref name) = edit.name {
        updated.name = name.clone();
    }
    if let Some(ref dose) = edit.dose {
        updated.dose = dose.clone();
    }
    if let Some(ref form) = edit.form {
        updated.form = Some(form.clone());
    }
    if let Some(ref route) = edit.route {
        updated.route = route.clone();
    }
    if let Some(ref notes) = edit.notes {
        updated.notes = Some(notes.clone());
    }

    if let Some(freq) = edit.frequency {
        updated.frequency = freq;

        if freq == Frequency::Stat && med.frequency != Frequency::Stat {
            updated.next_due_at = Some(now);
        } else if freq == Frequency::Prn {
            updated.next_due_at = None;
        } else if freq.interval_hours() != med.frequency.interval_hours() {
            updated.next_due_at = match (freq.interval_hours(), med.last_served_at) {
                (Some(hours), Some(last_served)) => Some(last_served + Duration::hours(hours)),
                // Never served: back to waiting for the first administration,
                // even if a missed dose had seeded a due time.
                _ => None,
            };
        }
    }

    // A completed course never carries a pending reminder.
    if updated.is_completed {
        updated.next_due_at = None;
    }

    Ok(updated)
}

/// Flip completion state. Completing clears the pending reminder; resuming
/// makes the medication immediately eligible for its next dose (except PRN,
/// which is never scheduled).
pub fn toggle_completed(med: &Medication, now: DateTime<Utc>) -> Medication {
    let mut updated = med.clone();
    updated.is_completed = !med.is_completed;
    updated.next_due_at = if updated.is_completed || med.frequency == Frequency::Prn {
        None
    } else {
        Some(now)
    };
    updated
}
