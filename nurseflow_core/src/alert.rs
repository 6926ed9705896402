//! Alert evaluation for due doses.
//!
//! On each tick the evaluator walks the store and decides which active,
//! schedulable medications with a past-due time deserve one external
//! notification. Deduplication is per [`DueInstant`]: the exact
//! `(medication, next_due_at)` pair, so a re-anchored schedule yields a new
//! alertable instant for the same medication. The evaluator is read-only
//! over the store and idempotent across ticks.

use crate::{DueInstant, Frequency, Result, Store};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::time::Duration as StdDuration;

/// Recommended tick period for the evaluation loop.
pub const EVALUATION_PERIOD: StdDuration = StdDuration::from_secs(30);

/// Doses older than this are silently skipped, so reopening after a long
/// idle period does not produce a burst of stale alerts.
pub const DEFAULT_WINDOW_HOURS: i64 = 24;

/// Label used when the owning patient cannot be resolved.
const UNKNOWN_PATIENT: &str = "Unknown Patient";

/// External notification dispatch consumed by the evaluator.
///
/// Implementations are expected to fail with an error on platform
/// rejection; the evaluator logs the failure and retries on a later tick.
pub trait Notifier {
    fn notify(&mut self, title: &str, body: &str, dedupe_tag: &str) -> Result<()>;
}

/// Tracks which due-instants have already fired for the lifetime of the
/// process.
pub struct AlertEvaluator {
    window: Duration,
    fired: HashSet<DueInstant>,
}

impl Default for AlertEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertEvaluator {
    pub fn new() -> Self {
        Self::with_window_hours(DEFAULT_WINDOW_HOURS)
    }

    pub fn with_window_hours(hours: i64) -> Self {
        Self {
            window: Duration::hours(hours),
            fired: HashSet::new(),
        }
    }

    /// Evaluate one tick: fire at most one notification per eligible
    /// due-instant. Returns the number of notifications dispatched.
    ///
    /// A dose is eligible when its due time is in the past by less than the
    /// stale window. A notify failure does not mark the instant as fired,
    /// so it is retried on a subsequent tick while still inside the window.
    pub fn evaluate<N: Notifier>(
        &mut self,
        store: &Store,
        now: DateTime<Utc>,
        notifier: &mut N,
    ) -> usize {
        let mut dispatched = 0;

        for med in store.medications.values() {
            if med.frequency == Frequency::Prn || med.is_completed {
                continue;
            }
            let due_at = match med.next_due_at {
                Some(d) => d,
                None => continue,
            };
            if due_at > now {
                continue;
            }
            let age = now - due_at;
            if age >= self.window {
                continue;
            }

            let key = DueInstant {
                medication_id: med.id,
                due_at,
            };
            if self.fired.contains(&key) {
                continue;
            }

            let patient_name = store
                .patient(med.patient_id)
                .map(|p| p.name.as_str())
                .unwrap_or(UNKNOWN_PATIENT);

            let title = format!("Medication Due: {}", med.name);
            let body = format!(
                "{} - {} {}\nDue at {}",
                patient_name,
                med.dose,
                med.route,
                due_at.to_rfc3339()
            );
            let tag = format!("{}_{}", med.id, due_at.timestamp_millis());

            match notifier.notify(&title, &body, &tag) {
                Ok(()) => {
                    self.fired.insert(key);
                    dispatched += 1;
                    tracing::info!("Alert fired for medication {} due {}", med.name, due_at);
                }
                Err(e) => {
                    // Not marked as fired: eligible again next tick.
                    tracing::warn!(
                        "Notification failed for medication {}: {}. Will retry.",
                        med.name,
                        e
                    );
                }
            }
        }

        dispatched
    }
}
