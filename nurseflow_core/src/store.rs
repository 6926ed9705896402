//! The care store: patients and medications, with persistence.
//!
//! All mutation flows through the operations here against one explicit
//! in-memory snapshot; there is no ambient shared state. Each operation is
//! a synchronous, non-interruptible step, so no caller ever observes a
//! partially-updated store. Dose transitions append to the dose log through
//! a [`LogSink`] before the medication state is committed, keeping the two
//! as one logical action.
//!
//! Persistence is wholesale: the snapshot is loaded once at startup and
//! written atomically (temp file + rename, under an exclusive lock) after
//! mutations. A missing or corrupt snapshot falls back to the empty store.

use crate::doselog::LogSink;
use crate::schedule::{self, MedicationEdit};
use crate::{DoseLogEntry, DoseStatus, Error, Frequency, Medication, Patient, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Fields required to prescribe a new medication.
#[derive(Clone, Debug)]
pub struct NewMedication {
    pub patient_id: Uuid,
    pub name: String,
    pub dose: String,
    pub form: Option<String>,
    pub route: String,
    pub frequency: Frequency,
    pub notes: Option<String>,
}

/// In-memory snapshot of patients and their medications, keyed by id.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Store {
    pub patients: HashMap<Uuid, Patient>,
    pub medications: HashMap<Uuid, Medication>,
}

impl Store {
    // ------------------------------------------------------------------
    // Patient operations
    // ------------------------------------------------------------------

    /// Register a patient. The name is required.
    pub fn add_patient(
        &mut self,
        name: impl Into<String>,
        room_number: Option<String>,
    ) -> Result<Patient> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::Validation("patient name is required".into()));
        }
        let patient = Patient::new(name, room_number);
        self.patients.insert(patient.id, patient.clone());
        Ok(patient)
    }

    /// Update a patient's details. Returns `None` if the id is unknown.
    pub fn update_patient(
        &mut self,
        id: Uuid,
        name: Option<String>,
        room_number: Option<String>,
    ) -> Option<Patient> {
        let patient = match self.patients.get_mut(&id) {
            Some(p) => p,
            None => {
                tracing::warn!("Ignoring update for unknown patient {}", id);
                return None;
            }
        };
        if let Some(name) = name {
            patient.name = name;
        }
        if let Some(room) = room_number {
            patient.room_number = Some(room);
        }
        Some(patient.clone())
    }

    /// Remove a patient, cascading to all of their medications.
    ///
    /// Dose log entries for the removed medications stay in the log file
    /// but become unreachable through the patient. Returns the removed
    /// patient and the number of medications deleted with them.
    pub fn remove_patient(&mut self, id: Uuid) -> Option<(Patient, usize)> {
        let patient = self.patients.remove(&id)?;
        let before = self.medications.len();
        self.medications.retain(|_, m| m.patient_id != id);
        let removed = before - self.medications.len();
        tracing::info!(
            "Removed patient {} and {} medication(s)",
            patient.name,
            removed
        );
        Some((patient, removed))
    }

    // ------------------------------------------------------------------
    // Medication operations
    // ------------------------------------------------------------------

    /// Prescribe a medication for an existing patient.
    ///
    /// STAT medications are due immediately; every other policy waits for
    /// its first logged dose.
    pub fn add_medication(&mut self, new: NewMedication, now: DateTime<Utc>) -> Result<Medication> {
        if new.name.trim().is_empty() || new.dose.trim().is_empty() || new.route.trim().is_empty() {
            return Err(Error::Validation(
                "medication name, dose and route are required".into(),
            ));
        }
        new.frequency.validate()?;
        if !self.patients.contains_key(&new.patient_id) {
            return Err(Error::Validation(format!(
                "no patient with id {}",
                new.patient_id
            )));
        }

        let medication = Medication {
            id: Uuid::new_v4(),
            patient_id: new.patient_id,
            name: new.name,
            dose: new.dose,
            form: new.form,
            route: new.route,
            frequency: new.frequency,
            last_served_at: None,
            next_due_at: schedule::initial_next_due(new.frequency, now),
            is_completed: false,
            notes: new.notes,
        };
        self.medications.insert(medication.id, medication.clone());
        Ok(medication)
    }

    /// Edit a medication, re-anchoring its schedule where the policy
    /// changed. Unknown ids are a silent no-op (`Ok(None)`).
    pub fn update_medication(
        &mut self,
        id: Uuid,
        edit: &MedicationEdit,
        now: DateTime<Utc>,
    ) -> Result<Option<Medication>> {
        let med = match self.medications.get(&id) {
            Some(m) => m,
            None => {
                tracing::warn!("Ignoring edit for unknown medication {}", id);
                return Ok(None);
            }
        };
        let updated = schedule::apply_edit(med, edit, now)?;
        self.medications.insert(id, updated.clone());
        Ok(Some(updated))
    }

    /// Remove a medication outright. Returns the removed record, if any.
    pub fn remove_medication(&mut self, id: Uuid) -> Option<Medication> {
        self.medications.remove(&id)
    }

    /// Flip a medication's completion state. Unknown ids are a no-op.
    pub fn toggle_completed(&mut self, id: Uuid, now: DateTime<Utc>) -> Option<Medication> {
        let med = match self.medications.get(&id) {
            Some(m) => m,
            None => {
                tracing::warn!("Ignoring completion toggle for unknown medication {}", id);
                return None;
            }
        };
        let updated = schedule::toggle_completed(med, now);
        self.medications.insert(id, updated.clone());
        Some(updated)
    }

    // ------------------------------------------------------------------
    // Dose transitions
    // ------------------------------------------------------------------

    /// Log a dose event and advance the schedule as one logical action.
    ///
    /// The entry is appended to the sink before the medication state is
    /// committed, so a sink failure leaves the schedule untouched. An
    /// unknown medication id is a silent no-op (`Ok(None)`), and so is a
    /// completed course: a finished medication never re-enters the
    /// schedule through a logged dose.
    pub fn record_dose(
        &mut self,
        id: Uuid,
        status: DoseStatus,
        at: DateTime<Utc>,
        notes: Option<String>,
        sink: &mut dyn LogSink,
    ) -> Result<Option<DoseLogEntry>> {
        let med = match self.medications.get(&id) {
            Some(m) if m.is_completed => {
                tracing::warn!("Ignoring {} event for completed medication {}", status, id);
                return Ok(None);
            }
            Some(m) => m,
            None => {
                tracing::warn!("Ignoring {} event for unknown medication {}", status, id);
                return Ok(None);
            }
        };

        let transition = schedule::record_dose(med, status, at, notes);
        sink.append(&transition.entry)?;
        self.medications.insert(id, transition.medication);
        Ok(Some(transition.entry))
    }

    /// Serve every selected medication at the shared instant.
    ///
    /// Each member transitions independently; a failure on one does not
    /// block the others. Returns the number served.
    pub fn bulk_serve(
        &mut self,
        ids: &[Uuid],
        now: DateTime<Utc>,
        sink: &mut dyn LogSink,
    ) -> usize {
        let mut served = 0;
        for &id in ids {
            match self.record_dose(id, DoseStatus::Served, now, Some("Batch served".into()), sink)
            {
                Ok(Some(_)) => served += 1,
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Batch serve failed for medication {}: {}", id, e);
                }
            }
        }
        served
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn patient(&self, id: Uuid) -> Option<&Patient> {
        self.patients.get(&id)
    }

    pub fn medication(&self, id: Uuid) -> Option<&Medication> {
        self.medications.get(&id)
    }

    /// Medications for one patient, stable-ordered by name.
    pub fn medications_for_patient(&self, patient_id: Uuid) -> Vec<&Medication> {
        let mut meds: Vec<_> = self
            .medications
            .values()
            .filter(|m| m.patient_id == patient_id)
            .collect();
        meds.sort_by(|a, b| a.name.cmp(&b.name));
        meds
    }

    /// Active, schedulable medications with a pending due time, soonest
    /// first. This is the dashboard view the alert evaluator also walks.
    pub fn upcoming_doses(&self) -> Vec<&Medication> {
        let mut meds: Vec<_> = self
            .medications
            .values()
            .filter(|m| m.next_due_at.is_some() && m.frequency != Frequency::Prn && !m.is_completed)
            .collect();
        meds.sort_by_key(|m| m.next_due_at);
        meds
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Load the snapshot from a file with shared locking.
    ///
    /// Returns the empty store if the file doesn't exist. If the file is
    /// corrupted, logs a warning and returns the empty store rather than
    /// failing startup.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No store file found, starting empty");
            return Ok(Self::default());
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Unable to open store {:?}: {}. Starting empty.", path, e);
                return Ok(Self::default());
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!("Unable to lock store {:?}: {}. Starting empty.", path, e);
            return Ok(Self::default());
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!("Failed to read store {:?}: {}. Starting empty.", path, e);
            return Ok(Self::default());
        }

        file.unlock()?;

        match serde_json::from_str::<Store>(&contents) {
            Ok(store) => {
                tracing::debug!(
                    "Loaded store: {} patient(s), {} medication(s)",
                    store.patients.len(),
                    store.medications.len()
                );
                Ok(store)
            }
            Err(e) => {
                tracing::warn!("Failed to parse store {:?}: {}. Starting empty.", path, e);
                Ok(Self::default())
            }
        }
    }

    /// Save the whole snapshot atomically: write to a temp file in the same
    /// directory, sync, then rename over the original.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let temp = NamedTempFile::new_in(path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "store path missing parent")
        })?)?;

        // Exclusive lock on the temp file to serialize concurrent writers
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved store to {:?}", path);
        Ok(())
    }
}
