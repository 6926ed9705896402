//! CSV export of the care roster.
//!
//! One row per (patient, medication) pair in a fixed column order. A
//! patient with no medications still emits one row with the medication
//! columns left empty, so the roster itself is never lost from the export.

use crate::{Medication, Patient, Result, Store};
use std::fs::File;
use std::io;
use std::path::Path;

/// A row in the CSV output. Column order is the wire contract.
#[derive(Debug, serde::Serialize)]
struct ExportRow {
    #[serde(rename = "Patient Name")]
    patient_name: String,
    #[serde(rename = "Room Number")]
    room_number: String,
    #[serde(rename = "Medication Name")]
    medication_name: String,
    #[serde(rename = "Dose")]
    dose: String,
    #[serde(rename = "Form")]
    form: String,
    #[serde(rename = "Route")]
    route: String,
    #[serde(rename = "Frequency")]
    frequency: String,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "Last Served")]
    last_served: String,
    #[serde(rename = "Next Due")]
    next_due: String,
    #[serde(rename = "Notes")]
    notes: String,
}

impl ExportRow {
    fn patient_only(patient: &Patient) -> Self {
        ExportRow {
            patient_name: patient.name.clone(),
            room_number: patient.room_number.clone().unwrap_or_default(),
            medication_name: String::new(),
            dose: String::new(),
            form: String::new(),
            route: String::new(),
            frequency: String::new(),
            status: String::new(),
            last_served: String::new(),
            next_due: String::new(),
            notes: String::new(),
        }
    }

    fn for_medication(patient: &Patient, med: &Medication) -> Self {
        ExportRow {
            patient_name: patient.name.clone(),
            room_number: patient.room_number.clone().unwrap_or_default(),
            medication_name: med.name.clone(),
            dose: med.dose.clone(),
            form: med.form.clone().unwrap_or_default(),
            route: med.route.clone(),
            frequency: med.frequency.to_string(),
            status: if med.is_completed {
                "COMPLETED".into()
            } else {
                "ACTIVE".into()
            },
            last_served: med
                .last_served_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
            next_due: med.next_due_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            notes: med.notes.clone().unwrap_or_default(),
        }
    }
}

/// Write the roster export to any writer. Patients are ordered by name for
/// a deterministic file.
pub fn write_export<W: io::Write>(store: &Store, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut patients: Vec<_> = store.patients.values().collect();
    patients.sort_by(|a, b| a.name.cmp(&b.name));

    for patient in patients {
        let meds = store.medications_for_patient(patient.id);
        if meds.is_empty() {
            csv_writer.serialize(ExportRow::patient_only(patient))?;
        } else {
            for med in meds {
                csv_writer.serialize(ExportRow::for_medication(patient, med))?;
            }
        }
    }

    csv_writer.flush()?;
    Ok(())
}

/// Export to a file, synced to disk before returning.
pub fn export_to_path(store: &Store, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    write_export(store, &file)?;
    file.sync_all()?;

    tracing::info!("Exported roster to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NewMedication;
    use crate::Frequency;
    use chrono::{TimeZone, Utc};

    fn seeded_store() -> Store {
        let mut store = Store::default();
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap();

        let ada = store.add_patient("Ada Osei", Some("12B".into())).unwrap();
        store
            .add_medication(
                NewMedication {
                    patient_id: ada.id,
                    name: "Amoxicillin".into(),
                    dose: "500mg".into(),
                    form: Some("Capsule".into()),
                    route: "PO".into(),
                    frequency: Frequency::Qid,
                    notes: Some("With food".into()),
                },
                now,
            )
            .unwrap();

        // Patient with no medications still gets a row
        store.add_patient("Beatriz Lima", None).unwrap();
        store
    }

    fn export_string(store: &Store) -> String {
        let mut buf = Vec::new();
        write_export(store, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_header_column_order() {
        let out = export_string(&seeded_store());
        let header = out.lines().next().unwrap();
        assert_eq!(
            header,
            "Patient Name,Room Number,Medication Name,Dose,Form,Route,Frequency,Status,Last Served,Next Due,Notes"
        );
    }

    #[test]
    fn test_medication_row_contents() {
        let out = export_string(&seeded_store());
        let row = out.lines().nth(1).unwrap();
        assert!(row.starts_with("Ada Osei,12B,Amoxicillin,500mg,Capsule,PO,QID,ACTIVE"));
        assert!(row.ends_with("With food"));
    }

    #[test]
    fn test_patient_without_medications_emits_empty_row() {
        let out = export_string(&seeded_store());
        let row = out.lines().nth(2).unwrap();
        assert_eq!(row, "Beatriz Lima,,,,,,,,,,");
    }

    #[test]
    fn test_completed_status_and_export_to_path() {
        let mut store = seeded_store();
        let med_id = *store.medications.keys().next().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();
        store.toggle_completed(med_id, now);

        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("roster.csv");
        export_to_path(&store, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("COMPLETED"));
        // Completed course: no pending due time in the export
        let row = contents
            .lines()
            .find(|l| l.contains("Amoxicillin"))
            .unwrap();
        assert!(row.contains("COMPLETED,,"));
    }
}
