use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use nurseflow_core::*;
use std::path::{Path, PathBuf};
use uuid::Uuid;

mod drug_info;

use drug_info::DrugInfoClient;

#[derive(Parser)]
#[command(name = "nurseflow")]
#[command(about = "Medication scheduling and administration tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage patients
    Patient {
        #[command(subcommand)]
        command: PatientCommands,
    },

    /// Manage medications
    Med {
        #[command(subcommand)]
        command: MedCommands,
    },

    /// Log a served dose
    Serve {
        med_id: Uuid,

        /// Asserted administration time (RFC3339); defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Log a missed dose (skips the current slot)
    Miss {
        med_id: Uuid,

        /// Asserted event time (RFC3339); defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Serve several medications at once, each independently
    BulkServe {
        #[arg(required = true)]
        med_ids: Vec<Uuid>,
    },

    /// Show the dose history for a medication, newest first
    History { med_id: Uuid },

    /// List pending doses, soonest first
    Due,

    /// Run the alert loop, evaluating due doses every tick
    Watch {
        /// Evaluate once and exit
        #[arg(long)]
        once: bool,
    },

    /// Export the roster to CSV
    Export {
        /// Output path; defaults to nurseflow_export_<date>.csv in the data dir
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Ask the drug-info assistant a free-text clinical question
    Ask {
        #[arg(required = true)]
        query: Vec<String>,
    },
}

#[derive(Subcommand)]
enum PatientCommands {
    /// Register a patient
    Add {
        name: String,

        #[arg(long)]
        room: Option<String>,
    },

    /// Update a patient's details
    Edit {
        id: Uuid,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        room: Option<String>,
    },

    /// List all patients
    List,

    /// Remove a patient and all of their medications
    Remove { id: Uuid },
}

#[derive(Subcommand)]
enum MedCommands {
    /// Prescribe a medication for a patient
    Add {
        #[arg(long)]
        patient: Uuid,

        #[arg(long)]
        name: String,

        #[arg(long)]
        dose: String,

        /// Administration route (PO, IV, ...)
        #[arg(long)]
        route: String,

        /// Tablet, Capsule, Syrup, ...
        #[arg(long)]
        form: Option<String>,

        /// stat, bd, tid, qid, daily, prn or custom:<hours>
        #[arg(long)]
        frequency: Frequency,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Edit a medication; schedule is re-anchored if the policy changes
    Edit {
        id: Uuid,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        dose: Option<String>,

        #[arg(long)]
        route: Option<String>,

        #[arg(long)]
        form: Option<String>,

        /// stat, bd, tid, qid, daily, prn or custom:<hours>
        #[arg(long)]
        frequency: Option<Frequency>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// List medications, optionally for one patient
    List {
        #[arg(long)]
        patient: Option<Uuid>,
    },

    /// Remove a medication outright
    Remove { id: Uuid },

    /// Toggle a medication's completed state
    Complete { id: Uuid },

    /// Look up a clinical summary for a medication
    Info { id: Uuid },
}

/// File layout inside the data directory.
struct DataPaths {
    store: PathBuf,
    doses: PathBuf,
}

impl DataPaths {
    fn new(data_dir: &Path) -> Self {
        Self {
            store: data_dir.join("store.json"),
            doses: data_dir.join("doses.jsonl"),
        }
    }
}

fn main() -> Result<()> {
    nurseflow_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    std::fs::create_dir_all(&data_dir)?;
    let paths = DataPaths::new(&data_dir);

    match cli.command {
        Commands::Patient { command } => cmd_patient(&paths, command),
        Commands::Med { command } => cmd_med(&paths, command, &config),
        Commands::Serve { med_id, at, notes } => {
            cmd_log_dose(&paths, med_id, DoseStatus::Served, at, notes)
        }
        Commands::Miss { med_id, at, notes } => {
            cmd_log_dose(&paths, med_id, DoseStatus::Missed, at, notes)
        }
        Commands::BulkServe { med_ids } => cmd_bulk_serve(&paths, &med_ids),
        Commands::History { med_id } => cmd_history(&paths, med_id),
        Commands::Due => cmd_due(&paths),
        Commands::Watch { once } => cmd_watch(&paths, once, &config),
        Commands::Export { out } => cmd_export(&paths, &data_dir, out),
        Commands::Ask { query } => cmd_ask(&query.join(" "), &config),
    }
}

fn cmd_patient(paths: &DataPaths, command: PatientCommands) -> Result<()> {
    let mut store = Store::load(&paths.store)?;

    match command {
        PatientCommands::Add { name, room } => {
            let patient = store.add_patient(name, room)?;
            store.save(&paths.store)?;
            println!("✓ Added patient {} ({})", patient.name, patient.id);
        }

        PatientCommands::Edit { id, name, room } => match store.update_patient(id, name, room) {
            Some(patient) => {
                store.save(&paths.store)?;
                println!("✓ Updated patient {}", patient.name);
            }
            None => println!("No patient with id {}", id),
        },

        PatientCommands::List => {
            let mut patients: Vec<_> = store.patients.values().collect();
            patients.sort_by(|a, b| a.name.cmp(&b.name));
            if patients.is_empty() {
                println!("No patients on record.");
            }
            for patient in patients {
                let meds = store.medications_for_patient(patient.id);
                let active = meds.iter().filter(|m| !m.is_completed).count();
                println!(
                    "{}  {}  room {}  ({} active medication(s))",
                    patient.id,
                    patient.name,
                    patient.room_number.as_deref().unwrap_or("-"),
                    active
                );
            }
        }

        PatientCommands::Remove { id } => match store.remove_patient(id) {
            Some((patient, med_count)) => {
                store.save(&paths.store)?;
                println!(
                    "✓ Removed patient {} and {} medication(s)",
                    patient.name, med_count
                );
            }
            None => println!("No patient with id {}", id),
        },
    }

    Ok(())
}

fn cmd_med(paths: &DataPaths, command: MedCommands, config: &Config) -> Result<()> {
    let mut store = Store::load(&paths.store)?;

    match command {
        MedCommands::Add {
            patient,
            name,
            dose,
            route,
            form,
            frequency,
            notes,
        } => {
            let med = store.add_medication(
                NewMedication {
                    patient_id: patient,
                    name,
                    dose,
                    form,
                    route,
                    frequency,
                    notes,
                },
                Utc::now(),
            )?;
            store.save(&paths.store)?;
            println!("✓ Added medication {} ({})", med.name, med.id);
            if let Some(due) = med.next_due_at {
                println!("  Due now: {}", due.to_rfc3339());
            }
        }

        MedCommands::Edit {
            id,
            name,
            dose,
            route,
            form,
            frequency,
            notes,
        } => {
            let edit = MedicationEdit {
                name,
                dose,
                form,
                route,
                frequency,
                notes,
            };
            match store.update_medication(id, &edit, Utc::now())? {
                Some(med) => {
                    store.save(&paths.store)?;
                    println!("✓ Updated medication {}", med.name);
                    match med.next_due_at {
                        Some(due) => println!("  Next due: {}", due.to_rfc3339()),
                        None => println!("  No pending reminder"),
                    }
                }
                None => println!("No medication with id {}", id),
            }
        }

        MedCommands::List { patient } => {
            let meds: Vec<&Medication> = match patient {
                Some(pid) => store.medications_for_patient(pid),
                None => {
                    let mut all: Vec<_> = store.medications.values().collect();
                    all.sort_by(|a, b| a.name.cmp(&b.name));
                    all
                }
            };
            if meds.is_empty() {
                println!("No medications on record.");
            }
            for med in meds {
                let status = if med.is_completed { "COMPLETED" } else { "ACTIVE" };
                let due = match med.next_due_at {
                    Some(d) => d.to_rfc3339(),
                    None => "-".into(),
                };
                println!(
                    "{}  {}  {} {}  {}  {}  due {}",
                    med.id, med.name, med.dose, med.route, med.frequency, status, due
                );
            }
        }

        MedCommands::Remove { id } => match store.remove_medication(id) {
            Some(med) => {
                store.save(&paths.store)?;
                println!("✓ Removed medication {}", med.name);
            }
            None => println!("No medication with id {}", id),
        },

        MedCommands::Complete { id } => match store.toggle_completed(id, Utc::now()) {
            Some(med) => {
                store.save(&paths.store)?;
                if med.is_completed {
                    println!("✓ Marked {} as completed", med.name);
                } else {
                    println!("✓ Resumed {}; due now", med.name);
                }
            }
            None => println!("No medication with id {}", id),
        },

        MedCommands::Info { id } => match store.medication(id) {
            Some(med) => {
                let client = DrugInfoClient::new(&config.ai.endpoint, &config.ai.model);
                let answer = client.ask_drug_info(&DrugInfoClient::summary_prompt(&med.name));
                println!("{}", answer);
            }
            None => println!("No medication with id {}", id),
        },
    }

    Ok(())
}

fn cmd_log_dose(
    paths: &DataPaths,
    med_id: Uuid,
    status: DoseStatus,
    at: Option<DateTime<Utc>>,
    notes: Option<String>,
) -> Result<()> {
    let mut store = Store::load(&paths.store)?;
    let mut sink = JsonlSink::new(&paths.doses);
    let at = at.unwrap_or_else(Utc::now);

    match store.record_dose(med_id, status, at, notes, &mut sink)? {
        Some(entry) => {
            store.save(&paths.store)?;
            let med = store
                .medication(med_id)
                .ok_or_else(|| Error::Other("medication vanished mid-update".into()))?;
            println!("✓ Logged {} for {} at {}", entry.status, med.name, at.to_rfc3339());
            if med.is_completed {
                println!("  Course complete");
            } else if let Some(due) = med.next_due_at {
                println!("  Next due: {}", due.to_rfc3339());
            }
        }
        None => match store.medication(med_id) {
            Some(med) => println!("{} is completed; dose not logged", med.name),
            None => println!("No medication with id {}", med_id),
        },
    }

    Ok(())
}

fn cmd_bulk_serve(paths: &DataPaths, med_ids: &[Uuid]) -> Result<()> {
    let mut store = Store::load(&paths.store)?;
    let mut sink = JsonlSink::new(&paths.doses);

    let served = store.bulk_serve(med_ids, Utc::now(), &mut sink);
    store.save(&paths.store)?;

    println!("✓ Served {} of {} medication(s)", served, med_ids.len());
    Ok(())
}

fn cmd_history(paths: &DataPaths, med_id: Uuid) -> Result<()> {
    let entries = history_for(&paths.doses, med_id)?;
    if entries.is_empty() {
        println!("No dose history for {}", med_id);
        return Ok(());
    }

    for entry in entries {
        let notes = entry.notes.as_deref().unwrap_or("");
        println!("{}  {}  {}", entry.recorded_at.to_rfc3339(), entry.status, notes);
    }
    Ok(())
}

fn cmd_due(paths: &DataPaths) -> Result<()> {
    let store = Store::load(&paths.store)?;
    let now = Utc::now();

    let upcoming = store.upcoming_doses();
    if upcoming.is_empty() {
        println!("No pending doses.");
        return Ok(());
    }

    for med in upcoming {
        let patient_name = store
            .patient(med.patient_id)
            .map(|p| p.name.as_str())
            .unwrap_or("Unknown Patient");
        let due = med.next_due_at.unwrap_or(now);
        let marker = if due <= now { "OVERDUE" } else { "due" };
        println!(
            "{}  {}  {} {}  {} {}",
            med.id,
            patient_name,
            med.name,
            med.dose,
            marker,
            due.to_rfc3339()
        );
    }
    Ok(())
}

/// Prints alerts to the terminal. OS-level delivery is a separate
/// collaborator; this is the reference implementation of the dispatch
/// interface.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, title: &str, body: &str, _dedupe_tag: &str) -> Result<()> {
        println!("🔔 {}", title);
        for line in body.lines() {
            println!("   {}", line);
        }
        Ok(())
    }
}

fn cmd_watch(paths: &DataPaths, once: bool, config: &Config) -> Result<()> {
    let mut evaluator = AlertEvaluator::with_window_hours(config.alerts.window_hours);
    let mut notifier = ConsoleNotifier;
    let period = std::time::Duration::from_secs(config.alerts.period_seconds);

    loop {
        // Reload each tick: the evaluator is read-only and decoupled from
        // whichever process mutated the store last.
        let store = Store::load(&paths.store)?;
        let fired = evaluator.evaluate(&store, Utc::now(), &mut notifier);
        if fired > 0 {
            tracing::info!("Dispatched {} alert(s)", fired);
        }

        if once {
            break;
        }
        std::thread::sleep(period);
    }

    Ok(())
}

fn cmd_export(paths: &DataPaths, data_dir: &Path, out: Option<PathBuf>) -> Result<()> {
    let store = Store::load(&paths.store)?;
    let out = out.unwrap_or_else(|| {
        data_dir.join(format!(
            "nurseflow_export_{}.csv",
            Utc::now().format("%Y-%m-%d")
        ))
    });

    nurseflow_core::export::export_to_path(&store, &out)?;
    println!("✓ Exported roster to {}", out.display());
    Ok(())
}

fn cmd_ask(query: &str, config: &Config) -> Result<()> {
    if query.trim().is_empty() {
        println!("Nothing to ask.");
        return Ok(());
    }

    let client = DrugInfoClient::new(&config.ai.endpoint, &config.ai.model);
    println!("{}", client.ask_drug_info(query));
    Ok(())
}
