#![forbid(unsafe_code)]

//! Core domain model and business logic for NurseFlow.
//!
//! This crate provides:
//! - Domain types (patients, medications, frequency policies, dose events)
//! - The schedule engine (pure dose/edit/completion transitions)
//! - The care store (explicit snapshot with atomic persistence)
//! - The append-only dose log
//! - The alert evaluator (one notification per due-instant)
//! - CSV roster export

pub mod alert;
pub mod config;
pub mod doselog;
pub mod error;
pub mod export;
pub mod logging;
pub mod schedule;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use alert::{AlertEvaluator, Notifier};
pub use config::Config;
pub use doselog::{history_for, JsonlSink, LogSink};
pub use error::{Error, Result};
pub use schedule::{DoseTransition, MedicationEdit};
pub use store::{NewMedication, Store};
pub use types::*;
