pub mod errors;
pub mod patient;

pub use errors::{PatientError, PatientResult};
pub use patient::{ClinicalEntry, ClinicalEntryUpdate, NewPatient, Patient, PatientUpdate};
