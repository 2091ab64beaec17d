pub mod patient_store;

pub use patient_store::{PatientStore, SledPatientStore};
