// models/src/errors.rs

pub use thiserror::Error;

/// Failure taxonomy for the patient store and everything layered on it.
///
/// The first group are client-visible conditions surfaced as 4xx responses;
/// `Storage` and `Serialization` are infrastructure faults that the HTTP
/// layer collapses into a generic 500.
#[derive(Debug, Error, PartialEq)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,
    #[error("Patient already exists")]
    DuplicateEmail,
    #[error("Cannot delete patient with clinical data")]
    HasClinicalData,
    #[error("Invalid clinical data index")]
    IndexOutOfRange,
    #[error("No clinical data available for this patient")]
    NoClinicalData,
    // The list query and the critical query report "nothing matched"
    // differently on the wire, hence two variants.
    #[error("Patient not found")]
    EmptyResult,
    #[error("No patients in critical condition found")]
    NoCriticalPatients,
    #[error("Invalid data provided: {0}")]
    InvalidData(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for PatientError {
    fn from(err: serde_json::Error) -> Self {
        PatientError::Serialization(format!("JSON processing error: {}", err))
    }
}

#[cfg(feature = "sled-errors")]
impl From<sled::Error> for PatientError {
    fn from(err: sled::Error) -> Self {
        PatientError::Storage(format!("Underlying storage operation failed: {}", err))
    }
}

/// A type alias for a `Result` that returns a `PatientError` on failure.
pub type PatientResult<T> = Result<T, PatientError>;
