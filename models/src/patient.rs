// models/src/patient.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{PatientError, PatientResult};

// Blood-pressure bounds for the critical-patient query. A reading outside
// either range marks the whole patient as critical.
pub const BPH_CRITICAL_LOW: f64 = 50.0;
pub const BPH_CRITICAL_HIGH: f64 = 150.0;
pub const BPL_CRITICAL_LOW: f64 = 60.0;
pub const BPL_CRITICAL_HIGH: f64 = 90.0;

/// One vital-signs reading embedded in a patient document. Entries have no
/// identity of their own and are addressed by position in the owning list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicalEntry {
    #[serde(default)]
    pub bph: f64, // Blood Pressure High (systolic)
    #[serde(default)]
    pub bpl: f64, // Blood Pressure Low (diastolic)
    #[serde(default)]
    pub rr: f64, // Respiratory Rate
    #[serde(default)]
    pub bol: f64, // Blood Oxygen Level
    #[serde(default)]
    pub hbr: f64, // Heart Beat Rate
}

impl ClinicalEntry {
    pub fn is_critical(&self) -> bool {
        self.bph < BPH_CRITICAL_LOW
            || self.bph > BPH_CRITICAL_HIGH
            || self.bpl < BPL_CRITICAL_LOW
            || self.bpl > BPL_CRITICAL_HIGH
    }

    /// Merges the given partial reading into this one; fields left out of
    /// the update keep their current value.
    pub fn apply(&mut self, update: &ClinicalEntryUpdate) {
        if let Some(bph) = update.bph {
            self.bph = bph;
        }
        if let Some(bpl) = update.bpl {
            self.bpl = bpl;
        }
        if let Some(rr) = update.rr {
            self.rr = rr;
        }
        if let Some(bol) = update.bol {
            self.bol = bol;
        }
        if let Some(hbr) = update.hbr {
            self.hbr = hbr;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub email: String, // Unique across the store
    pub phone: String,
    pub bdate: NaiveDate,
    pub address: Option<String>,
    #[serde(default)]
    pub clinical: Vec<ClinicalEntry>, // Insertion order is significant
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    pub fn has_critical_entry(&self) -> bool {
        self.clinical.iter().any(ClinicalEntry::is_critical)
    }

    /// Merges the given partial fields into this patient. Never touches
    /// `id`, `clinical`, or the timestamps; the store bumps `updated_at`
    /// when it persists the merge.
    pub fn apply(&mut self, update: PatientUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(email) = update.email {
            self.email = email;
        }
        if let Some(phone) = update.phone {
            self.phone = phone;
        }
        if let Some(bdate) = update.bdate {
            self.bdate = bdate;
        }
        if let Some(address) = update.address {
            self.address = Some(address);
        }
    }
}

/// Request body for creating a patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPatient {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub bdate: NaiveDate,
    pub address: Option<String>,
}

impl NewPatient {
    pub fn validate(&self) -> PatientResult<()> {
        if self.name.trim().is_empty() {
            return Err(PatientError::InvalidData("name must not be empty".to_string()));
        }
        if self.email.trim().is_empty() {
            return Err(PatientError::InvalidData("email must not be empty".to_string()));
        }
        if self.phone.trim().is_empty() {
            return Err(PatientError::InvalidData("phone must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Partial patient update; every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub bdate: Option<NaiveDate>,
    pub address: Option<String>,
}

/// Partial clinical-entry update; every measurement is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClinicalEntryUpdate {
    pub bph: Option<f64>,
    pub bpl: Option<f64>,
    pub rr: Option<f64>,
    pub bol: Option<f64>,
    pub hbr: Option<f64>,
}
