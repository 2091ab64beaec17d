// storage/src/patient_store.rs
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use sled::{Db, Tree};
use tracing::debug;
use uuid::Uuid;

use models::errors::{PatientError, PatientResult};
use models::patient::{ClinicalEntry, ClinicalEntryUpdate, NewPatient, Patient, PatientUpdate};

const PATIENTS_TREE: &str = "patients";

/// The patient access layer. Every operation is an independent,
/// non-transactional round trip to the store; read-modify-write pairs can
/// lose a concurrent update between the read and the save.
#[async_trait]
pub trait PatientStore: Send + Sync + 'static {
    async fn create_patient(&self, fields: NewPatient) -> PatientResult<Patient>;
    async fn list_patients(&self) -> PatientResult<Vec<Patient>>;
    async fn get_patient(&self, id: Uuid) -> PatientResult<Patient>;
    async fn update_patient(&self, id: Uuid, update: PatientUpdate) -> PatientResult<Patient>;
    async fn delete_patient(&self, id: Uuid) -> PatientResult<()>;
    async fn append_clinical_entry(&self, id: Uuid, entry: ClinicalEntry) -> PatientResult<Patient>;
    async fn get_clinical_entry_at(&self, id: Uuid, index: usize) -> PatientResult<ClinicalEntry>;
    async fn get_latest_clinical_entry(&self, id: Uuid) -> PatientResult<ClinicalEntry>;
    async fn update_clinical_entry_at(
        &self,
        id: Uuid,
        index: usize,
        update: ClinicalEntryUpdate,
    ) -> PatientResult<Patient>;
    async fn remove_clinical_entry_at(&self, id: Uuid, index: usize) -> PatientResult<Patient>;
    async fn find_critical_patients(&self) -> PatientResult<Vec<Patient>>;
}

/// Sled-backed implementation: one tree keyed by the patient id's raw uuid
/// bytes, values stored as JSON documents.
pub struct SledPatientStore {
    db: Db,
    tree: Tree,
}

impl SledPatientStore {
    pub fn open(path: impl AsRef<Path>) -> PatientResult<Self> {
        let db = sled::open(path.as_ref())?;
        let tree = db.open_tree(PATIENTS_TREE)?;
        debug!("patient store opened at {:?}", path.as_ref());
        Ok(Self { db, tree })
    }

    pub fn flush(&self) -> PatientResult<()> {
        self.db.flush()?;
        Ok(())
    }

    fn load(&self, id: &Uuid) -> PatientResult<Option<Patient>> {
        match self.tree.get(id.as_bytes())? {
            Some(ivec) => {
                let patient: Patient = serde_json::from_slice(&ivec)?;
                Ok(Some(patient))
            }
            None => Ok(None),
        }
    }

    fn require(&self, id: &Uuid) -> PatientResult<Patient> {
        self.load(id)?.ok_or(PatientError::NotFound)
    }

    fn persist(&self, patient: &Patient) -> PatientResult<()> {
        let value = serde_json::to_vec(patient)?;
        self.tree.insert(patient.id.as_bytes(), value)?;
        Ok(())
    }

    fn find_by_email(&self, email: &str) -> PatientResult<Option<Patient>> {
        for item in self.tree.iter() {
            let (_, value) = item?;
            let patient: Patient = serde_json::from_slice(&value)?;
            if patient.email == email {
                return Ok(Some(patient));
            }
        }
        Ok(None)
    }

    fn all_patients(&self) -> PatientResult<Vec<Patient>> {
        let mut patients = Vec::new();
        for item in self.tree.iter() {
            let (_, value) = item?;
            patients.push(serde_json::from_slice(&value)?);
        }
        Ok(patients)
    }

    // Bounds are checked against the list length as of this call.
    fn check_index(patient: &Patient, index: usize) -> PatientResult<()> {
        if index >= patient.clinical.len() {
            return Err(PatientError::IndexOutOfRange);
        }
        Ok(())
    }
}

#[async_trait]
impl PatientStore for SledPatientStore {
    async fn create_patient(&self, fields: NewPatient) -> PatientResult<Patient> {
        fields.validate()?;
        if self.find_by_email(&fields.email)?.is_some() {
            return Err(PatientError::DuplicateEmail);
        }
        let now = Utc::now();
        let patient = Patient {
            id: Uuid::new_v4(),
            name: fields.name,
            email: fields.email,
            phone: fields.phone,
            bdate: fields.bdate,
            address: fields.address,
            clinical: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.persist(&patient)?;
        Ok(patient)
    }

    async fn list_patients(&self) -> PatientResult<Vec<Patient>> {
        let patients = self.all_patients()?;
        if patients.is_empty() {
            return Err(PatientError::EmptyResult);
        }
        Ok(patients)
    }

    async fn get_patient(&self, id: Uuid) -> PatientResult<Patient> {
        self.require(&id)
    }

    async fn update_patient(&self, id: Uuid, update: PatientUpdate) -> PatientResult<Patient> {
        let mut patient = self.require(&id)?;
        patient.apply(update);
        patient.updated_at = Utc::now();
        self.persist(&patient)?;
        Ok(patient)
    }

    async fn delete_patient(&self, id: Uuid) -> PatientResult<()> {
        let patient = self.require(&id)?;
        if !patient.clinical.is_empty() {
            return Err(PatientError::HasClinicalData);
        }
        self.tree.remove(id.as_bytes())?;
        Ok(())
    }

    async fn append_clinical_entry(&self, id: Uuid, entry: ClinicalEntry) -> PatientResult<Patient> {
        let mut patient = self.require(&id)?;
        patient.clinical.push(entry);
        patient.updated_at = Utc::now();
        self.persist(&patient)?;
        Ok(patient)
    }

    async fn get_clinical_entry_at(&self, id: Uuid, index: usize) -> PatientResult<ClinicalEntry> {
        let patient = self.require(&id)?;
        Self::check_index(&patient, index)?;
        Ok(patient.clinical[index].clone())
    }

    async fn get_latest_clinical_entry(&self, id: Uuid) -> PatientResult<ClinicalEntry> {
        let patient = self.require(&id)?;
        patient
            .clinical
            .last()
            .cloned()
            .ok_or(PatientError::NoClinicalData)
    }

    async fn update_clinical_entry_at(
        &self,
        id: Uuid,
        index: usize,
        update: ClinicalEntryUpdate,
    ) -> PatientResult<Patient> {
        let mut patient = self.require(&id)?;
        Self::check_index(&patient, index)?;
        patient.clinical[index].apply(&update);
        patient.updated_at = Utc::now();
        self.persist(&patient)?;
        Ok(patient)
    }

    async fn remove_clinical_entry_at(&self, id: Uuid, index: usize) -> PatientResult<Patient> {
        let mut patient = self.require(&id)?;
        Self::check_index(&patient, index)?;
        patient.clinical.remove(index);
        patient.updated_at = Utc::now();
        self.persist(&patient)?;
        Ok(patient)
    }

    async fn find_critical_patients(&self) -> PatientResult<Vec<Patient>> {
        let critical: Vec<Patient> = self
            .all_patients()?
            .into_iter()
            .filter(Patient::has_critical_entry)
            .collect();
        if critical.is_empty() {
            return Err(PatientError::NoCriticalPatients);
        }
        Ok(critical)
    }
}
