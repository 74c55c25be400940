// libs/directory-cell/src/services/repository.rs
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{DirectoryError, Doctor, Patient};

/// Read access to doctor and patient records owned by registration.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    /// One entry per doctor; may repeat.
    async fn doctor_specialties(&self) -> Result<Vec<String>, DirectoryError>;

    async fn doctors_by_specialty(&self, specialty: &str) -> Result<Vec<Doctor>, DirectoryError>;

    /// `cpf` is already normalized to digits.
    async fn patient_by_cpf(&self, cpf: &str) -> Result<Option<Patient>, DirectoryError>;
}

// ==============================================================================
// SUPABASE (POSTGREST) REPOSITORY
// ==============================================================================

const DOCTORS_PATH: &str = "/rest/v1/doctors";
const PATIENTS_PATH: &str = "/rest/v1/patients";

pub struct SupabaseDirectoryRepository {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseDirectoryRepository {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    async fn fetch(&self, path: &str) -> Result<Vec<Value>, DirectoryError> {
        self.supabase
            .request(Method::GET, path, None, None)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))
    }
}

#[async_trait]
impl DirectoryRepository for SupabaseDirectoryRepository {
    async fn doctor_specialties(&self) -> Result<Vec<String>, DirectoryError> {
        let rows = self.fetch(&format!("{}?select=specialty", DOCTORS_PATH)).await?;

        Ok(rows
            .iter()
            .filter_map(|row| row["specialty"].as_str())
            .map(str::to_string)
            .collect())
    }

    async fn doctors_by_specialty(&self, specialty: &str) -> Result<Vec<Doctor>, DirectoryError> {
        debug!("Fetching doctors with specialty {}", specialty);

        let path = format!(
            "{}?specialty=eq.{}&order=full_name.asc",
            DOCTORS_PATH,
            urlencoding::encode(specialty)
        );

        parse_rows(self.fetch(&path).await?)
    }

    async fn patient_by_cpf(&self, cpf: &str) -> Result<Option<Patient>, DirectoryError> {
        let path = format!("{}?cpf=eq.{}&limit=1", PATIENTS_PATH, urlencoding::encode(cpf));

        let mut patients: Vec<Patient> = parse_rows(self.fetch(&path).await?)?;
        Ok(patients.pop())
    }
}

fn parse_rows<T: serde::de::DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, DirectoryError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| DirectoryError::DatabaseError(format!("Failed to parse directory rows: {}", e)))
}

// ==============================================================================
// IN-MEMORY REPOSITORY
// ==============================================================================

/// Process-local directory used when no database is configured, and by tests.
#[derive(Default)]
pub struct InMemoryDirectoryRepository {
    doctors: RwLock<Vec<Doctor>>,
    patients: RwLock<Vec<Patient>>,
}

impl InMemoryDirectoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(doctors: Vec<Doctor>, patients: Vec<Patient>) -> Self {
        Self {
            doctors: RwLock::new(doctors),
            patients: RwLock::new(patients),
        }
    }
}

#[async_trait]
impl DirectoryRepository for InMemoryDirectoryRepository {
    async fn doctor_specialties(&self) -> Result<Vec<String>, DirectoryError> {
        let doctors = self.doctors.read().await;
        Ok(doctors.iter().map(|doctor| doctor.specialty.clone()).collect())
    }

    async fn doctors_by_specialty(&self, specialty: &str) -> Result<Vec<Doctor>, DirectoryError> {
        let doctors = self.doctors.read().await;

        let mut matching: Vec<Doctor> = doctors
            .iter()
            .filter(|doctor| doctor.specialty == specialty)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.full_name.cmp(&b.full_name));

        Ok(matching)
    }

    async fn patient_by_cpf(&self, cpf: &str) -> Result<Option<Patient>, DirectoryError> {
        let patients = self.patients.read().await;
        Ok(patients.iter().find(|patient| patient.cpf == cpf).cloned())
    }
}
