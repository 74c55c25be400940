// libs/directory-cell/src/services/directory.rs
use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::models::{DirectoryError, Doctor, Patient, CPF_LENGTH};
use crate::services::repository::DirectoryRepository;

/// Strips `.`/`-`/space punctuation and requires exactly eleven digits.
pub fn normalize_cpf(raw: &str) -> Result<String, DirectoryError> {
    let digits: String = raw
        .chars()
        .filter(|c| !matches!(c, '.' | '-' | ' '))
        .collect();

    if digits.len() != CPF_LENGTH || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(DirectoryError::InvalidCpf(raw.to_string()));
    }

    Ok(digits)
}

#[derive(Clone)]
pub struct DirectoryService {
    repository: Arc<dyn DirectoryRepository>,
}

impl DirectoryService {
    pub fn new(repository: Arc<dyn DirectoryRepository>) -> Self {
        Self { repository }
    }

    /// Distinct specialties, sorted.
    pub async fn list_specialties(&self) -> Result<Vec<String>, DirectoryError> {
        let specialties: BTreeSet<String> = self.repository
            .doctor_specialties()
            .await?
            .into_iter()
            .map(|specialty| specialty.trim().to_string())
            .filter(|specialty| !specialty.is_empty())
            .collect();

        debug!("{} distinct specialties", specialties.len());
        Ok(specialties.into_iter().collect())
    }

    pub async fn doctors_by_specialty(
        &self,
        specialty: Option<&str>,
    ) -> Result<Vec<Doctor>, DirectoryError> {
        let specialty = specialty
            .map(str::trim)
            .filter(|specialty| !specialty.is_empty())
            .ok_or(DirectoryError::SpecialtyRequired)?;

        let doctors = self.repository.doctors_by_specialty(specialty).await?;
        if doctors.is_empty() {
            return Err(DirectoryError::DoctorsNotFound(specialty.to_string()));
        }

        Ok(doctors)
    }

    pub async fn find_patient_by_cpf(&self, raw_cpf: &str) -> Result<Patient, DirectoryError> {
        let cpf = normalize_cpf(raw_cpf)?;

        let patient = self.repository
            .patient_by_cpf(&cpf)
            .await?
            .ok_or(DirectoryError::PatientNotFound)?;

        info!("Patient {} looked up by CPF", patient.id);
        Ok(patient)
    }
}
