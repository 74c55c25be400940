// libs/directory-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Digits in a Brazilian taxpayer id (CPF).
pub const CPF_LENGTH: usize = 11;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    /// Regional medical council registration.
    pub crm: String,
    pub specialty: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub cpf: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpecialtyQuery {
    pub specialty: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Invalid CPF '{0}', expected 11 digits")]
    InvalidCpf(String),

    #[error("Specialty is required")]
    SpecialtyRequired,

    #[error("No doctors found for specialty '{0}'")]
    DoctorsNotFound(String),

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
