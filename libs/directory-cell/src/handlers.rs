// libs/directory-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{DirectoryError, Doctor, Patient, SpecialtyQuery};
use crate::services::directory::DirectoryService;

pub struct DirectoryState {
    pub directory: DirectoryService,
}

impl From<DirectoryError> for AppError {
    fn from(error: DirectoryError) -> Self {
        match error {
            DirectoryError::InvalidCpf(_) | DirectoryError::SpecialtyRequired => {
                AppError::BadRequest(error.to_string())
            }
            DirectoryError::DoctorsNotFound(_) | DirectoryError::PatientNotFound => {
                AppError::NotFound(error.to_string())
            }
            DirectoryError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[axum::debug_handler]
pub async fn get_specialties(
    State(state): State<Arc<DirectoryState>>,
) -> Result<Json<Value>, AppError> {
    let specialties = state.directory.list_specialties().await?;

    Ok(Json(json!({ "specialties": specialties })))
}

#[axum::debug_handler]
pub async fn get_doctors_by_specialty(
    State(state): State<Arc<DirectoryState>>,
    Query(query): Query<SpecialtyQuery>,
) -> Result<Json<Vec<Doctor>>, AppError> {
    let doctors = state
        .directory
        .doctors_by_specialty(query.specialty.as_deref())
        .await?;

    Ok(Json(doctors))
}

/// Front desk lookup; patients cannot search other patients' records.
#[axum::debug_handler]
pub async fn get_patient_by_cpf(
    State(state): State<Arc<DirectoryState>>,
    Extension(user): Extension<User>,
    Path(cpf): Path<String>,
) -> Result<Json<Patient>, AppError> {
    if !user.is_staff() {
        return Err(AppError::Forbidden(
            "Not authorized to look up patients".to_string(),
        ));
    }

    let patient = state.directory.find_patient_by_cpf(&cpf).await?;

    Ok(Json(patient))
}
