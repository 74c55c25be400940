// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    Appointment, AppointmentCandidate, AppointmentError, AppointmentFilter, AppointmentStatus,
    AvailabilityResponse, BookAppointmentRequest, ConflictCheckResponse, UpdateStatusRequest,
    DEFAULT_DURATION_MINUTES,
};
use crate::services::booking::AppointmentBookingService;

/// Shared by every appointment route.
pub struct AppointmentState {
    pub booking: AppointmentBookingService,
}

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct AppointmentListQuery {
    pub status: Option<AppointmentStatus>,
    pub date: Option<NaiveDate>,
    pub doctor_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ConflictCheckQuery {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub start_time: String,
    pub duration_minutes: Option<i32>,
}

impl From<AppointmentError> for AppError {
    fn from(error: AppointmentError) -> Self {
        match error {
            AppointmentError::ConflictDetected => AppError::Conflict(
                "Scheduling conflict: the doctor already has an appointment in this period".to_string(),
            ),
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            AppointmentError::Unauthorized => {
                AppError::Forbidden("Not authorized to access this appointment".to_string())
            }
            AppointmentError::Scheduling(_)
            | AppointmentError::OutsideWorkingHours { .. }
            | AppointmentError::InvalidStatusTransition { .. } => {
                AppError::ValidationError(error.to_string())
            }
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

// ==============================================================================
// AVAILABILITY (PUBLIC)
// ==============================================================================

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppointmentState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let available_slots = state.booking.available_slots(query.doctor_id, query.date).await?;

    Ok(Json(AvailabilityResponse {
        doctor_id: query.doctor_id,
        date: query.date,
        total_slots: available_slots.len(),
        available_slots,
    }))
}

// ==============================================================================
// BOOKING
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    // Patients book for themselves; front desk and doctors book for anyone
    if request.patient_id.to_string() != user.id && !user.is_staff() {
        return Err(AppError::Forbidden(
            "Not authorized to book appointment for this patient".to_string(),
        ));
    }

    let appointment = state.booking.book_appointment(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Appointment booked successfully",
            "appointment": appointment
        })),
    ))
}

#[axum::debug_handler]
pub async fn check_appointment_conflicts(
    State(state): State<Arc<AppointmentState>>,
    Query(query): Query<ConflictCheckQuery>,
) -> Result<Json<ConflictCheckResponse>, AppError> {
    let candidate = AppointmentCandidate {
        doctor_id: query.doctor_id,
        date: query.date,
        start_time: query.start_time,
        duration_minutes: query.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES),
    };

    Ok(Json(state.booking.check_conflicts(candidate).await?))
}

// ==============================================================================
// LISTINGS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let filter = AppointmentFilter {
        status: query.status,
        date: query.date,
        doctor_id: query.doctor_id,
    };

    list_visible(&state, &user, filter).await.map(Json)
}

#[axum::debug_handler]
pub async fn list_pending_appointments(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let filter = AppointmentFilter {
        status: Some(AppointmentStatus::Pending),
        ..Default::default()
    };

    list_visible(&state, &user, filter).await.map(Json)
}

#[axum::debug_handler]
pub async fn list_confirmed_appointments(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let filter = AppointmentFilter {
        status: Some(AppointmentStatus::Confirmed),
        ..Default::default()
    };

    list_visible(&state, &user, filter).await.map(Json)
}

#[axum::debug_handler]
pub async fn list_appointments_by_date(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Path(date): Path<NaiveDate>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let filter = AppointmentFilter {
        status: query.status,
        date: Some(date),
        doctor_id: None,
    };

    let appointments = list_visible(&state, &user, filter).await?;
    if appointments.is_empty() {
        return Err(AppError::NotFound(format!("No appointments found for {}", date)));
    }

    Ok(Json(appointments))
}

// ==============================================================================
// SINGLE APPOINTMENT
// ==============================================================================

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = state.booking.get_appointment(appointment_id).await?;
    ensure_can_view(&user, &appointment)?;

    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    ensure_staff(&user)?;

    Ok(Json(state.booking.confirm_appointment(appointment_id).await?))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_staff(&user)?;

    let appointment = state.booking.update_status(appointment_id, request.status).await?;

    Ok(Json(json!({
        "message": format!("Appointment status updated to {}", appointment.status),
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking.get_appointment(appointment_id).await?;
    ensure_can_view(&user, &appointment)?;

    state.booking.delete_appointment(appointment_id).await?;

    Ok(Json(json!({
        "message": "Appointment removed successfully"
    })))
}

// ==============================================================================
// ACCESS HELPERS
// ==============================================================================

fn ensure_staff(user: &User) -> Result<(), AppError> {
    if user.is_staff() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Only clinic staff can manage appointment status".to_string()))
    }
}

fn ensure_can_view(user: &User, appointment: &Appointment) -> Result<(), AppError> {
    if user.is_staff() || appointment.patient_id.to_string() == user.id {
        Ok(())
    } else {
        Err(AppointmentError::Unauthorized.into())
    }
}

/// Staff see every match; patients only their own appointments.
async fn list_visible(
    state: &AppointmentState,
    user: &User,
    filter: AppointmentFilter,
) -> Result<Vec<Appointment>, AppError> {
    let mut appointments = state.booking.list_appointments(filter).await?;

    if !user.is_staff() {
        appointments.retain(|appointment| appointment.patient_id.to_string() == user.id);
    }

    Ok(appointments)
}
