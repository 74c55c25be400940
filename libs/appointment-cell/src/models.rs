// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate};
use std::fmt;

/// Duration given to an appointment when the request omits one.
pub const DEFAULT_DURATION_MINUTES: i32 = 20;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    /// Wall-clock start, `HH:mm`.
    pub start_time: String,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload; the store assigns id and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub start_time: String,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
}

/// A not-yet-persisted proposal checked against the doctor's day.
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentCandidate {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub start_time: String,
    pub duration_minutes: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[serde(alias = "Pending")]
    Pending,
    #[serde(alias = "Confirmed")]
    Confirmed,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
        }
    }
}

impl AppointmentStatus {
    /// Pending moves to confirmed; re-applying the current status is a no-op.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        matches!(
            (self, next),
            (AppointmentStatus::Pending, _)
                | (AppointmentStatus::Confirmed, AppointmentStatus::Confirmed)
        )
    }
}

// ==============================================================================
// REQUEST / RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub start_time: String,
    pub duration_minutes: Option<i32>,
}

impl BookAppointmentRequest {
    pub fn to_candidate(&self) -> AppointmentCandidate {
        AppointmentCandidate {
            doctor_id: self.doctor_id,
            date: self.date,
            start_time: self.start_time.clone(),
            duration_minutes: self.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppointmentFilter {
    pub status: Option<AppointmentStatus>,
    pub date: Option<NaiveDate>,
    pub doctor_id: Option<Uuid>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.status.map_or(true, |status| appointment.status == status)
            && self.date.map_or(true, |date| appointment.date == date)
            && self.doctor_id.map_or(true, |doctor_id| appointment.doctor_id == doctor_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub available_slots: Vec<String>,
    pub total_slots: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckResponse {
    pub has_conflict: bool,
    pub within_working_hours: bool,
    pub conflicting_appointments: Vec<Appointment>,
}

// ==============================================================================
// ERROR MODELS
// ==============================================================================

/// Validation failures of the scheduling core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulingError {
    #[error("Invalid time format '{0}', expected HH:mm")]
    InvalidTimeFormat(String),

    #[error("Invalid duration {0}, expected a positive number of minutes")]
    InvalidDuration(i32),
}

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    #[error("Appointment must start and end within working hours ({start}-{end})")]
    OutsideWorkingHours { start: String, end: String },

    #[error("Appointment conflicts with existing booking")]
    ConflictDetected,

    #[error("Appointment not found")]
    NotFound,

    #[error("Appointment cannot move from {from} to {to}")]
    InvalidStatusTransition { from: AppointmentStatus, to: AppointmentStatus },

    #[error("Unauthorized access to appointment")]
    Unauthorized,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
