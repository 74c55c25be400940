// libs/appointment-cell/src/services/repository.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Timelike, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{SupabaseClient, SupabaseError};

use crate::models::{
    Appointment, AppointmentError, AppointmentFilter, AppointmentStatus, NewAppointment,
};
use crate::services::conflict::has_conflict;

/// Storage collaborator for appointments.
///
/// `insert` must refuse a row that collides with one already stored for the
/// same doctor and date, atomically with the write. The booking service's
/// own conflict check runs before the insert and cannot close that race.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn find_by_doctor_and_date(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    /// Ordered by date, then start time.
    async fn list(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, AppointmentError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError>;

    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment, AppointmentError>;

    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Option<Appointment>, AppointmentError>;

    /// `false` when nothing matched.
    async fn delete(&self, id: Uuid) -> Result<bool, AppointmentError>;
}

// ==============================================================================
// SUPABASE (POSTGREST) REPOSITORY
// ==============================================================================

const APPOINTMENTS_PATH: &str = "/rest/v1/appointments";

/// Reads and writes the `appointments` table. Double-booking under concurrent
/// writers is closed by a unique index on `(doctor_id, date, start_time)`;
/// PostgREST reports the violation as HTTP 409.
///
/// `start_time` may be a `text` column holding `HH:mm` or a Postgres `time`
/// column; whole-minute `HH:mm:ss` values are read back as `HH:mm`.
pub struct SupabaseAppointmentRepository {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentRepository {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)))
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn fetch(&self, query_parts: Vec<String>) -> Result<Vec<Appointment>, AppointmentError> {
        let mut query_parts = query_parts;
        query_parts.push("order=date.asc,start_time.asc".to_string());
        let path = format!("{}?{}", APPOINTMENTS_PATH, query_parts.join("&"));

        let result: Vec<Value> = self.supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(map_database_error)?;

        parse_rows(result)
    }

    async fn write(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let result: Vec<Value> = self.supabase
            .request_with_headers(
                method,
                path,
                None,
                body,
                Some(SupabaseClient::representation_headers()),
            )
            .await
            .map_err(map_database_error)?;

        parse_rows(result)
    }
}

#[async_trait]
impl AppointmentRepository for SupabaseAppointmentRepository {
    async fn find_by_doctor_and_date(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Fetching appointments for doctor {} on {}", doctor_id, date);

        self.fetch(vec![
            format!("doctor_id=eq.{}", doctor_id),
            format!("date=eq.{}", date),
        ])
        .await
    }

    async fn list(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, AppointmentError> {
        let mut query_parts = Vec::new();

        if let Some(status) = filter.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(date) = filter.date {
            query_parts.push(format!("date=eq.{}", date));
        }
        if let Some(doctor_id) = filter.doctor_id {
            query_parts.push(format!("doctor_id=eq.{}", doctor_id));
        }

        self.fetch(query_parts).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        let mut rows = self.fetch(vec![format!("id=eq.{}", id)]).await?;
        Ok(rows.pop())
    }

    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment, AppointmentError> {
        let body = serde_json::to_value(&appointment)
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to encode appointment: {}", e)))?;

        self.write(Method::POST, APPOINTMENTS_PATH, Some(body))
            .await?
            .pop()
            .ok_or_else(|| AppointmentError::DatabaseError("Insert returned no rows".to_string()))
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS_PATH, id);
        let body = json!({
            "status": status,
            "updated_at": Utc::now().to_rfc3339(),
        });

        Ok(self.write(Method::PATCH, &path, Some(body)).await?.pop())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppointmentError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS_PATH, id);
        Ok(!self.write(Method::DELETE, &path, None).await?.is_empty())
    }
}

fn parse_rows(rows: Vec<Value>) -> Result<Vec<Appointment>, AppointmentError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map(normalize_start_time))
        .collect::<Result<Vec<Appointment>, _>>()
        .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e)))
}

/// Drops zero seconds from a `time` column value. Anything else is left for
/// the scheduling core to accept or reject.
fn normalize_start_time(mut appointment: Appointment) -> Appointment {
    if let Ok(time) = NaiveTime::parse_from_str(appointment.start_time.trim(), "%H:%M:%S") {
        if time.second() == 0 {
            appointment.start_time = time.format("%H:%M").to_string();
        }
    }
    appointment
}

fn map_database_error(error: anyhow::Error) -> AppointmentError {
    match error.downcast_ref::<SupabaseError>() {
        Some(SupabaseError::Conflict(detail)) => {
            warn!("Store rejected overlapping appointment: {}", detail);
            AppointmentError::ConflictDetected
        }
        _ => AppointmentError::DatabaseError(error.to_string()),
    }
}

// ==============================================================================
// IN-MEMORY REPOSITORY
// ==============================================================================

/// Process-local store used when no database is configured, and by tests.
/// Conflict check and insert happen under one write lock.
#[derive(Default)]
pub struct InMemoryAppointmentRepository {
    appointments: RwLock<Vec<Appointment>>,
}

impl InMemoryAppointmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_appointments(appointments: Vec<Appointment>) -> Self {
        Self {
            appointments: RwLock::new(appointments),
        }
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn find_by_doctor_and_date(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.list(AppointmentFilter {
            doctor_id: Some(doctor_id),
            date: Some(date),
            status: None,
        })
        .await
    }

    async fn list(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, AppointmentError> {
        let appointments = self.appointments.read().await;

        let mut matching: Vec<Appointment> = appointments
            .iter()
            .filter(|appointment| filter.matches(appointment))
            .cloned()
            .collect();
        // Zero-padded HH:mm sorts lexically.
        matching.sort_by(|a, b| (a.date, &a.start_time).cmp(&(b.date, &b.start_time)));

        Ok(matching)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        let appointments = self.appointments.read().await;
        Ok(appointments.iter().find(|appointment| appointment.id == id).cloned())
    }

    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment, AppointmentError> {
        let mut appointments = self.appointments.write().await;

        if has_conflict(&appointment, appointments.as_slice())? {
            warn!(
                "Concurrent booking lost the race for doctor {} on {} at {}",
                appointment.doctor_id, appointment.date, appointment.start_time
            );
            return Err(AppointmentError::ConflictDetected);
        }

        let now = Utc::now();
        let stored = Appointment {
            id: Uuid::new_v4(),
            patient_id: appointment.patient_id,
            doctor_id: appointment.doctor_id,
            date: appointment.date,
            start_time: appointment.start_time,
            duration_minutes: appointment.duration_minutes,
            status: appointment.status,
            created_at: now,
            updated_at: now,
        };
        appointments.push(stored.clone());

        Ok(stored)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Option<Appointment>, AppointmentError> {
        let mut appointments = self.appointments.write().await;

        Ok(appointments
            .iter_mut()
            .find(|appointment| appointment.id == id)
            .map(|appointment| {
                appointment.status = status;
                appointment.updated_at = Utc::now();
                appointment.clone()
            }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppointmentError> {
        let mut appointments = self.appointments.write().await;
        let before = appointments.len();
        appointments.retain(|appointment| appointment.id != id);

        Ok(appointments.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn new_appointment(doctor_id: Uuid, start: &str) -> NewAppointment {
        NewAppointment {
            patient_id: Uuid::new_v4(),
            doctor_id,
            date: day(),
            start_time: start.to_string(),
            duration_minutes: 20,
            status: AppointmentStatus::Pending,
        }
    }

    fn stored(doctor_id: Uuid, start: &str) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id,
            date: day(),
            start_time: start.to_string(),
            duration_minutes: 20,
            status: AppointmentStatus::Confirmed,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_seeded_rows_block_overlapping_insert() {
        let doctor = Uuid::new_v4();
        let seeded = stored(doctor, "09:00");
        let repository = InMemoryAppointmentRepository::with_appointments(vec![seeded.clone()]);

        assert_matches!(
            repository.insert(new_appointment(doctor, "09:10")).await,
            Err(AppointmentError::ConflictDetected)
        );
        assert_eq!(repository.find_by_id(seeded.id).await.unwrap(), Some(seeded));
        assert!(repository.insert(new_appointment(doctor, "09:20")).await.is_ok());
    }

    #[test]
    fn test_time_column_values_read_back_as_minutes() {
        let doctor = Uuid::new_v4();
        let row = serde_json::to_value(stored(doctor, "09:00:00")).unwrap();
        let with_seconds = serde_json::to_value(stored(doctor, "09:00:30")).unwrap();
        let plain = serde_json::to_value(stored(doctor, "14:20")).unwrap();

        let rows = parse_rows(vec![row, with_seconds, plain]).unwrap();
        let starts: Vec<&str> = rows.iter().map(|a| a.start_time.as_str()).collect();

        assert_eq!(starts, vec!["09:00", "09:00:30", "14:20"]);
    }

    #[tokio::test]
    async fn test_insert_and_find_by_day() {
        let repository = InMemoryAppointmentRepository::new();
        let doctor = Uuid::new_v4();

        repository.insert(new_appointment(doctor, "10:00")).await.unwrap();
        repository.insert(new_appointment(doctor, "09:00")).await.unwrap();
        repository.insert(new_appointment(Uuid::new_v4(), "09:00")).await.unwrap();

        let rows = repository.find_by_doctor_and_date(doctor, day()).await.unwrap();
        let starts: Vec<&str> = rows.iter().map(|a| a.start_time.as_str()).collect();
        assert_eq!(starts, vec!["09:00", "10:00"]);
    }

    #[tokio::test]
    async fn test_insert_rejects_overlap_atomically() {
        let repository = Arc::new(InMemoryAppointmentRepository::new());
        let doctor = Uuid::new_v4();

        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let repository = Arc::clone(&repository);
                tokio::spawn(async move { repository.insert(new_appointment(doctor, "09:00")).await })
            })
            .collect();

        let mut booked = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(_) => booked += 1,
                Err(e) => assert_matches!(e, AppointmentError::ConflictDetected),
            }
        }

        assert_eq!(booked, 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let repository = InMemoryAppointmentRepository::new();
        let stored = repository.insert(new_appointment(Uuid::new_v4(), "11:00")).await.unwrap();

        let updated = repository
            .update_status(stored.id, AppointmentStatus::Confirmed)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, AppointmentStatus::Confirmed);

        let confirmed = repository
            .list(AppointmentFilter { status: Some(AppointmentStatus::Confirmed), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(confirmed.len(), 1);

        assert!(repository.delete(stored.id).await.unwrap());
        assert!(!repository.delete(stored.id).await.unwrap());
        assert!(repository.find_by_id(stored.id).await.unwrap().is_none());
        assert!(repository.update_status(stored.id, AppointmentStatus::Confirmed).await.unwrap().is_none());
    }
}
