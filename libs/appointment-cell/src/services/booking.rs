// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentCandidate, AppointmentError, AppointmentFilter, AppointmentStatus,
    BookAppointmentRequest, ConflictCheckResponse, NewAppointment,
};
use crate::services::availability::{available_slots, WorkingHours};
use crate::services::conflict::{find_conflicts, has_conflict};
use crate::services::interval::{format_time, Scheduled};
use crate::services::repository::AppointmentRepository;

/// Booking and querying on top of the pure scheduling functions. Each call
/// fetches a fresh copy of the doctor's day; nothing is cached between calls.
#[derive(Clone)]
pub struct AppointmentBookingService {
    repository: Arc<dyn AppointmentRepository>,
    working_hours: WorkingHours,
}

impl AppointmentBookingService {
    pub fn new(repository: Arc<dyn AppointmentRepository>) -> Self {
        Self::with_working_hours(repository, WorkingHours::STANDARD)
    }

    pub fn with_working_hours(repository: Arc<dyn AppointmentRepository>, working_hours: WorkingHours) -> Self {
        Self { repository, working_hours }
    }

    /// Validate, check working hours, check conflicts, then insert as pending.
    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let candidate = request.to_candidate();
        info!("Booking appointment for patient {} with doctor {} on {} at {}",
              request.patient_id, candidate.doctor_id, candidate.date, candidate.start_time);

        // Malformed input fails here, before any I/O.
        let interval = candidate.interval()?;
        if !self.working_hours.contains(&interval) {
            warn!("Rejected booking outside working hours: {} for {} minutes",
                  candidate.start_time, candidate.duration_minutes);
            return Err(self.outside_working_hours());
        }

        let existing = self.repository
            .find_by_doctor_and_date(candidate.doctor_id, candidate.date)
            .await?;

        if has_conflict(&candidate, &existing)? {
            warn!("Conflict detected for doctor {} on {} at {}",
                  candidate.doctor_id, candidate.date, candidate.start_time);
            return Err(AppointmentError::ConflictDetected);
        }

        let appointment = self.repository
            .insert(NewAppointment {
                patient_id: request.patient_id,
                doctor_id: candidate.doctor_id,
                date: candidate.date,
                // Canonical zero-padded HH:mm
                start_time: format_time(interval.start()),
                duration_minutes: candidate.duration_minutes,
                status: AppointmentStatus::Pending,
            })
            .await?;

        info!("Appointment {} booked", appointment.id);
        Ok(appointment)
    }

    /// Free `HH:mm` slot starts for the doctor's day.
    pub async fn available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<String>, AppointmentError> {
        debug!("Calculating available slots for doctor {} on {}", doctor_id, date);

        let existing = self.repository.find_by_doctor_and_date(doctor_id, date).await?;
        let slots = available_slots(doctor_id, date, &existing, &self.working_hours)?;

        debug!("{} of {} slots free for doctor {} on {}",
               slots.len(), self.working_hours.slots().count(), doctor_id, date);
        Ok(slots)
    }

    /// Read-only conflict report for a prospective appointment.
    pub async fn check_conflicts(
        &self,
        candidate: AppointmentCandidate,
    ) -> Result<ConflictCheckResponse, AppointmentError> {
        let interval = candidate.interval()?;

        let existing = self.repository
            .find_by_doctor_and_date(candidate.doctor_id, candidate.date)
            .await?;
        let conflicting_appointments: Vec<Appointment> = find_conflicts(&candidate, &existing)?
            .into_iter()
            .cloned()
            .collect();

        Ok(ConflictCheckResponse {
            has_conflict: !conflicting_appointments.is_empty(),
            within_working_hours: self.working_hours.contains(&interval),
            conflicting_appointments,
        })
    }

    pub async fn list_appointments(
        &self,
        filter: AppointmentFilter,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Listing appointments with filter {:?}", filter);
        self.repository.list(filter).await
    }

    pub async fn get_appointment(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(id).await?;

        if !current.status.can_transition_to(status) {
            warn!("Invalid status transition attempted: {} -> {}", current.status, status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: current.status,
                to: status,
            });
        }
        if current.status == status {
            return Ok(current);
        }

        let updated = self.repository
            .update_status(id, status)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        info!("Appointment {} moved from {} to {}", id, current.status, status);
        Ok(updated)
    }

    pub async fn confirm_appointment(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        self.update_status(id, AppointmentStatus::Confirmed).await
    }

    pub async fn delete_appointment(&self, id: Uuid) -> Result<(), AppointmentError> {
        if !self.repository.delete(id).await? {
            return Err(AppointmentError::NotFound);
        }

        info!("Appointment {} removed", id);
        Ok(())
    }

    fn outside_working_hours(&self) -> AppointmentError {
        AppointmentError::OutsideWorkingHours {
            start: self.working_hours.start_label(),
            end: self.working_hours.end_label(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use mockall::predicate::eq;

    use crate::models::SchedulingError;
    use crate::services::repository::MockAppointmentRepository;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn stored(doctor_id: Uuid, start: &str, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id,
            date: day(),
            start_time: start.to_string(),
            duration_minutes: 20,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn request(doctor_id: Uuid, start: &str, duration: Option<i32>) -> BookAppointmentRequest {
        BookAppointmentRequest {
            patient_id: Uuid::new_v4(),
            doctor_id,
            date: day(),
            start_time: start.to_string(),
            duration_minutes: duration,
        }
    }

    fn service(repository: MockAppointmentRepository) -> AppointmentBookingService {
        AppointmentBookingService::new(Arc::new(repository))
    }

    #[tokio::test]
    async fn test_book_inserts_pending_with_default_duration() {
        let doctor = Uuid::new_v4();
        let mut repository = MockAppointmentRepository::new();
        repository
            .expect_find_by_doctor_and_date()
            .with(eq(doctor), eq(day()))
            .times(1)
            .returning(move |doctor_id, _| Ok(vec![stored(doctor_id, "09:00", AppointmentStatus::Confirmed)]));
        repository
            .expect_insert()
            .withf(|new| new.start_time == "09:20"
                && new.duration_minutes == 20
                && new.status == AppointmentStatus::Pending)
            .times(1)
            .returning(|new| {
                let mut appointment = stored(new.doctor_id, &new.start_time, new.status);
                appointment.patient_id = new.patient_id;
                Ok(appointment)
            });

        let appointment = service(repository)
            .book_appointment(request(doctor, "09:20", None))
            .await
            .unwrap();

        assert_eq!(appointment.start_time, "09:20");
        assert_eq!(appointment.status, AppointmentStatus::Pending);
    }

    #[tokio::test]
    async fn test_book_conflict_never_inserts() {
        let doctor = Uuid::new_v4();
        let mut repository = MockAppointmentRepository::new();
        repository
            .expect_find_by_doctor_and_date()
            .returning(move |doctor_id, _| Ok(vec![stored(doctor_id, "09:00", AppointmentStatus::Pending)]));
        repository.expect_insert().never();

        let result = service(repository)
            .book_appointment(request(doctor, "09:10", Some(20)))
            .await;

        assert_matches!(result, Err(AppointmentError::ConflictDetected));
    }

    #[tokio::test]
    async fn test_book_validation_happens_before_fetch() {
        let mut repository = MockAppointmentRepository::new();
        repository.expect_find_by_doctor_and_date().never();
        repository.expect_insert().never();
        let service = service(repository);

        assert_matches!(
            service.book_appointment(request(Uuid::new_v4(), "9h00", None)).await,
            Err(AppointmentError::Scheduling(SchedulingError::InvalidTimeFormat(_)))
        );
        assert_matches!(
            service.book_appointment(request(Uuid::new_v4(), "09:00", Some(-5))).await,
            Err(AppointmentError::Scheduling(SchedulingError::InvalidDuration(-5)))
        );
        assert_matches!(
            service.book_appointment(request(Uuid::new_v4(), "16:50", Some(20))).await,
            Err(AppointmentError::OutsideWorkingHours { .. })
        );
        assert_matches!(
            service.book_appointment(request(Uuid::new_v4(), "07:40", Some(20))).await,
            Err(AppointmentError::OutsideWorkingHours { .. })
        );
    }

    #[tokio::test]
    async fn test_book_maps_store_race_to_conflict() {
        let mut repository = MockAppointmentRepository::new();
        repository.expect_find_by_doctor_and_date().returning(|_, _| Ok(vec![]));
        repository.expect_insert().returning(|_| Err(AppointmentError::ConflictDetected));

        let result = service(repository)
            .book_appointment(request(Uuid::new_v4(), "10:00", None))
            .await;

        assert_matches!(result, Err(AppointmentError::ConflictDetected));
    }

    #[tokio::test]
    async fn test_available_slots_uses_fresh_fetch() {
        let doctor = Uuid::new_v4();
        let mut repository = MockAppointmentRepository::new();
        repository
            .expect_find_by_doctor_and_date()
            .times(2)
            .returning(move |doctor_id, _| Ok(vec![stored(doctor_id, "09:00", AppointmentStatus::Pending)]));
        let service = service(repository);

        let first = service.available_slots(doctor, day()).await.unwrap();
        let second = service.available_slots(doctor, day()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 26);
        assert!(!first.contains(&"09:00".to_string()));
    }

    #[tokio::test]
    async fn test_check_conflicts_report() {
        let doctor = Uuid::new_v4();
        let mut repository = MockAppointmentRepository::new();
        repository
            .expect_find_by_doctor_and_date()
            .returning(move |doctor_id, _| Ok(vec![
                stored(doctor_id, "16:40", AppointmentStatus::Pending),
                stored(doctor_id, "08:00", AppointmentStatus::Pending),
            ]));

        let report = service(repository)
            .check_conflicts(AppointmentCandidate {
                doctor_id: doctor,
                date: day(),
                start_time: "16:50".to_string(),
                duration_minutes: 20,
            })
            .await
            .unwrap();

        assert!(report.has_conflict);
        assert!(!report.within_working_hours);
        assert_eq!(report.conflicting_appointments.len(), 1);
        assert_eq!(report.conflicting_appointments[0].start_time, "16:40");
    }

    #[tokio::test]
    async fn test_confirm_pending_appointment() {
        let appointment = stored(Uuid::new_v4(), "09:00", AppointmentStatus::Pending);
        let id = appointment.id;
        let mut repository = MockAppointmentRepository::new();
        let found = appointment.clone();
        repository
            .expect_find_by_id()
            .with(eq(id))
            .returning(move |_| Ok(Some(found.clone())));
        repository
            .expect_update_status()
            .with(eq(id), eq(AppointmentStatus::Confirmed))
            .times(1)
            .returning(move |_, status| {
                let mut updated = appointment.clone();
                updated.status = status;
                Ok(Some(updated))
            });

        let confirmed = service(repository).confirm_appointment(id).await.unwrap();
        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_confirmed_cannot_return_to_pending() {
        let appointment = stored(Uuid::new_v4(), "09:00", AppointmentStatus::Confirmed);
        let id = appointment.id;
        let mut repository = MockAppointmentRepository::new();
        repository
            .expect_find_by_id()
            .returning(move |_| Ok(Some(appointment.clone())));
        repository.expect_update_status().never();
        let service = service(repository);

        assert_matches!(
            service.update_status(id, AppointmentStatus::Pending).await,
            Err(AppointmentError::InvalidStatusTransition {
                from: AppointmentStatus::Confirmed,
                to: AppointmentStatus::Pending,
            })
        );
        // Re-confirming is a no-op without a write.
        assert_eq!(
            service.confirm_appointment(id).await.unwrap().status,
            AppointmentStatus::Confirmed
        );
    }

    #[tokio::test]
    async fn test_missing_appointment_is_not_found() {
        let mut repository = MockAppointmentRepository::new();
        repository.expect_find_by_id().returning(|_| Ok(None));
        repository.expect_delete().returning(|_| Ok(false));
        let service = service(repository);

        assert_matches!(service.get_appointment(Uuid::new_v4()).await, Err(AppointmentError::NotFound));
        assert_matches!(service.confirm_appointment(Uuid::new_v4()).await, Err(AppointmentError::NotFound));
        assert_matches!(service.delete_appointment(Uuid::new_v4()).await, Err(AppointmentError::NotFound));
    }
}
