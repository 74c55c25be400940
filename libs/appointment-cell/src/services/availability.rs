// libs/appointment-cell/src/services/availability.rs
//! Free-slot enumeration over the clinic's working day.
//!
//! Slots are recomputed from the fetched appointments on every call. The scan
//! is O(slots x existing), which is fine for a 27-slot day; a sorted sweep
//! over the existing intervals would be the path for dense calendars.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::SchedulingError;
use crate::services::conflict::interval_has_conflict;
use crate::services::interval::{format_time, Interval, Scheduled};

pub const WORKDAY_START_MINUTES: i32 = 8 * 60;
pub const WORKDAY_END_MINUTES: i32 = 17 * 60;
pub const SLOT_GRANULARITY_MINUTES: i32 = 20;

/// Daily bookable window, in minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingHours {
    pub start: i32,
    pub end: i32,
    pub granularity: i32,
}

impl WorkingHours {
    /// 08:00 to 17:00 in 20-minute slots.
    pub const STANDARD: WorkingHours = WorkingHours {
        start: WORKDAY_START_MINUTES,
        end: WORKDAY_END_MINUTES,
        granularity: SLOT_GRANULARITY_MINUTES,
    };

    /// Whether `interval` starts and ends inside the working day.
    pub fn contains(&self, interval: &Interval) -> bool {
        interval.start() >= self.start && interval.end() <= self.end
    }

    /// Slot intervals in ascending order. A trailing remainder shorter than
    /// the granularity is not offered.
    pub fn slots(&self) -> impl Iterator<Item = Interval> + '_ {
        let step = self.granularity.max(1);

        (self.start..self.end)
            .step_by(step as usize)
            .filter(move |start| start.checked_add(step).is_some_and(|end| end <= self.end))
            .filter_map(move |start| Interval::new(start, step).ok())
    }

    pub fn start_label(&self) -> String {
        format_time(self.start)
    }

    pub fn end_label(&self) -> String {
        format_time(self.end)
    }
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Start times (`HH:mm`, ascending) of every working-hours slot that does not
/// overlap an appointment of `doctor_id` on `date`.
///
/// Stored rows are validated before any slot is tested; one malformed row
/// fails the whole call.
pub fn available_slots<E: Scheduled>(
    doctor_id: Uuid,
    date: NaiveDate,
    existing: &[E],
    hours: &WorkingHours,
) -> Result<Vec<String>, SchedulingError> {
    let booked = existing
        .iter()
        .filter(|entry| entry.doctor_id() == doctor_id && entry.date() == date)
        .map(|entry| entry.interval())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(hours
        .slots()
        .filter(|slot| !interval_has_conflict(slot, &booked))
        .map(|slot| format_time(slot.start()))
        .collect())
}
