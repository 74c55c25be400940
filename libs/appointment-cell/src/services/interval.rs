// libs/appointment-cell/src/services/interval.rs
//! Minutes-from-midnight intervals. Every overlap decision in the cell goes
//! through [`overlaps`].

use chrono::{NaiveDate, NaiveTime, Timelike};
use uuid::Uuid;

use crate::models::{Appointment, AppointmentCandidate, NewAppointment, SchedulingError};

/// Half-open `[start, end)` range of minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    start: i32,
    end: i32,
}

impl Interval {
    pub fn new(start_minutes: i32, duration_minutes: i32) -> Result<Self, SchedulingError> {
        if duration_minutes <= 0 {
            return Err(SchedulingError::InvalidDuration(duration_minutes));
        }
        let end = start_minutes
            .checked_add(duration_minutes)
            .ok_or(SchedulingError::InvalidDuration(duration_minutes))?;

        Ok(Self { start: start_minutes, end })
    }

    /// Builds the interval of an `HH:mm` start time.
    pub fn from_start_time(start_time: &str, duration_minutes: i32) -> Result<Self, SchedulingError> {
        let start = parse_time(start_time)?;
        Self::new(start, duration_minutes)
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn duration(&self) -> i32 {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        overlaps(self, other)
    }
}

/// Parses `HH:mm` into minutes since midnight.
pub fn parse_time(text: &str) -> Result<i32, SchedulingError> {
    let time = NaiveTime::parse_from_str(text.trim(), "%H:%M")
        .map_err(|_| SchedulingError::InvalidTimeFormat(text.to_string()))?;

    Ok((time.hour() * 60 + time.minute()) as i32)
}

/// Formats minutes since midnight as `HH:mm`.
pub fn format_time(minutes: i32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// `a.start < b.end && b.start < a.end`; touching intervals do not overlap.
pub fn overlaps(a: &Interval, b: &Interval) -> bool {
    a.start < b.end && b.start < a.end
}

/// Anything that occupies a doctor's time on a given day.
pub trait Scheduled {
    fn doctor_id(&self) -> Uuid;
    fn date(&self) -> NaiveDate;
    fn start_time(&self) -> &str;
    fn duration_minutes(&self) -> i32;

    fn interval(&self) -> Result<Interval, SchedulingError> {
        Interval::from_start_time(self.start_time(), self.duration_minutes())
    }

    fn same_day_as<S: Scheduled + ?Sized>(&self, other: &S) -> bool {
        self.doctor_id() == other.doctor_id() && self.date() == other.date()
    }
}

macro_rules! impl_scheduled {
    ($($ty:ty),*) => {
        $(
            impl Scheduled for $ty {
                fn doctor_id(&self) -> Uuid {
                    self.doctor_id
                }

                fn date(&self) -> NaiveDate {
                    self.date
                }

                fn start_time(&self) -> &str {
                    &self.start_time
                }

                fn duration_minutes(&self) -> i32 {
                    self.duration_minutes
                }
            }
        )*
    };
}

impl_scheduled!(Appointment, AppointmentCandidate, NewAppointment);
