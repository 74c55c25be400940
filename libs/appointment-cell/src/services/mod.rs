pub mod interval;
pub mod conflict;
pub mod availability;
pub mod repository;
pub mod booking;

pub use availability::{available_slots, WorkingHours};
pub use booking::AppointmentBookingService;
pub use conflict::{find_conflicts, has_conflict};
pub use interval::{format_time, overlaps, parse_time, Interval, Scheduled};
pub use repository::{
    AppointmentRepository, InMemoryAppointmentRepository, SupabaseAppointmentRepository,
};
