// Appointment Cell - booking, conflict detection and slot availability
pub mod handlers;
pub mod router;
pub mod models;
pub mod services;

pub use models::{
    Appointment, AppointmentCandidate, AppointmentError, AppointmentFilter, AppointmentStatus,
    BookAppointmentRequest, NewAppointment, SchedulingError, DEFAULT_DURATION_MINUTES,
};

pub use router::{appointment_routes, appointment_routes_with_repository};

pub use services::{
    available_slots, has_conflict, overlaps, parse_time, AppointmentBookingService,
    AppointmentRepository, InMemoryAppointmentRepository, Interval, SupabaseAppointmentRepository,
    WorkingHours,
};
