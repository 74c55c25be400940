// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
    middleware,
};
use tracing::{info, warn};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, AppointmentState};
use crate::services::booking::AppointmentBookingService;
use crate::services::repository::{
    AppointmentRepository, InMemoryAppointmentRepository, SupabaseAppointmentRepository,
};

/// Routes backed by Supabase, or by a process-local store when the database
/// is not configured.
pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    let repository: Arc<dyn AppointmentRepository> = if state.is_database_configured() {
        info!("Appointment storage: Supabase at {}", state.supabase_url);
        Arc::new(SupabaseAppointmentRepository::new(&state))
    } else {
        warn!("Supabase not configured, appointments are kept in memory only");
        Arc::new(InMemoryAppointmentRepository::new())
    };

    appointment_routes_with_repository(state, repository)
}

pub fn appointment_routes_with_repository(
    config: Arc<AppConfig>,
    repository: Arc<dyn AppointmentRepository>,
) -> Router {
    let app_state = Arc::new(AppointmentState {
        booking: AppointmentBookingService::new(repository),
    });

    let public_routes = Router::new()
        .route("/availability", get(handlers::get_available_slots));

    let protected_routes = Router::new()
        .route("/", post(handlers::book_appointment).get(handlers::list_appointments))
        .route("/pending", get(handlers::list_pending_appointments))
        .route("/confirmed", get(handlers::list_confirmed_appointments))
        .route("/date/{date}", get(handlers::list_appointments_by_date))
        .route("/conflicts/check", get(handlers::check_appointment_conflicts))
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment)
                .patch(handlers::update_appointment_status)
                .delete(handlers::delete_appointment),
        )
        .route("/{appointment_id}/confirm", put(handlers::confirm_appointment))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state)
}
