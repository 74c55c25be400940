// libs/directory-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::get,
    middleware,
};
use tracing::warn;

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, DirectoryState};
use crate::services::directory::DirectoryService;
use crate::services::repository::{
    DirectoryRepository, InMemoryDirectoryRepository, SupabaseDirectoryRepository,
};

pub fn directory_routes(state: Arc<AppConfig>) -> Router {
    let repository: Arc<dyn DirectoryRepository> = if state.is_database_configured() {
        Arc::new(SupabaseDirectoryRepository::new(&state))
    } else {
        warn!("Supabase not configured, doctor and patient directory is empty");
        Arc::new(InMemoryDirectoryRepository::new())
    };

    directory_routes_with_repository(state, repository)
}

pub fn directory_routes_with_repository(
    config: Arc<AppConfig>,
    repository: Arc<dyn DirectoryRepository>,
) -> Router {
    let app_state = Arc::new(DirectoryState {
        directory: DirectoryService::new(repository),
    });

    let public_routes = Router::new()
        .route("/doctors", get(handlers::get_doctors_by_specialty))
        .route("/doctors/specialties", get(handlers::get_specialties));

    let protected_routes = Router::new()
        .route("/patients/cpf/{cpf}", get(handlers::get_patient_by_cpf))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state)
}
