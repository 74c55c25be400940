use std::sync::Arc;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt;
use serde_json::{json, Value};
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, query_param};
use assert_matches::assert_matches;

use directory_cell::models::DirectoryError;
use directory_cell::router::directory_routes;
use directory_cell::services::repository::{DirectoryRepository, SupabaseDirectoryRepository};
use shared_config::AppConfig;
use shared_utils::test_utils::{TestConfig, TestUser, JwtTestUtils, MockSupabaseResponses};

fn test_config(mock_server: &MockServer) -> AppConfig {
    TestConfig {
        supabase_url: mock_server.uri(),
        ..Default::default()
    }
    .to_app_config()
}

fn create_test_app(config: AppConfig) -> Router {
    directory_routes(Arc::new(config))
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_specialties_read_from_doctors_table() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("select", "specialty"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "specialty": "Pediatria" },
            { "specialty": "Cardiologia" },
            { "specialty": "Pediatria" },
            { "specialty": null }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(test_config(&mock_server));
    let response = app
        .oneshot(Request::builder().uri("/doctors/specialties").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["specialties"], json!(["Cardiologia", "Pediatria"]));
}

#[tokio::test]
async fn test_specialty_filter_is_encoded() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("specialty", "eq.Clínica Geral"))
        .and(query_param("order", "full_name.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_row("Carla Dias", "Clínica Geral")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let repository = SupabaseDirectoryRepository::new(&config);
    let doctors = repository.doctors_by_specialty("Clínica Geral").await.unwrap();

    assert_eq!(doctors.len(), 1);
    assert_eq!(doctors[0].full_name, "Carla Dias");
}

#[tokio::test]
async fn test_patient_by_cpf_from_patients_table() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let secretary = TestUser::secretary("desk@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("cpf", "eq.12345678909"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_row("Maria Souza", "12345678909")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let token = JwtTestUtils::create_test_token(&secretary, &config.supabase_jwt_secret, None);
    let app = create_test_app(config);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/patients/cpf/123.456.789-09")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["full_name"], "Maria Souza");
    assert_eq!(body["state"], "SP");
}

#[tokio::test]
async fn test_invalid_cpf_never_queries() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let secretary = TestUser::secretary("desk@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let token = JwtTestUtils::create_test_token(&secretary, &config.supabase_jwt_secret, None);
    let app = create_test_app(config);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/patients/cpf/1234")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_directory_database_failure_is_server_error() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let repository = SupabaseDirectoryRepository::new(&config);
    assert_matches!(
        repository.doctors_by_specialty("Cardiologia").await,
        Err(DirectoryError::DatabaseError(_))
    );

    let app = create_test_app(config);
    let response = app
        .oneshot(Request::builder().uri("/doctors?specialty=Cardiologia").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
