use uuid::Uuid;
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

use doctor_cell::router::{admin_doctor_routes, doctor_routes, public_doctor_routes, review_routes};
use shared_config::AppConfig;
use shared_utils::test_utils::{TestConfig, TestUser, JwtTestUtils, MockSupabaseResponses};

fn create_test_app(config: AppConfig) -> Router {
    let state = Arc::new(config);
    Router::new()
        .nest("/api/doctor", public_doctor_routes(state.clone()).merge(doctor_routes(state.clone())))
        .nest("/api/admin", admin_doctor_routes(state.clone()))
        .nest("/api/user", review_routes(state))
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn mock_signed_in(server: &MockServer, user: &TestUser) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/user_profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([user.profile_row()])))
        .mount(server)
        .await;
}

fn post_json(uri: &str, bearer: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", bearer)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_list_doctors_by_speciality() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("specialization", "eq.General physician"))
        .and(query_param("is_available", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(&Uuid::new_v4().to_string(), &Uuid::new_v4().to_string()),
            MockSupabaseResponses::doctor_response(&Uuid::new_v4().to_string(), &Uuid::new_v4().to_string()),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let response = app.oneshot(Request::builder()
        .uri("/api/doctor/list?speciality=General%20physician&available_only=true")
        .body(Body::empty())
        .unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_specialities_are_distinct_and_sorted() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("select", "specialization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "specialization": "Neurologist" },
            { "specialization": "Dermatologist" },
            { "specialization": "Neurologist" },
            { "specialization": " " }
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let response = app.oneshot(Request::builder()
        .uri("/api/doctor/specialities")
        .body(Body::empty())
        .unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"], json!(["Dermatologist", "Neurologist"]));
}

#[tokio::test]
async fn test_unknown_doctor_is_not_found() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let response = app.oneshot(Request::builder()
        .uri(format!("/api/doctor/details/{}", Uuid::new_v4()))
        .body(Body::empty())
        .unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["message"], "Doctor not found");
}

#[tokio::test]
async fn test_add_doctor_as_admin() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let admin = TestUser::admin("admin@clinic.com");
    let bearer = JwtTestUtils::bearer(&admin, &config.supabase_jwt_secret);
    let new_user_id = Uuid::new_v4().to_string();
    let doctor_id = Uuid::new_v4().to_string();

    mock_signed_in(&mock_server, &admin).await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/admin/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": new_user_id, "email": "meera@clinic.com", "user_metadata": {}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/user_profiles"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::user_profile_response(&new_user_id, "meera@clinic.com", "doctor")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::doctor_response(&doctor_id, &new_user_id)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let response = app.oneshot(post_json("/api/admin/add-doctor", &bearer, json!({
        "name": "Dr. Meera Shah",
        "email": "meera@clinic.com",
        "password": "longenough",
        "speciality": "General physician",
        "degree": "MBBS",
        "experience": "10",
        "fees": 500,
        "about": "Family medicine"
    }))).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Doctor added");
    assert_eq!(json["data"]["id"], doctor_id);
}

#[tokio::test]
async fn test_add_doctor_duplicate_email() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let admin = TestUser::admin("admin@clinic.com");
    let bearer = JwtTestUtils::bearer(&admin, &config.supabase_jwt_secret);

    mock_signed_in(&mock_server, &admin).await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/admin/users"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "msg": "A user with this email address has already been registered"
        })))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let response = app.oneshot(post_json("/api/admin/add-doctor", &bearer, json!({
        "name": "Dr. Meera Shah",
        "email": "meera@clinic.com",
        "password": "longenough",
        "speciality": "General physician",
        "degree": "MBBS",
        "experience": 10,
        "fees": 500
    }))).await.unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["message"], "Doctor with this email already exists");
}

#[tokio::test]
async fn test_add_doctor_validates_experience() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let admin = TestUser::admin("admin@clinic.com");
    let bearer = JwtTestUtils::bearer(&admin, &config.supabase_jwt_secret);

    mock_signed_in(&mock_server, &admin).await;

    let app = create_test_app(config);
    let response = app.oneshot(post_json("/api/admin/add-doctor", &bearer, json!({
        "name": "Dr. Meera Shah",
        "email": "meera@clinic.com",
        "password": "longenough",
        "speciality": "General physician",
        "degree": "MBBS",
        "experience": 90,
        "fees": 500
    }))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Experience must be a number between 0 and 70");
}

#[tokio::test]
async fn test_add_doctor_requires_admin() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let patient = TestUser::patient("jane@example.com");
    let bearer = JwtTestUtils::bearer(&patient, &config.supabase_jwt_secret);

    mock_signed_in(&mock_server, &patient).await;

    let app = create_test_app(config);
    let response = app.oneshot(post_json("/api/admin/add-doctor", &bearer, json!({}))).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["message"], "Insufficient permissions");
}

#[tokio::test]
async fn test_doctor_toggles_own_availability() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let doctor_user = TestUser::doctor("doc@clinic.com");
    let bearer = JwtTestUtils::bearer(&doctor_user, &config.supabase_jwt_secret);
    let doctor_id = Uuid::new_v4().to_string();

    mock_signed_in(&mock_server, &doctor_user).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("user_id", format!("eq.{}", doctor_user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(&doctor_id, &doctor_user.id)
        ])))
        .mount(&mock_server)
        .await;

    let mut unavailable = MockSupabaseResponses::doctor_response(&doctor_id, &doctor_user.id);
    unavailable["is_available"] = json!(false);
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([unavailable])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let response = app.oneshot(post_json("/api/doctor/change-availability", &bearer, json!({}))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["is_available"], false);
}

async fn mock_appointment(server: &MockServer, appointment_id: &str, patient_id: &str, doctor_id: &str, status: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(appointment_id, patient_id, doctor_id, status)
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_review_requires_completed_appointment() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let patient = TestUser::patient("jane@example.com");
    let bearer = JwtTestUtils::bearer(&patient, &config.supabase_jwt_secret);
    let appointment_id = Uuid::new_v4().to_string();

    mock_signed_in(&mock_server, &patient).await;
    mock_appointment(&mock_server, &appointment_id, &patient.id, &Uuid::new_v4().to_string(), "scheduled").await;

    let app = create_test_app(config);
    let response = app.oneshot(post_json("/api/user/add-review", &bearer, json!({
        "appointmentId": appointment_id,
        "rating": 5
    }))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Only completed appointments can be reviewed");
}

#[tokio::test]
async fn test_review_of_foreign_appointment_is_forbidden() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let patient = TestUser::patient("jane@example.com");
    let bearer = JwtTestUtils::bearer(&patient, &config.supabase_jwt_secret);
    let appointment_id = Uuid::new_v4().to_string();

    mock_signed_in(&mock_server, &patient).await;
    mock_appointment(
        &mock_server,
        &appointment_id,
        &Uuid::new_v4().to_string(),
        &Uuid::new_v4().to_string(),
        "completed",
    ).await;

    let app = create_test_app(config);
    let response = app.oneshot(post_json("/api/user/add-review", &bearer, json!({
        "appointment_id": appointment_id,
        "rating": 4
    }))).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_review_is_stored_and_rating_updated() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let patient = TestUser::patient("jane@example.com");
    let bearer = JwtTestUtils::bearer(&patient, &config.supabase_jwt_secret);
    let appointment_id = Uuid::new_v4().to_string();
    let doctor_id = Uuid::new_v4().to_string();

    mock_signed_in(&mock_server, &patient).await;
    mock_appointment(&mock_server, &appointment_id, &patient.id, &doctor_id, "completed").await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/reviews"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "patient_id": patient.id,
            "doctor_id": doctor_id,
            "appointment_id": appointment_id,
            "rating": 4,
            "review_text": "Very patient and thorough",
            "created_at": "2030-01-16T10:00:00Z"
        }])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(&doctor_id, &Uuid::new_v4().to_string())
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(&doctor_id, &Uuid::new_v4().to_string())
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let response = app.oneshot(post_json("/api/user/add-review", &bearer, json!({
        "appointment_id": appointment_id,
        "rating": "4",
        "review_text": "Very patient and thorough"
    }))).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["data"]["rating"], 4);
}

#[tokio::test]
async fn test_second_review_conflicts() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let patient = TestUser::patient("jane@example.com");
    let bearer = JwtTestUtils::bearer(&patient, &config.supabase_jwt_secret);
    let appointment_id = Uuid::new_v4().to_string();
    let doctor_id = Uuid::new_v4().to_string();

    mock_signed_in(&mock_server, &patient).await;
    mock_appointment(&mock_server, &appointment_id, &patient.id, &doctor_id, "completed").await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "patient_id": patient.id,
            "doctor_id": doctor_id,
            "appointment_id": appointment_id,
            "rating": 5,
            "review_text": null,
            "created_at": "2030-01-16T10:00:00Z"
        }])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let response = app.oneshot(post_json("/api/user/add-review", &bearer, json!({
        "appointment_id": appointment_id,
        "rating": 5
    }))).await.unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["message"], "You have already reviewed this appointment");
}
