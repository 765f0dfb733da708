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

use appointment_cell::router::{admin_appointment_routes, doctor_appointment_routes, patient_appointment_routes};
use security_cell::RateLimiters;
use shared_config::AppConfig;
use shared_utils::test_utils::{TestConfig, TestUser, JwtTestUtils, MockSupabaseResponses};

fn create_test_app(config: AppConfig) -> Router {
    let limiters = RateLimiters::from_config(&config);
    let state = Arc::new(config);
    Router::new()
        .nest("/api/user", patient_appointment_routes(state.clone(), &limiters))
        .nest("/api/doctor", doctor_appointment_routes(state.clone()))
        .nest("/api/admin", admin_appointment_routes(state))
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
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

fn get(uri: &str, bearer: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", bearer)
        .body(Body::empty())
        .unwrap()
}

struct Fixture {
    server: MockServer,
    config: AppConfig,
    user: TestUser,
    bearer: String,
}

async fn signed_in(user: TestUser) -> Fixture {
    let server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&server.uri()).to_app_config();
    let bearer = JwtTestUtils::bearer(&user, &config.supabase_jwt_secret);

    Mock::given(method("GET"))
        .and(path("/rest/v1/user_profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([user.profile_row()])))
        .mount(&server)
        .await;

    Fixture { server, config, user, bearer }
}

async fn mock_doctor(server: &MockServer, doctor: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([doctor])))
        .mount(server)
        .await;
}

async fn mock_slot(server: &MockServer, held: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "neq.cancelled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(held))
        .mount(server)
        .await;
}

fn booking(doctor_id: &str) -> Value {
    json!({
        "docId": doctor_id,
        "slotDate": "2030-01-15",
        "slotTime": "10:00",
        "symptoms": "Persistent cough"
    })
}

#[tokio::test]
async fn test_book_appointment_success() {
    let f = signed_in(TestUser::patient("jane@example.com")).await;
    let doctor_id = Uuid::new_v4().to_string();
    let appointment_id = Uuid::new_v4().to_string();

    mock_doctor(&f.server, MockSupabaseResponses::doctor_response(&doctor_id, &Uuid::new_v4().to_string())).await;
    mock_slot(&f.server, json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_response(&appointment_id, &f.user.id, &doctor_id, "scheduled")
        ])))
        .expect(1)
        .mount(&f.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/notifications"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::notification_response(&Uuid::new_v4().to_string(), &f.user.id, false)
        ])))
        .expect(2)
        .mount(&f.server)
        .await;

    let app = create_test_app(f.config.clone());
    let response = app.oneshot(post_json("/api/user/book-appointment", &f.bearer, booking(&doctor_id))).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()["ratelimit-limit"], "5");
    let json = body_json(response).await;
    assert_eq!(json["message"], "Appointment booked");
    assert_eq!(json["data"]["status"], "scheduled");
    assert_eq!(json["data"]["payment_status"], "pending");
    assert_eq!(json["data"]["appointment_time"], "10:00");
}

#[tokio::test]
async fn test_book_held_slot_conflicts() {
    let f = signed_in(TestUser::patient("jane@example.com")).await;
    let doctor_id = Uuid::new_v4().to_string();

    mock_doctor(&f.server, MockSupabaseResponses::doctor_response(&doctor_id, &Uuid::new_v4().to_string())).await;
    mock_slot(&f.server, json!([{ "id": Uuid::new_v4() }])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&f.server)
        .await;

    let app = create_test_app(f.config.clone());
    let response = app.oneshot(post_json("/api/user/book-appointment", &f.bearer, booking(&doctor_id))).await.unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["message"], "Slot not available");
}

#[tokio::test]
async fn test_unique_violation_on_insert_conflicts() {
    let f = signed_in(TestUser::patient("jane@example.com")).await;
    let doctor_id = Uuid::new_v4().to_string();

    mock_doctor(&f.server, MockSupabaseResponses::doctor_response(&doctor_id, &Uuid::new_v4().to_string())).await;
    mock_slot(&f.server, json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(
            MockSupabaseResponses::error_response("duplicate key value violates unique constraint", "23505")
        ))
        .mount(&f.server)
        .await;

    let app = create_test_app(f.config.clone());
    let response = app.oneshot(post_json("/api/user/book-appointment", &f.bearer, booking(&doctor_id))).await.unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["message"], "Slot not available");
}

#[tokio::test]
async fn test_book_unavailable_doctor() {
    let f = signed_in(TestUser::patient("jane@example.com")).await;
    let doctor_id = Uuid::new_v4().to_string();

    let mut doctor = MockSupabaseResponses::doctor_response(&doctor_id, &Uuid::new_v4().to_string());
    doctor["is_available"] = json!(false);
    mock_doctor(&f.server, doctor).await;

    let app = create_test_app(f.config.clone());
    let response = app.oneshot(post_json("/api/user/book-appointment", &f.bearer, booking(&doctor_id))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Doctor not available");
}

#[tokio::test]
async fn test_book_outside_working_hours() {
    let f = signed_in(TestUser::patient("jane@example.com")).await;
    let doctor_id = Uuid::new_v4().to_string();

    // 2030-01-15 is a Tuesday
    let mut doctor = MockSupabaseResponses::doctor_response(&doctor_id, &Uuid::new_v4().to_string());
    doctor["working_hours"] = json!({ "tuesday": { "start": "14:00", "end": "18:00" } });
    mock_doctor(&f.server, doctor).await;

    let app = create_test_app(f.config.clone());
    let response = app.oneshot(post_json("/api/user/book-appointment", &f.bearer, booking(&doctor_id))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["message"],
        "Doctor is available between 14:00 and 18:00 on Tuesday"
    );
}

#[tokio::test]
async fn test_book_unknown_doctor() {
    let f = signed_in(TestUser::patient("jane@example.com")).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&f.server)
        .await;

    let app = create_test_app(f.config.clone());
    let response = app
        .oneshot(post_json("/api/user/book-appointment", &f.bearer, booking(&Uuid::new_v4().to_string())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["message"], "Doctor not found");
}

#[tokio::test]
async fn test_doctors_cannot_book() {
    let f = signed_in(TestUser::doctor("doc@clinic.com")).await;

    let app = create_test_app(f.config.clone());
    let response = app
        .oneshot(post_json("/api/user/book-appointment", &f.bearer, booking(&Uuid::new_v4().to_string())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_booking_rate_limit_per_user() {
    let f = signed_in(TestUser::patient("jane@example.com")).await;
    let app = create_test_app(f.config.clone());

    // Invalid bodies still count against the window.
    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(post_json("/api/user/book-appointment", &f.bearer, json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = app
        .oneshot(post_json("/api/user/book-appointment", &f.bearer, json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_json(response).await["message"], "Too many booking attempts, please try again later.");
}

#[tokio::test]
async fn test_patient_cancels_own_appointment() {
    let f = signed_in(TestUser::patient("jane@example.com")).await;
    let appointment_id = Uuid::new_v4().to_string();
    let doctor_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(&appointment_id, &f.user.id, &doctor_id, "scheduled")
        ])))
        .mount(&f.server)
        .await;

    let mut cancelled = MockSupabaseResponses::appointment_response(&appointment_id, &f.user.id, &doctor_id, "cancelled");
    cancelled["cancelled_reason"] = json!("Feeling better");
    cancelled["cancelled_by"] = json!(f.user.id);
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "eq.scheduled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([cancelled])))
        .expect(1)
        .mount(&f.server)
        .await;

    // The doctor is told about the cancellation.
    mock_doctor(&f.server, MockSupabaseResponses::doctor_response(&doctor_id, &Uuid::new_v4().to_string())).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/notifications"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::notification_response(&Uuid::new_v4().to_string(), &f.user.id, false)
        ])))
        .expect(1)
        .mount(&f.server)
        .await;

    let app = create_test_app(f.config.clone());
    let response = app.oneshot(post_json("/api/user/cancel-appointment", &f.bearer, json!({
        "appointmentId": appointment_id,
        "reason": "Feeling better"
    }))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Appointment cancelled");
    assert_eq!(json["data"]["cancelled_reason"], "Feeling better");
}

#[tokio::test]
async fn test_patient_cannot_cancel_others_appointment() {
    let f = signed_in(TestUser::patient("jane@example.com")).await;
    let appointment_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                &appointment_id,
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                "scheduled",
            )
        ])))
        .mount(&f.server)
        .await;

    let app = create_test_app(f.config.clone());
    let response = app.oneshot(post_json("/api/user/cancel-appointment", &f.bearer, json!({
        "appointment_id": appointment_id
    }))).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["message"], "Not authorized to modify this appointment");
}

#[tokio::test]
async fn test_doctor_cannot_complete_cancelled_appointment() {
    let f = signed_in(TestUser::doctor("doc@clinic.com")).await;
    let appointment_id = Uuid::new_v4().to_string();
    let doctor_id = Uuid::new_v4().to_string();

    mock_doctor(&f.server, MockSupabaseResponses::doctor_response(&doctor_id, &f.user.id)).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(&appointment_id, &Uuid::new_v4().to_string(), &doctor_id, "cancelled")
        ])))
        .mount(&f.server)
        .await;

    let app = create_test_app(f.config.clone());
    let response = app.oneshot(post_json("/api/doctor/complete-appointment", &f.bearer, json!({
        "appointment_id": appointment_id
    }))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Cannot transition appointment from cancelled to completed");
}

#[tokio::test]
async fn test_doctor_marks_no_show() {
    let f = signed_in(TestUser::doctor("doc@clinic.com")).await;
    let appointment_id = Uuid::new_v4().to_string();
    let doctor_id = Uuid::new_v4().to_string();
    let patient_id = Uuid::new_v4().to_string();

    mock_doctor(&f.server, MockSupabaseResponses::doctor_response(&doctor_id, &f.user.id)).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(&appointment_id, &patient_id, &doctor_id, "scheduled")
        ])))
        .mount(&f.server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(&appointment_id, &patient_id, &doctor_id, "no_show")
        ])))
        .expect(1)
        .mount(&f.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/notifications"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::notification_response(&Uuid::new_v4().to_string(), &patient_id, false)
        ])))
        .expect(1)
        .mount(&f.server)
        .await;

    let app = create_test_app(f.config.clone());
    let response = app.oneshot(post_json("/api/doctor/mark-no-show", &f.bearer, json!({
        "appointment_id": appointment_id
    }))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "no_show");
}

#[tokio::test]
async fn test_patient_listing_rejects_unknown_status() {
    let f = signed_in(TestUser::patient("jane@example.com")).await;

    let app = create_test_app(f.config.clone());
    let response = app.oneshot(get("/api/user/appointments?status=pending", &f.bearer)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Invalid appointment status");
}

#[tokio::test]
async fn test_doctor_dashboard() {
    let f = signed_in(TestUser::doctor("doc@clinic.com")).await;
    let doctor_id = Uuid::new_v4().to_string();
    let patient_id = Uuid::new_v4().to_string();

    mock_doctor(&f.server, MockSupabaseResponses::doctor_response(&doctor_id, &f.user.id)).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(&Uuid::new_v4().to_string(), &patient_id, &doctor_id, "completed"),
            MockSupabaseResponses::appointment_response(&Uuid::new_v4().to_string(), &patient_id, &doctor_id, "scheduled"),
        ])))
        .mount(&f.server)
        .await;

    let app = create_test_app(f.config.clone());
    let response = app.oneshot(get("/api/doctor/dashboard", &f.bearer)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["earnings"], 500.0);
    assert_eq!(json["data"]["appointments"], 2);
    assert_eq!(json["data"]["patients"], 1);
}

#[tokio::test]
async fn test_admin_dashboard_counts() {
    let f = signed_in(TestUser::admin("admin@clinic.com")).await;

    for (table, total) in [("doctors", 4), ("user_profiles", 25), ("appointments", 60)] {
        Mock::given(method("HEAD"))
            .and(path(format!("/rest/v1/{}", table)))
            .respond_with(ResponseTemplate::new(200).insert_header("content-range", format!("0-0/{}", total)))
            .mount(&f.server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&f.server)
        .await;

    let app = create_test_app(f.config.clone());
    let response = app.oneshot(get("/api/admin/dashboard", &f.bearer)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["doctors"], 4);
    assert_eq!(json["data"]["patients"], 25);
    assert_eq!(json["data"]["appointments"], 60);
}

#[tokio::test]
async fn test_admin_routes_reject_patients() {
    let f = signed_in(TestUser::patient("jane@example.com")).await;

    let app = create_test_app(f.config.clone());
    let response = app.oneshot(get("/api/admin/appointments", &f.bearer)).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
