use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Query, State},
    http::StatusCode,
};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::response::ApiResponse;

use crate::models::{
    AdminDashboard, Appointment, AppointmentActionRequest, AppointmentListQuery, BookAppointmentRequest,
    DoctorDashboard,
};
use crate::services::{AppointmentBookingService, AppointmentService, DashboardService};

// ==============================================================================
// PATIENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Appointment>>), AppError> {
    let service = AppointmentBookingService::new(&config);
    let appointment = service.book_appointment(&user.id, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::with_message("Appointment booked", appointment))))
}

pub async fn patient_appointments(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<ApiResponse<Vec<Appointment>>>, AppError> {
    let appointments = AppointmentService::new(&config).list_for_patient(&user.id, &query).await?;
    Ok(Json(ApiResponse::ok(appointments)))
}

/// Shared by the patient, doctor and admin cancel routes; ownership depends
/// on the caller's role.
pub async fn cancel_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<AppointmentActionRequest>,
) -> Result<Json<ApiResponse<Appointment>>, AppError> {
    let appointment = AppointmentService::new(&config).cancel(&user, request).await?;
    Ok(Json(ApiResponse::with_message("Appointment cancelled", appointment)))
}

// ==============================================================================
// DOCTOR HANDLERS
// ==============================================================================

pub async fn doctor_appointments(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<ApiResponse<Vec<Appointment>>>, AppError> {
    let appointments = AppointmentService::new(&config).list_for_doctor(&user.id, &query).await?;
    Ok(Json(ApiResponse::ok(appointments)))
}

pub async fn complete_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<AppointmentActionRequest>,
) -> Result<Json<ApiResponse<Appointment>>, AppError> {
    let appointment = AppointmentService::new(&config).complete(&user, request).await?;
    Ok(Json(ApiResponse::with_message("Appointment completed", appointment)))
}

pub async fn mark_no_show(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<AppointmentActionRequest>,
) -> Result<Json<ApiResponse<Appointment>>, AppError> {
    let appointment = AppointmentService::new(&config).mark_no_show(&user, request).await?;
    Ok(Json(ApiResponse::with_message("Appointment marked as no-show", appointment)))
}

pub async fn doctor_dashboard(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<ApiResponse<DoctorDashboard>>, AppError> {
    let dashboard = DashboardService::new(&config).doctor_dashboard(&user.id).await?;
    Ok(Json(ApiResponse::ok(dashboard)))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

pub async fn all_appointments(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<ApiResponse<Vec<Appointment>>>, AppError> {
    let appointments = AppointmentService::new(&config).list_all(&query).await?;
    Ok(Json(ApiResponse::ok(appointments)))
}

pub async fn admin_dashboard(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<ApiResponse<AdminDashboard>>, AppError> {
    let dashboard = DashboardService::new(&config).admin_dashboard().await?;
    Ok(Json(ApiResponse::ok(dashboard)))
}
