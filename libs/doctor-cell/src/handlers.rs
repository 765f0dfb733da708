use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::response::ApiResponse;
use shared_utils::form::FormPayload;

use crate::models::{
    AddDoctorRequest, AddReviewRequest, ChangeAvailabilityRequest, Doctor, DoctorError, DoctorListQuery,
    Review, UpdateDoctorProfileRequest,
};
use crate::services::{DoctorService, ReviewService};

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctors(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<DoctorListQuery>,
) -> Result<Json<ApiResponse<Vec<Doctor>>>, AppError> {
    let doctors = DoctorService::new(&config).list_doctors(query).await?;
    Ok(Json(ApiResponse::ok(doctors)))
}

pub async fn list_specialities(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<ApiResponse<Vec<String>>>, AppError> {
    let specialities = DoctorService::new(&config).specialities().await?;
    Ok(Json(ApiResponse::ok(specialities)))
}

pub async fn doctor_details(
    State(config): State<Arc<AppConfig>>,
    Path(doc_id): Path<String>,
) -> Result<Json<ApiResponse<Doctor>>, AppError> {
    let doctor = DoctorService::new(&config).get_doctor(&doc_id).await?;
    Ok(Json(ApiResponse::ok(doctor)))
}

pub async fn doctor_reviews(
    State(config): State<Arc<AppConfig>>,
    Path(doc_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Review>>>, AppError> {
    let reviews = ReviewService::new(&config).reviews_for(&doc_id).await?;
    Ok(Json(ApiResponse::ok(reviews)))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn add_doctor(
    State(config): State<Arc<AppConfig>>,
    payload: FormPayload,
) -> Result<(StatusCode, Json<ApiResponse<Doctor>>), AppError> {
    let (request, image) = payload.into_parts::<AddDoctorRequest>()?;
    let doctor = DoctorService::new(&config).add_doctor(request, image).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::with_message("Doctor added", doctor))))
}

pub async fn all_doctors(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<ApiResponse<Vec<Doctor>>>, AppError> {
    let doctors = DoctorService::new(&config).all_doctors().await?;
    Ok(Json(ApiResponse::ok(doctors)))
}

pub async fn admin_change_availability(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<ChangeAvailabilityRequest>,
) -> Result<Json<ApiResponse<Doctor>>, AppError> {
    let doc_id = request
        .doc_id
        .ok_or_else(|| DoctorError::Validation("Doctor ID is required".to_string()))?;

    let doctor = DoctorService::new(&config).toggle_availability(&doc_id).await?;
    Ok(Json(ApiResponse::with_message("Availability changed", doctor)))
}

// ==============================================================================
// DOCTOR HANDLERS
// ==============================================================================

pub async fn change_availability(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<ApiResponse<Doctor>>, AppError> {
    let doctor = DoctorService::new(&config).toggle_own_availability(&user.id).await?;
    Ok(Json(ApiResponse::with_message("Availability changed", doctor)))
}

pub async fn doctor_profile(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<ApiResponse<Doctor>>, AppError> {
    let doctor = DoctorService::new(&config).get_by_user(&user.id).await?;
    Ok(Json(ApiResponse::ok(doctor)))
}

pub async fn update_doctor_profile(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateDoctorProfileRequest>,
) -> Result<Json<ApiResponse<Doctor>>, AppError> {
    let doctor = DoctorService::new(&config).update_profile(&user.id, request).await?;
    Ok(Json(ApiResponse::with_message("Profile updated", doctor)))
}

// ==============================================================================
// PATIENT HANDLERS
// ==============================================================================

pub async fn add_review(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<AddReviewRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Review>>), AppError> {
    let review = ReviewService::new(&config).add_review(&user.id, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::with_message("Review added", review))))
}
