use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::profile::UserProfile;
use shared_models::response::ApiResponse;
use shared_utils::form::FormPayload;

use crate::models::UpdateProfileRequest;
use crate::services::ProfileService;

#[axum::debug_handler]
pub async fn get_profile(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<ApiResponse<UserProfile>>, AppError> {
    let service = ProfileService::new(&config);
    let profile = service.get_profile(&user.id).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

#[axum::debug_handler]
pub async fn update_profile(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    payload: FormPayload,
) -> Result<Json<ApiResponse<UserProfile>>, AppError> {
    let (request, image) = payload.into_parts::<UpdateProfileRequest>()?;

    let service = ProfileService::new(&config);
    let profile = service.update_profile(&user, request, image).await?;
    Ok(Json(ApiResponse::with_message("Profile updated", profile)))
}
