use std::sync::Arc;

use axum::{
    extract::{Extension, Json, State},
    http::{HeaderMap, StatusCode},
};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::TokenResponse;
use shared_models::domain::UserRole;
use shared_models::error::AppError;
use shared_models::response::ApiResponse;
use shared_utils::extractor::AccessToken;
use shared_utils::jwt::{extract_bearer_token, validate_token};

use crate::models::{AuthResponse, LoginRequest, RegisterRequest};
use crate::services::AuthService;

pub async fn register(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), AppError> {
    let service = AuthService::new(&config);
    let response = service.register(request).await?;

    let message = if response.token.is_some() {
        "Registration successful"
    } else {
        "Registration successful, please confirm your email"
    };

    Ok((StatusCode::CREATED, Json(ApiResponse::with_message(message, response))))
}

async fn login_as(
    config: &AppConfig,
    request: LoginRequest,
    role: Option<UserRole>,
) -> Result<Json<ApiResponse<AuthResponse>>, AppError> {
    let service = AuthService::new(config);
    let response = service.login(request, role).await?;
    Ok(Json(ApiResponse::with_message("Login successful", response)))
}

pub async fn login(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, AppError> {
    login_as(&config, request, None).await
}

pub async fn doctor_login(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, AppError> {
    login_as(&config, request, Some(UserRole::Doctor)).await
}

pub async fn admin_login(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, AppError> {
    login_as(&config, request, Some(UserRole::Admin)).await
}

pub async fn validate_token_handler(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = extract_bearer_token(&headers)
        .ok_or_else(|| AppError::Auth("Access token is required".to_string()))?;

    let user = validate_token(token, &config.supabase_jwt_secret)
        .map_err(|_| AppError::Auth("Invalid or expired token".to_string()))?;

    Ok(Json(TokenResponse {
        valid: true,
        user_id: user.id,
        email: user.email,
        role: user.token_role,
    }))
}

pub async fn verify_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Json<Value> {
    debug!("Verifying token");

    let valid = extract_bearer_token(&headers)
        .map(|token| validate_token(token, &config.supabase_jwt_secret).is_ok())
        .unwrap_or(false);

    Json(json!({ "valid": valid }))
}

pub async fn logout(
    State(config): State<Arc<AppConfig>>,
    Extension(token): Extension<AccessToken>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let service = AuthService::new(&config);
    service.logout(&token.0).await?;
    Ok(Json(ApiResponse::message("Logged out successfully")))
}
