use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::{SupabaseClient, SupabaseError};
use shared_models::auth::User;
use shared_models::domain::UserRole;
use shared_models::error::AppError;

use crate::jwt::{extract_bearer_token, validate_token};

/// Raw bearer token of the authenticated request, for calls made on the
/// caller's behalf (logout).
#[derive(Debug, Clone)]
pub struct AccessToken(pub String);

#[derive(Debug, Deserialize)]
struct ProfileRow {
    id: String,
    email: Option<String>,
    full_name: Option<String>,
    role: UserRole,
    is_active: Option<bool>,
}

async fn load_user(config: &AppConfig, user_id: &str) -> Result<User, AppError> {
    let client = SupabaseClient::new(config);
    let query = format!("id=eq.{}&select=id,email,full_name,role,is_active", user_id);

    let profile: ProfileRow = match client.select_one("user_profiles", &query).await {
        Ok(Some(profile)) => profile,
        Ok(None) | Err(SupabaseError::NotFound(_)) => {
            return Err(AppError::Auth("User profile not found".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    Ok(User {
        id: profile.id,
        email: profile.email,
        full_name: profile.full_name,
        role: profile.role,
        is_active: profile.is_active.unwrap_or(true),
    })
}

pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())
        .ok_or_else(|| AppError::Auth("Access token is required".to_string()))?
        .to_string();

    let token_user = validate_token(&token, &config.supabase_jwt_secret)
        .map_err(|_| AppError::Auth("Invalid or expired token".to_string()))?;

    let user = load_user(&config, &token_user.id).await?;
    if !user.is_active {
        warn!("Deactivated account {} attempted access", user.id);
        return Err(AppError::Auth("Account is deactivated".to_string()));
    }

    debug!("Authenticated {} as {}", user.id, user.role);

    request.extensions_mut().insert(token_user);
    request.extensions_mut().insert(AccessToken(token));
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

pub fn extract_user<B>(request: &Request<B>) -> Result<User, AppError> {
    request
        .extensions()
        .get::<User>()
        .cloned()
        .ok_or_else(|| AppError::Auth("Authentication required".to_string()))
}

fn check_role<B>(request: &Request<B>, allowed: &[UserRole]) -> Result<(), AppError> {
    let user = extract_user(request)?;
    if !user.has_any_role(allowed) {
        warn!("User {} with role {} denied, needs one of {:?}", user.id, user.role, allowed);
        return Err(AppError::Forbidden("Insufficient permissions".to_string()));
    }
    Ok(())
}

// Role guards run inside `auth_middleware`; layer them first so auth wraps them.

pub async fn require_admin(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    check_role(&request, &[UserRole::Admin])?;
    Ok(next.run(request).await)
}

pub async fn require_doctor(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    check_role(&request, &[UserRole::Doctor])?;
    Ok(next.run(request).await)
}

pub async fn require_patient(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    check_role(&request, &[UserRole::Patient])?;
    Ok(next.run(request).await)
}

pub async fn require_doctor_or_admin(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    check_role(&request, &[UserRole::Doctor, UserRole::Admin])?;
    Ok(next.run(request).await)
}
