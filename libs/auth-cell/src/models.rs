use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::SupabaseError;
use shared_models::error::AppError;
use shared_models::profile::UserProfile;
use shared_utils::form::opt_text;

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default, alias = "name")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, alias = "phone", deserialize_with = "opt_text")]
    pub phone_number: Option<String>,
    /// Only `patient` may be requested.
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Absent when sign-up is waiting for e-mail confirmation.
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub user: UserProfile,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is deactivated")]
    AccountDeactivated,

    #[error("User profile not found")]
    ProfileMissing,

    #[error("Only patient accounts can be registered")]
    RoleNotAllowed,

    #[error("User already exists")]
    EmailTaken,

    #[error(transparent)]
    Upstream(#[from] SupabaseError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(msg) => AppError::ValidationError(msg),
            AuthError::InvalidCredentials | AuthError::AccountDeactivated | AuthError::ProfileMissing => {
                AppError::Auth(err.to_string())
            }
            AuthError::RoleNotAllowed => AppError::Forbidden(err.to_string()),
            AuthError::EmailTaken => AppError::Conflict(err.to_string()),
            AuthError::Upstream(e) => e.into(),
        }
    }
}
