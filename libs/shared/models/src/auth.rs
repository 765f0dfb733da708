use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::UserRole;

/// Claims carried by Supabase access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
    pub session_id: Option<String>,
}

/// Identity proven by a valid token, before the profile is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUser {
    pub id: String,
    pub email: Option<String>,
    pub token_role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub issued_at: Option<DateTime<Utc>>,
}

/// Authenticated caller attached to the request by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_doctor(&self) -> bool {
        self.role == UserRole::Doctor
    }

    pub fn is_patient(&self) -> bool {
        self.role == UserRole::Patient
    }

    pub fn has_any_role(&self, roles: &[UserRole]) -> bool {
        roles.contains(&self.role)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub valid: bool,
    pub user_id: String,
    pub email: Option<String>,
    pub role: Option<String>,
}
