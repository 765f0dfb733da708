//! GoTrue (Supabase Auth) endpoints.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::supabase::{SupabaseClient, SupabaseError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUserRecord {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub token_type: Option<String>,
    pub user: AuthUserRecord,
}

impl AuthSession {
    /// Sign-up answers with a session when e-mail confirmation is off and with
    /// a bare user record otherwise.
    fn from_signup_response(value: Value) -> Result<Self, SupabaseError> {
        if value.get("user").is_some() {
            serde_json::from_value(value).map_err(|e| SupabaseError::Decode(e.to_string()))
        } else {
            let user: AuthUserRecord = serde_json::from_value(value)
                .map_err(|e| SupabaseError::Decode(e.to_string()))?;
            Ok(Self {
                access_token: None,
                refresh_token: None,
                expires_in: None,
                token_type: None,
                user,
            })
        }
    }
}

impl SupabaseClient {
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<AuthSession, SupabaseError> {
        debug!("Signing up {}", email);

        let response: Value = self.request(
            Method::POST,
            "/auth/v1/signup",
            None,
            Some(json!({
                "email": email,
                "password": password,
                "data": { "full_name": full_name }
            })),
        ).await?;

        AuthSession::from_signup_response(response)
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, SupabaseError> {
        debug!("Password sign-in for {}", email);

        self.request(
            Method::POST,
            "/auth/v1/token?grant_type=password",
            None,
            Some(json!({ "email": email, "password": password })),
        ).await
    }

    /// Create a confirmed user with the service role key.
    pub async fn admin_create_user(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<AuthUserRecord, SupabaseError> {
        debug!("Creating auth user {}", email);

        self.request(
            Method::POST,
            "/auth/v1/admin/users",
            None,
            Some(json!({
                "email": email,
                "password": password,
                "email_confirm": true,
                "user_metadata": { "full_name": full_name }
            })),
        ).await
    }

    pub async fn admin_delete_user(&self, user_id: &str) -> Result<(), SupabaseError> {
        self.execute(
            Method::DELETE,
            &format!("/auth/v1/admin/users/{}", user_id),
            None,
            None,
        ).await
    }

    pub async fn get_auth_user(&self, auth_token: &str) -> Result<AuthUserRecord, SupabaseError> {
        self.request(Method::GET, "/auth/v1/user", Some(auth_token), None).await
    }

    pub async fn sign_out(&self, auth_token: &str) -> Result<(), SupabaseError> {
        self.execute(Method::POST, "/auth/v1/logout", Some(auth_token), None).await
    }
}
