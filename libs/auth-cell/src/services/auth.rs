use serde_json::json;
use tracing::{info, instrument, warn};

use security_cell::ValidationService;
use shared_config::AppConfig;
use shared_database::{AuthSession, SupabaseClient, SupabaseError};
use shared_models::domain::UserRole;
use shared_models::profile::UserProfile;

use crate::models::{AuthError, AuthResponse, LoginRequest, RegisterRequest};

pub struct AuthService {
    supabase: SupabaseClient,
}

/// Normalized registration input.
#[cfg_attr(test, derive(Debug))]
struct NewPatient {
    full_name: String,
    email: String,
    password: String,
    phone_number: Option<String>,
}

fn validate_registration(request: RegisterRequest) -> Result<NewPatient, AuthError> {
    let full_name = request
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AuthError::Validation("Name is required".to_string()))?;
    let full_name = ValidationService::check_name(full_name, 2, 50).map_err(AuthError::Validation)?;

    let email = ValidationService::check_email(request.email.as_deref().unwrap_or_default())
        .map_err(AuthError::Validation)?;

    let password = request.password.unwrap_or_default();
    ValidationService::check_password_strength(&password).map_err(AuthError::Validation)?;

    if let Some(phone) = request.phone_number.as_deref() {
        ValidationService::check_phone(phone).map_err(AuthError::Validation)?;
    }

    match request.role.as_deref().map(str::parse::<UserRole>) {
        None | Some(Ok(UserRole::Patient)) => {}
        Some(_) => return Err(AuthError::RoleNotAllowed),
    }

    Ok(NewPatient {
        full_name,
        email,
        password,
        phone_number: request.phone_number,
    })
}

fn validate_login(request: LoginRequest) -> Result<(String, String), AuthError> {
    let email = ValidationService::check_email(request.email.as_deref().unwrap_or_default())
        .map_err(AuthError::Validation)?;

    let password = request
        .password
        .filter(|password| !password.is_empty())
        .ok_or_else(|| AuthError::Validation("Password is required".to_string()))?;

    Ok((email, password))
}

fn is_duplicate_signup(err: &SupabaseError) -> bool {
    match err {
        SupabaseError::Conflict(_) => true,
        SupabaseError::Api { status: 400 | 422, message } => message.to_lowercase().contains("already"),
        _ => false,
    }
}

impl AuthService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn find_profile(&self, user_id: &str) -> Result<Option<UserProfile>, AuthError> {
        Ok(self
            .supabase
            .select_one("user_profiles", &format!("id=eq.{}", user_id))
            .await?)
    }

    #[instrument(skip(self, request))]
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AuthError> {
        let patient = validate_registration(request)?;

        let session = self
            .supabase
            .sign_up(&patient.email, &patient.password, &patient.full_name)
            .await
            .map_err(|e| if is_duplicate_signup(&e) { AuthError::EmailTaken } else { e.into() })?;

        let user_id = session.user.id.clone();
        let inserted = self
            .supabase
            .insert::<UserProfile>(
                "user_profiles",
                json!({
                    "id": user_id,
                    "email": patient.email,
                    "full_name": patient.full_name,
                    "phone_number": patient.phone_number,
                    "role": UserRole::Patient,
                    "is_active": true
                }),
            )
            .await;

        let profile = match inserted {
            Ok(profile) => profile,
            // A database trigger may already have created the row for this user.
            Err(SupabaseError::Conflict(_)) => match self.find_profile(&user_id).await? {
                Some(profile) => profile,
                None => return Err(AuthError::EmailTaken),
            },
            Err(e) => {
                warn!("Profile creation failed for {}, removing auth user: {}", user_id, e);
                if let Err(cleanup) = self.supabase.admin_delete_user(&user_id).await {
                    warn!("Could not remove auth user {}: {}", user_id, cleanup);
                }
                return Err(e.into());
            }
        };

        info!("Registered patient {}", profile.id);
        Ok(into_response(session, profile))
    }

    /// Password login. With `required_role`, accounts of any other role are
    /// answered exactly like a wrong password.
    #[instrument(skip(self, request))]
    pub async fn login(&self, request: LoginRequest, required_role: Option<UserRole>) -> Result<AuthResponse, AuthError> {
        let (email, password) = validate_login(request)?;

        let session = self
            .supabase
            .sign_in_with_password(&email, &password)
            .await
            .map_err(|e| match e {
                SupabaseError::Auth(_) | SupabaseError::Api { status: 400, .. } => AuthError::InvalidCredentials,
                other => other.into(),
            })?;

        let profile = self
            .find_profile(&session.user.id)
            .await?
            .ok_or(AuthError::ProfileMissing)?;

        if !profile.is_active {
            warn!("Login attempt on deactivated account {}", profile.id);
            return Err(AuthError::AccountDeactivated);
        }

        if let Some(role) = required_role {
            if profile.role != role {
                warn!("Account {} with role {} tried the {} login", profile.id, profile.role, role);
                return Err(AuthError::InvalidCredentials);
            }
        }

        info!("User {} logged in as {}", profile.id, profile.role);
        Ok(into_response(session, profile))
    }

    pub async fn logout(&self, access_token: &str) -> Result<(), AuthError> {
        match self.supabase.sign_out(access_token).await {
            // Session already gone.
            Ok(()) | Err(SupabaseError::Auth(_)) | Err(SupabaseError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn into_response(session: AuthSession, user: UserProfile) -> AuthResponse {
    AuthResponse {
        token: session.access_token,
        refresh_token: session.refresh_token,
        expires_in: session.expires_in,
        user,
    }
}
