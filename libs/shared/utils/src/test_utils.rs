use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::domain::UserRole;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub razorpay_base_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            razorpay_base_url: "http://localhost:54322".to_string(),
        }
    }
}

impl TestConfig {
    /// Point Supabase (and Razorpay) at a mock server.
    pub fn with_mock_server(uri: &str) -> Self {
        Self {
            supabase_url: uri.to_string(),
            razorpay_base_url: uri.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_role_key: "test-service-role-key".to_string(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            storage_bucket: "profile-images".to_string(),
            razorpay_key_id: "rzp_test_key".to_string(),
            razorpay_key_secret: "rzp_test_secret".to_string(),
            razorpay_base_url: self.razorpay_base_url.clone(),
            currency: "INR".to_string(),
            redis_url: None,
            frontend_urls: vec!["http://localhost:5173".to_string()],
            port: 4000,
            environment: "test".to_string(),
            trust_proxy: false,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            full_name: Some("Test User".to_string()),
            role: self.role.parse().unwrap_or(UserRole::Patient),
            is_active: true,
        }
    }

    /// The `user_profiles` row the auth middleware loads for this user.
    pub fn profile_row(&self) -> Value {
        MockSupabaseResponses::user_profile_response(&self.id, &self.email, &self.role)
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        // Supabase puts the Postgres role in `role`; the app role lives in the profile.
        let claims = json!({
            "sub": user.id,
            "email": user.email,
            "role": "authenticated",
            "aud": "authenticated",
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
            .expect("HS256 encoding of test claims")
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }

    pub fn bearer(user: &TestUser, secret: &str) -> String {
        format!("Bearer {}", Self::create_test_token(user, secret, Some(1)))
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn user_profile_response(user_id: &str, email: &str, role: &str) -> Value {
        json!({
            "id": user_id,
            "email": email,
            "full_name": "Test User",
            "phone_number": null,
            "date_of_birth": null,
            "gender": null,
            "address": null,
            "profile_image_url": null,
            "role": role,
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn doctor_response(doctor_id: &str, user_id: &str) -> Value {
        json!({
            "id": doctor_id,
            "user_id": user_id,
            "full_name": "Dr. Test Doctor",
            "medical_license": null,
            "specialization": "General physician",
            "qualification": "MBBS",
            "experience_years": 10,
            "bio": "Experienced general physician",
            "consultation_fee": 500.0,
            "is_available": true,
            "office_address": null,
            "working_hours": null,
            "rating": 0.0,
            "total_reviews": 0,
            "verified_at": null,
            "profile_image_url": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_response(appointment_id: &str, patient_id: &str, doctor_id: &str, status: &str) -> Value {
        json!({
            "id": appointment_id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "appointment_date": "2030-01-15",
            "appointment_time": "10:00:00",
            "duration_minutes": 30,
            "status": status,
            "symptoms": null,
            "notes": null,
            "prescription": null,
            "consultation_fee": 500.0,
            "payment_status": "pending",
            "payment_id": null,
            "razorpay_order_id": null,
            "razorpay_payment_id": null,
            "razorpay_signature": null,
            "cancelled_reason": null,
            "cancelled_by": null,
            "cancelled_at": null,
            "completed_at": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn notification_response(notification_id: &str, user_id: &str, is_read: bool) -> Value {
        json!({
            "id": notification_id,
            "user_id": user_id,
            "title": "Appointment booked",
            "message": "Your appointment is confirmed",
            "type": "success",
            "is_read": is_read,
            "appointment_id": null,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn auth_session_response(user_id: &str, email: &str) -> Value {
        json!({
            "access_token": "session-access-token",
            "refresh_token": "session-refresh-token",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": { "id": user_id, "email": email, "user_metadata": {} }
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
