use std::env;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_STORAGE_BUCKET: &str = "profile-images";
pub const DEFAULT_RAZORPAY_BASE_URL: &str = "https://api.razorpay.com/v1";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub supabase_jwt_secret: String,
    pub storage_bucket: String,
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
    pub razorpay_base_url: String,
    pub currency: String,
    pub redis_url: Option<String>,
    pub frontend_urls: Vec<String>,
    pub port: u16,
    pub environment: String,
    pub trust_proxy: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            storage_bucket: env::var("SUPABASE_STORAGE_BUCKET")
                .unwrap_or_else(|_| DEFAULT_STORAGE_BUCKET.to_string()),
            razorpay_key_id: env::var("RAZORPAY_KEY_ID")
                .unwrap_or_else(|_| {
                    warn!("RAZORPAY_KEY_ID not set, payments disabled");
                    String::new()
                }),
            razorpay_key_secret: env::var("RAZORPAY_KEY_SECRET")
                .unwrap_or_else(|_| {
                    warn!("RAZORPAY_KEY_SECRET not set, payments disabled");
                    String::new()
                }),
            razorpay_base_url: env::var("RAZORPAY_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_RAZORPAY_BASE_URL.to_string()),
            currency: env::var("CURRENCY").unwrap_or_else(|_| "INR".to_string()),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty()),
            frontend_urls: parse_origins(env::var("FRONTEND_URL").ok().as_deref()),
            port: env::var("PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            environment: env::var("APP_ENV")
                .or_else(|_| env::var("NODE_ENV"))
                .unwrap_or_else(|_| "development".to_string()),
            trust_proxy: env::var("TRUST_PROXY")
                .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes"))
                .unwrap_or(false),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_service_role_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_payment_configured(&self) -> bool {
        !self.razorpay_key_id.is_empty() && !self.razorpay_key_secret.is_empty()
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Key sent as `apikey` and default bearer for server-side PostgREST calls.
    pub fn service_key(&self) -> &str {
        if self.supabase_service_role_key.is_empty() {
            &self.supabase_anon_key
        } else {
            &self.supabase_service_role_key
        }
    }
}

fn parse_origins(raw: Option<&str>) -> Vec<String> {
    let origins: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty())
        .collect();

    if origins.is_empty() {
        vec!["http://localhost:5173".to_string()]
    } else {
        origins
    }
}
