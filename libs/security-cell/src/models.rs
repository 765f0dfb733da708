use std::time::Duration;

use thiserror::Error;

use shared_models::error::AppError;

// =====================================================================================
// RATE LIMIT POLICIES
// =====================================================================================

/// What identifies a client for a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    ClientIp,
    /// User id from a valid bearer token, else client IP.
    UserOrIp,
}

#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    pub name: &'static str,
    pub window: Duration,
    pub max_requests: u64,
    pub message: &'static str,
    pub key_strategy: KeyStrategy,
    /// Responses below 400 give their hit back.
    pub skip_successful: bool,
}

impl RateLimitPolicy {
    pub fn general() -> Self {
        Self {
            name: "general",
            window: Duration::from_secs(15 * 60),
            max_requests: 100,
            message: "Too many requests from this IP, please try again later.",
            key_strategy: KeyStrategy::ClientIp,
            skip_successful: false,
        }
    }

    pub fn auth() -> Self {
        Self {
            name: "auth",
            window: Duration::from_secs(15 * 60),
            max_requests: 5,
            message: "Too many authentication attempts, please try again later.",
            key_strategy: KeyStrategy::ClientIp,
            skip_successful: true,
        }
    }

    pub fn payment() -> Self {
        Self {
            name: "payment",
            window: Duration::from_secs(60),
            max_requests: 3,
            message: "Too many payment attempts, please try again later.",
            key_strategy: KeyStrategy::ClientIp,
            skip_successful: false,
        }
    }

    pub fn booking() -> Self {
        Self {
            name: "booking",
            window: Duration::from_secs(60),
            max_requests: 5,
            message: "Too many booking attempts, please try again later.",
            key_strategy: KeyStrategy::UserOrIp,
            skip_successful: false,
        }
    }

    pub fn admin() -> Self {
        Self {
            name: "admin",
            window: Duration::from_secs(15 * 60),
            max_requests: 50,
            message: "Too many admin requests, please try again later.",
            key_strategy: KeyStrategy::ClientIp,
            skip_successful: false,
        }
    }
}

/// Counter state after recording a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
    pub count: u64,
    pub reset_after: Duration,
}

// =====================================================================================
// ERRORS
// =====================================================================================

#[derive(Error, Debug)]
pub enum SecurityError {
    #[error("Rate limit store error: {0}")]
    Store(String),

    #[error("Rate limit store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("{0}")]
    Validation(String),
}

impl From<redis::RedisError> for SecurityError {
    fn from(err: redis::RedisError) -> Self {
        SecurityError::Store(err.to_string())
    }
}

impl From<deadpool_redis::PoolError> for SecurityError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        SecurityError::StoreUnavailable(err.to_string())
    }
}

impl From<SecurityError> for AppError {
    fn from(err: SecurityError) -> Self {
        match err {
            SecurityError::Validation(msg) => AppError::ValidationError(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}
