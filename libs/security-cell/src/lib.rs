// =====================================================================================
// SECURITY CELL - RATE LIMITING, INPUT VALIDATION & RESPONSE HARDENING
// =====================================================================================

pub mod headers;
pub mod middleware;
pub mod models;
pub mod services;

pub use headers::with_security_headers;
pub use middleware::{build_store, rate_limit_middleware, RateLimiter, RateLimiters};
pub use models::{KeyStrategy, RateLimitPolicy, SecurityError, WindowHit};
pub use services::{MemoryStore, RateLimitStore, RedisStore, ValidationService};
