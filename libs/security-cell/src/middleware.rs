// =====================================================================================
// RATE LIMIT MIDDLEWARE
// =====================================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::jwt::{extract_bearer_token, validate_token};

use crate::models::{KeyStrategy, RateLimitPolicy, WindowHit};
use crate::services::store::{MemoryStore, RateLimitStore, RedisStore};

const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

pub struct RateLimiter {
    policy: RateLimitPolicy,
    store: Arc<dyn RateLimitStore>,
    trust_proxy: bool,
    jwt_secret: String,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy, store: Arc<dyn RateLimitStore>, config: &AppConfig) -> Self {
        Self {
            policy,
            store,
            trust_proxy: config.trust_proxy,
            jwt_secret: config.supabase_jwt_secret.clone(),
        }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    fn client_ip<B>(&self, request: &Request<B>) -> String {
        if self.trust_proxy {
            let forwarded = request
                .headers()
                .get("x-forwarded-for")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .filter(|ip| !ip.is_empty());

            if let Some(ip) = forwarded {
                return ip.to_string();
            }
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn client_key<B>(&self, request: &Request<B>) -> String {
        let user = match self.policy.key_strategy {
            KeyStrategy::UserOrIp => extract_bearer_token(request.headers())
                .and_then(|token| validate_token(token, &self.jwt_secret).ok())
                .map(|user| format!("user:{}", user.id)),
            KeyStrategy::ClientIp => None,
        };

        let subject = user.unwrap_or_else(|| format!("ip:{}", self.client_ip(request)));
        format!("rl:{}:{}", self.policy.name, subject)
    }
}

/// Redis when `REDIS_URL` is set and usable, memory otherwise.
pub fn build_store(config: &AppConfig) -> Arc<dyn RateLimitStore> {
    if let Some(url) = config.redis_url.as_deref() {
        match RedisStore::new(url) {
            Ok(store) => return Arc::new(store),
            Err(e) => warn!("Falling back to in-memory rate limiting: {}", e),
        }
    }
    Arc::new(MemoryStore::new())
}

/// One limiter per route class, sharing a store.
#[derive(Clone)]
pub struct RateLimiters {
    pub general: Arc<RateLimiter>,
    pub auth: Arc<RateLimiter>,
    pub payment: Arc<RateLimiter>,
    pub booking: Arc<RateLimiter>,
    pub admin: Arc<RateLimiter>,
}

impl RateLimiters {
    pub fn new(config: &AppConfig, store: Arc<dyn RateLimitStore>) -> Self {
        let limiter = |policy| Arc::new(RateLimiter::new(policy, store.clone(), config));
        Self {
            general: limiter(RateLimitPolicy::general()),
            auth: limiter(RateLimitPolicy::auth()),
            payment: limiter(RateLimitPolicy::payment()),
            booking: limiter(RateLimitPolicy::booking()),
            admin: limiter(RateLimitPolicy::admin()),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config, build_store(config))
    }

    pub fn store(&self) -> &Arc<dyn RateLimitStore> {
        &self.general.store
    }
}

fn set_rate_headers(headers: &mut HeaderMap, policy: &RateLimitPolicy, hit: &WindowHit) {
    let remaining = policy.max_requests.saturating_sub(hit.count);
    let reset_secs = hit.reset_after.as_millis().div_ceil(1000);

    headers.insert(RATELIMIT_LIMIT, HeaderValue::from(policy.max_requests));
    headers.insert(RATELIMIT_REMAINING, HeaderValue::from(remaining));
    headers.insert(RATELIMIT_RESET, HeaderValue::from(reset_secs as u64));
}

pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let policy = limiter.policy();
    let key = limiter.client_key(&request);

    let hit = match limiter.store.increment(&key, policy.window).await {
        Ok(hit) => hit,
        Err(e) => {
            warn!("Rate limit store {} failed, letting request through: {}", limiter.store.backend(), e);
            return next.run(request).await;
        }
    };

    if hit.count > policy.max_requests {
        warn!("Rate limit '{}' exceeded for {} ({} hits)", policy.name, key, hit.count);

        let mut response = AppError::TooManyRequests(policy.message.to_string()).into_response();
        let headers = response.headers_mut();
        set_rate_headers(headers, policy, &hit);
        let retry_after = hit.reset_after.as_millis().div_ceil(1000) as u64;
        headers.insert(axum::http::header::RETRY_AFTER, HeaderValue::from(retry_after));
        return response;
    }

    debug!("Rate limit '{}' for {}: {}/{}", policy.name, key, hit.count, policy.max_requests);

    let mut response = next.run(request).await;

    if policy.skip_successful && response.status().as_u16() < 400 {
        if let Err(e) = limiter.store.decrement(&key).await {
            warn!("Failed to release rate limit hit for {}: {}", key, e);
        }
    }

    // An inner route-class limiter has already reported its own window.
    if !response.headers().contains_key(RATELIMIT_LIMIT) {
        set_rate_headers(response.headers_mut(), policy, &hit);
    }
    response
}
