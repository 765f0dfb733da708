use std::sync::Arc;

use axum::{middleware, routing::post, Router};

use security_cell::{rate_limit_middleware, RateLimiters};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

/// `/api/user`: register and login.
pub fn user_auth_routes(state: Arc<AppConfig>, limiters: &RateLimiters) -> Router {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route_layer(middleware::from_fn_with_state(limiters.auth.clone(), rate_limit_middleware))
        .with_state(state)
}

/// `/api/doctor`: doctor login.
pub fn doctor_auth_routes(state: Arc<AppConfig>, limiters: &RateLimiters) -> Router {
    Router::new()
        .route("/login", post(handlers::doctor_login))
        .route_layer(middleware::from_fn_with_state(limiters.auth.clone(), rate_limit_middleware))
        .with_state(state)
}

/// `/api/admin`: admin login.
pub fn admin_auth_routes(state: Arc<AppConfig>, limiters: &RateLimiters) -> Router {
    Router::new()
        .route("/login", post(handlers::admin_login))
        .route_layer(middleware::from_fn_with_state(limiters.auth.clone(), rate_limit_middleware))
        .with_state(state)
}

/// `/api/auth`: token checks and logout.
pub fn auth_routes(state: Arc<AppConfig>) -> Router {
    let public_routes = Router::new()
        .route("/validate", post(handlers::validate_token_handler))
        .route("/verify", post(handlers::verify_token));

    let protected_routes = Router::new()
        .route("/logout", post(handlers::logout))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
