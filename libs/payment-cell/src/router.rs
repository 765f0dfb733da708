use std::sync::Arc;

use axum::{middleware, routing::post, Router};

use security_cell::{rate_limit_middleware, RateLimiters};
use shared_config::AppConfig;
use shared_utils::extractor::{auth_middleware, require_patient};

use crate::handlers;

/// `/api/user`: Razorpay checkout. Route names follow the existing clients.
pub fn payment_routes(state: Arc<AppConfig>, limiters: &RateLimiters) -> Router {
    Router::new()
        .route("/payment-razorpay", post(handlers::create_order))
        .route("/verifyRazorpay", post(handlers::verify_payment))
        .route_layer(middleware::from_fn(require_patient))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .route_layer(middleware::from_fn_with_state(limiters.payment.clone(), rate_limit_middleware))
        .with_state(state)
}
