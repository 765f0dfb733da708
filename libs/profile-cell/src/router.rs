use std::sync::Arc;

use axum::{middleware, routing::{get, post}, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

/// `/api/user`: own profile, for any authenticated role.
pub fn profile_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/get-profile", get(handlers::get_profile))
        .route("/update-profile", post(handlers::update_profile))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
