use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

/// `/api/user/notifications`, open to every signed-in role.
pub fn notification_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/notifications", get(handlers::list_notifications))
        .route("/notifications/read", post(handlers::mark_read))
        .route("/notifications/read-all", post(handlers::mark_all_read))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
