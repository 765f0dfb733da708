use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::{auth_middleware, require_admin, require_doctor, require_patient};

use crate::handlers;

/// `/api/doctor`: browsing, open to everyone.
pub fn public_doctor_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/list", get(handlers::list_doctors))
        .route("/specialities", get(handlers::list_specialities))
        .route("/details/{doc_id}", get(handlers::doctor_details))
        .route("/reviews/{doc_id}", get(handlers::doctor_reviews))
        .with_state(state)
}

/// `/api/doctor`: the signed-in doctor's own card.
pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/change-availability", post(handlers::change_availability))
        .route("/profile", get(handlers::doctor_profile))
        .route("/update-profile", post(handlers::update_doctor_profile))
        .route_layer(middleware::from_fn(require_doctor))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

/// `/api/admin`: doctor onboarding and management.
pub fn admin_doctor_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/add-doctor", post(handlers::add_doctor))
        .route("/all-doctors", get(handlers::all_doctors))
        .route("/change-availability", post(handlers::admin_change_availability))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

/// `/api/user`: patient reviews.
pub fn review_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/add-review", post(handlers::add_review))
        .route_layer(middleware::from_fn(require_patient))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
