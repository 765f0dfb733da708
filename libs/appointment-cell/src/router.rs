use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use security_cell::{rate_limit_middleware, RateLimiters};
use shared_config::AppConfig;
use shared_utils::extractor::{auth_middleware, require_admin, require_doctor, require_patient};

use crate::handlers;

/// `/api/user`: booking and the patient's own appointments. The booking
/// limiter sits in front of authentication.
pub fn patient_appointment_routes(state: Arc<AppConfig>, limiters: &RateLimiters) -> Router {
    let booking = Router::new()
        .route("/book-appointment", post(handlers::book_appointment))
        .route_layer(middleware::from_fn(require_patient))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .route_layer(middleware::from_fn_with_state(limiters.booking.clone(), rate_limit_middleware));

    Router::new()
        .route("/appointments", get(handlers::patient_appointments))
        .route("/cancel-appointment", post(handlers::cancel_appointment))
        .route_layer(middleware::from_fn(require_patient))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .merge(booking)
        .with_state(state)
}

/// `/api/doctor`: the doctor's schedule.
pub fn doctor_appointment_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/appointments", get(handlers::doctor_appointments))
        .route("/complete-appointment", post(handlers::complete_appointment))
        .route("/cancel-appointment", post(handlers::cancel_appointment))
        .route("/mark-no-show", post(handlers::mark_no_show))
        .route("/dashboard", get(handlers::doctor_dashboard))
        .route_layer(middleware::from_fn(require_doctor))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

/// `/api/admin`: every appointment.
pub fn admin_appointment_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/appointments", get(handlers::all_appointments))
        .route("/cancel-appointment", post(handlers::cancel_appointment))
        .route("/dashboard", get(handlers::admin_dashboard))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
