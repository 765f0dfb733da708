use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, Method, StatusCode, Uri},
    middleware,
    response::Json,
    routing::get,
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{warn, Level};

use appointment_cell::router::{admin_appointment_routes, doctor_appointment_routes, patient_appointment_routes};
use auth_cell::router::{admin_auth_routes, auth_routes, doctor_auth_routes, user_auth_routes};
use doctor_cell::router::{admin_doctor_routes, doctor_routes, public_doctor_routes, review_routes};
use notification_cell::router::notification_routes;
use payment_cell::router::payment_routes;
use profile_cell::router::profile_routes;
use security_cell::{rate_limit_middleware, with_security_headers, RateLimitStore, RateLimiters};
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::error::AppError;

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
struct HealthState {
    config: Arc<AppConfig>,
    store: Arc<dyn RateLimitStore>,
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running",
        "timestamp": Utc::now()
    }))
}

async fn database_health(State(health): State<HealthState>) -> (StatusCode, Json<Value>) {
    let database = SupabaseClient::new(&health.config).ping().await;
    let rate_limit_store = health.store.ping().await;

    if let Err(e) = &database {
        warn!("Database health check failed: {}", e);
    }
    if let Err(e) = &rate_limit_store {
        warn!("Rate limit store health check failed: {}", e);
    }

    let status = if database.is_ok() && rate_limit_store.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (
        status,
        Json(json!({
            "success": status.is_success(),
            "database": if database.is_ok() { "connected" } else { "unreachable" },
            "rate_limit_store": {
                "backend": health.store.backend(),
                "status": if rate_limit_store.is_ok() { "connected" } else { "unreachable" }
            },
            "timestamp": Utc::now()
        })),
    )
}

async fn route_not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("Route {} not found", uri.path()))
}

/// All routes, grouped under the prefixes the web clients call.
pub fn create_router(state: Arc<AppConfig>, limiters: &RateLimiters) -> Router {
    let health_state = HealthState {
        config: state.clone(),
        store: limiters.store().clone(),
    };

    let user = Router::new()
        .merge(user_auth_routes(state.clone(), limiters))
        .merge(profile_routes(state.clone()))
        .merge(review_routes(state.clone()))
        .merge(patient_appointment_routes(state.clone(), limiters))
        .merge(payment_routes(state.clone(), limiters))
        .merge(notification_routes(state.clone()));

    let doctor = Router::new()
        .merge(doctor_auth_routes(state.clone(), limiters))
        .merge(public_doctor_routes(state.clone()))
        .merge(doctor_routes(state.clone()))
        .merge(doctor_appointment_routes(state.clone()));

    let admin = Router::new()
        .merge(admin_auth_routes(state.clone(), limiters))
        .merge(admin_doctor_routes(state.clone()))
        .merge(admin_appointment_routes(state.clone()))
        .layer(middleware::from_fn_with_state(limiters.admin.clone(), rate_limit_middleware));

    Router::new()
        .route("/", get(|| async { "API Working" }))
        .route("/health", get(health))
        .route("/health/db", get(database_health).with_state(health_state))
        .nest("/api/user", user)
        .nest("/api/doctor", doctor)
        .nest("/api/admin", admin)
        .nest("/api/auth", auth_routes(state))
        .fallback(route_not_found)
        .layer(middleware::from_fn_with_state(limiters.general.clone(), rate_limit_middleware))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .frontend_urls
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

/// The router wrapped in the HTTP edge: body limit, security headers,
/// request tracing and CORS.
pub fn create_app(state: Arc<AppConfig>, limiters: &RateLimiters) -> Router {
    let production = state.is_production();
    let cors = cors_layer(&state);

    let router = create_router(state, limiters).layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    with_security_headers(router, production)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
}
