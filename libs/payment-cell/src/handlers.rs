use std::sync::Arc;

use axum::extract::{Extension, Json, State};

use appointment_cell::Appointment;
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::response::ApiResponse;

use crate::models::{CreateOrderRequest, RazorpayOrder, VerifyPaymentRequest};
use crate::services::PaymentService;

pub async fn create_order(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<ApiResponse<RazorpayOrder>>, AppError> {
    let order = PaymentService::new(&config).create_order(&user.id, request).await?;
    Ok(Json(ApiResponse::with_message("Order created", order)))
}

pub async fn verify_payment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<ApiResponse<Appointment>>, AppError> {
    let appointment = PaymentService::new(&config).verify_payment(&user.id, request).await?;
    Ok(Json(ApiResponse::with_message("Payment successful", appointment)))
}
