use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::SupabaseError;
use shared_models::error::AppError;
use shared_utils::form::opt_text;

#[derive(Debug, Default, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default, alias = "appointmentId", deserialize_with = "opt_text")]
    pub appointment_id: Option<String>,
}

/// Fields handed back by the Razorpay checkout widget.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyPaymentRequest {
    #[serde(default, deserialize_with = "opt_text")]
    pub razorpay_order_id: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub razorpay_payment_id: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub razorpay_signature: Option<String>,
}

/// Order as returned by `POST /orders`. Amounts are in the smallest currency unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    #[serde(default)]
    pub entity: Option<String>,
    pub amount: i64,
    #[serde(default)]
    pub amount_paid: Option<i64>,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

/// Verified payment triple.
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("{0}")]
    Validation(String),

    #[error("Payments are not configured")]
    NotConfigured,

    #[error("Appointment cancelled or not found")]
    AppointmentUnavailable,

    #[error("Appointment already paid")]
    AlreadyPaid,

    #[error("Payment order not found")]
    OrderNotFound,

    #[error("Payment verification failed")]
    VerificationFailed,

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error(transparent)]
    Upstream(#[from] SupabaseError),
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        PaymentError::Gateway(err.to_string())
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Validation(msg) => AppError::ValidationError(msg),
            PaymentError::VerificationFailed => AppError::BadRequest(err.to_string()),
            PaymentError::AppointmentUnavailable | PaymentError::OrderNotFound => AppError::NotFound(err.to_string()),
            PaymentError::AlreadyPaid => AppError::Conflict(err.to_string()),
            PaymentError::NotConfigured => AppError::Internal(err.to_string()),
            PaymentError::Gateway(msg) => AppError::ExternalService(msg),
            PaymentError::Upstream(e) => e.into(),
        }
    }
}
