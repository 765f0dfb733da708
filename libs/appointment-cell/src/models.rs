use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use doctor_cell::DoctorError;
use shared_database::SupabaseError;
use shared_models::domain::{AppointmentStatus, PaymentStatus};
use shared_models::error::AppError;
use shared_utils::form::opt_text;

pub const DEFAULT_DURATION_MINUTES: i32 = 30;
pub const MAX_SYMPTOMS_LENGTH: usize = 1000;
pub const LATEST_APPOINTMENTS: usize = 5;

fn default_duration() -> i32 {
    DEFAULT_DURATION_MINUTES
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    #[serde(with = "time_of_day")]
    pub appointment_time: NaiveTime,
    #[serde(default = "default_duration")]
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub symptoms: Option<String>,
    pub notes: Option<String>,
    pub prescription: Option<String>,
    #[serde(default)]
    pub consultation_fee: f64,
    pub payment_status: PaymentStatus,
    pub payment_id: Option<String>,
    pub razorpay_order_id: Option<String>,
    pub razorpay_payment_id: Option<String>,
    pub razorpay_signature: Option<String>,
    pub cancelled_reason: Option<String>,
    pub cancelled_by: Option<Uuid>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Appointment {
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Completed
    }
}

/// Times are written as `HH:MM`; Postgres hands them back as `HH:MM:SS`.
pub mod time_of_day {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    use security_cell::ValidationService;

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ValidationService::parse_time_of_day(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid time of day: {}", raw)))
    }
}

/// Booking form. `docId`, `slotDate` and `slotTime` are the names used by
/// the older clients.
#[derive(Debug, Default, Deserialize)]
pub struct BookAppointmentRequest {
    #[serde(default, alias = "docId", alias = "doctorId", deserialize_with = "opt_text")]
    pub doctor_id: Option<String>,
    #[serde(default, alias = "slotDate", alias = "date", deserialize_with = "opt_text")]
    pub appointment_date: Option<String>,
    #[serde(default, alias = "slotTime", alias = "time", deserialize_with = "opt_text")]
    pub appointment_time: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub symptoms: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AppointmentActionRequest {
    #[serde(default, alias = "appointmentId", deserialize_with = "opt_text")]
    pub appointment_id: Option<String>,
    #[serde(default, alias = "cancellation_reason", alias = "cancelled_reason", deserialize_with = "opt_text")]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AppointmentListQuery {
    pub status: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DoctorDashboard {
    pub earnings: f64,
    pub appointments: usize,
    pub patients: usize,
    pub latest_appointments: Vec<Appointment>,
}

#[derive(Debug, Serialize)]
pub struct AdminDashboard {
    pub doctors: u64,
    pub appointments: u64,
    pub patients: u64,
    pub latest_appointments: Vec<Appointment>,
}

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("{0}")]
    Validation(String),

    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not available")]
    DoctorNotAvailable,

    #[error("{0}")]
    OutsideWorkingHours(String),

    #[error("Cannot book an appointment in the past")]
    SlotInPast,

    #[error("Slot not available")]
    SlotNotAvailable,

    #[error("Cannot transition appointment from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Not authorized to modify this appointment")]
    NotOwner,

    #[error(transparent)]
    Doctor(#[from] DoctorError),

    #[error(transparent)]
    Upstream(#[from] SupabaseError),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::Validation(msg) | AppointmentError::OutsideWorkingHours(msg) => {
                AppError::ValidationError(msg)
            }
            AppointmentError::NotFound => AppError::NotFound(err.to_string()),
            AppointmentError::DoctorNotAvailable
            | AppointmentError::SlotInPast
            | AppointmentError::InvalidStatusTransition { .. } => AppError::BadRequest(err.to_string()),
            AppointmentError::SlotNotAvailable => AppError::Conflict(err.to_string()),
            AppointmentError::NotOwner => AppError::Forbidden(err.to_string()),
            AppointmentError::Doctor(e) => e.into(),
            AppointmentError::Upstream(e) => e.into(),
        }
    }
}
