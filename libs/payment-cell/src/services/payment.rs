use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument, warn};

use appointment_cell::Appointment;
use notification_cell::{NewNotification, NotificationService};
use security_cell::ValidationService;
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::domain::{AppointmentStatus, NotificationType, PaymentStatus};

use crate::models::{CreateOrderRequest, PaymentConfirmation, PaymentError, RazorpayOrder, VerifyPaymentRequest};
use crate::services::razorpay::{to_minor_units, RazorpayClient};

fn order_appointment_id(request: &CreateOrderRequest) -> Result<String, PaymentError> {
    let id = request
        .appointment_id
        .clone()
        .ok_or_else(|| PaymentError::Validation("Appointment ID is required".to_string()))?;
    if !ValidationService::validate_uuid(&id) {
        return Err(PaymentError::Validation("Invalid appointment ID".to_string()));
    }
    Ok(id)
}

fn confirmation(request: VerifyPaymentRequest) -> Result<PaymentConfirmation, PaymentError> {
    match (request.razorpay_order_id, request.razorpay_payment_id, request.razorpay_signature) {
        (Some(order_id), Some(payment_id), Some(signature)) => Ok(PaymentConfirmation { order_id, payment_id, signature }),
        _ => Err(PaymentError::Validation("Payment details are required".to_string())),
    }
}

/// Only the patient's own, live, unpaid appointments can be paid for.
fn payable(appointment: Option<Appointment>, patient_id: &str) -> Result<Appointment, PaymentError> {
    let appointment = appointment
        .filter(|a| a.patient_id.to_string() == patient_id && a.status != AppointmentStatus::Cancelled)
        .ok_or(PaymentError::AppointmentUnavailable)?;

    if appointment.is_paid() {
        return Err(PaymentError::AlreadyPaid);
    }
    Ok(appointment)
}

pub struct PaymentService {
    supabase: SupabaseClient,
    razorpay: RazorpayClient,
    notifications: NotificationService,
    currency: String,
    configured: bool,
}

impl PaymentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            razorpay: RazorpayClient::new(config),
            notifications: NotificationService::new(config),
            currency: config.currency.clone(),
            configured: config.is_payment_configured(),
        }
    }

    fn ensure_configured(&self) -> Result<(), PaymentError> {
        if self.configured {
            Ok(())
        } else {
            Err(PaymentError::NotConfigured)
        }
    }

    #[instrument(skip(self, request))]
    pub async fn create_order(&self, patient_id: &str, request: CreateOrderRequest) -> Result<RazorpayOrder, PaymentError> {
        let appointment_id = order_appointment_id(&request)?;
        self.ensure_configured()?;

        let appointment = self
            .supabase
            .select_one::<Appointment>("appointments", &format!("id=eq.{}", appointment_id))
            .await?;
        let appointment = payable(appointment, patient_id)?;

        let amount = to_minor_units(appointment.consultation_fee)
            .ok_or_else(|| PaymentError::Validation("Invalid consultation fee".to_string()))?;

        let order = self
            .razorpay
            .create_order(amount, &self.currency, &appointment.id.to_string())
            .await?;

        let _: Vec<Appointment> = self
            .supabase
            .update(
                "appointments",
                &format!("id=eq.{}", appointment.id),
                json!({ "razorpay_order_id": order.id, "updated_at": Utc::now() }),
            )
            .await?;

        info!("Created order {} for appointment {}", order.id, appointment.id);
        Ok(order)
    }

    #[instrument(skip(self, request))]
    pub async fn verify_payment(&self, patient_id: &str, request: VerifyPaymentRequest) -> Result<Appointment, PaymentError> {
        let payment = confirmation(request)?;
        self.ensure_configured()?;

        let appointment = self
            .supabase
            .select_one::<Appointment>(
                "appointments",
                &format!("razorpay_order_id=eq.{}", urlencoding::encode(&payment.order_id)),
            )
            .await?
            .ok_or(PaymentError::OrderNotFound)?;
        let appointment = payable(Some(appointment), patient_id)?;
        let filter = format!("id=eq.{}", appointment.id);

        if !self.razorpay.verify(&payment.order_id, &payment.payment_id, &payment.signature) {
            warn!("Signature mismatch for order {} on appointment {}", payment.order_id, appointment.id);
            if let Err(e) = self
                .supabase
                .update::<Appointment>(
                    "appointments",
                    &filter,
                    json!({ "payment_status": PaymentStatus::Failed, "updated_at": Utc::now() }),
                )
                .await
            {
                warn!("Could not record failed payment for {}: {}", appointment.id, e);
            }
            return Err(PaymentError::VerificationFailed);
        }

        let updated: Vec<Appointment> = self
            .supabase
            .update(
                "appointments",
                &filter,
                json!({
                    "payment_status": PaymentStatus::Completed,
                    "payment_id": payment.payment_id,
                    "razorpay_payment_id": payment.payment_id,
                    "razorpay_signature": payment.signature,
                    "updated_at": Utc::now()
                }),
            )
            .await?;
        let paid = updated.into_iter().next().ok_or(PaymentError::AppointmentUnavailable)?;

        self.notifications
            .notify(
                NewNotification::new(
                    patient_id,
                    "Payment received",
                    format!("Payment for your appointment on {} was successful", paid.appointment_date),
                )
                .kind(NotificationType::Success)
                .for_appointment(paid.id),
            )
            .await;

        info!("Appointment {} paid with {}", paid.id, payment.payment_id);
        Ok(paid)
    }
}
