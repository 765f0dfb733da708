use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use doctor_cell::DoctorService;
use notification_cell::{NewNotification, NotificationService};
use security_cell::ValidationService;
use shared_config::AppConfig;
use shared_database::{SupabaseClient, SupabaseError};
use shared_models::domain::{AppointmentStatus, NotificationType, PaymentStatus};

use crate::models::{
    Appointment, AppointmentError, BookAppointmentRequest, DEFAULT_DURATION_MINUTES, MAX_SYMPTOMS_LENGTH,
};

pub struct AppointmentBookingService {
    supabase: SupabaseClient,
    doctors: DoctorService,
    notifications: NotificationService,
}

/// A booking request that passed shape validation.
#[derive(Debug, PartialEq)]
pub struct RequestedSlot {
    pub doctor_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub symptoms: Option<String>,
}

pub fn validate_booking(request: BookAppointmentRequest, now: NaiveDateTime) -> Result<RequestedSlot, AppointmentError> {
    let doctor_id = request
        .doctor_id
        .ok_or_else(|| AppointmentError::Validation("Doctor ID is required".to_string()))?;
    if !ValidationService::validate_uuid(&doctor_id) {
        return Err(AppointmentError::Validation("Invalid doctor ID".to_string()));
    }

    let date = request
        .appointment_date
        .ok_or_else(|| AppointmentError::Validation("Appointment date is required".to_string()))?;
    let date = ValidationService::parse_iso_date(&date)
        .ok_or_else(|| AppointmentError::Validation("Invalid date format".to_string()))?;

    let time = request
        .appointment_time
        .ok_or_else(|| AppointmentError::Validation("Appointment time is required".to_string()))?;
    let time = ValidationService::parse_time_of_day(&time)
        .ok_or_else(|| AppointmentError::Validation("Invalid time format".to_string()))?;
    // Slots are minute-granular.
    let time = NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time);

    if let Some(symptoms) = &request.symptoms {
        if !ValidationService::validate_text_length(symptoms, MAX_SYMPTOMS_LENGTH) {
            return Err(AppointmentError::Validation(format!(
                "Symptoms must be at most {} characters",
                MAX_SYMPTOMS_LENGTH
            )));
        }
    }

    if date.and_time(time) <= now {
        return Err(AppointmentError::SlotInPast);
    }

    Ok(RequestedSlot {
        doctor_id,
        date,
        time,
        symptoms: request.symptoms,
    })
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            doctors: DoctorService::new(config),
            notifications: NotificationService::new(config),
        }
    }

    #[instrument(skip(self, request))]
    pub async fn book_appointment(
        &self,
        patient_id: &str,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let slot = validate_booking(request, Local::now().naive_local())?;

        let doctor = self.doctors.get_doctor(&slot.doctor_id).await?;
        if !doctor.is_available {
            warn!("Booking attempt on unavailable doctor {}", doctor.id);
            return Err(AppointmentError::DoctorNotAvailable);
        }

        doctor
            .accepts_slot(slot.date, slot.time)
            .map_err(AppointmentError::OutsideWorkingHours)?;

        if self.is_slot_taken(&slot).await? {
            return Err(AppointmentError::SlotNotAvailable);
        }

        let now = Utc::now();
        let appointment: Appointment = self
            .supabase
            .insert(
                "appointments",
                json!({
                    "patient_id": patient_id,
                    "doctor_id": doctor.id,
                    "appointment_date": slot.date,
                    "appointment_time": slot.time.format("%H:%M:%S").to_string(),
                    "duration_minutes": DEFAULT_DURATION_MINUTES,
                    "status": AppointmentStatus::Scheduled,
                    "symptoms": slot.symptoms,
                    "consultation_fee": doctor.consultation_fee,
                    "payment_status": PaymentStatus::Pending,
                    "created_at": now,
                    "updated_at": now
                }),
            )
            .await
            .map_err(|e| match e {
                // Unique index on active slots.
                SupabaseError::Conflict(_) => AppointmentError::SlotNotAvailable,
                other => other.into(),
            })?;

        info!("Appointment {} booked with doctor {} by {}", appointment.id, doctor.id, patient_id);

        let when = format!("{} at {}", slot.date.format("%d %b %Y"), slot.time.format("%H:%M"));
        let doctor_name = doctor.full_name.clone().unwrap_or_else(|| "your doctor".to_string());
        futures::join!(
            self.notifications.notify(
                NewNotification::new(
                    patient_id,
                    "Appointment booked",
                    format!("Your appointment with {} is scheduled for {}", doctor_name, when),
                )
                .kind(NotificationType::Success)
                .for_appointment(appointment.id),
            ),
            self.notifications.notify(
                NewNotification::new(
                    doctor.user_id.to_string(),
                    "New appointment",
                    format!("A patient booked an appointment for {}", when),
                )
                .for_appointment(appointment.id),
            ),
        );

        Ok(appointment)
    }

    async fn is_slot_taken(&self, slot: &RequestedSlot) -> Result<bool, AppointmentError> {
        let filter = format!(
            "select=id&doctor_id=eq.{}&appointment_date=eq.{}&appointment_time=eq.{}&status=neq.cancelled",
            slot.doctor_id,
            slot.date,
            slot.time.format("%H:%M:%S")
        );
        let held: Option<serde_json::Value> = self.supabase.select_one("appointments", &filter).await?;
        debug!("Slot {} {} held: {}", slot.date, slot.time, held.is_some());
        Ok(held.is_some())
    }
}
