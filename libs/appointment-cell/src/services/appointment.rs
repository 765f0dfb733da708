use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::DoctorService;
use notification_cell::{NewNotification, NotificationService};
use security_cell::ValidationService;
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::User;
use shared_models::domain::{AppointmentStatus, NotificationType, UserRole};

use crate::models::{Appointment, AppointmentActionRequest, AppointmentError, AppointmentListQuery};
use crate::services::lifecycle::AppointmentLifecycleService;

pub const MAX_REASON_LENGTH: usize = 500;

/// Who is acting on an appointment.
#[derive(Debug, Clone)]
pub enum Actor {
    Patient { user_id: String },
    Doctor { user_id: String, doctor_id: Uuid },
    Admin { user_id: String },
}

impl Actor {
    pub fn user_id(&self) -> &str {
        match self {
            Actor::Patient { user_id } | Actor::Doctor { user_id, .. } | Actor::Admin { user_id } => user_id,
        }
    }

    pub fn may_modify(&self, appointment: &Appointment) -> bool {
        match self {
            Actor::Patient { user_id } => appointment.patient_id.to_string() == *user_id,
            Actor::Doctor { doctor_id, .. } => appointment.doctor_id == *doctor_id,
            Actor::Admin { .. } => true,
        }
    }
}

/// PostgREST filter for a listing, newest slot first.
pub fn list_filter(base: &str, query: &AppointmentListQuery) -> Result<String, AppointmentError> {
    let mut filter = base.to_string();

    if let Some(status) = query.status.as_deref().filter(|s| !s.trim().is_empty()) {
        let status: AppointmentStatus = status.parse().map_err(AppointmentError::Validation)?;
        filter.push_str(&format!("&status=eq.{}", status));
    }

    if let Some(date) = query.date.as_deref().filter(|d| !d.trim().is_empty()) {
        let date = ValidationService::parse_iso_date(date)
            .ok_or_else(|| AppointmentError::Validation("Invalid date format".to_string()))?;
        filter.push_str(&format!("&appointment_date=eq.{}", date));
    }

    filter.push_str("&order=appointment_date.desc,appointment_time.desc");
    Ok(filter)
}

fn appointment_id(request: &AppointmentActionRequest) -> Result<String, AppointmentError> {
    let id = request
        .appointment_id
        .clone()
        .ok_or_else(|| AppointmentError::Validation("Appointment ID is required".to_string()))?;
    if !ValidationService::validate_uuid(&id) {
        return Err(AppointmentError::Validation("Invalid appointment ID".to_string()));
    }
    Ok(id)
}

fn transition_changes(target: AppointmentStatus, actor: &Actor, reason: Option<String>) -> Map<String, Value> {
    let now = Utc::now();
    let mut changes = Map::new();
    changes.insert("status".to_string(), json!(target));
    changes.insert("updated_at".to_string(), json!(now));

    match target {
        AppointmentStatus::Cancelled => {
            changes.insert("cancelled_reason".to_string(), json!(reason));
            changes.insert("cancelled_by".to_string(), json!(actor.user_id()));
            changes.insert("cancelled_at".to_string(), json!(now));
        }
        AppointmentStatus::Completed => {
            changes.insert("completed_at".to_string(), json!(now));
        }
        AppointmentStatus::NoShow | AppointmentStatus::Scheduled => {}
    }

    changes
}

pub struct AppointmentService {
    supabase: SupabaseClient,
    doctors: DoctorService,
    notifications: NotificationService,
}

impl AppointmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            doctors: DoctorService::new(config),
            notifications: NotificationService::new(config),
        }
    }

    pub async fn get_appointment(&self, appointment_id: &str) -> Result<Appointment, AppointmentError> {
        if !ValidationService::validate_uuid(appointment_id) {
            return Err(AppointmentError::NotFound);
        }

        self.supabase
            .select_one("appointments", &format!("id=eq.{}", appointment_id))
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    pub async fn list_for_patient(
        &self,
        patient_id: &str,
        query: &AppointmentListQuery,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = list_filter(&format!("patient_id=eq.{}", patient_id), query)?;
        Ok(self.supabase.select("appointments", &filter).await?)
    }

    pub async fn list_for_doctor(
        &self,
        user_id: &str,
        query: &AppointmentListQuery,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let doctor = self.doctors.get_by_user(user_id).await?;
        let filter = list_filter(&format!("doctor_id=eq.{}", doctor.id), query)?;
        Ok(self.supabase.select("appointments", &filter).await?)
    }

    pub async fn list_all(&self, query: &AppointmentListQuery) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = list_filter("select=*", query)?;
        Ok(self.supabase.select("appointments", &filter).await?)
    }

    pub async fn cancel(&self, user: &User, request: AppointmentActionRequest) -> Result<Appointment, AppointmentError> {
        self.transition(user, request, AppointmentStatus::Cancelled).await
    }

    pub async fn complete(&self, user: &User, request: AppointmentActionRequest) -> Result<Appointment, AppointmentError> {
        self.transition(user, request, AppointmentStatus::Completed).await
    }

    pub async fn mark_no_show(&self, user: &User, request: AppointmentActionRequest) -> Result<Appointment, AppointmentError> {
        self.transition(user, request, AppointmentStatus::NoShow).await
    }

    async fn actor(&self, user: &User) -> Result<Actor, AppointmentError> {
        Ok(match user.role {
            UserRole::Patient => Actor::Patient { user_id: user.id.clone() },
            UserRole::Doctor => {
                let doctor = self.doctors.get_by_user(&user.id).await?;
                Actor::Doctor { user_id: user.id.clone(), doctor_id: doctor.id }
            }
            UserRole::Admin => Actor::Admin { user_id: user.id.clone() },
        })
    }

    async fn transition(
        &self,
        user: &User,
        request: AppointmentActionRequest,
        target: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let id = appointment_id(&request)?;
        if let Some(reason) = &request.reason {
            if !ValidationService::validate_text_length(reason, MAX_REASON_LENGTH) {
                return Err(AppointmentError::Validation(format!(
                    "Reason must be at most {} characters",
                    MAX_REASON_LENGTH
                )));
            }
        }

        let appointment = self.get_appointment(&id).await?;
        let actor = self.actor(user).await?;

        if !actor.may_modify(&appointment) {
            warn!("User {} may not modify appointment {}", user.id, appointment.id);
            return Err(AppointmentError::NotOwner);
        }

        AppointmentLifecycleService::validate_status_transition(appointment.status, target)?;

        let changes = transition_changes(target, &actor, request.reason);
        let updated: Vec<Appointment> = self
            .supabase
            .update(
                "appointments",
                &format!("id=eq.{}&status=eq.{}", appointment.id, AppointmentStatus::Scheduled),
                Value::Object(changes),
            )
            .await?;

        let Some(updated) = updated.into_iter().next() else {
            // Someone else moved it first.
            let current = self.get_appointment(&id).await?;
            return Err(AppointmentError::InvalidStatusTransition { from: current.status, to: target });
        };

        info!("Appointment {} moved to {} by {}", updated.id, target, user.id);
        self.notify_parties(&actor, &updated).await;
        Ok(updated)
    }

    /// Tell whoever did not make the change.
    async fn notify_parties(&self, actor: &Actor, appointment: &Appointment) {
        let when = format!(
            "{} at {}",
            appointment.appointment_date.format("%d %b %Y"),
            appointment.appointment_time.format("%H:%M")
        );

        let (title, message, kind) = match appointment.status {
            AppointmentStatus::Cancelled => {
                let reason = appointment
                    .cancelled_reason
                    .as_deref()
                    .map(|reason| format!(": {}", reason))
                    .unwrap_or_default();
                (
                    "Appointment cancelled",
                    format!("The appointment on {} was cancelled{}", when, reason),
                    NotificationType::Warning,
                )
            }
            AppointmentStatus::Completed => (
                "Appointment completed",
                format!("The appointment on {} is complete", when),
                NotificationType::Success,
            ),
            AppointmentStatus::NoShow => (
                "Missed appointment",
                format!("The appointment on {} was marked as a no-show", when),
                NotificationType::Warning,
            ),
            AppointmentStatus::Scheduled => return,
        };

        if !matches!(actor, Actor::Patient { .. }) {
            self.notifications
                .notify(
                    NewNotification::new(appointment.patient_id.to_string(), title, message.clone())
                        .kind(kind)
                        .for_appointment(appointment.id),
                )
                .await;
        }

        if !matches!(actor, Actor::Doctor { .. }) {
            match self.doctors.get_doctor(&appointment.doctor_id.to_string()).await {
                Ok(doctor) => {
                    self.notifications
                        .notify(
                            NewNotification::new(doctor.user_id.to_string(), title, message)
                                .kind(kind)
                                .for_appointment(appointment.id),
                        )
                        .await
                }
                Err(e) => debug!("Skipping doctor notification for {}: {}", appointment.id, e),
            }
        }
    }
}
