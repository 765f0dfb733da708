use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::SupabaseError;
use shared_models::domain::NotificationType;
use shared_models::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    #[serde(default)]
    pub is_read: bool,
    pub appointment_id: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A notification about to be written.
#[derive(Debug, Clone, Serialize)]
pub struct NewNotification {
    pub user_id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub appointment_id: Option<String>,
}

impl NewNotification {
    pub fn new(user_id: impl Into<String>, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            title: title.into(),
            message: message.into(),
            notification_type: NotificationType::Info,
            appointment_id: None,
        }
    }

    pub fn kind(mut self, notification_type: NotificationType) -> Self {
        self.notification_type = notification_type;
        self
    }

    pub fn for_appointment(mut self, appointment_id: impl ToString) -> Self {
        self.appointment_id = Some(appointment_id.to_string());
        self
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct MarkReadRequest {
    #[serde(alias = "notificationId")]
    pub notification_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
}

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("{0}")]
    Validation(String),

    #[error("Notification not found")]
    NotFound,

    #[error("Not authorized to modify this notification")]
    NotOwner,

    #[error(transparent)]
    Upstream(#[from] SupabaseError),
}

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::Validation(msg) => AppError::ValidationError(msg),
            NotificationError::NotFound => AppError::NotFound(err.to_string()),
            NotificationError::NotOwner => AppError::Forbidden(err.to_string()),
            NotificationError::Upstream(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_notification_uses_type_column() {
        let value = serde_json::to_value(
            NewNotification::new("u-1", "Payment received", "Thanks")
                .kind(NotificationType::Success)
                .for_appointment("a-1"),
        )
        .unwrap();

        assert_eq!(value["type"], "success");
        assert_eq!(value["appointment_id"], "a-1");
        assert!(value.get("notification_type").is_none());
    }

    #[test]
    fn stored_rows_decode() {
        let row = json!({
            "id": "7d5c8f1e-43a1-4c36-9b4b-1f1e4f3e0a11",
            "user_id": "0b8a3c5e-2f7d-4f0a-9c1e-5d7e9f1a2b3c",
            "title": "Appointment booked",
            "message": "See you soon",
            "type": "warning",
            "appointment_id": null,
            "created_at": "2024-01-01T00:00:00Z"
        });

        let notification: Notification = serde_json::from_value(row).unwrap();
        assert_eq!(notification.notification_type, NotificationType::Warning);
        assert!(!notification.is_read);
    }
}
