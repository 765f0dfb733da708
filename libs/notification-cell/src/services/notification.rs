use serde_json::json;
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{NewNotification, Notification, NotificationError, NotificationList};

pub struct NotificationService {
    supabase: SupabaseClient,
}

impl NotificationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create(&self, notification: NewNotification) -> Result<Notification, NotificationError> {
        let row = json!(notification);
        let created: Notification = self.supabase.insert("notifications", row).await?;
        debug!("Notification {} created for {}", created.id, created.user_id);
        Ok(created)
    }

    /// Fire-and-forget variant for side effects of other operations.
    pub async fn notify(&self, notification: NewNotification) {
        let user_id = notification.user_id.clone();
        if let Err(e) = self.create(notification).await {
            warn!("Failed to notify {}: {}", user_id, e);
        }
    }

    pub async fn list(&self, user_id: &str, unread_only: bool) -> Result<NotificationList, NotificationError> {
        let mut query = format!("user_id=eq.{}&order=created_at.desc", user_id);
        if unread_only {
            query.push_str("&is_read=eq.false");
        }

        let notifications: Vec<Notification> = self.supabase.select("notifications", &query).await?;

        let unread_count = if unread_only {
            notifications.len()
        } else {
            notifications.iter().filter(|n| !n.is_read).count()
        };

        Ok(NotificationList { notifications, unread_count })
    }

    pub async fn mark_read(&self, user_id: &str, notification_id: &str) -> Result<Notification, NotificationError> {
        let notification: Notification = self
            .supabase
            .select_one("notifications", &format!("id=eq.{}", notification_id))
            .await?
            .ok_or(NotificationError::NotFound)?;

        if notification.user_id.to_string() != user_id {
            warn!("User {} tried to read notification {} of {}", user_id, notification.id, notification.user_id);
            return Err(NotificationError::NotOwner);
        }

        if notification.is_read {
            return Ok(notification);
        }

        let updated: Vec<Notification> = self
            .supabase
            .update(
                "notifications",
                &format!("id=eq.{}", notification_id),
                json!({ "is_read": true }),
            )
            .await?;

        updated.into_iter().next().ok_or(NotificationError::NotFound)
    }

    pub async fn mark_all_read(&self, user_id: &str) -> Result<usize, NotificationError> {
        let updated: Vec<Notification> = self
            .supabase
            .update(
                "notifications",
                &format!("user_id=eq.{}&is_read=eq.false", user_id),
                json!({ "is_read": true }),
            )
            .await?;

        info!("Marked {} notifications read for {}", updated.len(), user_id);
        Ok(updated.len())
    }
}
