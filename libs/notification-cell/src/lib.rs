pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{NewNotification, Notification, NotificationError};
pub use services::NotificationService;
