use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Query, State},
};
use serde_json::{json, Value};

use security_cell::ValidationService;
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::response::ApiResponse;

use crate::models::{MarkReadRequest, Notification, NotificationList, NotificationQuery};
use crate::services::NotificationService;

pub async fn list_notifications(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<ApiResponse<NotificationList>>, AppError> {
    let service = NotificationService::new(&config);
    let list = service.list(&user.id, query.unread_only.unwrap_or(false)).await?;
    Ok(Json(ApiResponse::ok(list)))
}

pub async fn mark_read(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<MarkReadRequest>,
) -> Result<Json<ApiResponse<Notification>>, AppError> {
    let notification_id = request
        .notification_id
        .ok_or_else(|| AppError::ValidationError("Notification ID is required".to_string()))?;
    if !ValidationService::validate_uuid(&notification_id) {
        return Err(AppError::ValidationError("Invalid notification ID".to_string()));
    }

    let service = NotificationService::new(&config);
    let notification = service.mark_read(&user.id, &notification_id).await?;
    Ok(Json(ApiResponse::with_message("Notification marked as read", notification)))
}

pub async fn mark_all_read(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let service = NotificationService::new(&config);
    let updated = service.mark_all_read(&user.id).await?;
    Ok(Json(ApiResponse::with_message(
        "All notifications marked as read",
        json!({ "updated": updated }),
    )))
}
