use chrono::{Local, Utc};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use security_cell::ValidationService;
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::User;
use shared_models::domain::Gender;
use shared_models::profile::UserProfile;
use shared_utils::upload::UploadedImage;

use crate::models::{flatten_address, ProfileError, UpdateProfileRequest};

pub struct ProfileService {
    supabase: SupabaseClient,
    bucket: String,
}

fn build_changes(request: UpdateProfileRequest) -> Result<Map<String, Value>, ProfileError> {
    let mut update_data = Map::new();

    if let Some(full_name) = request.full_name {
        let full_name = ValidationService::check_name(&full_name, 2, 50).map_err(ProfileError::Validation)?;
        update_data.insert("full_name".to_string(), json!(full_name));
    }

    if let Some(phone) = request.phone_number {
        ValidationService::check_phone(&phone).map_err(ProfileError::Validation)?;
        update_data.insert("phone_number".to_string(), json!(phone));
    }

    if let Some(gender) = request.gender {
        let gender: Gender = gender.parse().map_err(ProfileError::Validation)?;
        update_data.insert("gender".to_string(), json!(gender));
    }

    if let Some(date_of_birth) = request.date_of_birth {
        let date = ValidationService::parse_iso_date(&date_of_birth)
            .filter(|date| *date <= Local::now().date_naive())
            .ok_or_else(|| ProfileError::Validation("Invalid date of birth".to_string()))?;
        update_data.insert("date_of_birth".to_string(), json!(date));
    }

    if let Some(address) = request.address.as_ref().and_then(flatten_address) {
        update_data.insert("address".to_string(), json!(address));
    }

    Ok(update_data)
}

impl ProfileService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            bucket: config.storage_bucket.clone(),
        }
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<UserProfile, ProfileError> {
        debug!("Fetching profile {}", user_id);

        self.supabase
            .select_one("user_profiles", &format!("id=eq.{}", user_id))
            .await?
            .ok_or(ProfileError::NotFound)
    }

    pub async fn update_profile(
        &self,
        user: &User,
        request: UpdateProfileRequest,
        image: Option<UploadedImage>,
    ) -> Result<UserProfile, ProfileError> {
        let mut update_data = build_changes(request)?;

        if let Some(image) = image {
            let object_name = image.object_name("profiles", &user.id);
            let url = self
                .supabase
                .upload_object(&self.bucket, &object_name, image.bytes, &image.content_type)
                .await
                .map_err(ProfileError::Upload)?;
            update_data.insert("profile_image_url".to_string(), json!(url));
        }

        if update_data.is_empty() {
            return self.get_profile(&user.id).await;
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now()));

        let updated: Vec<UserProfile> = self
            .supabase
            .update("user_profiles", &format!("id=eq.{}", user.id), Value::Object(update_data.clone()))
            .await?;
        let profile = updated.into_iter().next().ok_or(ProfileError::NotFound)?;

        if user.is_doctor() {
            self.sync_doctor_card(&user.id, &update_data).await;
        }

        info!("Profile {} updated", profile.id);
        Ok(profile)
    }

    /// Doctor rows carry a copy of the name and picture shown on listings.
    async fn sync_doctor_card(&self, user_id: &str, update_data: &Map<String, Value>) {
        let card: Map<String, Value> = ["full_name", "profile_image_url"]
            .iter()
            .filter_map(|key| update_data.get(*key).map(|value| (key.to_string(), value.clone())))
            .collect();

        if card.is_empty() {
            return;
        }

        if let Err(e) = self
            .supabase
            .update::<Value>("doctors", &format!("user_id=eq.{}", user_id), Value::Object(card))
            .await
        {
            warn!("Failed to sync doctor card for {}: {}", user_id, e);
        }
    }
}
