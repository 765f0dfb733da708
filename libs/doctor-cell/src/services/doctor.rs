use std::collections::BTreeSet;

use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument, warn};

use security_cell::ValidationService;
use shared_config::AppConfig;
use shared_database::{SupabaseClient, SupabaseError};
use shared_models::domain::UserRole;
use shared_models::profile::UserProfile;
use shared_utils::upload::UploadedImage;

use crate::models::{
    office_address_value, AddDoctorRequest, Doctor, DoctorError, DoctorListQuery,
    UpdateDoctorProfileRequest, WorkingHours,
};

pub const MAX_EXPERIENCE_YEARS: i64 = 70;

pub struct DoctorService {
    supabase: SupabaseClient,
    bucket: String,
}

/// Validated add-doctor input.
#[derive(Debug)]
struct NewDoctor {
    full_name: String,
    email: String,
    password: String,
    specialization: String,
    qualification: String,
    experience_years: i64,
    consultation_fee: f64,
    bio: Option<String>,
    office_address: Option<Value>,
    medical_license: Option<String>,
}

fn required(value: Option<String>, message: &str) -> Result<String, DoctorError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| DoctorError::Validation(message.to_string()))
}

fn validate_new_doctor(request: AddDoctorRequest) -> Result<NewDoctor, DoctorError> {
    let full_name = required(request.full_name, "Doctor name is required")?;
    let full_name = ValidationService::check_name(&full_name, 2, 100).map_err(DoctorError::Validation)?;

    let email = ValidationService::check_email(request.email.as_deref().unwrap_or_default())
        .map_err(DoctorError::Validation)?;

    let password = request.password.unwrap_or_default();
    ValidationService::check_password_length(&password).map_err(DoctorError::Validation)?;

    let specialization = required(request.specialization, "Speciality is required")?;
    let qualification = required(request.qualification, "Degree is required")?;

    let experience_years = request
        .experience_years
        .filter(|years| (0..=MAX_EXPERIENCE_YEARS).contains(years))
        .ok_or_else(|| DoctorError::Validation("Experience must be a number between 0 and 70".to_string()))?;

    let consultation_fee = request
        .consultation_fee
        .filter(|fee| fee.is_finite() && *fee >= 0.0)
        .ok_or_else(|| DoctorError::Validation("Fees must be a positive number".to_string()))?;

    Ok(NewDoctor {
        full_name,
        email,
        password,
        specialization,
        qualification,
        experience_years,
        consultation_fee,
        bio: request.bio,
        office_address: request.office_address.as_ref().and_then(office_address_value),
        medical_license: request.medical_license,
    })
}

fn build_profile_changes(request: UpdateDoctorProfileRequest) -> Result<Map<String, Value>, DoctorError> {
    let mut update_data = Map::new();

    if let Some(fee) = request.consultation_fee {
        if !fee.is_finite() || fee < 0.0 {
            return Err(DoctorError::Validation("Fees must be a positive number".to_string()));
        }
        update_data.insert("consultation_fee".to_string(), json!(fee));
    }
    if let Some(address) = request.office_address.as_ref().and_then(office_address_value) {
        update_data.insert("office_address".to_string(), address);
    }
    if let Some(available) = request.is_available {
        update_data.insert("is_available".to_string(), json!(available));
    }
    if let Some(bio) = request.bio {
        if !ValidationService::validate_text_length(&bio, 2000) {
            return Err(DoctorError::Validation("About must be at most 2000 characters".to_string()));
        }
        update_data.insert("bio".to_string(), json!(bio));
    }
    if let Some(hours) = request.working_hours.filter(|hours| !hours.is_null()) {
        let hours = WorkingHours::parse(&hours).map_err(DoctorError::Validation)?;
        update_data.insert("working_hours".to_string(), json!(hours));
    }

    Ok(update_data)
}

fn is_duplicate_user(err: &SupabaseError) -> bool {
    match err {
        SupabaseError::Conflict(_) => true,
        SupabaseError::Api { status: 400 | 422, message } => {
            let message = message.to_lowercase();
            message.contains("already") || message.contains("exists")
        }
        _ => false,
    }
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            bucket: config.storage_bucket.clone(),
        }
    }

    pub async fn list_doctors(&self, query: DoctorListQuery) -> Result<Vec<Doctor>, DoctorError> {
        let mut filter = "order=created_at.desc".to_string();

        if let Some(speciality) = query.speciality.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            filter.push_str(&format!("&specialization=eq.{}", urlencoding::encode(speciality)));
        }
        if query.available_only.unwrap_or(false) {
            filter.push_str("&is_available=eq.true");
        }

        debug!("Listing doctors with {}", filter);
        Ok(self.supabase.select("doctors", &filter).await?)
    }

    pub async fn all_doctors(&self) -> Result<Vec<Doctor>, DoctorError> {
        self.list_doctors(DoctorListQuery::default()).await
    }

    pub async fn specialities(&self) -> Result<Vec<String>, DoctorError> {
        let rows: Vec<Value> = self.supabase.select("doctors", "select=specialization").await?;

        let specialities: BTreeSet<String> = rows
            .iter()
            .filter_map(|row| row.get("specialization").and_then(Value::as_str))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Ok(specialities.into_iter().collect())
    }

    pub async fn get_doctor(&self, doctor_id: &str) -> Result<Doctor, DoctorError> {
        if !ValidationService::validate_uuid(doctor_id) {
            return Err(DoctorError::NotFound);
        }

        self.supabase
            .select_one("doctors", &format!("id=eq.{}", doctor_id))
            .await?
            .ok_or(DoctorError::NotFound)
    }

    /// The doctor row owned by a signed-in doctor account.
    pub async fn get_by_user(&self, user_id: &str) -> Result<Doctor, DoctorError> {
        self.supabase
            .select_one("doctors", &format!("user_id=eq.{}", user_id))
            .await?
            .ok_or(DoctorError::ProfileMissing)
    }

    #[instrument(skip(self, request, image))]
    pub async fn add_doctor(
        &self,
        request: AddDoctorRequest,
        image: Option<UploadedImage>,
    ) -> Result<Doctor, DoctorError> {
        let doctor = validate_new_doctor(request)?;

        let auth_user = self
            .supabase
            .admin_create_user(&doctor.email, &doctor.password, &doctor.full_name)
            .await
            .map_err(|e| if is_duplicate_user(&e) { DoctorError::EmailTaken } else { e.into() })?;
        let user_id = auth_user.id;

        let mut uploaded = None;
        if let Some(image) = image {
            let object_name = image.object_name("doctors", &user_id);
            match self
                .supabase
                .upload_object(&self.bucket, &object_name, image.bytes, &image.content_type)
                .await
            {
                Ok(url) => uploaded = Some((object_name, url)),
                Err(e) => {
                    self.discard(&user_id, None).await;
                    return Err(DoctorError::Upload(e));
                }
            }
        }
        let image_url = uploaded.as_ref().map(|(_, url)| url.clone());

        if let Err(e) = self.store_profile(&user_id, &doctor, image_url.as_deref()).await {
            self.discard(&user_id, uploaded.as_ref().map(|(name, _)| name.as_str())).await;
            return Err(e);
        }

        let now = Utc::now();
        let inserted = self
            .supabase
            .insert::<Doctor>(
                "doctors",
                json!({
                    "user_id": user_id,
                    "full_name": doctor.full_name,
                    "medical_license": doctor.medical_license,
                    "specialization": doctor.specialization,
                    "qualification": doctor.qualification,
                    "experience_years": doctor.experience_years,
                    "bio": doctor.bio,
                    "consultation_fee": doctor.consultation_fee,
                    "is_available": true,
                    "office_address": doctor.office_address,
                    "profile_image_url": image_url,
                    "rating": 0.0,
                    "total_reviews": 0,
                    "created_at": now,
                    "updated_at": now
                }),
            )
            .await;

        match inserted {
            Ok(created) => {
                info!("Doctor {} added for {}", created.id, doctor.email);
                Ok(created)
            }
            Err(e) => {
                warn!("Doctor row creation failed for {}: {}", user_id, e);
                if let Err(cleanup) = self.supabase.delete("user_profiles", &format!("id=eq.{}", user_id)).await {
                    warn!("Could not remove profile {}: {}", user_id, cleanup);
                }
                self.discard(&user_id, uploaded.as_ref().map(|(name, _)| name.as_str())).await;
                Err(if e.is_conflict() { DoctorError::EmailTaken } else { e.into() })
            }
        }
    }

    async fn store_profile(&self, user_id: &str, doctor: &NewDoctor, image_url: Option<&str>) -> Result<(), DoctorError> {
        let row = json!({
            "id": user_id,
            "email": doctor.email,
            "full_name": doctor.full_name,
            "role": UserRole::Doctor,
            "is_active": true,
            "profile_image_url": image_url
        });

        match self.supabase.insert::<UserProfile>("user_profiles", row).await {
            Ok(_) => Ok(()),
            // A signup trigger may have created a patient row already.
            Err(SupabaseError::Conflict(_)) => {
                self.supabase
                    .update::<Value>(
                        "user_profiles",
                        &format!("id=eq.{}", user_id),
                        json!({ "role": UserRole::Doctor, "full_name": doctor.full_name, "profile_image_url": image_url }),
                    )
                    .await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort removal of a half-created doctor account.
    async fn discard(&self, user_id: &str, object_name: Option<&str>) {
        if let Some(object_name) = object_name {
            if let Err(e) = self.supabase.delete_object(&self.bucket, object_name).await {
                warn!("Could not remove image {}: {}", object_name, e);
            }
        }
        if let Err(e) = self.supabase.admin_delete_user(user_id).await {
            warn!("Could not remove auth user {}: {}", user_id, e);
        }
    }

    pub async fn toggle_availability(&self, doctor_id: &str) -> Result<Doctor, DoctorError> {
        let doctor = self.get_doctor(doctor_id).await?;
        self.set_availability(&doctor, !doctor.is_available).await
    }

    pub async fn toggle_own_availability(&self, user_id: &str) -> Result<Doctor, DoctorError> {
        let doctor = self.get_by_user(user_id).await?;
        self.set_availability(&doctor, !doctor.is_available).await
    }

    async fn set_availability(&self, doctor: &Doctor, available: bool) -> Result<Doctor, DoctorError> {
        let updated: Vec<Doctor> = self
            .supabase
            .update(
                "doctors",
                &format!("id=eq.{}", doctor.id),
                json!({ "is_available": available, "updated_at": Utc::now() }),
            )
            .await?;

        info!("Doctor {} availability set to {}", doctor.id, available);
        updated.into_iter().next().ok_or(DoctorError::NotFound)
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        request: UpdateDoctorProfileRequest,
    ) -> Result<Doctor, DoctorError> {
        let mut update_data = build_profile_changes(request)?;
        let doctor = self.get_by_user(user_id).await?;

        if update_data.is_empty() {
            return Ok(doctor);
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now()));

        let updated: Vec<Doctor> = self
            .supabase
            .update("doctors", &format!("id=eq.{}", doctor.id), Value::Object(update_data))
            .await?;

        info!("Doctor {} updated their profile", doctor.id);
        updated.into_iter().next().ok_or(DoctorError::NotFound)
    }
}
