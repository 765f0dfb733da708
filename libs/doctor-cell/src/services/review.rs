use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use security_cell::ValidationService;
use shared_config::AppConfig;
use shared_database::{SupabaseClient, SupabaseError};
use shared_models::domain::AppointmentStatus;

use crate::models::{AddReviewRequest, Doctor, DoctorError, Review, ReviewedAppointment};

pub const MAX_REVIEW_LENGTH: usize = 1000;

pub struct ReviewService {
    supabase: SupabaseClient,
}

/// Rating average after one more review, rounded to two decimals.
pub fn running_mean(current: f64, count: i32, rating: i32) -> f64 {
    let count = count.max(0) as f64;
    let mean = (current * count + rating as f64) / (count + 1.0);
    (mean * 100.0).round() / 100.0
}

fn validate_review(request: &AddReviewRequest) -> Result<(String, i32), DoctorError> {
    let appointment_id = request
        .appointment_id
        .clone()
        .ok_or_else(|| DoctorError::Validation("Appointment ID is required".to_string()))?;
    if !ValidationService::validate_uuid(&appointment_id) {
        return Err(DoctorError::Validation("Invalid appointment ID".to_string()));
    }

    let rating = request
        .rating
        .filter(|rating| (1..=5).contains(rating))
        .ok_or_else(|| DoctorError::Validation("Rating must be between 1 and 5".to_string()))?;

    if let Some(text) = &request.review_text {
        if !ValidationService::validate_text_length(text, MAX_REVIEW_LENGTH) {
            return Err(DoctorError::Validation(format!(
                "Review must be at most {} characters",
                MAX_REVIEW_LENGTH
            )));
        }
    }

    Ok((appointment_id, rating as i32))
}

impl ReviewService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn reviews_for(&self, doctor_id: &str) -> Result<Vec<Review>, DoctorError> {
        if !ValidationService::validate_uuid(doctor_id) {
            return Err(DoctorError::NotFound);
        }

        Ok(self
            .supabase
            .select("reviews", &format!("doctor_id=eq.{}&order=created_at.desc", doctor_id))
            .await?)
    }

    pub async fn add_review(&self, patient_id: &str, request: AddReviewRequest) -> Result<Review, DoctorError> {
        let (appointment_id, rating) = validate_review(&request)?;

        let appointment: ReviewedAppointment = self
            .supabase
            .select_one(
                "appointments",
                &format!("id=eq.{}&select=id,patient_id,doctor_id,status", appointment_id),
            )
            .await?
            .ok_or(DoctorError::AppointmentNotFound)?;

        if appointment.patient_id.to_string() != patient_id {
            warn!("Patient {} tried to review appointment {}", patient_id, appointment.id);
            return Err(DoctorError::NotOwner);
        }
        if appointment.status != AppointmentStatus::Completed {
            return Err(DoctorError::NotReviewable);
        }

        let existing: Option<Review> = self
            .supabase
            .select_one("reviews", &format!("appointment_id=eq.{}", appointment_id))
            .await?;
        if existing.is_some() {
            return Err(DoctorError::AlreadyReviewed);
        }

        let review: Review = self
            .supabase
            .insert(
                "reviews",
                json!({
                    "patient_id": patient_id,
                    "doctor_id": appointment.doctor_id,
                    "appointment_id": appointment.id,
                    "rating": rating,
                    "review_text": request.review_text,
                    "created_at": Utc::now()
                }),
            )
            .await
            .map_err(|e| match e {
                SupabaseError::Conflict(_) => DoctorError::AlreadyReviewed,
                other => other.into(),
            })?;

        if let Err(e) = self.bump_rating(&appointment.doctor_id.to_string(), rating).await {
            warn!("Failed to update rating of doctor {}: {}", appointment.doctor_id, e);
        }

        info!("Review {} added for doctor {}", review.id, review.doctor_id);
        Ok(review)
    }

    async fn bump_rating(&self, doctor_id: &str, rating: i32) -> Result<(), DoctorError> {
        let doctor: Doctor = self
            .supabase
            .select_one("doctors", &format!("id=eq.{}", doctor_id))
            .await?
            .ok_or(DoctorError::NotFound)?;

        let total = doctor.total_reviews.unwrap_or(0);
        let mean = running_mean(doctor.rating.unwrap_or(0.0), total, rating);

        self.supabase
            .update::<Doctor>(
                "doctors",
                &format!("id=eq.{}", doctor_id),
                json!({ "rating": mean, "total_reviews": total + 1 }),
            )
            .await?;
        Ok(())
    }
}
