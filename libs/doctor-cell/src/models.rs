use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use security_cell::ValidationService;
use shared_database::SupabaseError;
use shared_models::domain::AppointmentStatus;
use shared_models::error::AppError;
use shared_utils::form::{opt_bool, opt_f64, opt_i64, opt_text};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: Option<String>,
    pub medical_license: Option<String>,
    pub specialization: String,
    pub qualification: Option<String>,
    #[serde(default)]
    pub experience_years: i32,
    pub bio: Option<String>,
    #[serde(default)]
    pub consultation_fee: f64,
    #[serde(default)]
    pub is_available: bool,
    pub office_address: Option<Value>,
    pub working_hours: Option<WorkingHours>,
    pub rating: Option<f64>,
    pub total_reviews: Option<i32>,
    pub verified_at: Option<DateTime<Utc>>,
    pub profile_image_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Doctor {
    /// Whether a new booking at `date`/`time` fits this doctor's week.
    pub fn accepts_slot(&self, date: NaiveDate, time: NaiveTime) -> Result<(), String> {
        match &self.working_hours {
            Some(hours) => hours.accepts(date, time),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkingDay {
    pub start: Option<String>,
    pub end: Option<String>,
    #[serde(default)]
    pub closed: bool,
}

/// Weekly hours keyed by lowercase weekday name. Days without an entry are
/// unrestricted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkingHours(pub BTreeMap<String, WorkingDay>);

const WEEKDAYS: [&str; 7] = ["monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday"];

fn weekday_key(day: Weekday) -> &'static str {
    WEEKDAYS[day.num_days_from_monday() as usize]
}

impl WorkingHours {
    pub fn accepts(&self, date: NaiveDate, time: NaiveTime) -> Result<(), String> {
        let Some(day) = self.0.get(weekday_key(date.weekday())) else {
            return Ok(());
        };

        if day.closed {
            return Err(format!("Doctor does not work on {}", date.format("%A")));
        }

        let start = day.start.as_deref().and_then(ValidationService::parse_time_of_day);
        let end = day.end.as_deref().and_then(ValidationService::parse_time_of_day);

        match (start, end) {
            (Some(start), Some(end)) if time < start || time >= end => Err(format!(
                "Doctor is available between {} and {} on {}",
                start.format("%H:%M"),
                end.format("%H:%M"),
                date.format("%A")
            )),
            _ => Ok(()),
        }
    }

    /// Parse and check hours sent by a doctor.
    pub fn parse(value: &Value) -> Result<Self, String> {
        let value = match value {
            Value::String(text) => serde_json::from_str(text).map_err(|_| "Invalid working hours".to_string())?,
            other => other.clone(),
        };

        let hours: BTreeMap<String, WorkingDay> =
            serde_json::from_value(value).map_err(|_| "Invalid working hours".to_string())?;

        let mut normalized = BTreeMap::new();
        for (day, hours) in hours {
            let key = day.trim().to_ascii_lowercase();
            if !WEEKDAYS.contains(&key.as_str()) {
                return Err(format!("Unknown weekday: {}", day));
            }

            if !hours.closed {
                let start = hours.start.as_deref().and_then(ValidationService::parse_time_of_day);
                let end = hours.end.as_deref().and_then(ValidationService::parse_time_of_day);
                match (start, end) {
                    (Some(start), Some(end)) if start < end => {}
                    _ => return Err(format!("Invalid working hours for {}", key)),
                }
            }

            normalized.insert(key, hours);
        }

        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_id: Uuid,
    pub rating: i32,
    pub review_text: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// The columns of an appointment a review depends on.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewedAppointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub status: AppointmentStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct DoctorListQuery {
    #[serde(default, alias = "specialization")]
    pub speciality: Option<String>,
    #[serde(default)]
    pub available_only: Option<bool>,
}

/// Admin form for onboarding a doctor. Field names follow the old admin
/// panel (`name`, `speciality`, `degree`, `experience`, `fees`, `about`).
#[derive(Debug, Default, Deserialize)]
pub struct AddDoctorRequest {
    #[serde(default, alias = "name", deserialize_with = "opt_text")]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, alias = "speciality", deserialize_with = "opt_text")]
    pub specialization: Option<String>,
    #[serde(default, alias = "degree", deserialize_with = "opt_text")]
    pub qualification: Option<String>,
    #[serde(default, alias = "experience", deserialize_with = "opt_i64")]
    pub experience_years: Option<i64>,
    #[serde(default, alias = "fees", deserialize_with = "opt_f64")]
    pub consultation_fee: Option<f64>,
    #[serde(default, alias = "about", deserialize_with = "opt_text")]
    pub bio: Option<String>,
    #[serde(default, alias = "address")]
    pub office_address: Option<Value>,
    #[serde(default, deserialize_with = "opt_text")]
    pub medical_license: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangeAvailabilityRequest {
    #[serde(default, alias = "docId", alias = "doctor_id")]
    pub doc_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDoctorProfileRequest {
    #[serde(default, alias = "fees", deserialize_with = "opt_f64")]
    pub consultation_fee: Option<f64>,
    #[serde(default, alias = "address")]
    pub office_address: Option<Value>,
    #[serde(default, alias = "available", deserialize_with = "opt_bool")]
    pub is_available: Option<bool>,
    #[serde(default, alias = "about", deserialize_with = "opt_text")]
    pub bio: Option<String>,
    #[serde(default)]
    pub working_hours: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddReviewRequest {
    #[serde(default, alias = "appointmentId", deserialize_with = "opt_text")]
    pub appointment_id: Option<String>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub rating: Option<i64>,
    #[serde(default, alias = "review", alias = "comment", deserialize_with = "opt_text")]
    pub review_text: Option<String>,
}

/// Office addresses are kept as JSON objects; encoded objects sent through
/// multipart are decoded first.
pub fn office_address_value(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(parsed @ Value::Object(_)) => Some(parsed),
            _ => Some(Value::String(text.trim().to_string())),
        },
        other => Some(other.clone()),
    }
}

#[derive(Error, Debug)]
pub enum DoctorError {
    #[error("{0}")]
    Validation(String),

    #[error("Doctor not found")]
    NotFound,

    #[error("Doctor profile not found")]
    ProfileMissing,

    #[error("Doctor with this email already exists")]
    EmailTaken,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Not authorized to review this appointment")]
    NotOwner,

    #[error("Only completed appointments can be reviewed")]
    NotReviewable,

    #[error("You have already reviewed this appointment")]
    AlreadyReviewed,

    #[error("Image upload failed: {0}")]
    Upload(SupabaseError),

    #[error(transparent)]
    Upstream(#[from] SupabaseError),
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::Validation(msg) => AppError::ValidationError(msg),
            DoctorError::NotFound | DoctorError::ProfileMissing | DoctorError::AppointmentNotFound => {
                AppError::NotFound(err.to_string())
            }
            DoctorError::NotOwner => AppError::Forbidden(err.to_string()),
            DoctorError::NotReviewable => AppError::BadRequest(err.to_string()),
            DoctorError::EmailTaken | DoctorError::AlreadyReviewed => AppError::Conflict(err.to_string()),
            DoctorError::Upload(e) => AppError::ExternalService(e.to_string()),
            DoctorError::Upstream(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn hours() -> WorkingHours {
        WorkingHours::parse(&json!({
            "Monday": { "start": "09:00", "end": "17:00" },
            "sunday": { "closed": true }
        }))
        .unwrap()
    }

    fn at(date: &str, time: &str) -> (NaiveDate, NaiveTime) {
        (
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            NaiveTime::parse_from_str(time, "%H:%M").unwrap(),
        )
    }

    #[test]
    fn slot_inside_hours_is_accepted() {
        // 2030-01-14 is a Monday
        let (date, time) = at("2030-01-14", "09:00");
        assert!(hours().accepts(date, time).is_ok());
    }

    #[test]
    fn end_of_day_is_exclusive() {
        let (date, time) = at("2030-01-14", "17:00");
        assert_matches!(hours().accepts(date, time), Err(msg) if msg.contains("between 09:00 and 17:00"));
    }

    #[test]
    fn closed_day_rejects_everything() {
        let (date, time) = at("2030-01-20", "10:00");
        assert_eq!(hours().accepts(date, time), Err("Doctor does not work on Sunday".to_string()));
    }

    #[test]
    fn days_without_hours_are_open() {
        let (date, time) = at("2030-01-16", "23:30");
        assert!(hours().accepts(date, time).is_ok());
    }

    #[test]
    fn inverted_hours_are_rejected() {
        let result = WorkingHours::parse(&json!({ "friday": { "start": "18:00", "end": "08:00" } }));
        assert_eq!(result.unwrap_err(), "Invalid working hours for friday");
        assert!(WorkingHours::parse(&json!({ "funday": { "closed": true } })).is_err());
    }

    #[test]
    fn encoded_hours_are_accepted() {
        let parsed = WorkingHours::parse(&json!(r#"{"tuesday":{"start":"10:00 AM","end":"2:00 PM"}}"#)).unwrap();
        assert!(parsed.0.contains_key("tuesday"));
    }

    #[test]
    fn legacy_form_names_are_aliases() {
        let request: AddDoctorRequest = serde_json::from_value(json!({
            "name": "Dr. Rao",
            "speciality": "Dermatologist",
            "degree": "MBBS",
            "experience": "4",
            "fees": "350",
            "about": "Skin specialist",
            "address": "{\"line1\":\"17 Hill Rd\",\"city\":\"Mumbai\"}"
        }))
        .unwrap();

        assert_eq!(request.specialization.as_deref(), Some("Dermatologist"));
        assert_eq!(request.experience_years, Some(4));
        assert_eq!(request.consultation_fee, Some(350.0));
        let address = office_address_value(request.office_address.as_ref().unwrap()).unwrap();
        assert_eq!(address["city"], "Mumbai");
    }

    #[test]
    fn doctor_rows_decode_with_defaults() {
        let doctor: Doctor = serde_json::from_value(json!({
            "id": "7d5c8f1e-43a1-4c36-9b4b-1f1e4f3e0a11",
            "user_id": "0b8a3c5e-2f7d-4f0a-9c1e-5d7e9f1a2b3c",
            "specialization": "Neurologist",
            "consultation_fee": 800,
            "is_available": true,
            "working_hours": { "monday": { "start": "09:00", "end": "12:00" } }
        }))
        .unwrap();

        assert_eq!(doctor.experience_years, 0);
        let (date, time) = at("2030-01-14", "13:00");
        assert!(doctor.accepts_slot(date, time).is_err());
    }
}
