use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use shared_database::SupabaseError;
use shared_models::error::AppError;
use shared_utils::form::opt_text;

/// Partial update; absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default, alias = "name", deserialize_with = "opt_text")]
    pub full_name: Option<String>,
    #[serde(default, alias = "phone", deserialize_with = "opt_text")]
    pub phone_number: Option<String>,
    #[serde(default, alias = "dob", deserialize_with = "opt_text")]
    pub date_of_birth: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub gender: Option<String>,
    /// Plain string, `{line1, line2, city, state, zip}`, or that object JSON-encoded.
    #[serde(default)]
    pub address: Option<Value>,
}

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("{0}")]
    Validation(String),

    #[error("Profile not found")]
    NotFound,

    #[error("Image upload failed: {0}")]
    Upload(SupabaseError),

    #[error(transparent)]
    Upstream(#[from] SupabaseError),
}

impl From<ProfileError> for AppError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::Validation(msg) => AppError::ValidationError(msg),
            ProfileError::NotFound => AppError::NotFound(err.to_string()),
            ProfileError::Upload(e) => AppError::ExternalService(e.to_string()),
            ProfileError::Upstream(e) => e.into(),
        }
    }
}

/// Address objects are stored as a single comma separated line.
pub fn flatten_address(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(parsed @ Value::Object(_)) => flatten_address(&parsed),
            _ => Some(text.trim().to_string()),
        },
        Value::Object(fields) => {
            let parts: Vec<&str> = ["line1", "line2", "city", "state", "zip"]
                .iter()
                .filter_map(|key| fields.get(*key).and_then(Value::as_str))
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .collect();
            Some(parts.join(", "))
        }
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn address_objects_are_flattened() {
        let address = json!({ "line1": "12 Park St", "line2": "", "city": "Pune", "state": "MH", "zip": "411001" });
        assert_eq!(flatten_address(&address).as_deref(), Some("12 Park St, Pune, MH, 411001"));
    }

    #[test]
    fn encoded_address_objects_are_flattened() {
        let address = json!(r#"{"line1":"Flat 4","line2":"MG Road"}"#);
        assert_eq!(flatten_address(&address).as_deref(), Some("Flat 4, MG Road"));
    }

    #[test]
    fn plain_addresses_are_kept() {
        assert_eq!(flatten_address(&json!(" 221B Baker Street ")).as_deref(), Some("221B Baker Street"));
        assert_eq!(flatten_address(&Value::Null), None);
    }
}
