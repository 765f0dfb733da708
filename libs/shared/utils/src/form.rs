//! Request bodies that arrive either as JSON or as `multipart/form-data`.

use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::{Map, Value};

use shared_models::error::AppError;

use crate::upload::{MultipartForm, UploadedImage, IMAGE_FIELD};

pub enum FormPayload {
    Json(Value),
    Multipart(MultipartForm),
}

impl<S> FromRequest<S> for FormPayload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.starts_with("multipart/form-data"))
            .unwrap_or(false);

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            Ok(Self::Multipart(MultipartForm::parse(multipart).await?))
        } else {
            let Json(value) = Json::<Value>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            Ok(Self::Json(value))
        }
    }
}

impl FormPayload {
    /// Deserialize the text part and pull out the image, if any. JSON clients
    /// may send the image as a base64 data URL under `image`.
    pub fn into_parts<T: DeserializeOwned>(self) -> Result<(T, Option<UploadedImage>), AppError> {
        let (value, image) = match self {
            Self::Json(mut value) => {
                let data_url = value
                    .as_object_mut()
                    .and_then(|object| object.remove(IMAGE_FIELD))
                    .and_then(|image| image.as_str().map(str::to_string))
                    .filter(|image| image.starts_with("data:"));

                let image = data_url
                    .map(|url| UploadedImage::from_data_url(IMAGE_FIELD, &url))
                    .transpose()?;
                (value, image)
            }
            Self::Multipart(form) => {
                let object: Map<String, Value> = form
                    .fields
                    .into_iter()
                    .map(|(name, text)| (name, Value::String(text)))
                    .collect();
                (Value::Object(object), form.image)
            }
        };

        let body = serde_json::from_value(value)
            .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?;
        Ok((body, image))
    }
}

// Multipart fields are always text, so numeric and boolean fields accept
// their string spelling too. Empty strings read as absent.

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

pub fn opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Option::<Loose>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Loose::Int(n)) => Ok(Some(n as f64)),
        Some(Loose::Float(n)) => Ok(Some(n)),
        Some(Loose::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Loose::Text(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
        Some(Loose::Bool(_)) => Err(serde::de::Error::custom("expected a number")),
    }
}

pub fn opt_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    match Option::<Loose>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Loose::Int(n)) => Ok(Some(n)),
        Some(Loose::Float(n)) if n.fract() == 0.0 => Ok(Some(n as i64)),
        Some(Loose::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Loose::Text(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
        Some(_) => Err(serde::de::Error::custom("expected an integer")),
    }
}

pub fn opt_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    match Option::<Loose>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Loose::Bool(b)) => Ok(Some(b)),
        Some(Loose::Text(s)) => match s.trim() {
            "" => Ok(None),
            "true" | "1" => Ok(Some(true)),
            "false" | "0" => Ok(Some(false)),
            other => Err(serde::de::Error::custom(format!("expected a boolean, got {}", other))),
        },
        Some(_) => Err(serde::de::Error::custom("expected a boolean")),
    }
}

/// Strings or numbers (`phone: 9876543210`) read as trimmed text.
pub fn opt_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Option::<Loose>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Loose::Text(s)) => Ok(Some(s.trim().to_string()).filter(|s| !s.is_empty())),
        Some(Loose::Int(n)) => Ok(Some(n.to_string())),
        Some(Loose::Float(n)) => Ok(Some(n.to_string())),
        Some(Loose::Bool(b)) => Ok(Some(b.to_string())),
    }
}
