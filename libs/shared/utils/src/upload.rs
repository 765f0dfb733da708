use std::collections::HashMap;
use std::path::Path;

use axum::extract::Multipart;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use rand::Rng;
use thiserror::Error;
use tracing::debug;

use shared_models::error::AppError;

pub const IMAGE_FIELD: &str = "image";
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_MIME_TYPES: [&str; 5] = ["image/jpeg", "image/jpg", "image/png", "image/webp", "image/gif"];
const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];

#[derive(Error, Debug, PartialEq)]
pub enum UploadError {
    #[error("Only image files (JPEG, PNG, WebP, GIF) are allowed!")]
    InvalidMimeType,

    #[error("Invalid file extension!")]
    InvalidExtension,

    #[error("File too large")]
    FileTooLarge,

    #[error("Only one file is allowed")]
    TooManyFiles,

    #[error("Unexpected file field: {0}")]
    UnexpectedField(String),

    #[error("Malformed upload: {0}")]
    Malformed(String),
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub field_name: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    pub fn new(field_name: &str, file_name: &str, content_type: &str, bytes: Vec<u8>) -> Result<Self, UploadError> {
        validate_image(content_type, file_name, bytes.len())?;
        Ok(Self {
            field_name: field_name.to_string(),
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            bytes,
        })
    }

    /// `data:image/png;base64,....` as sent by JSON clients.
    pub fn from_data_url(field_name: &str, data_url: &str) -> Result<Self, UploadError> {
        let rest = data_url
            .strip_prefix("data:")
            .ok_or_else(|| UploadError::Malformed("expected a data URL".to_string()))?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| UploadError::Malformed("data URL has no payload".to_string()))?;
        let content_type = meta
            .strip_suffix(";base64")
            .ok_or_else(|| UploadError::Malformed("data URL is not base64".to_string()))?;

        let extension = content_type.rsplit('/').next().unwrap_or_default();
        if !ALLOWED_MIME_TYPES.contains(&content_type) {
            return Err(UploadError::InvalidMimeType);
        }

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| UploadError::Malformed(e.to_string()))?;

        Self::new(field_name, &format!("{}.{}", field_name, extension), content_type, bytes)
    }

    pub fn extension(&self) -> String {
        file_extension(&self.file_name).unwrap_or_else(|| "jpg".to_string())
    }

    /// `<folder>/<owner>/<field>-<unix_ms>-<random>.<ext>`
    pub fn object_name(&self, folder: &str, owner: &str) -> String {
        let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
        format!(
            "{}/{}/{}-{}-{}.{}",
            folder,
            owner,
            self.field_name,
            Utc::now().timestamp_millis(),
            suffix,
            self.extension()
        )
    }
}

fn file_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn validate_image(content_type: &str, file_name: &str, size: usize) -> Result<(), UploadError> {
    if !ALLOWED_MIME_TYPES.contains(&content_type.to_ascii_lowercase().as_str()) {
        return Err(UploadError::InvalidMimeType);
    }

    match file_extension(file_name) {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => {}
        _ => return Err(UploadError::InvalidExtension),
    }

    if size > MAX_IMAGE_BYTES {
        return Err(UploadError::FileTooLarge);
    }

    Ok(())
}

/// Text fields plus the single optional `image` file of a multipart body.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub image: Option<UploadedImage>,
}

impl MultipartForm {
    pub async fn parse(mut multipart: Multipart) -> Result<Self, UploadError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| UploadError::Malformed(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    if name != IMAGE_FIELD {
                        return Err(UploadError::UnexpectedField(name));
                    }
                    if form.image.is_some() {
                        return Err(UploadError::TooManyFiles);
                    }

                    let content_type = field.content_type().unwrap_or_default().to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| UploadError::Malformed(e.body_text()))?;

                    debug!("Received {} ({}, {} bytes)", file_name, content_type, bytes.len());
                    form.image = Some(UploadedImage::new(&name, &file_name, &content_type, bytes.to_vec())?);
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| UploadError::Malformed(e.body_text()))?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}
