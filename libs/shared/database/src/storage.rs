//! Supabase Storage objects.

use reqwest::header::{HeaderValue, CONTENT_TYPE};
use tracing::{debug, error};

use crate::supabase::{SupabaseClient, SupabaseError};

impl SupabaseClient {
    /// Upload raw bytes and return the public URL of the stored object.
    pub async fn upload_object(
        &self,
        bucket: &str,
        object_path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, SupabaseError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, object_path);
        debug!("Uploading {} bytes to {}", bytes.len(), url);

        let mut headers = self.get_headers(None)?;
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(content_type).map_err(|e| SupabaseError::InvalidHeader(e.to_string()))?,
        );
        headers.insert("x-upsert", HeaderValue::from_static("true"));

        let response = self.http()
            .post(&url)
            .headers(headers)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Storage upload failed ({}): {}", status, error_text);
            return Err(SupabaseError::Api { status: status.as_u16(), message: error_text });
        }

        Ok(self.public_object_url(bucket, object_path))
    }

    pub async fn delete_object(&self, bucket: &str, object_path: &str) -> Result<(), SupabaseError> {
        self.execute(
            reqwest::Method::DELETE,
            &format!("/storage/v1/object/{}/{}", bucket, object_path),
            None,
            None,
        ).await
    }

    pub fn public_object_url(&self, bucket: &str, object_path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, bucket, object_path)
    }

    /// Inverse of [`public_object_url`](Self::public_object_url) for objects in `bucket`.
    pub fn object_path_from_url<'a>(&self, bucket: &str, url: &'a str) -> Option<&'a str> {
        let marker = format!("/storage/v1/object/public/{}/", bucket);
        url.find(&marker).map(|idx| &url[idx + marker.len()..])
    }
}
