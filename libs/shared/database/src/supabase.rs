use reqwest::{
    Client,
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;
use shared_models::error::AppError;

/// Postgres error code for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Error, Debug)]
pub enum SupabaseError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
}

impl SupabaseError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, SupabaseError::Conflict(_))
    }

    fn from_status(status: StatusCode, body: &str) -> Self {
        let message = extract_error_message(body);
        let code = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("code").and_then(|c| c.as_str().map(str::to_string)));

        if code.as_deref() == Some(UNIQUE_VIOLATION) {
            return SupabaseError::Conflict(message);
        }

        match status.as_u16() {
            401 | 403 => SupabaseError::Auth(message),
            404 | 406 => SupabaseError::NotFound(message),
            409 => SupabaseError::Conflict(message),
            other => SupabaseError::Api { status: other, message },
        }
    }
}

impl From<SupabaseError> for AppError {
    fn from(err: SupabaseError) -> Self {
        match err {
            SupabaseError::NotFound(_) => AppError::NotFound("Resource not found".to_string()),
            SupabaseError::Conflict(_) => AppError::Conflict("Resource already exists".to_string()),
            SupabaseError::Decode(msg) => AppError::Database(msg),
            other => AppError::ExternalService(other.to_string()),
        }
    }
}

/// PostgREST returns `{message, code, details, hint}`, GoTrue returns
/// `{error, error_description}` or `{msg}`.
fn extract_error_message(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => ["message", "error_description", "msg", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string()),
        Err(_) => body.to_string(),
    }
}

pub struct SupabaseClient {
    client: Client,
    pub(crate) base_url: String,
    anon_key: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
            service_key: config.service_key().to_string(),
        }
    }

    /// Headers for a call. Without a user token the service role key is the bearer.
    pub(crate) fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap, SupabaseError> {
        let mut headers = HeaderMap::new();

        let api_key = if self.service_key.is_empty() { &self.anon_key } else { &self.service_key };
        headers.insert(
            "apikey",
            HeaderValue::from_str(api_key).map_err(|e| SupabaseError::InvalidHeader(e.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let bearer = auth_token.unwrap_or(api_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", bearer))
                .map_err(|e| SupabaseError::InvalidHeader(e.to_string()))?,
        );

        Ok(headers)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<reqwest::Response, SupabaseError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("API error ({}): {}", status, error_text);
            return Err(SupabaseError::from_status(status, &error_text));
        }

        Ok(response)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T, SupabaseError>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(&self, method: Method, path: &str,
                                         auth_token: Option<&str>, body: Option<Value>,
                                         extra_headers: Option<HeaderMap>)
                                         -> Result<T, SupabaseError>
    where T: DeserializeOwned {
        let response = self.send(method, path, auth_token, body, extra_headers).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| SupabaseError::Decode(e.to_string()))
    }

    /// Fire a request whose response body is not needed (204 responses).
    pub async fn execute(&self, method: Method, path: &str,
                         auth_token: Option<&str>, body: Option<Value>)
                         -> Result<(), SupabaseError> {
        self.send(method, path, auth_token, body, None).await?;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // PostgREST helpers
    // ---------------------------------------------------------------------

    /// `GET /rest/v1/{table}?{query}`
    pub async fn select<T>(&self, table: &str, query: &str) -> Result<Vec<T>, SupabaseError>
    where T: DeserializeOwned {
        let path = rest_path(table, query);
        let rows: Vec<Value> = self.request(Method::GET, &path, None, None).await?;
        decode_rows(rows)
    }

    pub async fn select_one<T>(&self, table: &str, query: &str) -> Result<Option<T>, SupabaseError>
    where T: DeserializeOwned {
        let query = if query.is_empty() { "limit=1".to_string() } else { format!("{}&limit=1", query) };
        Ok(self.select(table, &query).await?.into_iter().next())
    }

    /// Insert a row and return the stored representation.
    pub async fn insert<T>(&self, table: &str, row: Value) -> Result<T, SupabaseError>
    where T: DeserializeOwned {
        let rows: Vec<Value> = self.request_with_headers(
            Method::POST,
            &rest_path(table, ""),
            None,
            Some(row),
            Some(prefer_representation()),
        ).await?;

        decode_rows::<T>(rows)?
            .into_iter()
            .next()
            .ok_or_else(|| SupabaseError::Decode(format!("Insert into {} returned no rows", table)))
    }

    /// Patch rows matching `filter` and return them.
    pub async fn update<T>(&self, table: &str, filter: &str, changes: Value) -> Result<Vec<T>, SupabaseError>
    where T: DeserializeOwned {
        let rows: Vec<Value> = self.request_with_headers(
            Method::PATCH,
            &rest_path(table, filter),
            None,
            Some(changes),
            Some(prefer_representation()),
        ).await?;

        decode_rows(rows)
    }

    pub async fn delete(&self, table: &str, filter: &str) -> Result<(), SupabaseError> {
        self.execute(Method::DELETE, &rest_path(table, filter), None, None).await
    }

    /// Exact row count through the `Content-Range` header.
    pub async fn count(&self, table: &str, filter: &str) -> Result<u64, SupabaseError> {
        let query = if filter.is_empty() { "select=id".to_string() } else { format!("select=id&{}", filter) };
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("prefer"), HeaderValue::from_static("count=exact"));

        let response = self.send(Method::HEAD, &rest_path(table, &query), None, None, Some(headers)).await?;

        let range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| SupabaseError::Decode("Missing Content-Range header".to_string()))?;

        parse_content_range_total(range)
            .ok_or_else(|| SupabaseError::Decode(format!("Unparseable Content-Range: {}", range)))
    }

    /// Cheap connectivity probe used by the health endpoint.
    pub async fn ping(&self) -> Result<(), SupabaseError> {
        let _: Vec<Value> = self.request(
            Method::GET,
            "/rest/v1/user_profiles?select=id&limit=1",
            None,
            None,
        ).await?;
        Ok(())
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }
}

fn rest_path(table: &str, query: &str) -> String {
    if query.is_empty() {
        format!("/rest/v1/{}", table)
    } else {
        format!("/rest/v1/{}?{}", table, query)
    }
}

fn prefer_representation() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static("prefer"), HeaderValue::from_static("return=representation"));
    headers
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, SupabaseError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| SupabaseError::Decode(e.to_string()))
}

/// `0-9/42` and `*/0` both carry the total after the slash.
fn parse_content_range_total(range: &str) -> Option<u64> {
    range.rsplit('/').next()?.trim().parse().ok()
}
