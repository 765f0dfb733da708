use axum::http::HeaderMap;
use chrono::{TimeZone, Utc};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use tracing::debug;

use shared_models::auth::{JwtClaims, TokenUser};

pub fn validate_token(token: &str, jwt_secret: &str) -> Result<TokenUser, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    // Supabase tokens carry `aud: authenticated`; the audience is not pinned here.
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;

    let data = decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        debug!("Token rejected: {}", e);
        match e.kind() {
            ErrorKind::ExpiredSignature => "Token expired".to_string(),
            ErrorKind::InvalidSignature => "Invalid token signature".to_string(),
            _ => "Invalid token".to_string(),
        }
    })?;

    let claims = data.claims;
    let issued_at = claims.iat
        .and_then(|timestamp| Utc.timestamp_opt(timestamp as i64, 0).single());

    let user = TokenUser {
        id: claims.sub,
        email: claims.email,
        token_role: claims.role,
        metadata: claims.user_metadata,
        issued_at,
    };

    debug!("Token validated successfully for user: {}", user.id);
    Ok(user)
}

/// `Authorization: Bearer <token>` → `<token>`.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
