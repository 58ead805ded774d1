//! API key authentication extractor.
//!
//! Extracts and verifies API keys from:
//! - `Authorization: Bearer <key>` header
//! - `X-API-Key: <key>` header
//!
//! Keys are SHA-256 hashed and compared against the `api_keys` table.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sha2::{Digest, Sha256};
use sqlx::Row;

use crate::http::error::AppError;
use crate::state::AppState;

/// Prefix of every generated API key.
const KEY_PREFIX: &str = "playdo_";

/// Authenticated request marker. Extracting this validates the API key.
pub struct Authenticated;

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let api_key = extract_api_key(parts)?;
        let key_hash = hash_api_key(&api_key);

        let result = sqlx::query("SELECT id FROM api_keys WHERE key_hash = ?")
            .bind(&key_hash)
            .fetch_optional(&state.db_pool.reader)
            .await
            .map_err(|e| AppError::Internal(format!("Database error: {e}")))?;

        match result {
            Some(row) => {
                // Best effort; a failed timestamp update does not fail the request
                let id: String = row.get("id");
                let now = chrono::Utc::now().to_rfc3339();
                if let Err(e) = sqlx::query("UPDATE api_keys SET last_used_at = ? WHERE id = ?")
                    .bind(&now)
                    .bind(&id)
                    .execute(&state.db_pool.writer)
                    .await
                {
                    tracing::debug!(error = %e, "Failed to record API key use");
                }
                Ok(Authenticated)
            }
            None => Err(AppError::Unauthorized(
                "Invalid API key. Provide a valid key via 'Authorization: Bearer <key>' or 'X-API-Key: <key>' header.".to_string(),
            )),
        }
    }
}

/// Extract the API key from request headers.
fn extract_api_key(parts: &Parts) -> Result<String, AppError> {
    if let Some(auth) = parts.headers.get("authorization") {
        let auth_str = auth.to_str().map_err(|_| {
            AppError::Unauthorized("Invalid Authorization header encoding".to_string())
        })?;
        if let Some(key) = auth_str.strip_prefix("Bearer ") {
            return Ok(key.trim().to_string());
        }
    }

    if let Some(key) = parts.headers.get("x-api-key") {
        let key_str = key.to_str().map_err(|_| {
            AppError::Unauthorized("Invalid X-API-Key header encoding".to_string())
        })?;
        return Ok(key_str.trim().to_string());
    }

    Err(AppError::Unauthorized(
        "Missing API key. Provide via 'Authorization: Bearer <key>' or 'X-API-Key: <key>' header.".to_string(),
    ))
}

/// Compute SHA-256 hash of an API key (lowercase hex).
pub fn hash_api_key(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    format!("{:x}", digest)
}

/// Generate a random API key.
fn generate_api_key() -> String {
    format!(
        "{KEY_PREFIX}{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

/// Make sure at least one API key exists.
///
/// Returns the plaintext key when a new one was created (it is shown to the
/// user once and never stored), or `None` when a key already existed.
pub async fn ensure_api_key(state: &AppState) -> anyhow::Result<Option<String>> {
    let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM api_keys LIMIT 1")
        .fetch_optional(&state.db_pool.reader)
        .await?;

    if existing.is_some() {
        return Ok(None);
    }

    let plaintext_key = generate_api_key();
    let key_hash = hash_api_key(&plaintext_key);
    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query("INSERT INTO api_keys (id, key_hash, name, created_at) VALUES (?, ?, ?, ?)")
        .bind(&id)
        .bind(&key_hash)
        .bind("default")
        .bind(&now)
        .execute(&state.db_pool.writer)
        .await?;

    tracing::info!(key_id = %id, "Generated API key");

    Ok(Some(plaintext_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_hash_is_stable_hex() {
        let hash = hash_api_key("playdo_abc");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_api_key("playdo_abc"));
        assert_ne!(hash, hash_api_key("playdo_abd"));
    }

    #[test]
    fn test_generated_keys_are_prefixed_and_unique() {
        let a = generate_api_key();
        let b = generate_api_key();
        assert!(a.starts_with(KEY_PREFIX));
        assert_eq!(a.len(), KEY_PREFIX.len() + 64);
        assert_ne!(a, b);
    }

    #[test]
    fn test_extract_bearer_and_x_api_key() {
        let key = extract_api_key(&parts(&[("authorization", "Bearer  playdo_1 ")])).unwrap();
        assert_eq!(key, "playdo_1");

        let key = extract_api_key(&parts(&[("x-api-key", "playdo_2")])).unwrap();
        assert_eq!(key, "playdo_2");
    }

    #[test]
    fn test_missing_key_is_unauthorized() {
        assert!(matches!(
            extract_api_key(&parts(&[])),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            extract_api_key(&parts(&[("authorization", "Basic abc")])),
            Err(AppError::Unauthorized(_))
        ));
    }
}
