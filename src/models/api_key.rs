// src/models/api_key.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Represents the 'api_keys' table. Only the SHA-256 digest of a key is stored.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ApiKey {
    pub id: i64,
    pub partner_name: String,
    /// First characters of the plaintext, for identification in listings.
    pub prefix: String,
    #[serde(skip)]
    pub key_hash: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub revoked_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Insert payload for an API key.
#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub partner_name: String,
    pub prefix: String,
    pub key_hash: String,
}

/// DTO for issuing a key.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateApiKeyRequest {
    #[validate(length(min = 1, max = 100))]
    pub partner_name: String,
}

/// Returned exactly once, when the key is issued.
#[derive(Debug, Serialize)]
pub struct ApiKeyCreatedResponse {
    pub id: i64,
    pub partner_name: String,
    pub prefix: String,
    pub key: String,
}

/// Injected into partner requests by the API key middleware.
#[derive(Debug, Clone)]
pub struct PartnerContext {
    pub key_id: i64,
    pub partner_name: String,
}
