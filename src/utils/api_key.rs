// src/utils/api_key.rs

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};

use crate::{
    config::API_KEY_HEADER, error::AppError, models::api_key::PartnerContext, state::AppState,
    utils::hash::sha256_hex,
};

/// Axum Middleware: partner authentication.
///
/// Hashes the `X-API-Key` header and looks the digest up among unrevoked keys.
/// On success a [`PartnerContext`] is injected for the handler; otherwise 401.
pub async fn api_key_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let key_hash = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(sha256_hex)
        .ok_or_else(|| AppError::AuthError("Missing API key".to_string()))?;

    let key = state
        .store
        .find_active_api_key(&key_hash)
        .await?
        .ok_or_else(|| AppError::AuthError("Invalid API key".to_string()))?;

    tracing::debug!(key_id = key.id, partner = %key.partner_name, "Partner request authenticated");

    req.extensions_mut().insert(PartnerContext {
        key_id: key.id,
        partner_name: key.partner_name,
    });
    Ok(next.run(req).await)
}
