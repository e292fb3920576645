// src/handlers/admin.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        api_key::{ApiKeyCreatedResponse, CreateApiKeyRequest, NewApiKey},
        assessment::{CreateQuestionRequest, CreateTestRequest, NewChoice, NewQuestion, NewTest},
        family::WeightVector,
    },
    repository::Store,
    utils::{hash::generate_api_key, html::clean_html, jwt::Claims, response::ApiResponse},
};

/// Creates a new test.
/// Admin only.
pub async fn create_test(
    State(store): State<Arc<dyn Store>>,
    payload: Result<Json<CreateTestRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let test = store
        .create_test(NewTest {
            name: clean_html(&payload.name),
            family: payload.family,
            description: payload.description.as_deref().map(clean_html),
        })
        .await?;

    tracing::info!(test_id = test.id, "Created {} test '{}'", test.family, test.name);

    Ok((StatusCode::CREATED, ApiResponse::ok(test)))
}

/// Adds a question with its weighted choices to a test.
/// Admin only. Every weight vector must cover exactly the test family's dimensions.
pub async fn create_question(
    State(store): State<Arc<dyn Store>>,
    Path(test_id): Path<i64>,
    payload: Result<Json<CreateQuestionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let test = store
        .find_test(test_id)
        .await?
        .ok_or(AppError::NotFound("Test not found".to_string()))?;

    let choices = payload
        .choices
        .into_iter()
        .enumerate()
        .map(|(index, choice)| {
            let weights = WeightVector::new(test.family, choice.weights).map_err(|e| {
                AppError::Validation {
                    message: format!("Choice {} has invalid weights: {}", index + 1, e),
                    details: vec![json!({ "choice_index": index, "reason": e.to_string() })],
                }
            })?;
            Ok(NewChoice {
                label: clean_html(&choice.label),
                weights,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    let question = store
        .create_question(NewQuestion {
            test_id: test.id,
            prompt: clean_html(&payload.prompt),
            choices,
        })
        .await?;

    Ok((StatusCode::CREATED, ApiResponse::ok(question)))
}

/// Lists all active users.
/// Admin only.
pub async fn list_users(State(store): State<Arc<dyn Store>>) -> Result<impl IntoResponse, AppError> {
    let users = store.list_users().await?;
    Ok(ApiResponse::ok(users))
}

/// Soft-deletes a user by ID. Their results are kept.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if id == claims.user_id()? {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let results_retained = store.soft_delete_user(id).await?;
    tracing::info!(user_id = id, results_retained, "Soft-deleted user");

    Ok(ApiResponse::ok(json!({
        "id": id,
        "results_retained": results_retained
    })))
}

/// Issues a partner API key. The plaintext is returned once and never stored.
/// Admin only.
pub async fn create_api_key(
    State(store): State<Arc<dyn Store>>,
    payload: Result<Json<CreateApiKeyRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let generated = generate_api_key();
    let key = store
        .create_api_key(NewApiKey {
            partner_name: clean_html(&payload.partner_name),
            prefix: generated.prefix,
            key_hash: generated.hash,
        })
        .await?;

    tracing::info!(key_id = key.id, prefix = %key.prefix, "Issued API key for {}", key.partner_name);

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(ApiKeyCreatedResponse {
            id: key.id,
            partner_name: key.partner_name,
            prefix: key.prefix,
            key: generated.plaintext,
        }),
    ))
}

/// Lists issued keys (never the key itself).
/// Admin only.
pub async fn list_api_keys(State(store): State<Arc<dyn Store>>) -> Result<impl IntoResponse, AppError> {
    let keys = store.list_api_keys().await?;
    Ok(ApiResponse::ok(keys))
}

/// Revokes a key. Requests presenting it are rejected from then on.
/// Admin only.
pub async fn revoke_api_key(
    State(store): State<Arc<dyn Store>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    store.revoke_api_key(id).await?;
    tracing::info!(key_id = id, "Revoked API key");
    Ok(StatusCode::NO_CONTENT)
}
