// src/handlers/auth.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{CreateUserRequest, LoginRequest, NewUser},
    repository::Store,
    utils::{
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
        response::ApiResponse,
    },
};

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(store): State<Arc<dyn Store>>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let password_hash = hash_password(&payload.password)?;

    let user = store
        .create_user(NewUser {
            username: payload.username,
            password_hash,
            role: "user".to_string(),
        })
        .await?;

    tracing::info!(user_id = user.id, "Registered user {}", user.username);

    Ok((StatusCode::CREATED, ApiResponse::ok(user)))
}

/// Authenticates a user and returns a JWT token.
///
/// Soft-deleted accounts are invisible here, so they cannot log in.
pub async fn login(
    State(store): State<Arc<dyn Store>>,
    State(config): State<Config>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let user = store
        .find_user_by_username(&payload.username)
        .await?
        .ok_or(AppError::AuthError("Invalid username or password".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError("Invalid username or password".to_string()));
    }

    let token = sign_jwt(user.id, &user.role, &config.jwt_secret, config.jwt_expiration)?;

    Ok(ApiResponse::ok(json!({
        "token": token,
        "type": "Bearer",
        "expires_in": config.jwt_expiration
    })))
}
