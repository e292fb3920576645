// src/handlers/profile.rs

use std::sync::Arc;

use axum::{
    Extension,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::{api_key::PartnerContext, family::Family, user::MeResponse},
    repository::Store,
    services::profile,
    utils::{jwt::Claims, response::ApiResponse},
};

/// Get current user's profile, latest result per family and result counts.
pub async fn get_me(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let user = store
        .find_user(user_id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let learning = profile::learning_profile(store.as_ref(), user_id).await?;
    let counts = store.count_results(user_id).await?;
    let count_of = |family: Family| counts.get(&family).copied().unwrap_or(0);

    Ok(ApiResponse::ok(MeResponse {
        id: user.id,
        username: user.username,
        role: user.role,
        created_at: user.created_at,
        learning_pattern: user.learning_pattern,
        learning_style: user.learning_style,
        profile: learning,
        pattern_results_count: count_of(Family::Pattern),
        style_results_count: count_of(Family::Style),
    }))
}

/// Partner view of a user's learning profile.
pub async fn get_partner_profile(
    State(store): State<Arc<dyn Store>>,
    Extension(partner): Extension<PartnerContext>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    store
        .find_user(user_id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    tracing::info!(
        key_id = partner.key_id,
        partner = %partner.partner_name,
        user_id,
        "Partner profile read"
    );

    let learning = profile::learning_profile(store.as_ref(), user_id).await?;
    Ok(ApiResponse::ok(learning))
}
