// src/handlers/results.rs

use std::sync::Arc;

use axum::{
    Extension,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::result::ResultListParams,
    repository::Store,
    services::profile,
    utils::{jwt::Claims, response::ApiResponse},
};

/// Lists the caller's own results, newest first.
pub async fn list_my_results(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ResultListParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let results = store.list_results(user_id, params.family).await?;
    Ok(ApiResponse::ok(results))
}

/// Returns one result with its details. Only the owner may read it.
pub async fn get_result(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let view = profile::result_for_owner(store.as_ref(), user_id, id).await?;
    Ok(ApiResponse::ok(view))
}
