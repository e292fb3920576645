// src/handlers/assessment.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::{assessment::PublicQuestion, family::Family, result::SubmitAnswersRequest},
    repository::Store,
    services::submission,
    utils::{jwt::Claims, response::ApiResponse},
};

/// Parses the `{family}` path segment (`pattern`/`style`, or `pola`/`gaya`).
pub(crate) fn parse_family(raw: &str) -> Result<Family, AppError> {
    raw.parse::<Family>()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

/// Lists the tests of one family.
pub async fn list_tests(
    State(store): State<Arc<dyn Store>>,
    Path(family): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let family = parse_family(&family)?;
    let tests = store.list_tests(family).await?;
    Ok(ApiResponse::ok(tests))
}

/// Returns a test's questions with their choices. Weights stay server-side.
pub async fn list_questions(
    State(store): State<Arc<dyn Store>>,
    Path((family, test_id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let family = parse_family(&family)?;

    store
        .find_test(test_id)
        .await?
        .filter(|t| t.family == family)
        .ok_or_else(|| AppError::NotFound(format!("No {} test with id {}", family, test_id)))?;

    let questions: Vec<PublicQuestion> = store
        .questions_for_test(test_id)
        .await?
        .into_iter()
        .map(PublicQuestion::from)
        .collect();

    Ok(ApiResponse::ok(questions))
}

/// Submits answers for a test and returns the scored result.
pub async fn submit_answers(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(family): Path<String>,
    payload: Result<Json<SubmitAnswersRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let family = parse_family(&family)?;
    let Json(req) = payload?;
    let user_id = claims.user_id()?;

    let outcome = submission::submit(store.as_ref(), user_id, family, req).await?;

    Ok((StatusCode::CREATED, ApiResponse::ok(outcome)))
}
