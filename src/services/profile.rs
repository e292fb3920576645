// src/services/profile.rs

use crate::{
    error::AppError,
    models::{
        family::Family,
        result::ResultView,
        user::{FamilyProfile, LearningProfile},
    },
    repository::Store,
    services::scoring,
};

/// Latest result of each family, read from the result history.
///
/// A family the user never took is `None`, which is the "not yet tested"
/// state rather than an error.
pub async fn learning_profile(store: &dyn Store, user_id: i64) -> Result<LearningProfile, AppError> {
    Ok(LearningProfile {
        learning_pattern: latest_for_family(store, user_id, Family::Pattern).await?,
        learning_style: latest_for_family(store, user_id, Family::Style).await?,
    })
}

async fn latest_for_family(
    store: &dyn Store,
    user_id: i64,
    family: Family,
) -> Result<Option<FamilyProfile>, AppError> {
    let Some(result) = store.latest_result(user_id, family).await? else {
        return Ok(None);
    };

    let details = store.result_details(result.id).await?;
    let score = scoring::score(family, details.iter().map(|d| &d.weights));

    Ok(Some(FamilyProfile {
        result_id: result.id,
        test_id: result.test_id,
        label: result.dominant,
        taken_at: result.created_at,
        percentages: scoring::percentages(&score.dimension_totals),
        dimension_totals: score.dimension_totals,
    }))
}

/// Loads one result for `caller_id`. Results of other users are forbidden.
pub async fn result_for_owner(
    store: &dyn Store,
    caller_id: i64,
    result_id: i64,
) -> Result<ResultView, AppError> {
    let result = store
        .find_result(result_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Result not found".to_string()))?;

    if result.user_id != caller_id {
        tracing::warn!(caller_id, result_id, "Refused access to another user's result");
        return Err(AppError::Forbidden(
            "You can only view your own results".to_string(),
        ));
    }

    let details = store.result_details(result.id).await?;
    let score = scoring::score(result.family, details.iter().map(|d| &d.weights));

    Ok(ResultView {
        percentages: scoring::percentages(&score.dimension_totals),
        dimension_totals: score.dimension_totals,
        details,
        result,
    })
}
