// src/services/submission.rs

use std::collections::HashMap;

use validator::Validate;

use crate::{
    error::AppError,
    models::{
        family::Family,
        result::{NewResult, SubmissionResponse, SubmitAnswersRequest},
    },
    repository::Store,
    services::{
        scoring,
        validation::{self, AnswerError, AnswerFault},
    },
};

/// Validates, scores and stores one test submission.
///
/// * Input checks run before any storage access.
/// * The target test must exist and belong to `family`.
/// * Every answer must reference a question of that test and one of its choices;
///   the first bad pair rejects the whole submission before anything is written.
/// * Header, detail rows and the profile label are written atomically.
pub async fn submit(
    store: &dyn Store,
    user_id: i64,
    family: Family,
    req: SubmitAnswersRequest,
) -> Result<SubmissionResponse, AppError> {
    req.validate()?;

    let test = store
        .find_test(req.test_id)
        .await?
        .filter(|t| t.family == family)
        .ok_or_else(|| AppError::NotFound(format!("No {} test with id {}", family, req.test_id)))?;

    let question_ids = unique(req.answers.iter().map(|a| a.question_id));
    let choice_ids = unique(req.answers.iter().map(|a| a.choice_id));

    let questions: HashMap<_, _> = store
        .question_refs(&question_ids)
        .await?
        .into_iter()
        .map(|q| (q.id, q))
        .collect();
    let choices: HashMap<_, _> = store
        .choice_refs(&choice_ids)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    let answers = validation::check_answers(test.id, family, &req.answers, &questions, &choices)
        .map_err(rejected_answer)?;

    let score = scoring::score(family, answers.iter().map(|a| &a.weights));
    let answer_count = answers.len();

    let result_id = store
        .persist_result(NewResult {
            user_id,
            test_id: test.id,
            family,
            dominant: score.dominant,
            details: answers,
        })
        .await
        .inspect_err(|e| tracing::error!("Failed to persist {} result for user {}: {}", family, user_id, e))?;

    tracing::info!(
        user_id,
        test_id = test.id,
        result_id,
        answers = answer_count,
        "{} submission scored as {}",
        family,
        score.dominant
    );

    Ok(SubmissionResponse {
        result_id,
        dominant_label: score.dominant,
        dimension_totals: score.dimension_totals,
    })
}

fn unique(ids: impl Iterator<Item = i64>) -> Vec<i64> {
    let mut ids: Vec<i64> = ids.collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn rejected_answer(err: AnswerError) -> AppError {
    let message = match err.fault {
        AnswerFault::InvalidQuestion => format!(
            "Question {} does not belong to this test",
            err.question_id
        ),
        AnswerFault::InvalidChoice => format!(
            "Choice {} does not belong to question {}",
            err.choice_id, err.question_id
        ),
        AnswerFault::WrongFamily => format!(
            "Choice {} is not weighted for this test family",
            err.choice_id
        ),
    };
    let details = serde_json::to_value(&err).map(|v| vec![v]).unwrap_or_default();
    AppError::Validation { message, details }
}
