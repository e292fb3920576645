// src/models/result.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::family::{Dimension, Family, WeightVector};

/// One submitted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerInput {
    pub question_id: i64,
    pub choice_id: i64,
}

/// DTO for submitting a test attempt.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswersRequest {
    /// Any id is accepted here; one that names no test is a 404.
    pub test_id: i64,
    #[serde(default)]
    #[validate(length(min = 1, message = "answers must not be empty"))]
    pub answers: Vec<AnswerInput>,
}

/// An answer that passed validation, carrying the weights of its choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedAnswer {
    pub question_id: i64,
    pub choice_id: i64,
    pub weights: WeightVector,
}

/// Insert payload for one submission: header, details and the profile label.
#[derive(Debug, Clone)]
pub struct NewResult {
    pub user_id: i64,
    pub test_id: i64,
    pub family: Family,
    pub dominant: Dimension,
    pub details: Vec<WeightedAnswer>,
}

/// Represents the 'results' table. Append-only.
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub id: i64,
    pub user_id: i64,
    pub test_id: i64,
    pub family: Family,
    pub dominant: Dimension,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'result_details' table.
#[derive(Debug, Clone, Serialize)]
pub struct ResultDetail {
    pub id: i64,
    pub result_id: i64,
    pub question_id: i64,
    pub choice_id: i64,
    pub weights: WeightVector,
}

/// Response payload of a successful submission.
#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub result_id: i64,
    pub dominant_label: Dimension,
    pub dimension_totals: BTreeMap<Dimension, i64>,
}

/// Full view of one stored result.
#[derive(Debug, Serialize)]
pub struct ResultView {
    #[serde(flatten)]
    pub result: TestResult,
    pub details: Vec<ResultDetail>,
    pub dimension_totals: BTreeMap<Dimension, i64>,
    pub percentages: BTreeMap<Dimension, u32>,
}

/// Query parameters for listing results.
#[derive(Debug, Deserialize)]
pub struct ResultListParams {
    pub family: Option<Family>,
}
