// src/models/assessment.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::family::{Dimension, Family, WeightVector};

/// Represents the 'tests' table. Provisioned by admins, read-only afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Test {
    pub id: i64,
    pub name: String,
    pub family: Family,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A choice including its weights. Never sent to test-takers.
#[derive(Debug, Clone, Serialize)]
pub struct Choice {
    pub id: i64,
    pub question_id: i64,
    pub label: String,
    pub weights: WeightVector,
}

/// A question with all of its choices.
#[derive(Debug, Clone, Serialize)]
pub struct Question {
    pub id: i64,
    pub test_id: i64,
    pub prompt: String,
    pub choices: Vec<Choice>,
}

/// Ownership facts about a question, used to validate answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRef {
    pub id: i64,
    pub test_id: i64,
}

/// Ownership facts and weights of a choice, used to validate and score answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceRef {
    pub id: i64,
    pub question_id: i64,
    pub weights: WeightVector,
}

/// DTO for sending a choice to the client (weights hidden).
#[derive(Debug, Serialize)]
pub struct PublicChoice {
    pub id: i64,
    pub label: String,
}

/// DTO for sending a question to the client.
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub prompt: String,
    pub choices: Vec<PublicChoice>,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            prompt: q.prompt,
            choices: q
                .choices
                .into_iter()
                .map(|c| PublicChoice {
                    id: c.id,
                    label: c.label,
                })
                .collect(),
        }
    }
}

/// DTO for creating a new test.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTestRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub family: Family,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

/// DTO for one choice inside [`CreateQuestionRequest`].
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateChoiceRequest {
    pub label: String,
    pub weights: BTreeMap<Dimension, u32>,
}

/// DTO for adding a question (with its weighted choices) to a test.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub prompt: String,
    #[validate(custom(function = validate_choices))]
    pub choices: Vec<CreateChoiceRequest>,
}

fn validate_choices(choices: &[CreateChoiceRequest]) -> Result<(), validator::ValidationError> {
    if choices.is_empty() {
        return Err(validator::ValidationError::new("choices_cannot_be_empty"));
    }
    for choice in choices {
        if choice.label.trim().is_empty() {
            return Err(validator::ValidationError::new("choice_label_empty"));
        }
        if choice.label.len() > 500 {
            return Err(validator::ValidationError::new("choice_label_too_long"));
        }
    }
    Ok(())
}

/// Insert payload for a test, after validation and sanitising.
#[derive(Debug, Clone)]
pub struct NewTest {
    pub name: String,
    pub family: Family,
    pub description: Option<String>,
}

/// Insert payload for a question and its choices.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub test_id: i64,
    pub prompt: String,
    pub choices: Vec<NewChoice>,
}

#[derive(Debug, Clone)]
pub struct NewChoice {
    pub label: String,
    pub weights: WeightVector,
}
