// src/services/validation.rs

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{
    assessment::{ChoiceRef, QuestionRef},
    family::Family,
    result::{AnswerInput, WeightedAnswer},
};

/// Why an answer was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerFault {
    /// The question does not exist or belongs to another test.
    InvalidQuestion,
    /// The choice does not exist or belongs to another question.
    InvalidChoice,
    /// The choice's weights are not for the test's family.
    WrongFamily,
}

/// First offending answer of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("answer (question {question_id}, choice {choice_id}) is invalid: {fault:?}")]
pub struct AnswerError {
    pub question_id: i64,
    pub choice_id: i64,
    pub fault: AnswerFault,
}

/// Checks every answer against the looked-up questions and choices.
///
/// Stops at the first bad pair; the caller rejects the whole submission.
/// On success returns the answers in submission order, each carrying the
/// weights of its choice.
pub fn check_answers(
    test_id: i64,
    family: Family,
    answers: &[AnswerInput],
    questions: &HashMap<i64, QuestionRef>,
    choices: &HashMap<i64, ChoiceRef>,
) -> Result<Vec<WeightedAnswer>, AnswerError> {
    answers
        .iter()
        .map(|answer| {
            let reject = |fault| AnswerError {
                question_id: answer.question_id,
                choice_id: answer.choice_id,
                fault,
            };

            match questions.get(&answer.question_id) {
                Some(q) if q.test_id == test_id => {}
                _ => return Err(reject(AnswerFault::InvalidQuestion)),
            }

            let choice = match choices.get(&answer.choice_id) {
                Some(c) if c.question_id == answer.question_id => c,
                _ => return Err(reject(AnswerFault::InvalidChoice)),
            };

            if choice.weights.family() != family {
                return Err(reject(AnswerFault::WrongFamily));
            }

            Ok(WeightedAnswer {
                question_id: answer.question_id,
                choice_id: answer.choice_id,
                weights: choice.weights.clone(),
            })
        })
        .collect()
}
