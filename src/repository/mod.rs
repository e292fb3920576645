// src/repository/mod.rs

//! Storage seams. Handlers and services only talk to these traits; the
//! Postgres adapter serves production and the in-memory adapter serves tests.

pub mod memory;
pub mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::models::{
    api_key::{ApiKey, NewApiKey},
    assessment::{ChoiceRef, NewQuestion, NewTest, Question, QuestionRef, Test},
    family::Family,
    result::{NewResult, ResultDetail, TestResult},
    user::{NewUser, User},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored data is invalid: {0}")]
    Corrupt(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Users. Every read sees active (not soft-deleted) users only.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, new: NewUser) -> RepoResult<User>;
    async fn find_user(&self, id: i64) -> RepoResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    async fn list_users(&self) -> RepoResult<Vec<User>>;
    /// Soft-deletes the user and returns how many results they own.
    async fn soft_delete_user(&self, id: i64) -> RepoResult<i64>;
}

/// Reference data: tests, questions and weighted choices.
#[async_trait]
pub trait WeightStore: Send + Sync {
    async fn create_test(&self, new: NewTest) -> RepoResult<Test>;
    async fn create_question(&self, new: NewQuestion) -> RepoResult<Question>;
    async fn find_test(&self, id: i64) -> RepoResult<Option<Test>>;
    async fn list_tests(&self, family: Family) -> RepoResult<Vec<Test>>;
    async fn questions_for_test(&self, test_id: i64) -> RepoResult<Vec<Question>>;
    /// Looks up questions by id. Unknown ids are simply absent.
    async fn question_refs(&self, ids: &[i64]) -> RepoResult<Vec<QuestionRef>>;
    /// Looks up choices by id. Unknown ids are simply absent.
    async fn choice_refs(&self, ids: &[i64]) -> RepoResult<Vec<ChoiceRef>>;
}

/// Append-only results.
#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Writes header, details and the profile label in one transaction.
    /// Nothing persists when any step fails.
    async fn persist_result(&self, new: NewResult) -> RepoResult<i64>;
    async fn find_result(&self, id: i64) -> RepoResult<Option<TestResult>>;
    async fn result_details(&self, result_id: i64) -> RepoResult<Vec<ResultDetail>>;
    /// Newest first.
    async fn list_results(&self, user_id: i64, family: Option<Family>) -> RepoResult<Vec<TestResult>>;
    async fn latest_result(&self, user_id: i64, family: Family) -> RepoResult<Option<TestResult>>;
    /// Number of results per family. Families never taken are absent.
    async fn count_results(&self, user_id: i64) -> RepoResult<HashMap<Family, i64>>;
}

#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    async fn create_api_key(&self, new: NewApiKey) -> RepoResult<ApiKey>;
    /// Unrevoked key with the given digest.
    async fn find_active_api_key(&self, key_hash: &str) -> RepoResult<Option<ApiKey>>;
    async fn list_api_keys(&self) -> RepoResult<Vec<ApiKey>>;
    async fn revoke_api_key(&self, id: i64) -> RepoResult<()>;
}

/// Everything the application needs from storage.
pub trait Store: UserRepository + WeightStore + ResultRepository + ApiKeyRepository {}

impl<T> Store for T where T: UserRepository + WeightStore + ResultRepository + ApiKeyRepository {}
