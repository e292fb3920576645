// src/repository/memory.rs

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::Utc;

use super::{
    ApiKeyRepository, RepoResult, RepositoryError, ResultRepository, UserRepository, WeightStore,
};
use crate::models::{
    api_key::{ApiKey, NewApiKey},
    assessment::{Choice, ChoiceRef, NewQuestion, NewTest, Question, QuestionRef, Test},
    family::Family,
    result::{NewResult, ResultDetail, TestResult},
    user::{NewUser, User},
};

#[derive(Debug, Clone)]
struct UserEntry {
    user: User,
    deleted: bool,
}

#[derive(Debug, Default)]
struct Tables {
    users: Vec<UserEntry>,
    tests: Vec<Test>,
    questions: Vec<(i64, i64, String)>,
    choices: Vec<Choice>,
    results: Vec<TestResult>,
    details: Vec<ResultDetail>,
    api_keys: Vec<ApiKey>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Soft-delete filter for every user read and write.
    fn active_user_mut(&mut self, id: i64) -> Option<&mut UserEntry> {
        self.users.iter_mut().find(|e| e.user.id == id && !e.deleted)
    }

    fn active_users(&self) -> impl Iterator<Item = &User> {
        self.users.iter().filter(|e| !e.deleted).map(|e| &e.user)
    }
}

/// In-process store with the same contract as [`super::PgStore`].
///
/// Every operation runs under one lock, and multi-row writes are staged and
/// checked before anything is applied, so a failed write leaves no trace.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("memory store lock poisoned".to_string()))
    }

    /// Number of stored results and detail rows, across all users.
    pub fn row_counts(&self) -> RepoResult<(usize, usize)> {
        let tables = self.lock()?;
        Ok((tables.results.len(), tables.details.len()))
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, new: NewUser) -> RepoResult<User> {
        let mut tables = self.lock()?;
        if tables.users.iter().any(|e| e.user.username == new.username) {
            return Err(RepositoryError::Conflict(format!(
                "Username '{}' already exists",
                new.username
            )));
        }

        let user = User {
            id: tables.next_id(),
            username: new.username,
            password: new.password_hash,
            role: new.role,
            learning_pattern: None,
            learning_style: None,
            created_at: Utc::now(),
        };
        tables.users.push(UserEntry {
            user: user.clone(),
            deleted: false,
        });
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> RepoResult<Option<User>> {
        let tables = self.lock()?;
        Ok(tables.active_users().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let tables = self.lock()?;
        Ok(tables.active_users().find(|u| u.username == username).cloned())
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let tables = self.lock()?;
        let mut users: Vec<User> = tables.active_users().cloned().collect();
        users.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(users)
    }

    async fn soft_delete_user(&self, id: i64) -> RepoResult<i64> {
        let mut tables = self.lock()?;
        let count = tables.results.iter().filter(|r| r.user_id == id).count() as i64;
        let entry = tables
            .active_user_mut(id)
            .ok_or(RepositoryError::NotFound("User"))?;
        entry.deleted = true;
        Ok(count)
    }
}

#[async_trait]
impl WeightStore for MemoryStore {
    async fn create_test(&self, new: NewTest) -> RepoResult<Test> {
        let mut tables = self.lock()?;
        let test = Test {
            id: tables.next_id(),
            name: new.name,
            family: new.family,
            description: new.description,
            created_at: Utc::now(),
        };
        tables.tests.push(test.clone());
        Ok(test)
    }

    async fn create_question(&self, new: NewQuestion) -> RepoResult<Question> {
        let mut tables = self.lock()?;
        if !tables.tests.iter().any(|t| t.id == new.test_id) {
            return Err(RepositoryError::NotFound("Test"));
        }

        let question_id = tables.next_id();
        let mut choices = Vec::with_capacity(new.choices.len());
        for choice in new.choices {
            choices.push(Choice {
                id: tables.next_id(),
                question_id,
                label: choice.label,
                weights: choice.weights,
            });
        }

        tables
            .questions
            .push((question_id, new.test_id, new.prompt.clone()));
        tables.choices.extend(choices.iter().cloned());

        Ok(Question {
            id: question_id,
            test_id: new.test_id,
            prompt: new.prompt,
            choices,
        })
    }

    async fn find_test(&self, id: i64) -> RepoResult<Option<Test>> {
        let tables = self.lock()?;
        Ok(tables.tests.iter().find(|t| t.id == id).cloned())
    }

    async fn list_tests(&self, family: Family) -> RepoResult<Vec<Test>> {
        let tables = self.lock()?;
        Ok(tables
            .tests
            .iter()
            .filter(|t| t.family == family)
            .cloned()
            .collect())
    }

    async fn questions_for_test(&self, test_id: i64) -> RepoResult<Vec<Question>> {
        let tables = self.lock()?;
        Ok(tables
            .questions
            .iter()
            .filter(|(_, t, _)| *t == test_id)
            .map(|(id, test_id, prompt)| Question {
                id: *id,
                test_id: *test_id,
                prompt: prompt.clone(),
                choices: tables
                    .choices
                    .iter()
                    .filter(|c| c.question_id == *id)
                    .cloned()
                    .collect(),
            })
            .collect())
    }

    async fn question_refs(&self, ids: &[i64]) -> RepoResult<Vec<QuestionRef>> {
        let tables = self.lock()?;
        Ok(tables
            .questions
            .iter()
            .filter(|(id, _, _)| ids.contains(id))
            .map(|(id, test_id, _)| QuestionRef {
                id: *id,
                test_id: *test_id,
            })
            .collect())
    }

    async fn choice_refs(&self, ids: &[i64]) -> RepoResult<Vec<ChoiceRef>> {
        let tables = self.lock()?;
        Ok(tables
            .choices
            .iter()
            .filter(|c| ids.contains(&c.id))
            .map(|c| ChoiceRef {
                id: c.id,
                question_id: c.question_id,
                weights: c.weights.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl ResultRepository for MemoryStore {
    async fn persist_result(&self, new: NewResult) -> RepoResult<i64> {
        let mut tables = self.lock()?;

        // Check every precondition before the first write.
        if tables.active_user_mut(new.user_id).is_none() {
            return Err(RepositoryError::NotFound("User"));
        }
        if !tables.tests.iter().any(|t| t.id == new.test_id) {
            return Err(RepositoryError::NotFound("Test"));
        }

        let result_id = tables.next_id();
        let mut details = Vec::with_capacity(new.details.len());
        for answer in new.details {
            details.push(ResultDetail {
                id: tables.next_id(),
                result_id,
                question_id: answer.question_id,
                choice_id: answer.choice_id,
                weights: answer.weights,
            });
        }

        tables.results.push(TestResult {
            id: result_id,
            user_id: new.user_id,
            test_id: new.test_id,
            family: new.family,
            dominant: new.dominant,
            created_at: Utc::now(),
        });
        tables.details.extend(details);

        if let Some(entry) = tables.active_user_mut(new.user_id) {
            match new.family {
                Family::Pattern => entry.user.learning_pattern = Some(new.dominant),
                Family::Style => entry.user.learning_style = Some(new.dominant),
            }
        }

        Ok(result_id)
    }

    async fn find_result(&self, id: i64) -> RepoResult<Option<TestResult>> {
        let tables = self.lock()?;
        Ok(tables.results.iter().find(|r| r.id == id).cloned())
    }

    async fn result_details(&self, result_id: i64) -> RepoResult<Vec<ResultDetail>> {
        let tables = self.lock()?;
        Ok(tables
            .details
            .iter()
            .filter(|d| d.result_id == result_id)
            .cloned()
            .collect())
    }

    async fn list_results(&self, user_id: i64, family: Option<Family>) -> RepoResult<Vec<TestResult>> {
        let tables = self.lock()?;
        // Ids grow monotonically, so reverse insertion order is newest first.
        Ok(tables
            .results
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id && family.is_none_or(|f| r.family == f))
            .cloned()
            .collect())
    }

    async fn latest_result(&self, user_id: i64, family: Family) -> RepoResult<Option<TestResult>> {
        let tables = self.lock()?;
        Ok(tables
            .results
            .iter()
            .rev()
            .find(|r| r.user_id == user_id && r.family == family)
            .cloned())
    }

    async fn count_results(&self, user_id: i64) -> RepoResult<HashMap<Family, i64>> {
        let tables = self.lock()?;
        let mut counts = HashMap::new();
        for result in tables.results.iter().filter(|r| r.user_id == user_id) {
            *counts.entry(result.family).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

#[async_trait]
impl ApiKeyRepository for MemoryStore {
    async fn create_api_key(&self, new: NewApiKey) -> RepoResult<ApiKey> {
        let mut tables = self.lock()?;
        if tables.api_keys.iter().any(|k| k.key_hash == new.key_hash) {
            return Err(RepositoryError::Conflict("API key collision".to_string()));
        }
        let key = ApiKey {
            id: tables.next_id(),
            partner_name: new.partner_name,
            prefix: new.prefix,
            key_hash: new.key_hash,
            created_at: Utc::now(),
            revoked_at: None,
        };
        tables.api_keys.push(key.clone());
        Ok(key)
    }

    async fn find_active_api_key(&self, key_hash: &str) -> RepoResult<Option<ApiKey>> {
        let tables = self.lock()?;
        Ok(tables
            .api_keys
            .iter()
            .find(|k| k.key_hash == key_hash && k.revoked_at.is_none())
            .cloned())
    }

    async fn list_api_keys(&self) -> RepoResult<Vec<ApiKey>> {
        let tables = self.lock()?;
        Ok(tables.api_keys.iter().rev().cloned().collect())
    }

    async fn revoke_api_key(&self, id: i64) -> RepoResult<()> {
        let mut tables = self.lock()?;
        let key = tables
            .api_keys
            .iter_mut()
            .find(|k| k.id == id && k.revoked_at.is_none())
            .ok_or(RepositoryError::NotFound("API key"))?;
        key.revoked_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        assessment::NewChoice,
        family::{Dimension, WeightVector},
        result::WeightedAnswer,
    };

    async fn seeded() -> (MemoryStore, User, Question) {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                username: "alice".to_string(),
                password_hash: "hash".to_string(),
                role: "user".to_string(),
            })
            .await
            .unwrap();
        let test = store
            .create_test(NewTest {
                name: "Gaya belajar".to_string(),
                family: Family::Style,
                description: None,
            })
            .await
            .unwrap();
        let question = store
            .create_question(NewQuestion {
                test_id: test.id,
                prompt: "How do you remember a route?".to_string(),
                choices: vec![NewChoice {
                    label: "A map".to_string(),
                    weights: WeightVector::from_ordered(Family::Style, &[3, 0, 1]).unwrap(),
                }],
            })
            .await
            .unwrap();
        (store, user, question)
    }

    fn new_result(user_id: i64, question: &Question) -> NewResult {
        let choice = &question.choices[0];
        NewResult {
            user_id,
            test_id: question.test_id,
            family: Family::Style,
            dominant: Dimension::Visual,
            details: vec![WeightedAnswer {
                question_id: question.id,
                choice_id: choice.id,
                weights: choice.weights.clone(),
            }],
        }
    }

    #[tokio::test]
    async fn persist_writes_header_details_and_profile_label() {
        let (store, user, question) = seeded().await;

        let id = store.persist_result(new_result(user.id, &question)).await.unwrap();

        assert_eq!(store.row_counts().unwrap(), (1, 1));
        assert_eq!(store.result_details(id).await.unwrap().len(), 1);
        let user = store.find_user(user.id).await.unwrap().unwrap();
        assert_eq!(user.learning_style, Some(Dimension::Visual));
        assert_eq!(user.learning_pattern, None);
    }

    #[tokio::test]
    async fn persist_for_deleted_user_leaves_nothing_behind() {
        let (store, user, question) = seeded().await;
        store.soft_delete_user(user.id).await.unwrap();

        let err = store.persist_result(new_result(user.id, &question)).await.unwrap_err();

        assert!(matches!(err, RepositoryError::NotFound("User")));
        assert_eq!(store.row_counts().unwrap(), (0, 0));
    }

    #[tokio::test]
    async fn soft_deleted_users_disappear_from_reads() {
        let (store, user, question) = seeded().await;
        store.persist_result(new_result(user.id, &question)).await.unwrap();
        store.persist_result(new_result(user.id, &question)).await.unwrap();

        let counts = store.count_results(user.id).await.unwrap();
        assert_eq!(counts.get(&Family::Style), Some(&2));
        assert_eq!(counts.get(&Family::Pattern), None);

        assert_eq!(store.soft_delete_user(user.id).await.unwrap(), 2);
        assert!(store.find_user(user.id).await.unwrap().is_none());
        assert!(store.find_user_by_username("alice").await.unwrap().is_none());
        assert!(store.list_users().await.unwrap().is_empty());
        assert!(matches!(
            store.soft_delete_user(user.id).await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn revoked_keys_are_not_active() {
        let store = MemoryStore::new();
        let key = store
            .create_api_key(NewApiKey {
                partner_name: "acme".to_string(),
                prefix: "abcd1234".to_string(),
                key_hash: "digest".to_string(),
            })
            .await
            .unwrap();

        assert!(store.find_active_api_key("digest").await.unwrap().is_some());
        store.revoke_api_key(key.id).await.unwrap();
        assert!(store.find_active_api_key("digest").await.unwrap().is_none());
    }
}
