// src/repository/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, types::Json};

use super::{
    ApiKeyRepository, RepoResult, RepositoryError, ResultRepository, UserRepository, WeightStore,
};
use crate::models::{
    api_key::{ApiKey, NewApiKey},
    assessment::{Choice, ChoiceRef, NewQuestion, NewTest, Question, QuestionRef, Test},
    family::{Dimension, Family, WeightVector},
    result::{NewResult, ResultDetail, TestResult},
    user::{NewUser, User},
};

/// Postgres-backed store. Users are always read through the `active_users` view.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password: String,
    role: String,
    learning_pattern: Option<String>,
    learning_style: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(FromRow)]
struct TestRow {
    id: i64,
    name: String,
    family: String,
    description: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(FromRow)]
struct QuestionRow {
    id: i64,
    test_id: i64,
    prompt: String,
}

#[derive(FromRow)]
struct ChoiceRow {
    id: i64,
    question_id: i64,
    label: String,
    weights: Json<WeightVector>,
}

#[derive(FromRow)]
struct ResultRow {
    id: i64,
    user_id: i64,
    test_id: i64,
    family: String,
    dominant: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(FromRow)]
struct DetailRow {
    id: i64,
    result_id: i64,
    question_id: i64,
    choice_id: i64,
    weights: Json<WeightVector>,
}

fn parse_family(raw: &str) -> RepoResult<Family> {
    raw.parse::<Family>()
        .map_err(|e| RepositoryError::Corrupt(e.to_string()))
}

fn parse_dimension(raw: &str) -> RepoResult<Dimension> {
    raw.parse::<Dimension>()
        .map_err(|e| RepositoryError::Corrupt(e.to_string()))
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> RepoResult<Self> {
        Ok(User {
            id: row.id,
            username: row.username,
            password: row.password,
            role: row.role,
            learning_pattern: row.learning_pattern.as_deref().map(parse_dimension).transpose()?,
            learning_style: row.learning_style.as_deref().map(parse_dimension).transpose()?,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<TestRow> for Test {
    type Error = RepositoryError;

    fn try_from(row: TestRow) -> RepoResult<Self> {
        Ok(Test {
            id: row.id,
            name: row.name,
            family: parse_family(&row.family)?,
            description: row.description,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<ResultRow> for TestResult {
    type Error = RepositoryError;

    fn try_from(row: ResultRow) -> RepoResult<Self> {
        Ok(TestResult {
            id: row.id,
            user_id: row.user_id,
            test_id: row.test_id,
            family: parse_family(&row.family)?,
            dominant: parse_dimension(&row.dominant)?,
            created_at: row.created_at,
        })
    }
}

impl From<ChoiceRow> for Choice {
    fn from(row: ChoiceRow) -> Self {
        Choice {
            id: row.id,
            question_id: row.question_id,
            label: row.label,
            weights: row.weights.0,
        }
    }
}

impl From<DetailRow> for ResultDetail {
    fn from(row: DetailRow) -> Self {
        ResultDetail {
            id: row.id,
            result_id: row.result_id,
            question_id: row.question_id,
            choice_id: row.choice_id,
            weights: row.weights.0,
        }
    }
}

fn conflict_or_database(err: sqlx::Error, message: impl FnOnce() -> String) -> RepositoryError {
    let unique = matches!(&err, sqlx::Error::Database(db) if db.is_unique_violation());
    if unique {
        RepositoryError::Conflict(message())
    } else {
        RepositoryError::Database(err)
    }
}

/// Builds `<prefix> IN (...)` over the given ids, the way dynamic IN lists are
/// bound everywhere in this module.
fn in_list<'a>(prefix: &str, ids: &'a [i64]) -> QueryBuilder<'a, Postgres> {
    let mut query_builder = QueryBuilder::<Postgres>::new(prefix);
    query_builder.push(" IN (");
    let mut separated = query_builder.separated(",");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
    query_builder
}

const USER_COLUMNS: &str =
    "id, username, password, role, learning_pattern, learning_style, created_at";
const RESULT_COLUMNS: &str = "id, user_id, test_id, family, dominant, created_at";

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, new: NewUser) -> RepoResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (username, password, role) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        ))
        .bind(&new.username)
        .bind(&new.password_hash)
        .bind(&new.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_database(e, || format!("Username '{}' already exists", new.username)))?;

        row.try_into()
    }

    async fn find_user(&self, id: i64) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM active_users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM active_users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM active_users ORDER BY id DESC"
        ))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(User::try_from)
        .collect()
    }

    async fn soft_delete_user(&self, id: i64) -> RepoResult<i64> {
        let mut tx = self.pool.begin().await?;

        let results_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM results WHERE user_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        let deleted = sqlx::query(
            "UPDATE users SET deleted_at = NOW() WHERE id = (SELECT id FROM active_users WHERE id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if deleted.rows_affected() == 0 {
            return Err(RepositoryError::NotFound("User"));
        }

        tx.commit().await?;
        Ok(results_count)
    }
}

#[async_trait]
impl WeightStore for PgStore {
    async fn create_test(&self, new: NewTest) -> RepoResult<Test> {
        sqlx::query_as::<_, TestRow>(
            "INSERT INTO tests (name, family, description) VALUES ($1, $2, $3)
             RETURNING id, name, family, description, created_at",
        )
        .bind(&new.name)
        .bind(new.family.as_str())
        .bind(&new.description)
        .fetch_one(&self.pool)
        .await?
        .try_into()
    }

    async fn create_question(&self, new: NewQuestion) -> RepoResult<Question> {
        let mut tx = self.pool.begin().await?;

        let question_id: i64 =
            sqlx::query_scalar("INSERT INTO questions (test_id, prompt) VALUES ($1, $2) RETURNING id")
                .bind(new.test_id)
                .bind(&new.prompt)
                .fetch_one(&mut *tx)
                .await?;

        let mut choices = Vec::with_capacity(new.choices.len());
        for choice in new.choices {
            let id: i64 = sqlx::query_scalar(
                "INSERT INTO choices (question_id, label, weights) VALUES ($1, $2, $3) RETURNING id",
            )
            .bind(question_id)
            .bind(&choice.label)
            .bind(Json(&choice.weights))
            .fetch_one(&mut *tx)
            .await?;

            choices.push(Choice {
                id,
                question_id,
                label: choice.label,
                weights: choice.weights,
            });
        }

        tx.commit().await?;

        Ok(Question {
            id: question_id,
            test_id: new.test_id,
            prompt: new.prompt,
            choices,
        })
    }

    async fn find_test(&self, id: i64) -> RepoResult<Option<Test>> {
        sqlx::query_as::<_, TestRow>(
            "SELECT id, name, family, description, created_at FROM tests WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Test::try_from)
        .transpose()
    }

    async fn list_tests(&self, family: Family) -> RepoResult<Vec<Test>> {
        sqlx::query_as::<_, TestRow>(
            "SELECT id, name, family, description, created_at FROM tests WHERE family = $1 ORDER BY id",
        )
        .bind(family.as_str())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Test::try_from)
        .collect()
    }

    async fn questions_for_test(&self, test_id: i64) -> RepoResult<Vec<Question>> {
        let questions = sqlx::query_as::<_, QuestionRow>(
            "SELECT id, test_id, prompt FROM questions WHERE test_id = $1 ORDER BY id",
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;

        let choices = sqlx::query_as::<_, ChoiceRow>(
            "SELECT c.id, c.question_id, c.label, c.weights
             FROM choices c
             JOIN questions q ON q.id = c.question_id
             WHERE q.test_id = $1
             ORDER BY c.id",
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_question: HashMap<i64, Vec<Choice>> = HashMap::new();
        for row in choices {
            by_question.entry(row.question_id).or_default().push(row.into());
        }

        Ok(questions
            .into_iter()
            .map(|q| Question {
                choices: by_question.remove(&q.id).unwrap_or_default(),
                id: q.id,
                test_id: q.test_id,
                prompt: q.prompt,
            })
            .collect())
    }

    async fn question_refs(&self, ids: &[i64]) -> RepoResult<Vec<QuestionRef>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = in_list("SELECT id, test_id, prompt FROM questions WHERE id", ids);
        let rows: Vec<QuestionRow> = query.build_query_as().fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|q| QuestionRef {
                id: q.id,
                test_id: q.test_id,
            })
            .collect())
    }

    async fn choice_refs(&self, ids: &[i64]) -> RepoResult<Vec<ChoiceRef>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = in_list("SELECT id, question_id, label, weights FROM choices WHERE id", ids);
        let rows: Vec<ChoiceRow> = query.build_query_as().fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|c| ChoiceRef {
                id: c.id,
                question_id: c.question_id,
                weights: c.weights.0,
            })
            .collect())
    }
}

#[async_trait]
impl ResultRepository for PgStore {
    async fn persist_result(&self, new: NewResult) -> RepoResult<i64> {
        // Dropping `tx` on any early return rolls the whole submission back
        // and hands the connection back to the pool.
        let mut tx = self.pool.begin().await?;

        let result_id: i64 = sqlx::query_scalar(
            "INSERT INTO results (user_id, test_id, family, dominant) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(new.user_id)
        .bind(new.test_id)
        .bind(new.family.as_str())
        .bind(new.dominant.as_str())
        .fetch_one(&mut *tx)
        .await?;

        for detail in &new.details {
            sqlx::query(
                "INSERT INTO result_details (result_id, question_id, choice_id, weights)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(result_id)
            .bind(detail.question_id)
            .bind(detail.choice_id)
            .bind(Json(&detail.weights))
            .execute(&mut *tx)
            .await?;
        }

        let update = match new.family {
            Family::Pattern => "UPDATE active_users SET learning_pattern = $1 WHERE id = $2",
            Family::Style => "UPDATE active_users SET learning_style = $1 WHERE id = $2",
        };
        let updated = sqlx::query(update)
            .bind(new.dominant.as_str())
            .bind(new.user_id)
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound("User"));
        }

        tx.commit().await?;
        Ok(result_id)
    }

    async fn find_result(&self, id: i64) -> RepoResult<Option<TestResult>> {
        sqlx::query_as::<_, ResultRow>(&format!("SELECT {RESULT_COLUMNS} FROM results WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(TestResult::try_from)
            .transpose()
    }

    async fn result_details(&self, result_id: i64) -> RepoResult<Vec<ResultDetail>> {
        let rows = sqlx::query_as::<_, DetailRow>(
            "SELECT id, result_id, question_id, choice_id, weights
             FROM result_details WHERE result_id = $1 ORDER BY id",
        )
        .bind(result_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ResultDetail::from).collect())
    }

    async fn list_results(&self, user_id: i64, family: Option<Family>) -> RepoResult<Vec<TestResult>> {
        sqlx::query_as::<_, ResultRow>(&format!(
            "SELECT {RESULT_COLUMNS} FROM results
             WHERE user_id = $1 AND ($2::TEXT IS NULL OR family = $2)
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .bind(family.map(Family::as_str))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(TestResult::try_from)
        .collect()
    }

    async fn latest_result(&self, user_id: i64, family: Family) -> RepoResult<Option<TestResult>> {
        sqlx::query_as::<_, ResultRow>(&format!(
            "SELECT {RESULT_COLUMNS} FROM results
             WHERE user_id = $1 AND family = $2
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        ))
        .bind(user_id)
        .bind(family.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(TestResult::try_from)
        .transpose()
    }

    async fn count_results(&self, user_id: i64) -> RepoResult<HashMap<Family, i64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT family, COUNT(*) FROM results WHERE user_id = $1 GROUP BY family",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(family, count)| Ok((parse_family(&family)?, count)))
            .collect()
    }
}

const API_KEY_COLUMNS: &str = "id, partner_name, prefix, key_hash, created_at, revoked_at";

#[async_trait]
impl ApiKeyRepository for PgStore {
    async fn create_api_key(&self, new: NewApiKey) -> RepoResult<ApiKey> {
        sqlx::query_as::<_, ApiKey>(&format!(
            "INSERT INTO api_keys (partner_name, prefix, key_hash) VALUES ($1, $2, $3)
             RETURNING {API_KEY_COLUMNS}"
        ))
        .bind(&new.partner_name)
        .bind(&new.prefix)
        .bind(&new.key_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_database(e, || "API key collision".to_string()))
    }

    async fn find_active_api_key(&self, key_hash: &str) -> RepoResult<Option<ApiKey>> {
        Ok(sqlx::query_as::<_, ApiKey>(&format!(
            "SELECT {API_KEY_COLUMNS} FROM api_keys WHERE key_hash = $1 AND revoked_at IS NULL"
        ))
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_api_keys(&self) -> RepoResult<Vec<ApiKey>> {
        Ok(sqlx::query_as::<_, ApiKey>(&format!(
            "SELECT {API_KEY_COLUMNS} FROM api_keys ORDER BY id DESC"
        ))
        .fetch_all(&self.pool)
        .await?)
    }

    async fn revoke_api_key(&self, id: i64) -> RepoResult<()> {
        let revoked = sqlx::query(
            "UPDATE api_keys SET revoked_at = NOW() WHERE id = $1 AND revoked_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if revoked.rows_affected() == 0 {
            return Err(RepositoryError::NotFound("API key"));
        }
        Ok(())
    }
}
