// tests/postgres_store_tests.rs
//
// Runs against a real Postgres when DATABASE_URL is set; skipped otherwise.

use learning_profile::{
    models::{
        assessment::{NewChoice, NewQuestion, NewTest, Question},
        family::{Dimension, Family, WeightVector},
        result::{NewResult, WeightedAnswer},
        user::NewUser,
    },
    repository::{PgStore, RepositoryError, ResultRepository, UserRepository, WeightStore},
};
use sqlx::{PgPool, postgres::PgPoolOptions};

async fn connect() -> Option<(PgStore, PgPool)> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres store test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    Some((PgStore::new(pool.clone()), pool))
}

async fn user(store: &PgStore) -> i64 {
    store
        .create_user(NewUser {
            username: format!("pg_{}", &uuid::Uuid::new_v4().to_string()[..8]),
            password_hash: "x".to_string(),
            role: "user".to_string(),
        })
        .await
        .unwrap()
        .id
}

/// A style test with one question and two choices: visual-heavy, kinestetik-heavy.
async fn style_question(store: &PgStore) -> Question {
    let test = store
        .create_test(NewTest {
            name: "Gaya belajar".to_string(),
            family: Family::Style,
            description: None,
        })
        .await
        .unwrap();
    store
        .create_question(NewQuestion {
            test_id: test.id,
            prompt: "How do you remember a route?".to_string(),
            choices: vec![
                NewChoice {
                    label: "A map".to_string(),
                    weights: WeightVector::from_ordered(Family::Style, &[3, 0, 1]).unwrap(),
                },
                NewChoice {
                    label: "Walking it".to_string(),
                    weights: WeightVector::from_ordered(Family::Style, &[0, 1, 4]).unwrap(),
                },
            ],
        })
        .await
        .unwrap()
}

fn submission(user_id: i64, question: &Question, picks: &[usize], dominant: Dimension) -> NewResult {
    NewResult {
        user_id,
        test_id: question.test_id,
        family: Family::Style,
        dominant,
        details: picks
            .iter()
            .map(|i| WeightedAnswer {
                question_id: question.id,
                choice_id: question.choices[*i].id,
                weights: question.choices[*i].weights.clone(),
            })
            .collect(),
    }
}

async fn row_counts(pool: &PgPool, user_id: i64) -> (i64, i64) {
    let results: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM results WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap();
    let details: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM result_details d JOIN results r ON r.id = d.result_id WHERE r.user_id = $1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .unwrap();
    (results, details)
}

#[tokio::test]
async fn test_detail_rows_match_answers() {
    let Some((store, pool)) = connect().await else {
        return;
    };
    let user_id = user(&store).await;
    let question = style_question(&store).await;

    let result_id = store
        .persist_result(submission(user_id, &question, &[0, 1, 0], Dimension::Visual))
        .await
        .unwrap();

    let details = store.result_details(result_id).await.unwrap();
    assert_eq!(details.len(), 3);
    assert_eq!(details[1].weights.get(Dimension::Kinestetik), 4);
    assert_eq!(row_counts(&pool, user_id).await, (1, 3));

    let choice_ids: Vec<i64> = question.choices.iter().map(|c| c.id).collect();
    let refs = store.choice_refs(&choice_ids).await.unwrap();
    assert_eq!(refs.len(), 2);
    assert!(refs.iter().all(|c| c.question_id == question.id));
    let questions = store.question_refs(&[question.id, -1]).await.unwrap();
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].test_id, question.test_id);

    let counts = store.count_results(user_id).await.unwrap();
    assert_eq!(counts.get(&Family::Style), Some(&1));
}

#[tokio::test]
async fn test_soft_deleted_user_submission_rolls_back() {
    let Some((store, pool)) = connect().await else {
        return;
    };
    let user_id = user(&store).await;
    let question = style_question(&store).await;
    assert_eq!(store.soft_delete_user(user_id).await.unwrap(), 0);

    let err = store
        .persist_result(submission(user_id, &question, &[0], Dimension::Visual))
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::NotFound("User")));
    assert_eq!(row_counts(&pool, user_id).await, (0, 0));
    let label: Option<String> =
        sqlx::query_scalar("SELECT learning_style FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(label, None);
    assert!(store.find_user(user_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_latest_submission_overwrites_label() {
    let Some((store, _pool)) = connect().await else {
        return;
    };
    let user_id = user(&store).await;
    let question = style_question(&store).await;

    store
        .persist_result(submission(user_id, &question, &[0], Dimension::Visual))
        .await
        .unwrap();
    let latest = store
        .persist_result(submission(user_id, &question, &[1], Dimension::Kinestetik))
        .await
        .unwrap();

    let user = store.find_user(user_id).await.unwrap().unwrap();
    assert_eq!(user.learning_style, Some(Dimension::Kinestetik));
    assert_eq!(user.learning_pattern, None);
    let result = store
        .latest_result(user_id, Family::Style)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.id, latest);
    assert_eq!(store.soft_delete_user(user_id).await.unwrap(), 2);
}
