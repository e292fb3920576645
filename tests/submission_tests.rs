// tests/submission_tests.rs

mod common;

use common::{pattern, spawn_app, style};
use serde_json::{Value, json};

#[tokio::test]
async fn pattern_submission_scores_and_updates_profile() {
    // Arrange
    let app = spawn_app().await;
    let (_, admin) = app.admin().await;
    let (_, token) = app.user().await;
    let (test_id, questions) = app
        .seed_test(
            &admin,
            "pattern",
            &[
                vec![pattern(2, 0, 0, 0), pattern(0, 0, 5, 0)],
                vec![pattern(0, 3, 0, 0), pattern(0, 0, 5, 0)],
                vec![pattern(0, 0, 0, 1), pattern(0, 0, 5, 0)],
            ],
        )
        .await;
    let answers: Vec<Value> = questions
        .iter()
        .map(|(q, c)| json!({ "question_id": q, "choice_id": c[0] }))
        .collect();

    // Act
    let response = app
        .post(
            "/api/tests/pattern/submissions",
            &token,
            &json!({ "test_id": test_id, "answers": answers }),
        )
        .await;

    // Assert
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["dominant_label"], "fast");
    assert_eq!(
        body["data"]["dimension_totals"],
        json!({ "consistent": 2, "fast": 3, "reflective": 0, "balanced": 1 })
    );
    assert!(body["data"]["result_id"].as_i64().is_some());
    assert_eq!(app.store.row_counts().unwrap(), (1, 3));

    let me: Value = app.get("/api/profile/me", &token).await.json().await.unwrap();
    assert_eq!(me["data"]["learning_pattern"], "fast");
    assert_eq!(me["data"]["learning_style"], Value::Null);
    assert_eq!(me["data"]["profile"]["learning_pattern"]["label"], "fast");
    assert_eq!(me["data"]["profile"]["learning_pattern"]["percentages"]["fast"], 50);
    assert_eq!(me["data"]["pattern_results_count"], 1);
}

#[tokio::test]
async fn choice_from_another_question_is_rejected_without_writes() {
    let app = spawn_app().await;
    let (_, admin) = app.admin().await;
    let (_, token) = app.user().await;
    let (test_id, questions) = app
        .seed_test(
            &admin,
            "style",
            &[
                vec![style(1, 0, 0), style(0, 1, 0)],
                vec![style(0, 0, 1), style(1, 1, 0)],
            ],
        )
        .await;

    let response = app
        .post(
            "/api/tests/style/submissions",
            &token,
            &json!({
                "test_id": test_id,
                "answers": [
                    { "question_id": questions[0].0, "choice_id": questions[0].1[0] },
                    { "question_id": questions[1].0, "choice_id": questions[0].1[1] }
                ]
            }),
        )
        .await;

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("does not belong"));
    assert_eq!(body["details"][0]["fault"], "invalid_choice");
    assert_eq!(body["details"][0]["question_id"], questions[1].0);

    assert_eq!(app.store.row_counts().unwrap(), (0, 0));
    let me: Value = app.get("/api/profile/me", &token).await.json().await.unwrap();
    assert_eq!(me["data"]["learning_style"], Value::Null);
}

#[tokio::test]
async fn question_from_another_test_is_rejected() {
    let app = spawn_app().await;
    let (_, admin) = app.admin().await;
    let (_, token) = app.user().await;
    let (test_a, _) = app.seed_test(&admin, "style", &[vec![style(1, 0, 0)]]).await;
    let (_, other) = app.seed_test(&admin, "style", &[vec![style(0, 1, 0)]]).await;

    let response = app
        .post(
            "/api/tests/style/submissions",
            &token,
            &json!({
                "test_id": test_a,
                "answers": [{ "question_id": other[0].0, "choice_id": other[0].1[0] }]
            }),
        )
        .await;

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["details"][0]["fault"], "invalid_question");
    assert_eq!(app.store.row_counts().unwrap(), (0, 0));
}

#[tokio::test]
async fn empty_or_malformed_submissions_are_bad_requests() {
    let app = spawn_app().await;
    let (_, token) = app.user().await;

    let empty = app
        .post(
            "/api/tests/pattern/submissions",
            &token,
            &json!({ "test_id": 1, "answers": [] }),
        )
        .await;
    assert_eq!(empty.status().as_u16(), 400);

    let missing_answers = app
        .post("/api/tests/pattern/submissions", &token, &json!({ "test_id": 1 }))
        .await;
    assert_eq!(missing_answers.status().as_u16(), 400);

    let missing_test = app
        .post(
            "/api/tests/pattern/submissions",
            &token,
            &json!({ "answers": [{ "question_id": 1, "choice_id": 2 }] }),
        )
        .await;
    assert_eq!(missing_test.status().as_u16(), 400);

    let missing_choice = app
        .post(
            "/api/tests/pattern/submissions",
            &token,
            &json!({ "test_id": 1, "answers": [{ "question_id": 1 }] }),
        )
        .await;
    assert_eq!(missing_choice.status().as_u16(), 400);

    let unknown_family = app
        .post(
            "/api/tests/mood/submissions",
            &token,
            &json!({ "test_id": 1, "answers": [{ "question_id": 1, "choice_id": 2 }] }),
        )
        .await;
    assert_eq!(unknown_family.status().as_u16(), 400);

    assert_eq!(app.store.row_counts().unwrap(), (0, 0));
}

#[tokio::test]
async fn unknown_test_is_not_found() {
    let app = spawn_app().await;
    let (_, admin) = app.admin().await;
    let (_, token) = app.user().await;
    let (style_test, questions) = app.seed_test(&admin, "style", &[vec![style(1, 0, 0)]]).await;
    let answers = json!([{ "question_id": questions[0].0, "choice_id": questions[0].1[0] }]);

    let missing = app
        .post(
            "/api/tests/style/submissions",
            &token,
            &json!({ "test_id": 999_999, "answers": answers }),
        )
        .await;
    assert_eq!(missing.status().as_u16(), 404);

    // A style test submitted under the pattern family does not exist there.
    let wrong_family = app
        .post(
            "/api/tests/pattern/submissions",
            &token,
            &json!({ "test_id": style_test, "answers": answers }),
        )
        .await;
    assert_eq!(wrong_family.status().as_u16(), 404);

    for test_id in [0, -7] {
        let response = app
            .post(
                "/api/tests/style/submissions",
                &token,
                &json!({ "test_id": test_id, "answers": answers }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 404);
    }
    assert_eq!(app.store.row_counts().unwrap(), (0, 0));
}

#[tokio::test]
async fn submission_requires_login() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/api/tests/style/submissions"))
        .json(&json!({ "test_id": 1, "answers": [{ "question_id": 1, "choice_id": 1 }] }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn tied_totals_resolve_the_same_way_every_time() {
    let app = spawn_app().await;
    let (_, admin) = app.admin().await;
    let (_, token) = app.user().await;
    let (test_id, questions) = app
        .seed_test(
            &admin,
            "gaya",
            &[vec![style(5, 0, 0)], vec![style(0, 5, 2)]],
        )
        .await;
    let answers: Vec<Value> = questions
        .iter()
        .map(|(q, c)| json!({ "question_id": q, "choice_id": c[0] }))
        .collect();

    for _ in 0..3 {
        let body: Value = app
            .post(
                "/api/tests/gaya/submissions",
                &token,
                &json!({ "test_id": test_id, "answers": answers }),
            )
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(body["data"]["dominant_label"], "visual");
        assert_eq!(
            body["data"]["dimension_totals"],
            json!({ "visual": 5, "auditori": 5, "kinestetik": 2 })
        );
    }
}

#[tokio::test]
async fn both_families_are_tracked_independently() {
    let app = spawn_app().await;
    let (_, admin) = app.admin().await;
    let (_, token) = app.user().await;
    let (pattern_test, pq) = app
        .seed_test(&admin, "pattern", &[vec![pattern(0, 0, 4, 1)]])
        .await;
    let (style_test, sq) = app.seed_test(&admin, "style", &[vec![style(0, 0, 3)]]).await;

    for (family, test_id, q) in [("pattern", pattern_test, &pq), ("style", style_test, &sq)] {
        let response = app
            .post(
                &format!("/api/tests/{}/submissions", family),
                &token,
                &json!({
                    "test_id": test_id,
                    "answers": [{ "question_id": q[0].0, "choice_id": q[0].1[0] }]
                }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);
    }

    let first: Value = app.get("/api/profile/me", &token).await.json().await.unwrap();
    assert_eq!(first["data"]["learning_pattern"], "reflective");
    assert_eq!(first["data"]["learning_style"], "kinestetik");
    assert_eq!(first["data"]["profile"]["learning_style"]["percentages"]["kinestetik"], 100);
    assert_eq!(first["data"]["profile"]["learning_pattern"]["percentages"]["reflective"], 80);
    assert_eq!(first["data"]["style_results_count"], 1);

    // Reading again without a new submission gives the same body.
    let second: Value = app.get("/api/profile/me", &token).await.json().await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn latest_submission_of_a_family_wins() {
    let app = spawn_app().await;
    let (_, admin) = app.admin().await;
    let (_, token) = app.user().await;
    let (test_id, q) = app
        .seed_test(&admin, "style", &[vec![style(3, 0, 0), style(0, 0, 3)]])
        .await;

    for choice in [q[0].1[0], q[0].1[1]] {
        app.post(
            "/api/tests/style/submissions",
            &token,
            &json!({ "test_id": test_id, "answers": [{ "question_id": q[0].0, "choice_id": choice }] }),
        )
        .await;
    }

    let me: Value = app.get("/api/profile/me", &token).await.json().await.unwrap();
    assert_eq!(me["data"]["learning_style"], "kinestetik");
    assert_eq!(me["data"]["profile"]["learning_style"]["label"], "kinestetik");
    assert_eq!(me["data"]["style_results_count"], 2);
}

#[tokio::test]
async fn question_listing_hides_weights() {
    let app = spawn_app().await;
    let (_, admin) = app.admin().await;
    let (test_id, _) = app
        .seed_test(&admin, "pola", &[vec![pattern(1, 0, 0, 0), pattern(0, 1, 0, 0)]])
        .await;

    let tests: Value = app
        .client
        .get(app.url("/api/tests/pattern"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tests["data"].as_array().unwrap().len(), 1);

    let questions: Value = app
        .client
        .get(app.url(&format!("/api/tests/pattern/{}/questions", test_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let choices = questions["data"][0]["choices"].as_array().unwrap();
    assert_eq!(choices.len(), 2);
    assert!(choices.iter().all(|c| c.get("weights").is_none()));

    let wrong_family = app
        .client
        .get(app.url(&format!("/api/tests/style/{}/questions", test_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_family.status().as_u16(), 404);
}
