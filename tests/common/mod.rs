// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use learning_profile::{
    config::Config,
    models::user::NewUser,
    repository::{MemoryStore, UserRepository},
    routes,
    state::AppState,
    utils::{hash::hash_password, jwt::sign_jwt},
};
use serde_json::{Value, json};

pub const JWT_SECRET: &str = "test_secret_for_integration_tests";

pub struct TestApp {
    pub address: String,
    pub store: Arc<MemoryStore>,
    pub client: reqwest::Client,
}

/// Spawns the app on a random port, backed by a fresh in-memory store.
pub async fn spawn_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());

    let config = Config {
        database_url: "unused".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        admin_username: None,
        admin_password: None,
    };

    let state = AppState {
        store: store.clone(),
        config,
    };
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        store,
        client: reqwest::Client::new(),
    }
}

pub fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Registers and logs in a fresh user. Returns (user_id, token).
    pub async fn user(&self) -> (i64, String) {
        let username = unique_name("u");
        let password = "password123";

        let registered: Value = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Register failed")
            .json()
            .await
            .unwrap();
        let id = registered["data"]["id"].as_i64().expect("user id");

        let login: Value = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Login failed")
            .json()
            .await
            .unwrap();
        let token = login["data"]["token"].as_str().expect("Token not found");

        (id, token.to_string())
    }

    /// Creates an admin directly in the store and signs a token for it.
    pub async fn admin(&self) -> (i64, String) {
        let admin = self
            .store
            .create_user(NewUser {
                username: unique_name("admin"),
                password_hash: hash_password("adminpass").unwrap(),
                role: "admin".to_string(),
            })
            .await
            .unwrap();
        let token = sign_jwt(admin.id, "admin", JWT_SECRET, 600).unwrap();
        (admin.id, token)
    }

    pub async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post(&self, path: &str, token: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Creates a test through the admin API. `questions` holds, per question,
    /// the weight vectors of its choices. Returns (test_id, [(question_id, [choice_id])]).
    pub async fn seed_test(
        &self,
        admin_token: &str,
        family: &str,
        questions: &[Vec<Value>],
    ) -> (i64, Vec<(i64, Vec<i64>)>) {
        let test: Value = self
            .post(
                "/api/admin/tests",
                admin_token,
                &json!({ "name": unique_name("test"), "family": family }),
            )
            .await
            .json()
            .await
            .unwrap();
        let test_id = test["data"]["id"].as_i64().expect("test id");

        let mut ids = Vec::new();
        for (n, weights) in questions.iter().enumerate() {
            let choices: Vec<Value> = weights
                .iter()
                .enumerate()
                .map(|(i, w)| json!({ "label": format!("Option {}", i + 1), "weights": w }))
                .collect();
            let question: Value = self
                .post(
                    &format!("/api/admin/tests/{}/questions", test_id),
                    admin_token,
                    &json!({ "prompt": format!("Question {}", n + 1), "choices": choices }),
                )
                .await
                .json()
                .await
                .unwrap();
            let question_id = question["data"]["id"].as_i64().expect("question id");
            let choice_ids = question["data"]["choices"]
                .as_array()
                .expect("choices")
                .iter()
                .map(|c| c["id"].as_i64().unwrap())
                .collect();
            ids.push((question_id, choice_ids));
        }

        (test_id, ids)
    }
}

pub fn pattern(consistent: u32, fast: u32, reflective: u32, balanced: u32) -> Value {
    json!({ "consistent": consistent, "fast": fast, "reflective": reflective, "balanced": balanced })
}

pub fn style(visual: u32, auditori: u32, kinestetik: u32) -> Value {
    json!({ "visual": visual, "auditori": auditori, "kinestetik": kinestetik })
}
