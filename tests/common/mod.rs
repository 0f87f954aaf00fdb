// tests/common/mod.rs
//
// Shared test harness: spawns the app on a random port with an in-memory
// database, a scripted oracle and an in-memory file store.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use papergrade::config::Config;
use papergrade::error::AppError;
use papergrade::oracle::{ContentPart, GradingOracle};
use papergrade::routes;
use papergrade::state::AppState;
use papergrade::storage::FileStore;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

/// Oracle double that replays pre-scripted responses in order.
pub struct ScriptedOracle {
    responses: Mutex<VecDeque<Result<String, String>>>,
    pub calls: Mutex<Vec<Vec<ContentPart>>>,
}

impl ScriptedOracle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn push_ok(&self, content: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(content.to_string()));
    }

    pub fn push_err(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl GradingOracle for ScriptedOracle {
    async fn invoke(
        &self,
        parts: Vec<ContentPart>,
        _response_format: serde_json::Value,
    ) -> Result<String, AppError> {
        self.calls.lock().unwrap().push(parts);
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(content)) => Ok(content),
            Some(Err(message)) => Err(AppError::Upstream(message)),
            None => Err(AppError::Upstream(
                "no scripted oracle response left".to_string(),
            )),
        }
    }
}

/// File store double: accepts everything, returns a deterministic public URL.
pub struct MemoryStore;

#[async_trait]
impl FileStore for MemoryStore {
    async fn put(
        &self,
        key: &str,
        _bytes: Vec<u8>,
        _mime_type: &str,
    ) -> Result<String, AppError> {
        Ok(format!("https://files.test/{}", key))
    }
}

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub client: reqwest::Client,
}

fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        llm_api_url: "http://127.0.0.1:1/v1/chat/completions".to_string(),
        llm_api_key: "test".to_string(),
        llm_model: "test-model".to_string(),
        llm_timeout_secs: 5,
        storage_api_url: "http://127.0.0.1:1/storage".to_string(),
        storage_api_key: "test".to_string(),
        storage_public_url: "https://files.test".to_string(),
        admin_username: None,
        admin_password: None,
    }
}

/// Spawn the app on a random port against a fresh in-memory database.
/// Returns the base URL plus handles for seeding and assertions.
pub async fn spawn_app(oracle: Arc<ScriptedOracle>) -> TestApp {
    // A single connection keeps every query on the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory sqlite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let oracle: Arc<dyn GradingOracle> = oracle;
    let state = AppState {
        pool: pool.clone(),
        config: test_config(),
        oracle,
        storage: Arc::new(MemoryStore),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        pool,
        client: reqwest::Client::new(),
    }
}

/// Register a fresh user and return their bearer token.
pub async fn register_and_login(app: &TestApp) -> String {
    let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let password = "password123";

    let response = app
        .client
        .post(format!("{}/api/auth/register", app.address))
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(response.status().as_u16(), 201);

    let login: serde_json::Value = app
        .client
        .post(format!("{}/api/auth/login", app.address))
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");

    login["token"].as_str().expect("Token not found").to_string()
}

/// A valid exam.create body: one PNG page, one PDF mark scheme.
pub fn sample_exam_body() -> serde_json::Value {
    serde_json::json!({
        "subject": "math",
        "paperType": "paper1",
        "paperCode": "9709/12",
        "sessionLabel": "May/June",
        "year": 2024,
        "examFiles": [
            { "name": "page1.png", "data": "aGVsbG8=", "type": "image/png" }
        ],
        "markSchemeFile": { "name": "ms.pdf", "data": "d29ybGQ=", "type": "application/pdf" }
    })
}

/// Create an exam through the API and return its id.
pub async fn create_exam(app: &TestApp, token: &str) -> i64 {
    let response = app
        .client
        .post(format!("{}/api/exams", app.address))
        .bearer_auth(token)
        .json(&sample_exam_body())
        .send()
        .await
        .expect("Create exam failed");
    assert_eq!(response.status().as_u16(), 201);

    let body: serde_json::Value = response.json().await.unwrap();
    body["examId"].as_i64().expect("examId missing")
}

/// A schema-conforming full grading payload over the given
/// (number, topic, score, max) questions.
pub fn grading_payload(
    questions: &[(&str, &str, i64, i64)],
    percentage: i64,
    grade: &str,
) -> String {
    let total: i64 = questions.iter().map(|q| q.2).sum();
    let max: i64 = questions.iter().map(|q| q.3).sum();

    let question_values: Vec<serde_json::Value> = questions
        .iter()
        .map(|(number, topic, score, max_score)| {
            serde_json::json!({
                "questionNumber": number,
                "topic": topic,
                "score": score,
                "maxScore": max_score,
                "isCorrect": score == max_score,
                "feedback": "feedback",
                "studentAnswer": "x = 2",
                "correctAnswer": "x = 2"
            })
        })
        .collect();

    serde_json::json!({
        "totalScore": total,
        "maxScore": max,
        "percentage": percentage,
        "grade": grade,
        "overallFeedback": "Solid attempt overall.",
        "strengths": ["algebraic manipulation"],
        "weaknesses": ["sign errors"],
        "focusAreas": ["integration"],
        "drillTopics": ["chain rule"],
        "questions": question_values
    })
    .to_string()
}
