// src/config.rs

use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,

    /// Chat-completions endpoint of the grading model.
    pub llm_api_url: String,
    pub llm_api_key: String,
    pub llm_model: String,
    /// Hard ceiling on a single oracle call, in seconds. The grading model
    /// reads multi-page scans and can take tens of seconds; past this bound
    /// the attempt is failed rather than left hanging.
    pub llm_timeout_secs: u64,

    /// Object store write endpoint and the public base URL its keys resolve under.
    pub storage_api_url: String,
    pub storage_api_key: String,
    pub storage_public_url: String,

    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let llm_api_url = env::var("LLM_API_URL").expect("LLM_API_URL must be set");
        let llm_api_key = env::var("LLM_API_KEY").expect("LLM_API_KEY must be set");
        let llm_model = env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
        let llm_timeout_secs = env::var("LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(120);

        let storage_api_url = env::var("STORAGE_API_URL").expect("STORAGE_API_URL must be set");
        let storage_api_key = env::var("STORAGE_API_KEY").expect("STORAGE_API_KEY must be set");
        let storage_public_url =
            env::var("STORAGE_PUBLIC_URL").unwrap_or_else(|_| storage_api_url.clone());

        let admin_username = env::var("ADMIN_USERNAME").ok();
        let admin_password = env::var("ADMIN_PASSWORD").ok();

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            llm_api_url,
            llm_api_key,
            llm_model,
            llm_timeout_secs,
            storage_api_url,
            storage_api_key,
            storage_public_url,
            admin_username,
            admin_password,
        }
    }
}
