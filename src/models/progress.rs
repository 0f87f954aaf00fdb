// src/models/progress.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// One (subject, paper type) rollup for `progress.summary`.
#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectProgress {
    pub subject: String,
    pub paper_type: String,
    pub avg_percentage: f64,
    pub total_exams: i64,
    pub latest_percentage: Option<i64>,
}

/// One point of the chronological score trend.
#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub exam_id: i64,
    pub subject: String,
    pub paper_type: String,
    pub session_label: Option<String>,
    pub percentage: i64,
    pub total_score: i64,
    pub max_score: i64,
    pub grade: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Per-topic rollup for `progress.topics`.
#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicPerformance {
    pub topic: Option<String>,
    /// Average of per-question score/max_score percentages.
    pub avg_score: f64,
    pub total_questions: i64,
    /// Questions answered for full marks.
    pub correct_count: i64,
}

/// Query parameters for the trend view.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendParams {
    pub subject: Option<String>,
    pub paper_type: Option<String>,
}

/// Query parameters for the topic view.
#[derive(Debug, Deserialize)]
pub struct TopicParams {
    pub subject: Option<String>,
}
