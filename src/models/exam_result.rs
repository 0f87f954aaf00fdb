// src/models/exam_result.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

use crate::models::question_result::QuestionResult;

/// Represents the 'exam_results' table: the aggregate outcome of grading one
/// exam. At most one row per exam (enforced by a unique index on exam_id).
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub id: i64,
    pub exam_id: i64,
    pub user_id: i64,

    pub total_score: i64,
    pub max_score: i64,

    /// Percentage score (0-100).
    pub percentage: i64,

    /// Cambridge grade: A*, A, B, C, D, E or U.
    pub grade: String,

    /// Overall feedback in markdown.
    pub overall_feedback: String,

    pub strengths: Json<Vec<String>>,
    pub weaknesses: Json<Vec<String>>,
    pub focus_areas: Json<Vec<String>>,
    pub drill_topics: Json<Vec<String>>,

    /// Full structured payload as returned by the grading oracle,
    /// retained for audit and replay.
    pub analysis_data: Json<serde_json::Value>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// `result.get` response: the aggregate plus its per-question breakdown.
#[derive(Debug, Serialize)]
pub struct ResultResponse {
    #[serde(flatten)]
    pub result: ExamResult,
    pub questions: Vec<QuestionResult>,
}

/// One entry of `result.list`: a result joined with its exam's metadata.
#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultListEntry {
    pub id: i64,
    pub exam_id: i64,
    pub total_score: i64,
    pub max_score: i64,
    pub percentage: i64,
    pub grade: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,

    pub subject: String,
    pub paper_type: String,
    pub paper_code: Option<String>,
    pub session_label: Option<String>,
    pub year: Option<i64>,
}

/// Query parameters for result listing.
#[derive(Debug, Deserialize)]
pub struct ResultListParams {
    pub subject: Option<String>,
}
