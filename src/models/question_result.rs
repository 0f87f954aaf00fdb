// src/models/question_result.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Represents the 'question_results' table: one row per graded question,
/// always owned by exactly one exam result.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub id: i64,
    pub exam_result_id: i64,
    pub exam_id: i64,
    pub user_id: i64,

    /// Question label, e.g. "1", "2a", "3bi".
    pub question_number: String,

    /// Topic or section this question belongs to.
    pub topic: Option<String>,

    pub score: i64,
    pub max_score: i64,

    /// True iff score == max_score at the last evaluation.
    pub is_correct: bool,

    pub feedback: String,

    /// What the student wrote, as read by the oracle (best effort).
    pub student_answer: String,

    /// The correct answer per the mark scheme (best effort).
    pub correct_answer: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for disputing a single question's score.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DisputeRequest {
    pub question_result_id: i64,

    /// The student's justification. Required, bounded.
    #[validate(length(min = 1, max = 2000, message = "Dispute reason is required."))]
    pub reason: String,
}
