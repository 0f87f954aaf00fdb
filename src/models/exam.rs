// src/models/exam.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Grading lifecycle of an exam.
///
/// `pending -> grading -> {completed, failed}`; `completed` and `failed` are
/// terminal for a pass, but a regrade rolls the exam back to `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExamStatus {
    Pending,
    Grading,
    Completed,
    Failed,
}

impl ExamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamStatus::Pending => "pending",
            ExamStatus::Grading => "grading",
            ExamStatus::Completed => "completed",
            ExamStatus::Failed => "failed",
        }
    }
}

/// Represents the 'exams' table in the database: one uploaded submission.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: i64,
    pub user_id: i64,

    /// Subject key, e.g. 'math', 'physics', 'chemistry'.
    pub subject: String,

    /// Paper type key, e.g. 'paper1' or 'mcq'.
    pub paper_type: String,

    /// Cambridge paper code, e.g. "9709/12".
    pub paper_code: Option<String>,

    /// Exam session, e.g. "May/June".
    pub session_label: Option<String>,

    pub year: Option<i64>,

    /// Public URLs of the uploaded exam pages, in page order.
    /// Stored as a JSON array in the database.
    pub exam_file_urls: Json<Vec<String>>,

    /// Public URL of the mark scheme PDF.
    pub mark_scheme_url: String,

    pub status: ExamStatus,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// One uploaded file in a create request: raw bytes as base64.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UploadFile {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Base64-encoded file content.
    pub data: String,
    /// MIME type, e.g. "image/png" or "application/pdf".
    #[serde(rename = "type")]
    pub mime_type: String,
}

/// DTO for creating a new exam with its uploaded files.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 64))]
    pub subject: String,
    #[validate(length(min = 1, max = 64))]
    pub paper_type: String,
    #[validate(length(max = 16))]
    pub paper_code: Option<String>,
    #[validate(length(max = 128))]
    pub session_label: Option<String>,
    pub year: Option<i64>,
    #[validate(nested, length(min = 1, message = "At least one exam file is required."))]
    pub exam_files: Vec<UploadFile>,
    #[validate(nested)]
    pub mark_scheme_file: UploadFile,
}

/// Query parameters for exam listing.
#[derive(Debug, Deserialize)]
pub struct ExamListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
