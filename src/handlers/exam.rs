// src/handlers/exam.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde_json::json;
use sqlx::{SqlitePool, types::Json as SqlJson};

use crate::{
    error::AppError,
    models::{
        exam::{CreateExamRequest, Exam, ExamListParams, ExamStatus, UploadFile},
        exam_result::ExamResult,
    },
    oracle::{self, GradingReport},
    state::AppState,
    storage::{FileStore, object_key},
    subjects,
    utils::jwt::CurrentUser,
};
use validator::Validate;

/// Fetch an exam scoped to its owner. A row owned by someone else presents
/// exactly as a missing row.
pub(crate) async fn fetch_owned_exam(
    pool: &SqlitePool,
    exam_id: i64,
    user_id: i64,
) -> Result<Exam, AppError> {
    sqlx::query_as::<_, Exam>(
        r#"
        SELECT id, user_id, subject, paper_type, paper_code, session_label, year,
               exam_file_urls, mark_scheme_url, status, created_at, updated_at
        FROM exams
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(exam_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Exam not found".to_string()))
}

pub(crate) async fn set_exam_status(
    pool: &SqlitePool,
    exam_id: i64,
    status: ExamStatus,
) -> Result<(), AppError> {
    tracing::debug!("Exam {} -> {}", exam_id, status.as_str());
    sqlx::query("UPDATE exams SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(status)
        .bind(exam_id)
        .execute(pool)
        .await?;
    Ok(())
}

async fn store_upload(
    storage: &Arc<dyn FileStore>,
    prefix: &str,
    user_id: i64,
    file: &UploadFile,
) -> Result<String, AppError> {
    let bytes = BASE64
        .decode(&file.data)
        .map_err(|_| AppError::BadRequest(format!("File '{}' is not valid base64", file.name)))?;

    let key = object_key(prefix, user_id, &file.name);
    storage.put(&key, bytes, &file.mime_type).await
}

/// Creates an exam record from uploaded pages and a mark scheme.
///
/// Validates the (subject, paper type) combination against the Cambridge
/// lookup table, stores every file, and inserts the exam as `pending`.
pub async fn create_exam(
    State(pool): State<SqlitePool>,
    State(storage): State<Arc<dyn FileStore>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if !subjects::is_valid_paper(&payload.subject, &payload.paper_type) {
        return Err(AppError::BadRequest(format!(
            "Invalid paper type \"{}\" for subject \"{}\"",
            payload.paper_type, payload.subject
        )));
    }

    let mut exam_file_urls = Vec::with_capacity(payload.exam_files.len());
    for file in &payload.exam_files {
        exam_file_urls.push(store_upload(&storage, "exams", user_id, file).await?);
    }

    let mark_scheme_url =
        store_upload(&storage, "markschemes", user_id, &payload.mark_scheme_file).await?;

    let exam_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO exams
            (user_id, subject, paper_type, paper_code, session_label, year,
             exam_file_urls, mark_scheme_url, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(&payload.subject)
    .bind(&payload.paper_type)
    .bind(&payload.paper_code)
    .bind(&payload.session_label)
    .bind(payload.year)
    .bind(SqlJson(&exam_file_urls))
    .bind(&mark_scheme_url)
    .bind(ExamStatus::Pending)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create exam: {:?}", e);
        AppError::from(e)
    })?;

    Ok((StatusCode::CREATED, Json(json!({ "examId": exam_id }))))
}

/// Get a single exam by ID.
pub async fn get_exam(
    State(pool): State<SqlitePool>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = fetch_owned_exam(&pool, exam_id, user_id).await?;
    Ok(Json(exam))
}

/// List the caller's exams, newest first.
pub async fn list_exams(
    State(pool): State<SqlitePool>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Query(params): Query<ExamListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 100);
    let offset = params.offset.unwrap_or(0).max(0);

    let exams = sqlx::query_as::<_, Exam>(
        r#"
        SELECT id, user_id, subject, paper_type, paper_code, session_label, year,
               exam_file_urls, mark_scheme_url, status, created_at, updated_at
        FROM exams
        WHERE user_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await?;

    Ok(Json(exams))
}

/// Runs one full grading pass against the oracle.
///
/// The status transitions drive the exam's state machine:
/// `pending -> grading -> completed` on success, `-> failed` on any error
/// past the point the oracle was committed to.
pub async fn grade_exam(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = fetch_owned_exam(&state.pool, exam_id, user_id).await?;

    // Grading is expensive and non-deterministic: a completed exam with a
    // result short-circuits idempotently instead of re-running the oracle.
    if exam.status == ExamStatus::Completed {
        let existing = sqlx::query_as::<_, ExamResult>(
            r#"
            SELECT id, exam_id, user_id, total_score, max_score, percentage, grade,
                   overall_feedback, strengths, weaknesses, focus_areas, drill_topics,
                   analysis_data, created_at
            FROM exam_results
            WHERE exam_id = ? AND user_id = ?
            "#,
        )
        .bind(exam.id)
        .bind(user_id)
        .fetch_optional(&state.pool)
        .await?;

        if let Some(existing) = existing {
            return Ok(Json(json!({ "examResultId": existing.id })));
        }
    }

    set_exam_status(&state.pool, exam.id, ExamStatus::Grading).await?;

    match run_grading(&state, &exam, user_id).await {
        Ok(exam_result_id) => Ok(Json(json!({ "examResultId": exam_result_id }))),
        Err(err) => {
            tracing::warn!("Grading exam {} failed: {}", exam.id, err);
            set_exam_status(&state.pool, exam.id, ExamStatus::Failed).await?;
            Err(err)
        }
    }
}

/// Oracle call plus persistence. The result row, its question rows and the
/// `completed` transition commit in one transaction, so a failed attempt
/// leaves no partial rows behind.
async fn run_grading(state: &AppState, exam: &Exam, user_id: i64) -> Result<i64, AppError> {
    let parts = oracle::build_grading_parts(exam);
    let content = state
        .oracle
        .invoke(parts, oracle::grading_response_format())
        .await?;

    let report = oracle::parse_grading_report(&content)?;
    // The raw payload is retained verbatim for audit/replay.
    let raw: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| AppError::Upstream(format!("Grading response is not JSON: {}", e)))?;

    let mut tx = state.pool.begin().await?;

    let exam_result_id = insert_result_rows(&mut tx, exam, user_id, &report, &raw).await?;

    sqlx::query("UPDATE exams SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(ExamStatus::Completed)
        .bind(exam.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(
        "Exam {} graded: {}/{} ({}%), grade {}",
        exam.id,
        report.total_score,
        report.max_score,
        report.percentage,
        report.grade
    );

    Ok(exam_result_id)
}

async fn insert_result_rows(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    exam: &Exam,
    user_id: i64,
    report: &GradingReport,
    raw: &serde_json::Value,
) -> Result<i64, AppError> {
    let exam_result_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO exam_results
            (exam_id, user_id, total_score, max_score, percentage, grade,
             overall_feedback, strengths, weaknesses, focus_areas, drill_topics,
             analysis_data)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(exam.id)
    .bind(user_id)
    .bind(report.total_score)
    .bind(report.max_score)
    .bind(report.percentage)
    .bind(&report.grade)
    .bind(&report.overall_feedback)
    .bind(SqlJson(&report.strengths))
    .bind(SqlJson(&report.weaknesses))
    .bind(SqlJson(&report.focus_areas))
    .bind(SqlJson(&report.drill_topics))
    .bind(SqlJson(raw))
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| {
        // The unique index on exam_id is what stops two concurrent first-time
        // grade calls from both persisting a result.
        if e.to_string().contains("UNIQUE constraint") {
            AppError::Conflict("Exam already has a grading result".to_string())
        } else {
            AppError::from(e)
        }
    })?;

    for q in &report.questions {
        sqlx::query(
            r#"
            INSERT INTO question_results
                (exam_result_id, exam_id, user_id, question_number, topic,
                 score, max_score, is_correct, feedback, student_answer, correct_answer)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(exam_result_id)
        .bind(exam.id)
        .bind(user_id)
        .bind(&q.question_number)
        .bind(&q.topic)
        .bind(q.score)
        .bind(q.max_score)
        .bind(q.is_correct)
        .bind(&q.feedback)
        .bind(&q.student_answer)
        .bind(&q.correct_answer)
        .execute(&mut **tx)
        .await?;
    }

    Ok(exam_result_id)
}
