// src/handlers/result.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    grading::{grade_from_percentage, recompute_aggregate},
    models::{
        exam::ExamStatus,
        exam_result::{ExamResult, ResultListEntry, ResultListParams, ResultResponse},
        question_result::{DisputeRequest, QuestionResult},
    },
    handlers::exam::fetch_owned_exam,
    oracle,
    state::AppState,
    utils::jwt::CurrentUser,
};
use validator::Validate;

async fn fetch_owned_result(
    pool: &SqlitePool,
    exam_id: i64,
    user_id: i64,
) -> Result<ExamResult, AppError> {
    sqlx::query_as::<_, ExamResult>(
        r#"
        SELECT id, exam_id, user_id, total_score, max_score, percentage, grade,
               overall_feedback, strengths, weaknesses, focus_areas, drill_topics,
               analysis_data, created_at
        FROM exam_results
        WHERE exam_id = ? AND user_id = ?
        "#,
    )
    .bind(exam_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Result not found".to_string()))
}

async fn fetch_result_questions(
    pool: &SqlitePool,
    exam_result_id: i64,
    user_id: i64,
) -> Result<Vec<QuestionResult>, AppError> {
    let questions = sqlx::query_as::<_, QuestionResult>(
        r#"
        SELECT id, exam_result_id, exam_id, user_id, question_number, topic,
               score, max_score, is_correct, feedback, student_answer, correct_answer,
               created_at
        FROM question_results
        WHERE exam_result_id = ? AND user_id = ?
        ORDER BY question_number
        "#,
    )
    .bind(exam_result_id)
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(questions)
}

/// Get an exam's result with its per-question breakdown.
pub async fn get_result(
    State(pool): State<SqlitePool>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = fetch_owned_result(&pool, exam_id, user_id).await?;
    let questions = fetch_result_questions(&pool, result.id, user_id).await?;

    Ok(Json(ResultResponse { result, questions }))
}

/// List the caller's results with exam metadata, newest first.
pub async fn list_results(
    State(pool): State<SqlitePool>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Query(params): Query<ResultListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut sql = String::from(
        r#"
        SELECT r.id, r.exam_id, r.total_score, r.max_score, r.percentage, r.grade,
               r.created_at,
               e.subject, e.paper_type, e.paper_code, e.session_label, e.year
        FROM exam_results r
        INNER JOIN exams e ON r.exam_id = e.id
        WHERE r.user_id = ?
        "#,
    );
    if params.subject.is_some() {
        sql.push_str(" AND e.subject = ?");
    }
    sql.push_str(" ORDER BY r.created_at DESC, r.id DESC");

    let mut query = sqlx::query_as::<_, ResultListEntry>(&sql).bind(user_id);
    if let Some(subject) = &params.subject {
        query = query.bind(subject);
    }

    Ok(Json(query.fetch_all(&pool).await?))
}

/// Re-evaluates one disputed question and rolls the exam-level aggregate
/// forward.
///
/// The oracle's verdict is authoritative either way: a rejected dispute still
/// applies whatever score came back. Aggregates are recomputed from the rows
/// in hand, substituting the fresh score for the disputed row rather than
/// re-reading it. Exam status never changes here.
pub async fn dispute_question(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(exam_id): Path<i64>,
    Json(payload): Json<DisputeRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let exam = fetch_owned_exam(&state.pool, exam_id, user_id).await?;
    let exam_result = fetch_owned_result(&state.pool, exam.id, user_id).await?;

    let question = sqlx::query_as::<_, QuestionResult>(
        r#"
        SELECT id, exam_result_id, exam_id, user_id, question_number, topic,
               score, max_score, is_correct, feedback, student_answer, correct_answer,
               created_at
        FROM question_results
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(payload.question_result_id)
    .bind(user_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::NotFound("Question not found".to_string()))?;

    let parts = oracle::build_dispute_parts(&exam, &question, &payload.reason);
    let content = state
        .oracle
        .invoke(parts, oracle::dispute_response_format())
        .await?;
    let outcome = oracle::parse_dispute_outcome(&content)?;

    sqlx::query(
        r#"
        UPDATE question_results
        SET score = ?, is_correct = ?, feedback = ?
        WHERE id = ?
        "#,
    )
    .bind(outcome.new_score)
    .bind(outcome.new_score == outcome.max_score)
    .bind(&outcome.feedback)
    .bind(question.id)
    .execute(&state.pool)
    .await?;

    let all_questions = fetch_result_questions(&state.pool, exam_result.id, user_id).await?;
    let aggregate = recompute_aggregate(&all_questions, question.id, outcome.new_score);
    let new_grade = grade_from_percentage(aggregate.percentage);

    sqlx::query(
        r#"
        UPDATE exam_results
        SET total_score = ?, max_score = ?, percentage = ?, grade = ?
        WHERE id = ?
        "#,
    )
    .bind(aggregate.total_score)
    .bind(aggregate.max_score)
    .bind(aggregate.percentage)
    .bind(new_grade)
    .bind(exam_result.id)
    .execute(&state.pool)
    .await?;

    tracing::info!(
        "Dispute on question {} of exam {}: {} -> {} (accepted: {})",
        question.id,
        exam.id,
        question.score,
        outcome.new_score,
        outcome.accepted
    );

    Ok(Json(json!({
        "accepted": outcome.accepted,
        "previousScore": question.score,
        "newScore": outcome.new_score,
        "maxScore": outcome.max_score,
        "feedback": outcome.feedback,
        "newTotalScore": aggregate.total_score,
        "newPercentage": aggregate.percentage,
        "newGrade": new_grade,
    })))
}

/// Discards an exam's result and rolls it back to `pending`.
///
/// Question rows go first, then the result row, then the status reset, all in
/// one transaction. Re-grading is a separate, client-driven call; an exam left
/// at `pending` with no result is a valid, recoverable state.
pub async fn regrade_exam(
    State(pool): State<SqlitePool>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = fetch_owned_exam(&pool, exam_id, user_id).await?;

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM question_results WHERE exam_id = ? AND user_id = ?")
        .bind(exam.id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM exam_results WHERE exam_id = ? AND user_id = ?")
        .bind(exam.id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE exams SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(ExamStatus::Pending)
        .bind(exam.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Json(json!({ "success": true, "examId": exam.id })))
}
