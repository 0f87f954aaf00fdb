// src/handlers/progress.rs

//! Read-only rollups over persisted results. No caching: every view is
//! computed fresh from the caller's current rows.

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::progress::{SubjectProgress, TopicParams, TopicPerformance, TrendParams, TrendPoint},
    utils::jwt::CurrentUser,
};

/// Per (subject, paper type): average percentage, exam count and the most
/// recent percentage.
pub async fn summary(
    State(pool): State<SqlitePool>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let rows = sqlx::query_as::<_, SubjectProgress>(
        r#"
        SELECT e.subject,
               e.paper_type,
               AVG(r.percentage) AS avg_percentage,
               COUNT(r.id) AS total_exams,
               (SELECT r2.percentage
                FROM exam_results r2
                INNER JOIN exams e2 ON r2.exam_id = e2.id
                WHERE r2.user_id = ?
                  AND e2.subject = e.subject
                  AND e2.paper_type = e.paper_type
                ORDER BY r2.created_at DESC, r2.id DESC
                LIMIT 1) AS latest_percentage
        FROM exam_results r
        INNER JOIN exams e ON r.exam_id = e.id
        WHERE r.user_id = ?
        GROUP BY e.subject, e.paper_type
        "#,
    )
    .bind(user_id)
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(rows))
}

/// Chronological score trend, optionally narrowed to a subject/paper type.
pub async fn trend(
    State(pool): State<SqlitePool>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Query(params): Query<TrendParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut sql = String::from(
        r#"
        SELECT e.id AS exam_id, e.subject, e.paper_type, e.session_label,
               r.percentage, r.total_score, r.max_score, r.grade, r.created_at
        FROM exam_results r
        INNER JOIN exams e ON r.exam_id = e.id
        WHERE r.user_id = ?
        "#,
    );
    if params.subject.is_some() {
        sql.push_str(" AND e.subject = ?");
    }
    if params.paper_type.is_some() {
        sql.push_str(" AND e.paper_type = ?");
    }
    sql.push_str(" ORDER BY r.created_at, r.id");

    let mut query = sqlx::query_as::<_, TrendPoint>(&sql).bind(user_id);
    if let Some(subject) = &params.subject {
        query = query.bind(subject);
    }
    if let Some(paper_type) = &params.paper_type {
        query = query.bind(paper_type);
    }

    Ok(Json(query.fetch_all(&pool).await?))
}

/// Per-topic average score percentage, question count and full-mark count.
pub async fn topics(
    State(pool): State<SqlitePool>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Query(params): Query<TopicParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut sql = String::from(
        r#"
        SELECT q.topic,
               COALESCE(AVG(CAST(q.score AS REAL) / q.max_score * 100), 0) AS avg_score,
               COUNT(q.id) AS total_questions,
               SUM(CASE WHEN q.score = q.max_score THEN 1 ELSE 0 END) AS correct_count
        FROM question_results q
        INNER JOIN exams e ON q.exam_id = e.id
        WHERE q.user_id = ?
        "#,
    );
    if params.subject.is_some() {
        sql.push_str(" AND e.subject = ?");
    }
    sql.push_str(" GROUP BY q.topic");

    let mut query = sqlx::query_as::<_, TopicPerformance>(&sql).bind(user_id);
    if let Some(subject) = &params.subject {
        query = query.bind(subject);
    }

    Ok(Json(query.fetch_all(&pool).await?))
}
