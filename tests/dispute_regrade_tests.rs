// tests/dispute_regrade_tests.rs
//
// Dispute rollforward, regrade round-trip, and the progress rollups.

mod common;

use std::sync::Arc;

use common::{ScriptedOracle, create_exam, grading_payload, register_and_login, spawn_app};

async fn graded_exam(
    app: &common::TestApp,
    oracle: &Arc<ScriptedOracle>,
    token: &str,
    questions: &[(&str, &str, i64, i64)],
    percentage: i64,
    grade: &str,
) -> i64 {
    let exam_id = create_exam(app, token).await;
    oracle.push_ok(&grading_payload(questions, percentage, grade));

    let response = app
        .client
        .post(format!("{}/api/exams/{}/grade", app.address, exam_id))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    exam_id
}

async fn fetch_result(
    app: &common::TestApp,
    token: &str,
    exam_id: i64,
) -> reqwest::Response {
    app.client
        .get(format!("{}/api/exams/{}/result", app.address, exam_id))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn dispute_rolls_aggregate_and_grade_forward() {
    let oracle = ScriptedOracle::new();
    let app = spawn_app(oracle.clone()).await;
    let token = register_and_login(&app).await;

    // 10/10 -> 100% -> A*
    let exam_id = graded_exam(
        &app,
        &oracle,
        &token,
        &[("1", "Algebra", 5, 5), ("2", "Calculus", 5, 5)],
        100,
        "A*",
    )
    .await;

    let result: serde_json::Value = fetch_result(&app, &token, exam_id).await.json().await.unwrap();
    let disputed = &result["questions"][1];
    let question_result_id = disputed["id"].as_i64().unwrap();

    // the oracle revises question 2 down to 3/5
    oracle.push_ok(
        r#"{"newScore":3,"maxScore":5,"accepted":false,"feedback":"Two accuracy marks lost."}"#,
    );

    let outcome: serde_json::Value = app
        .client
        .post(format!("{}/api/exams/{}/dispute", app.address, exam_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "questionResultId": question_result_id,
            "reason": "I used an alternative valid method for part (b)."
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // rejected disputes still apply the returned score
    assert_eq!(outcome["accepted"], false);
    assert_eq!(outcome["previousScore"], 5);
    assert_eq!(outcome["newScore"], 3);
    assert_eq!(outcome["newTotalScore"], 8);
    assert_eq!(outcome["newPercentage"], 80);
    assert_eq!(outcome["newGrade"], "A");

    // persisted aggregate matches
    let result: serde_json::Value = fetch_result(&app, &token, exam_id).await.json().await.unwrap();
    assert_eq!(result["totalScore"], 8);
    assert_eq!(result["maxScore"], 10);
    assert_eq!(result["percentage"], 80);
    assert_eq!(result["grade"], "A");

    let question = result["questions"]
        .as_array()
        .unwrap()
        .iter()
        .find(|q| q["id"].as_i64() == Some(question_result_id))
        .unwrap();
    assert_eq!(question["score"], 3);
    assert_eq!(question["isCorrect"], false);
    assert_eq!(question["feedback"], "Two accuracy marks lost.");

    // exam status is untouched by a dispute
    let exam: serde_json::Value = app
        .client
        .get(format!("{}/api/exams/{}", app.address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(exam["status"], "completed");
}

#[tokio::test]
async fn dispute_rejects_empty_reason_before_any_oracle_call() {
    let oracle = ScriptedOracle::new();
    let app = spawn_app(oracle.clone()).await;
    let token = register_and_login(&app).await;

    let exam_id = graded_exam(&app, &oracle, &token, &[("1", "Algebra", 5, 5)], 100, "A*").await;
    let result: serde_json::Value = fetch_result(&app, &token, exam_id).await.json().await.unwrap();
    let question_result_id = result["questions"][0]["id"].as_i64().unwrap();

    let response = app
        .client
        .post(format!("{}/api/exams/{}/dispute", app.address, exam_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "questionResultId": question_result_id,
            "reason": ""
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    // only the initial grading call reached the oracle
    assert_eq!(oracle.call_count(), 1);
}

#[tokio::test]
async fn dispute_unknown_question_is_not_found() {
    let oracle = ScriptedOracle::new();
    let app = spawn_app(oracle.clone()).await;
    let token = register_and_login(&app).await;

    let exam_id = graded_exam(&app, &oracle, &token, &[("1", "Algebra", 5, 5)], 100, "A*").await;

    let response = app
        .client
        .post(format!("{}/api/exams/{}/dispute", app.address, exam_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "questionResultId": 999999,
            "reason": "This was marked wrongly."
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn regrade_round_trip_resets_and_regrades() {
    let oracle = ScriptedOracle::new();
    let app = spawn_app(oracle.clone()).await;
    let token = register_and_login(&app).await;

    let exam_id = graded_exam(
        &app,
        &oracle,
        &token,
        &[("1", "Algebra", 3, 5), ("2", "Vectors", 2, 5)],
        50,
        "D",
    )
    .await;

    let response = app
        .client
        .post(format!("{}/api/exams/{}/regrade", app.address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);

    // result is gone, exam is back to pending
    assert_eq!(fetch_result(&app, &token, exam_id).await.status().as_u16(), 404);

    let exam: serde_json::Value = app
        .client
        .get(format!("{}/api/exams/{}", app.address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(exam["status"], "pending");

    let question_rows =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM question_results WHERE exam_id = ?")
            .bind(exam_id)
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(question_rows, 0);

    // a fresh grading pass builds a new result set
    oracle.push_ok(&grading_payload(
        &[("1", "Algebra", 5, 5), ("2", "Vectors", 4, 5)],
        90,
        "A*",
    ));
    let response = app
        .client
        .post(format!("{}/api/exams/{}/grade", app.address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let result: serde_json::Value = fetch_result(&app, &token, exam_id).await.json().await.unwrap();
    assert_eq!(result["percentage"], 90);
    assert_eq!(result["questions"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn topic_performance_averages_per_question_percentages() {
    let oracle = ScriptedOracle::new();
    let app = spawn_app(oracle.clone()).await;
    let token = register_and_login(&app).await;

    graded_exam(
        &app,
        &oracle,
        &token,
        &[("1", "Algebra", 8, 10), ("2", "Algebra", 6, 10)],
        70,
        "B",
    )
    .await;

    let topics: Vec<serde_json::Value> = app
        .client
        .get(format!("{}/api/progress/topics", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(topics.len(), 1);
    let algebra = &topics[0];
    assert_eq!(algebra["topic"], "Algebra");
    // average of 80% and 60%
    assert_eq!(algebra["avgScore"].as_f64().unwrap(), 70.0);
    assert_eq!(algebra["totalQuestions"], 2);
    assert_eq!(algebra["correctCount"], 0);
}

#[tokio::test]
async fn summary_and_trend_reflect_graded_exams() {
    let oracle = ScriptedOracle::new();
    let app = spawn_app(oracle.clone()).await;
    let token = register_and_login(&app).await;

    graded_exam(&app, &oracle, &token, &[("1", "Algebra", 6, 10)], 60, "C").await;
    graded_exam(&app, &oracle, &token, &[("1", "Algebra", 8, 10)], 80, "A").await;

    let summary: Vec<serde_json::Value> = app
        .client
        .get(format!("{}/api/progress/summary", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(summary.len(), 1);
    let entry = &summary[0];
    assert_eq!(entry["subject"], "math");
    assert_eq!(entry["paperType"], "paper1");
    assert_eq!(entry["totalExams"], 2);
    assert_eq!(entry["avgPercentage"].as_f64().unwrap(), 70.0);
    assert_eq!(entry["latestPercentage"], 80);

    let trend: Vec<serde_json::Value> = app
        .client
        .get(format!("{}/api/progress/trend?subject=math", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(trend.len(), 2);
    // chronological order
    assert_eq!(trend[0]["percentage"], 60);
    assert_eq!(trend[1]["percentage"], 80);

    // filters narrow the trend
    let filtered: Vec<serde_json::Value> = app
        .client
        .get(format!("{}/api/progress/trend?subject=physics", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(filtered.is_empty());
}
