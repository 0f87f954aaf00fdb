// src/oracle.rs

//! Client for the external grading oracle: a vision/document capable
//! chat-completions endpoint in structured-output mode.
//!
//! The orchestrators build an ordered list of content parts (instructions,
//! exam pages, mark scheme) plus a strict JSON schema, and get back the raw
//! response text. Parsing is strict: a payload that misses a field or carries
//! an extra one fails the whole attempt, there is no partial acceptance.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::Config;
use crate::error::AppError;
use crate::models::exam::Exam;
use crate::models::question_result::QuestionResult;

/// One part of the oracle request's user message.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageRef },
    FileUrl { file_url: FileRef },
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageRef {
    pub url: String,
    pub detail: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileRef {
    pub url: String,
    pub mime_type: &'static str,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    /// Reference an uploaded exam file. PDFs are routed as document parts,
    /// everything else as a high-detail image.
    pub fn exam_file(url: &str) -> Self {
        if url.to_lowercase().ends_with(".pdf") {
            ContentPart::document(url)
        } else {
            ContentPart::ImageUrl {
                image_url: ImageRef {
                    url: url.to_string(),
                    detail: "high",
                },
            }
        }
    }

    pub fn document(url: &str) -> Self {
        ContentPart::FileUrl {
            file_url: FileRef {
                url: url.to_string(),
                mime_type: "application/pdf",
            },
        }
    }
}

/// The full grading payload the oracle must return for one exam.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GradingReport {
    pub total_score: i64,
    pub max_score: i64,
    pub percentage: i64,
    pub grade: String,
    pub overall_feedback: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub focus_areas: Vec<String>,
    pub drill_topics: Vec<String>,
    pub questions: Vec<QuestionGrading>,
}

/// Per-question breakdown inside a [`GradingReport`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QuestionGrading {
    pub question_number: String,
    pub topic: String,
    pub score: i64,
    pub max_score: i64,
    pub is_correct: bool,
    pub feedback: String,
    pub student_answer: String,
    pub correct_answer: String,
}

/// The oracle's verdict on a disputed question. Whatever score comes back is
/// authoritative, accepted or not.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DisputeOutcome {
    pub new_score: i64,
    pub max_score: i64,
    pub accepted: bool,
    pub feedback: String,
}

/// The external grading oracle, as a seam so tests can script responses.
#[async_trait]
pub trait GradingOracle: Send + Sync {
    /// Send one user message built from `parts`, constrained to
    /// `response_format`, and return the raw response text.
    async fn invoke(
        &self,
        parts: Vec<ContentPart>,
        response_format: Value,
    ) -> Result<String, AppError>;
}

/// Production oracle speaking the OpenAI chat-completions wire format.
pub struct HttpOracle {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl HttpOracle {
    pub fn new(config: &Config) -> Self {
        // Built once at startup. The timeout is load-bearing: a client
        // without it would wait on a stalled upstream indefinitely.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.llm_timeout_secs))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_url: config.llm_api_url.clone(),
            api_key: config.llm_api_key.clone(),
            model: config.llm_model.clone(),
        }
    }
}

#[async_trait]
impl GradingOracle for HttpOracle {
    async fn invoke(
        &self,
        parts: Vec<ContentPart>,
        response_format: Value,
    ) -> Result<String, AppError> {
        tracing::debug!("Invoking grading oracle, model: {}", self.model);

        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": parts,
            }],
            "response_format": response_format,
        });

        let response = self
            .client
            .post(&self.api_url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!("Oracle returned {}: {}", status, detail);
            return Err(AppError::Upstream(format!(
                "Grading service returned {}",
                status
            )));
        }

        let payload: Value = response.json().await?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                AppError::Upstream("No response from AI grading".to_string())
            })?;

        Ok(content.to_string())
    }
}

/// Parse the full grading payload, strictly.
pub fn parse_grading_report(content: &str) -> Result<GradingReport, AppError> {
    serde_json::from_str(content).map_err(|e| {
        AppError::Upstream(format!("Grading response did not match schema: {}", e))
    })
}

/// Parse the dispute payload, strictly.
pub fn parse_dispute_outcome(content: &str) -> Result<DisputeOutcome, AppError> {
    serde_json::from_str(content).map_err(|e| {
        AppError::Upstream(format!("Dispute response did not match schema: {}", e))
    })
}

/// Content parts for a full grading pass: task instructions, every exam page,
/// then the mark scheme.
pub fn build_grading_parts(exam: &Exam) -> Vec<ContentPart> {
    let mut parts = Vec::with_capacity(exam.exam_file_urls.len() + 3);

    parts.push(ContentPart::text(format!(
        r#"You are an expert Cambridge AS and A Level exam grader. You are grading a {subject} {paper} exam.

TASK: Compare the student's exam answers against the official Cambridge mark scheme and grade each question.

INSTRUCTIONS:
1. Carefully examine each page of the student's exam paper
2. Read the mark scheme thoroughly
3. For each question, determine the score based on the mark scheme criteria
4. Provide specific, constructive feedback for each question
5. Identify the topic/section each question belongs to
6. Calculate the total score

For MCQ papers: identify each answer choice and compare against the mark scheme.
For written papers: evaluate working, method marks, accuracy marks, and communication marks as per Cambridge standards.

Return your analysis as JSON matching the schema below."#,
        subject = exam.subject,
        paper = exam.paper_type,
    )));

    for url in exam.exam_file_urls.iter() {
        parts.push(ContentPart::exam_file(url));
    }

    parts.push(ContentPart::text("MARK SCHEME (PDF):"));
    parts.push(ContentPart::document(&exam.mark_scheme_url));

    parts
}

/// Content parts for re-evaluating one disputed question: the original
/// grading, the student's justification, then the same file references.
pub fn build_dispute_parts(
    exam: &Exam,
    question: &QuestionResult,
    reason: &str,
) -> Vec<ContentPart> {
    let mut parts = Vec::with_capacity(exam.exam_file_urls.len() + 3);

    parts.push(ContentPart::text(format!(
        r#"You are an expert Cambridge AS and A Level exam grader reviewing a DISPUTE on a specific question.

The student is disputing the grade for Question {number} in a {subject} {paper} exam.

ORIGINAL GRADING:
- Score: {score}/{max_score}
- Student's answer (as read): {student_answer}
- Correct answer: {correct_answer}
- Original feedback: {feedback}

STUDENT'S DISPUTE REASON:
"{reason}"

INSTRUCTIONS:
1. Re-examine the student's exam paper for this specific question
2. Re-read the mark scheme for this question
3. Consider the student's dispute reason carefully
4. Determine if the original grading was fair or if the score should be adjusted
5. Be fair, if the student has a valid point (e.g., alternative valid method, misread handwriting), adjust the score
6. If the original grading was correct, keep the same score but explain why

Return JSON matching the schema below."#,
        number = question.question_number,
        subject = exam.subject,
        paper = exam.paper_type,
        score = question.score,
        max_score = question.max_score,
        student_answer = question.student_answer,
        correct_answer = question.correct_answer,
        feedback = question.feedback,
        reason = reason,
    )));

    for url in exam.exam_file_urls.iter() {
        parts.push(ContentPart::exam_file(url));
    }

    parts.push(ContentPart::text("MARK SCHEME (PDF):"));
    parts.push(ContentPart::document(&exam.mark_scheme_url));

    parts
}

/// Strict schema directive for the full grading pass.
pub fn grading_response_format() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "exam_grading_result",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "totalScore": { "type": "integer", "description": "Total marks achieved" },
                    "maxScore": { "type": "integer", "description": "Maximum possible marks" },
                    "percentage": { "type": "integer", "description": "Percentage score (0-100)" },
                    "grade": { "type": "string", "description": "Cambridge grade: A*, A, B, C, D, E, or U" },
                    "overallFeedback": {
                        "type": "string",
                        "description": "Detailed overall feedback in markdown format. Include what the student did well, areas for improvement, and specific study recommendations."
                    },
                    "strengths": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "List of specific strengths demonstrated in the exam"
                    },
                    "weaknesses": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "List of specific weaknesses or areas needing improvement"
                    },
                    "focusAreas": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Topics the student should focus on studying next"
                    },
                    "drillTopics": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Specific topics/skills the student should practice repeatedly"
                    },
                    "questions": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "questionNumber": { "type": "string", "description": "Question number (e.g., '1', '2a', '3bi')" },
                                "topic": { "type": "string", "description": "Topic or section this question belongs to" },
                                "score": { "type": "integer", "description": "Marks awarded" },
                                "maxScore": { "type": "integer", "description": "Maximum marks available" },
                                "isCorrect": { "type": "boolean", "description": "Whether the answer is fully correct" },
                                "feedback": { "type": "string", "description": "Specific feedback for this question" },
                                "studentAnswer": { "type": "string", "description": "What the student wrote/selected" },
                                "correctAnswer": { "type": "string", "description": "The correct answer from the mark scheme" }
                            },
                            "required": [
                                "questionNumber", "topic", "score", "maxScore",
                                "isCorrect", "feedback", "studentAnswer", "correctAnswer"
                            ],
                            "additionalProperties": false
                        },
                        "description": "Per-question grading breakdown"
                    }
                },
                "required": [
                    "totalScore", "maxScore", "percentage", "grade", "overallFeedback",
                    "strengths", "weaknesses", "focusAreas", "drillTopics", "questions"
                ],
                "additionalProperties": false
            }
        }
    })
}

/// Strict schema directive for a dispute review.
pub fn dispute_response_format() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "dispute_result",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "newScore": { "type": "integer", "description": "The revised score for this question" },
                    "maxScore": { "type": "integer", "description": "Maximum marks for this question" },
                    "accepted": { "type": "boolean", "description": "Whether the dispute was accepted (score changed)" },
                    "feedback": { "type": "string", "description": "Detailed explanation of the dispute review decision" }
                },
                "required": ["newScore", "maxScore", "accepted", "feedback"],
                "additionalProperties": false
            }
        }
    })
}
