// src/grading.rs

//! Pure grading arithmetic shared by the dispute rollforward.
//!
//! The full grading pass stores the oracle's own totals verbatim; only a
//! dispute recomputes aggregates locally, from the question rows it already
//! holds in memory.

use crate::models::question_result::QuestionResult;

/// Recomputed exam-level aggregate after a single question changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aggregate {
    pub total_score: i64,
    pub max_score: i64,
    pub percentage: i64,
}

/// Cambridge letter grade for a percentage, inclusive lower bounds.
pub fn grade_from_percentage(pct: i64) -> &'static str {
    if pct >= 90 {
        "A*"
    } else if pct >= 80 {
        "A"
    } else if pct >= 70 {
        "B"
    } else if pct >= 60 {
        "C"
    } else if pct >= 50 {
        "D"
    } else if pct >= 40 {
        "E"
    } else {
        "U"
    }
}

/// Sum scores across all question rows, substituting `new_score` for the
/// disputed row instead of re-reading it. The stored row may be stale if the
/// persistence layer is eventually consistent; the in-hand value is not.
pub fn recompute_aggregate(
    questions: &[QuestionResult],
    disputed_id: i64,
    new_score: i64,
) -> Aggregate {
    let total_score: i64 = questions
        .iter()
        .map(|q| if q.id == disputed_id { new_score } else { q.score })
        .sum();
    let max_score: i64 = questions.iter().map(|q| q.max_score).sum();

    let percentage = if max_score > 0 {
        ((total_score as f64 / max_score as f64) * 100.0).round() as i64
    } else {
        0
    };

    Aggregate {
        total_score,
        max_score,
        percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: i64, score: i64, max_score: i64) -> QuestionResult {
        QuestionResult {
            id,
            exam_result_id: 1,
            exam_id: 1,
            user_id: 1,
            question_number: id.to_string(),
            topic: None,
            score,
            max_score,
            is_correct: score == max_score,
            feedback: String::new(),
            student_answer: String::new(),
            correct_answer: String::new(),
            created_at: None,
        }
    }

    #[test]
    fn grade_boundaries() {
        // each threshold exactly, and one below
        assert_eq!(grade_from_percentage(90), "A*");
        assert_eq!(grade_from_percentage(89), "A");
        assert_eq!(grade_from_percentage(80), "A");
        assert_eq!(grade_from_percentage(79), "B");
        assert_eq!(grade_from_percentage(70), "B");
        assert_eq!(grade_from_percentage(69), "C");
        assert_eq!(grade_from_percentage(60), "C");
        assert_eq!(grade_from_percentage(59), "D");
        assert_eq!(grade_from_percentage(50), "D");
        assert_eq!(grade_from_percentage(49), "E");
        assert_eq!(grade_from_percentage(40), "E");
        assert_eq!(grade_from_percentage(39), "U");
        assert_eq!(grade_from_percentage(100), "A*");
        assert_eq!(grade_from_percentage(0), "U");
    }

    #[test]
    fn dispute_rollforward_from_full_marks() {
        // 10/10 (A*) with one question disputed down to 3/5 -> 8/10, 80%, A
        let questions = vec![question(1, 5, 5), question(2, 5, 5)];
        let agg = recompute_aggregate(&questions, 2, 3);
        assert_eq!(
            agg,
            Aggregate {
                total_score: 8,
                max_score: 10,
                percentage: 80,
            }
        );
        assert_eq!(grade_from_percentage(agg.percentage), "A");
    }

    #[test]
    fn substitutes_in_memory_value_not_stored_row() {
        let questions = vec![question(1, 0, 10), question(2, 10, 10)];
        let agg = recompute_aggregate(&questions, 1, 7);
        assert_eq!(agg.total_score, 17);
        assert_eq!(agg.percentage, 85);
    }

    #[test]
    fn percentage_rounds_half_up() {
        let questions = vec![question(1, 1, 3)];
        // 1/3 -> 33.33 -> 33
        assert_eq!(recompute_aggregate(&questions, 0, 0).percentage, 33);
        let questions = vec![question(1, 5, 8)];
        // 5/8 -> 62.5 -> 63
        assert_eq!(recompute_aggregate(&questions, 0, 0).percentage, 63);
    }

    #[test]
    fn zero_max_yields_zero_percentage() {
        let questions: Vec<QuestionResult> = vec![];
        let agg = recompute_aggregate(&questions, 1, 5);
        assert_eq!(agg.percentage, 0);
        assert_eq!(agg.total_score, 0);
    }
}
