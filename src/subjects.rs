// src/subjects.rs

//! Cambridge AS & A Level reference data.
//!
//! Each subject has a syllabus code (e.g. 9709 for Mathematics) and a fixed
//! set of paper types a submission may declare. The (subject, paper type)
//! combination is validated once, at exam creation.

/// One subject entry: internal key, display label, syllabus code, allowed paper types.
pub struct Subject {
    pub value: &'static str,
    pub label: &'static str,
    pub syllabus_code: &'static str,
    pub paper_types: &'static [&'static str],
}

pub const SUBJECTS: &[Subject] = &[
    Subject {
        value: "math",
        label: "Mathematics",
        syllabus_code: "9709",
        paper_types: &["paper1", "paper2", "paper3", "paper4", "paper5", "paper6"],
    },
    Subject {
        value: "physics",
        label: "Physics",
        syllabus_code: "9702",
        paper_types: &["mcq", "paper2", "paper3", "paper4", "paper5"],
    },
    Subject {
        value: "chemistry",
        label: "Chemistry",
        syllabus_code: "9701",
        paper_types: &["mcq", "paper2", "paper3", "paper4", "paper5"],
    },
];

pub fn subject_by_value(value: &str) -> Option<&'static Subject> {
    SUBJECTS.iter().find(|s| s.value == value)
}

/// Whether `paper_type` is an allowed paper for `subject`.
/// Unknown subjects allow nothing.
pub fn is_valid_paper(subject: &str, paper_type: &str) -> bool {
    subject_by_value(subject)
        .map(|s| s.paper_types.contains(&paper_type))
        .unwrap_or(false)
}

/// Build a full paper code string, e.g. ("9709", "12") -> "9709/12".
pub fn build_paper_code(syllabus_code: &str, component: &str) -> String {
    format!("{}/{}", syllabus_code, component)
}

/// Parse a paper code like "9709/12" into (syllabus_code, component).
pub fn parse_paper_code(code: &str) -> Option<(&str, &str)> {
    let (syllabus, component) = code.split_once('/')?;
    if syllabus.len() == 4
        && component.len() == 2
        && syllabus.chars().all(|c| c.is_ascii_digit())
        && component.chars().all(|c| c.is_ascii_digit())
    {
        Some((syllabus, component))
    } else {
        None
    }
}
