use serde::{Deserialize, Serialize};

use crate::model::ids::{LessonId, QuestionId, StudentId};
use crate::model::status::RawAnswerStatus;

/// Question reference nested inside an answer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRef {
    pub question_id: QuestionId,
    #[serde(default)]
    pub question_label: String,
}

/// One student's answer to one question, as returned by `GET /api/answers/`.
///
/// Records are consumed straight into the student view-model and never kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub student_id: StudentId,
    pub lesson_id: LessonId,
    #[serde(default)]
    pub answer_correctness: Option<i64>,
    #[serde(default)]
    pub answer_status: Option<i64>,
    #[serde(default)]
    pub answer_start_unix: Option<i64>,
    #[serde(default)]
    pub answer_end_unix: Option<i64>,
    /// Free-text start time, used only when `answer_start_unix` is unusable.
    #[serde(default)]
    pub answer_start_time: Option<String>,
    pub question: QuestionRef,
}

impl AnswerRecord {
    /// A record with no status and no timing information.
    #[must_use]
    pub fn new(student_id: StudentId, lesson_id: LessonId, question_id: QuestionId) -> Self {
        Self {
            student_id,
            lesson_id,
            answer_correctness: None,
            answer_status: Some(0),
            answer_start_unix: None,
            answer_end_unix: None,
            answer_start_time: None,
            question: QuestionRef {
                question_id,
                question_label: String::new(),
            },
        }
    }

    /// Mark the record as being worked on since `start_unix`.
    #[must_use]
    pub fn in_progress(mut self, start_unix: i64) -> Self {
        self.answer_status = RawAnswerStatus::InProgress.code();
        self.answer_start_unix = Some(start_unix);
        self.answer_end_unix = None;
        self.answer_correctness = None;
        self
    }

    /// Mark the record as finalized between `start_unix` and `end_unix`.
    #[must_use]
    pub fn finalized(mut self, start_unix: i64, end_unix: i64, correct: bool) -> Self {
        self.answer_status = RawAnswerStatus::Finalized.code();
        self.answer_start_unix = Some(start_unix);
        self.answer_end_unix = Some(end_unix);
        self.answer_correctness = Some(i64::from(correct));
        self
    }

    /// Replace the epoch start with a free-text start time.
    #[must_use]
    pub fn with_start_text(mut self, text: impl Into<String>) -> Self {
        self.answer_start_unix = None;
        self.answer_start_time = Some(text.into());
        self
    }

    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.question.question_id
    }

    #[must_use]
    pub fn raw_status(&self) -> RawAnswerStatus {
        RawAnswerStatus::from_code(self.answer_status)
    }

    /// Correctness flag; only meaningful for finalized records.
    #[must_use]
    pub fn correctness(&self) -> Option<bool> {
        match self.answer_correctness {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        }
    }

    /// Server epoch start, if present and positive.
    #[must_use]
    pub fn start_unix(&self) -> Option<i64> {
        self.answer_start_unix.filter(|s| *s > 0)
    }

    /// Server epoch end, if present and positive.
    #[must_use]
    pub fn end_unix(&self) -> Option<i64> {
        self.answer_end_unix.filter(|e| *e > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_backend_shape() {
        let json = r#"{
            "student_id": 4,
            "lesson_id": 12,
            "answer_correctness": 1,
            "answer_status": 2,
            "answer_start_unix": 1700000000,
            "answer_end_unix": 1700000120,
            "question": { "question_id": 15, "question_label": "Q1" }
        }"#;
        let record: AnswerRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.student_id, StudentId::new(4));
        assert_eq!(record.question_id(), QuestionId::new(15));
        assert_eq!(record.raw_status(), RawAnswerStatus::Finalized);
        assert_eq!(record.correctness(), Some(true));
        assert_eq!(record.end_unix(), Some(1_700_000_120));
        assert_eq!(record.answer_start_time, None);
    }

    #[test]
    fn null_and_zero_times_are_unusable() {
        let json = r#"{
            "student_id": 1,
            "lesson_id": 1,
            "answer_correctness": null,
            "answer_status": 1,
            "answer_start_unix": 0,
            "answer_end_unix": null,
            "question": { "question_id": 3 }
        }"#;
        let record: AnswerRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.start_unix(), None);
        assert_eq!(record.end_unix(), None);
        assert_eq!(record.correctness(), None);
    }
}
