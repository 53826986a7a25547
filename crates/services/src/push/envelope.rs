use serde::Deserialize;
use serde_json::Value;

use classroom_core::model::{LessonId, StudentId, ThemeId};

const STUDENT_ANSWERED: &str = "student_answered";

/// Inbound notification, decoded once at the transport boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// A student submitted or changed an answer in `lesson_id`.
    StudentAnswered {
        lesson_id: LessonId,
        student_id: Option<StudentId>,
    },
    /// Anything the dashboard does not interpret; kept for logging.
    Other(String),
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum TaggedEnvelope {
    StudentAnswered {
        #[serde(rename = "lessonId", alias = "lesson_id")]
        lesson_id: LessonId,
        #[serde(default, rename = "studentId", alias = "student_id")]
        student_id: Option<StudentId>,
    },
}

impl PushEvent {
    /// Decodes a legacy comma-joined payload (`student_answered,<lesson>[,<student>]`)
    /// or a tagged JSON envelope (`{"kind":"student_answered","lessonId":..}`).
    #[must_use]
    pub fn decode(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with('{') {
            return serde_json::from_str::<Value>(trimmed)
                .map_or_else(|_| Self::Other(raw.to_string()), |value| Self::from_value(&value));
        }

        let mut parts = trimmed.split(',').map(str::trim);
        if parts.next() != Some(STUDENT_ANSWERED) {
            return Self::Other(raw.to_string());
        }
        let Some(Ok(lesson_id)) = parts.next().map(str::parse::<LessonId>) else {
            return Self::Other(raw.to_string());
        };
        let student_id = parts.next().and_then(|part| part.parse::<StudentId>().ok());
        Self::StudentAnswered {
            lesson_id,
            student_id,
        }
    }

    /// Decodes one Socket.IO event argument.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(text) => Self::decode(text),
            Value::Object(_) => match TaggedEnvelope::deserialize(value) {
                Ok(TaggedEnvelope::StudentAnswered {
                    lesson_id,
                    student_id,
                }) => Self::StudentAnswered {
                    lesson_id,
                    student_id,
                },
                Err(_) => Self::Other(value.to_string()),
            },
            other => Self::Other(other.to_string()),
        }
    }

    /// True for an answer notification about `lesson_id`.
    #[must_use]
    pub fn triggers_refresh_for(&self, lesson_id: LessonId) -> bool {
        matches!(self, Self::StudentAnswered { lesson_id: l, .. } if *l == lesson_id)
    }
}

/// Outbound command for student devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassroomCommand {
    LessonStart,
    LessonTheme(ThemeId),
    ExerciseStart,
    ExerciseEnd,
}

impl ClassroomCommand {
    /// Wire form understood by the student app.
    #[must_use]
    pub fn encode(self) -> String {
        match self {
            Self::LessonStart => "lesson_start".to_string(),
            Self::LessonTheme(theme) => format!("lesson_theme_id,{theme}"),
            Self::ExerciseStart => "exercise_start".to_string(),
            Self::ExerciseEnd => "exercise_end".to_string(),
        }
    }
}
