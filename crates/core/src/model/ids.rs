use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Backend identifier of an enrolled student.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StudentId(u64);

impl StudentId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Backend identifier of a scheduled lesson.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LessonId(u64);

impl LessonId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Backend identifier of a tracked exercise question.
///
/// Ordering matters: slot assignment sorts these ascending.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuestionId(u64);

impl QuestionId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Backend identifier of a class (the roster owner).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(u64);

impl ClassId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Backend identifier of the lesson theme (content block) being exercised.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThemeId(u64);

impl ThemeId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StudentId({})", self.0)
    }
}

impl fmt::Debug for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LessonId({})", self.0)
    }
}

impl fmt::Debug for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuestionId({})", self.0)
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

impl fmt::Debug for ThemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ThemeId({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ThemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── FromStr Implementations ───────────────────────────────────────────────────

/// Error type for parsing an ID from a string (CLI flags, push payloads).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
    raw: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from {:?}", self.kind, self.raw)
    }
}

impl std::error::Error for ParseIdError {}

fn parse_u64(s: &str, kind: &'static str) -> Result<u64, ParseIdError> {
    s.trim().parse::<u64>().map_err(|_| ParseIdError {
        kind,
        raw: s.to_string(),
    })
}

impl FromStr for StudentId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_u64(s, "StudentId").map(StudentId::new)
    }
}

impl FromStr for LessonId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_u64(s, "LessonId").map(LessonId::new)
    }
}

impl FromStr for QuestionId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_u64(s, "QuestionId").map(QuestionId::new)
    }
}

impl FromStr for ClassId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_u64(s, "ClassId").map(ClassId::new)
    }
}

impl FromStr for ThemeId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_u64(s, "ThemeId").map(ThemeId::new)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lesson_id_from_str_trims_whitespace() {
        let id: LessonId = " 12 ".parse().unwrap();
        assert_eq!(id, LessonId::new(12));
    }

    #[test]
    fn test_student_id_from_str_invalid() {
        let err = "abc".parse::<StudentId>().unwrap_err();
        assert_eq!(err.to_string(), "failed to parse StudentId from \"abc\"");
    }

    #[test]
    fn test_question_ids_sort_numerically() {
        let mut ids = vec![QuestionId::new(23), QuestionId::new(9), QuestionId::new(15)];
        ids.sort();
        assert_eq!(ids, vec![QuestionId::new(9), QuestionId::new(15), QuestionId::new(23)]);
    }

    #[test]
    fn test_ids_deserialize_from_bare_numbers() {
        let id: ClassId = serde_json::from_str("7").unwrap();
        assert_eq!(id, ClassId::new(7));
        assert_eq!(ThemeId::new(3).to_string(), "3");
    }
}
