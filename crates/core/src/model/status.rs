use serde::{Deserialize, Serialize};

//
// ─── RAW ANSWER STATUS ────────────────────────────────────────────────────────
//

/// Status code carried on the wire by an answer record.
///
/// The backend encodes it as `0` (unanswered), `1` (in progress) and
/// `2` (finalized). Any other code, including a missing one, is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawAnswerStatus {
    Unanswered,
    InProgress,
    Finalized,
    Unknown,
}

impl RawAnswerStatus {
    #[must_use]
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(0) => Self::Unanswered,
            Some(1) => Self::InProgress,
            Some(2) => Self::Finalized,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn code(self) -> Option<i64> {
        match self {
            Self::Unanswered => Some(0),
            Self::InProgress => Some(1),
            Self::Finalized => Some(2),
            Self::Unknown => None,
        }
    }
}

//
// ─── SLOT STATUS ──────────────────────────────────────────────────────────────
//

/// Derived per-question status shown in a dashboard slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    /// No answer yet, or nothing usable was reported.
    #[default]
    Unanswered,
    /// The student is working on the question ("pencil").
    InProgress,
    Correct,
    Wrong,
}

impl SlotStatus {
    /// `Correct` and `Wrong` are terminal: the fast cadence never downgrades them.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Correct | Self::Wrong)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unanswered => "unanswered",
            Self::InProgress => "in_progress",
            Self::Correct => "correct",
            Self::Wrong => "wrong",
        }
    }
}
