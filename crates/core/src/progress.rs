use chrono::{DateTime, NaiveDateTime};
use thiserror::Error;

use crate::model::{AnswerRecord, RawAnswerStatus, SlotStatus};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TimestampError {
    #[error("timestamp is empty")]
    Empty,

    #[error("unrecognized timestamp: {0:?}")]
    Invalid(String),
}

//
// ─── EXERCISE DURATION ────────────────────────────────────────────────────────
//

/// Target duration of the current exercise; progress is measured against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExerciseDuration {
    secs: u32,
}

impl ExerciseDuration {
    pub const DEFAULT_MINUTES: u32 = 5;

    /// Returns `None` for zero minutes.
    #[must_use]
    pub fn from_minutes(minutes: u32) -> Option<Self> {
        if minutes == 0 {
            return None;
        }
        Some(Self {
            secs: minutes.saturating_mul(60),
        })
    }

    #[must_use]
    pub fn as_secs(self) -> u32 {
        self.secs
    }

    #[must_use]
    pub fn minutes(self) -> u32 {
        self.secs / 60
    }
}

impl Default for ExerciseDuration {
    fn default() -> Self {
        Self {
            secs: Self::DEFAULT_MINUTES * 60,
        }
    }
}

//
// ─── START TIME ───────────────────────────────────────────────────────────────
//

/// Parses the free-text start time into epoch seconds.
///
/// Accepts RFC 3339, and `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DDTHH:MM:SS` with
/// optional fractional seconds. Values without an offset are read as UTC.
///
/// # Errors
///
/// Returns `TimestampError` when the text is blank or matches no format.
pub fn parse_fallback_timestamp(raw: &str) -> Result<i64, TimestampError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TimestampError::Empty);
    }
    let normalized = trimmed.replacen(' ', "T", 1);

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&normalized) {
        return Ok(parsed.timestamp());
    }
    normalized
        .parse::<NaiveDateTime>()
        .map(|naive| naive.and_utc().timestamp())
        .map_err(|_| TimestampError::Invalid(trimmed.to_string()))
}

/// Start time in epoch seconds: the integer field if positive, else the
/// parsed free-text field. `None` when neither is usable.
#[must_use]
pub fn resolve_start_time(record: &AnswerRecord) -> Option<i64> {
    if let Some(start) = record.start_unix() {
        return Some(start);
    }
    let text = record.answer_start_time.as_deref()?;
    parse_fallback_timestamp(text).ok().filter(|secs| *secs > 0)
}

//
// ─── STATUS ───────────────────────────────────────────────────────────────────
//

#[must_use]
pub fn derive_status(record: Option<&AnswerRecord>) -> SlotStatus {
    let Some(record) = record else {
        return SlotStatus::Unanswered;
    };
    if resolve_start_time(record).is_none() {
        return SlotStatus::Unanswered;
    }
    match record.raw_status() {
        RawAnswerStatus::InProgress => SlotStatus::InProgress,
        RawAnswerStatus::Finalized => match record.correctness() {
            Some(true) => SlotStatus::Correct,
            Some(false) => SlotStatus::Wrong,
            None => SlotStatus::Unanswered,
        },
        RawAnswerStatus::Unanswered | RawAnswerStatus::Unknown => SlotStatus::Unanswered,
    }
}

//
// ─── PROGRESS ─────────────────────────────────────────────────────────────────
//

/// Share of `target` elapsed between `start` and `until`, clamped to `0..=100`.
#[must_use]
pub fn elapsed_progress(start: i64, until: i64, target: ExerciseDuration) -> f64 {
    let elapsed = until.saturating_sub(start).max(0);

    // Exercise spans are minutes long; the cast is exact in practice.
    #[allow(clippy::cast_precision_loss)]
    let elapsed = elapsed as f64;

    (elapsed / f64::from(target.as_secs()) * 100.0).min(100.0)
}

/// Progress for a record at server-adjusted time `server_now`.
///
/// Finalized records with an end time measure `end - start`; in-progress
/// records measure `server_now - start`; everything else is `0`.
#[must_use]
pub fn derive_progress(
    record: Option<&AnswerRecord>,
    server_now: i64,
    target: ExerciseDuration,
) -> f64 {
    let Some(record) = record else {
        return 0.0;
    };
    let Some(start) = resolve_start_time(record) else {
        return 0.0;
    };

    if let Some(end) = record.end_unix() {
        return elapsed_progress(start, end, target);
    }
    if record.raw_status() == RawAnswerStatus::InProgress {
        return elapsed_progress(start, server_now, target);
    }
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LessonId, QuestionId, StudentId};
    use crate::time::FIXED_TEST_TIMESTAMP;

    const START: i64 = FIXED_TEST_TIMESTAMP;

    fn base() -> AnswerRecord {
        AnswerRecord::new(StudentId::new(1), LessonId::new(1), QuestionId::new(15))
    }

    fn five_minutes() -> ExerciseDuration {
        ExerciseDuration::from_minutes(5).unwrap()
    }

    #[test]
    fn status_follows_raw_code_and_correctness() {
        assert_eq!(derive_status(None), SlotStatus::Unanswered);
        assert_eq!(derive_status(Some(&base())), SlotStatus::Unanswered);
        assert_eq!(
            derive_status(Some(&base().in_progress(START))),
            SlotStatus::InProgress
        );
        assert_eq!(
            derive_status(Some(&base().finalized(START, START + 10, true))),
            SlotStatus::Correct
        );
        assert_eq!(
            derive_status(Some(&base().finalized(START, START + 10, false))),
            SlotStatus::Wrong
        );
    }

    #[test]
    fn status_without_start_time_is_unanswered() {
        let mut record = base().in_progress(START);
        record.answer_start_unix = Some(0);
        assert_eq!(derive_status(Some(&record)), SlotStatus::Unanswered);

        let mut finalized = base().finalized(START, START + 5, true);
        finalized.answer_correctness = None;
        assert_eq!(derive_status(Some(&finalized)), SlotStatus::Unanswered);
    }

    #[test]
    fn finalized_progress_saturates_at_exactly_one_hundred() {
        let target = five_minutes();
        let mut last = 0.0;
        for elapsed in [0, 30, 150, 299, 300, 301, 10_000] {
            let record = base().finalized(START, START + elapsed, true);
            let progress = derive_progress(Some(&record), START, target);
            assert!(progress >= last, "progress regressed at {elapsed}s");
            last = progress;
        }
        let half = base().finalized(START, START + 150, true);
        assert!((derive_progress(Some(&half), START, target) - 50.0).abs() < f64::EPSILON);

        let exact = base().finalized(START, START + 300, false);
        assert!((derive_progress(Some(&exact), START, target) - 100.0).abs() < f64::EPSILON);
        assert!((last - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn in_progress_uses_server_now_and_never_goes_negative() {
        let target = five_minutes();
        let record = base().in_progress(START);
        assert!((derive_progress(Some(&record), START + 60, target) - 20.0).abs() < 1e-9);
        assert!(derive_progress(Some(&record), START - 60, target).abs() < f64::EPSILON);
    }

    #[test]
    fn finalized_without_end_has_no_progress() {
        let mut record = base().finalized(START, START + 30, true);
        record.answer_end_unix = None;
        assert!(derive_progress(Some(&record), START + 600, five_minutes()).abs() < f64::EPSILON);
    }

    #[test]
    fn start_time_prefers_epoch_then_text() {
        let record = base().in_progress(START);
        assert_eq!(resolve_start_time(&record), Some(START));

        let text = base().in_progress(0).with_start_text("2023-11-14 22:13:20");
        assert_eq!(resolve_start_time(&text), Some(START));

        let rfc = base().with_start_text("2023-11-14T23:13:20+01:00");
        assert_eq!(resolve_start_time(&rfc), Some(START));
    }

    #[test]
    fn malformed_text_resolves_to_none() {
        let record = base().in_progress(0).with_start_text("yesterday-ish");
        assert_eq!(resolve_start_time(&record), None);
        assert_eq!(derive_status(Some(&record)), SlotStatus::Unanswered);
        assert!(derive_progress(Some(&record), START, five_minutes()).abs() < f64::EPSILON);

        assert_eq!(parse_fallback_timestamp("  "), Err(TimestampError::Empty));
    }

    #[test]
    fn zero_minute_duration_is_rejected() {
        assert!(ExerciseDuration::from_minutes(0).is_none());
        assert_eq!(ExerciseDuration::default().as_secs(), 300);
        assert_eq!(ExerciseDuration::from_minutes(7).unwrap().minutes(), 7);
    }
}
