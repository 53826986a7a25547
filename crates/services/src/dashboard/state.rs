use serde::Serialize;
use tracing::{debug, info};

use classroom_core::ServerClock;
use classroom_core::model::{AnswerRecord, LessonId, QuestionId, RosterEntry, Student, ThemeId};
use classroom_core::progress::ExerciseDuration;
use classroom_core::slots::{SLOT_COUNT, Slot, SlotResolver};

use super::reconcile::{MergeMode, ReconcileReport, merge_batch};
use super::summary::{SlotSummary, summarize_slots};
use super::ticker::advance_in_progress;
use super::timer::{DashboardPhase, ExerciseTimer};

/// Per-lesson view-model owned by one dashboard session.
///
/// All mutation goes through `&mut self`; the runtime owns the only instance
/// and publishes immutable snapshots after each change.
#[derive(Debug, Clone)]
pub struct DashboardState {
    lesson_id: LessonId,
    theme_id: Option<ThemeId>,
    students: Vec<Student>,
    slots: SlotResolver,
    clock: ServerClock,
    timer: ExerciseTimer,
    lesson_started: bool,
}

impl DashboardState {
    #[must_use]
    pub fn new(lesson_id: LessonId, clock: ServerClock, duration: ExerciseDuration) -> Self {
        Self {
            lesson_id,
            theme_id: None,
            students: Vec::new(),
            slots: SlotResolver::new(),
            clock,
            timer: ExerciseTimer::new(duration),
            lesson_started: false,
        }
    }

    #[must_use]
    pub fn with_theme(mut self, theme_id: Option<ThemeId>) -> Self {
        self.theme_id = theme_id;
        self
    }

    /// Replaces the roster with empty rows, in the order given.
    pub fn seed_roster(&mut self, roster: &[RosterEntry]) {
        self.students = roster.iter().map(Student::from_roster).collect();
        debug!(lesson = %self.lesson_id, students = self.students.len(), "roster seeded");
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn theme_id(&self) -> Option<ThemeId> {
        self.theme_id
    }

    pub fn set_theme(&mut self, theme_id: ThemeId) {
        self.theme_id = Some(theme_id);
    }

    #[must_use]
    pub fn students(&self) -> &[Student] {
        &self.students
    }

    #[must_use]
    pub fn slot_resolver(&self) -> &SlotResolver {
        &self.slots
    }

    #[must_use]
    pub fn clock(&self) -> &ServerClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut ServerClock {
        &mut self.clock
    }

    #[must_use]
    pub fn timer(&self) -> &ExerciseTimer {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut ExerciseTimer {
        &mut self.timer
    }

    #[must_use]
    pub fn lesson_started(&self) -> bool {
        self.lesson_started
    }

    pub fn mark_lesson_started(&mut self) {
        self.lesson_started = true;
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.timer.is_running()
    }

    #[must_use]
    pub fn phase(&self) -> DashboardPhase {
        DashboardPhase::derive(self.lesson_started, &self.timer)
    }

    /// One reconciliation cycle.
    ///
    /// Freezes the slot mapping on the first non-empty batch, lets the clock
    /// offset estimator see every epoch start time, then merges.
    pub fn reconcile(&mut self, batch: &[AnswerRecord], mode: MergeMode) -> ReconcileReport {
        if self.slots.observe(batch)
            && let Some(mapping) = self.slots.mapping()
        {
            info!(
                lesson = %self.lesson_id,
                slots = ?mapping.iter().collect::<Vec<_>>(),
                dropped = ?mapping.dropped(),
                "question slots resolved"
            );
        }
        let Some(mapping) = self.slots.mapping() else {
            return ReconcileReport::default();
        };

        for start in batch.iter().filter_map(AnswerRecord::start_unix) {
            if self.clock.observe(start) {
                info!(offset_ms = self.clock.offset().offset_ms(), "clock skew detected");
            }
        }

        let report = merge_batch(
            &mut self.students,
            batch,
            mapping,
            self.clock.server_now_secs(),
            self.timer.duration(),
            mode,
        );
        debug!(?mode, ?report, "reconciled");
        report
    }

    /// Advances in-progress bars to server-adjusted now.
    pub fn tick(&mut self) -> usize {
        advance_in_progress(
            &mut self.students,
            self.clock.server_now_secs(),
            self.timer.duration(),
        )
    }

    #[must_use]
    pub fn snapshot(&self) -> DashboardSnapshot {
        let slots = self
            .slots
            .mapping()
            .map(|mapping| mapping.iter().collect())
            .unwrap_or_default();
        DashboardSnapshot {
            lesson_id: self.lesson_id,
            theme_id: self.theme_id,
            students: self.students.clone(),
            slots,
            summaries: summarize_slots(&self.students),
            timer: self.timer,
            phase: self.phase(),
            clock_offset_ms: self.clock.offset().offset_ms(),
        }
    }
}

/// Immutable copy of the view-model handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub lesson_id: LessonId,
    pub theme_id: Option<ThemeId>,
    pub students: Vec<Student>,
    pub slots: Vec<(Slot, QuestionId)>,
    pub summaries: [SlotSummary; SLOT_COUNT],
    pub timer: ExerciseTimer,
    pub phase: DashboardPhase,
    pub clock_offset_ms: i64,
}

impl DashboardSnapshot {
    #[must_use]
    pub fn empty(lesson_id: LessonId, duration: ExerciseDuration) -> Self {
        DashboardState::new(lesson_id, ServerClock::default(), duration).snapshot()
    }
}
