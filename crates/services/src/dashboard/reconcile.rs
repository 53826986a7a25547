use std::collections::HashMap;

use classroom_core::model::{AnswerRecord, Student, StudentId};
use classroom_core::progress::{ExerciseDuration, derive_progress, derive_status, resolve_start_time};
use classroom_core::slots::QuestionSlotMap;

/// How a batch is folded into existing slot state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Fast cadence and push: a terminal status is never overwritten.
    Protected,
    /// Slow full resync: every mapped slot takes the fetched status.
    Authoritative,
}

/// What a merge pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Students with at least one record in the batch.
    pub students_matched: usize,
    /// Slot writes that changed status, progress or start time.
    pub slots_changed: usize,
    /// Records whose status was ignored to protect a terminal state.
    pub statuses_held: usize,
    /// Records whose question has no slot.
    pub unmapped_records: usize,
}

impl ReconcileReport {
    #[must_use]
    pub fn changed(&self) -> bool {
        self.slots_changed > 0
    }
}

/// Folds `batch` into `students`.
///
/// Progress and start time are always refreshed. Status is refreshed unless
/// `mode` is `Protected` and the slot already holds `Correct` or `Wrong`.
/// Students without records, and slots without records, keep their state.
pub fn merge_batch(
    students: &mut [Student],
    batch: &[AnswerRecord],
    slots: &QuestionSlotMap,
    server_now: i64,
    target: ExerciseDuration,
    mode: MergeMode,
) -> ReconcileReport {
    let mut by_student: HashMap<StudentId, Vec<&AnswerRecord>> = HashMap::new();
    for record in batch {
        by_student.entry(record.student_id).or_default().push(record);
    }

    let mut report = ReconcileReport::default();
    for student in students.iter_mut() {
        let Some(records) = by_student.get(&student.id()) else {
            continue;
        };
        report.students_matched += 1;

        for record in records {
            let Some(slot) = slots.slot_for(record.question_id()) else {
                report.unmapped_records += 1;
                continue;
            };

            let state = student.slot_mut(slot);
            let before = *state;

            state.progress = derive_progress(Some(record), server_now, target);
            state.started_at = resolve_start_time(record);

            let status = derive_status(Some(record));
            match mode {
                MergeMode::Protected if state.status.is_terminal() => {
                    if status != state.status {
                        report.statuses_held += 1;
                    }
                }
                MergeMode::Protected | MergeMode::Authoritative => state.status = status,
            }

            if *state != before {
                report.slots_changed += 1;
            }
        }
    }
    report
}
