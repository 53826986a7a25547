use classroom_core::model::{SlotStatus, Student};
use classroom_core::progress::{ExerciseDuration, elapsed_progress};
use classroom_core::slots::Slot;

/// Re-derives progress of every in-progress slot that has a start time.
///
/// Never touches status. Returns how many slots changed value.
pub fn advance_in_progress(
    students: &mut [Student],
    server_now: i64,
    target: ExerciseDuration,
) -> usize {
    let mut changed = 0;
    for student in students.iter_mut() {
        for slot in Slot::ALL {
            let state = student.slot_mut(slot);
            if state.status != SlotStatus::InProgress {
                continue;
            }
            let Some(start) = state.started_at else {
                continue;
            };
            let progress = elapsed_progress(start, server_now, target);
            if progress != state.progress {
                state.progress = progress;
                changed += 1;
            }
        }
    }
    changed
}
