use serde::Serialize;

use classroom_core::model::{SlotStatus, Student};
use classroom_core::slots::{SLOT_COUNT, Slot};

/// Class-wide tally for one slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlotSummary {
    pub slot: Slot,
    pub correct: usize,
    pub wrong: usize,
    pub in_progress: usize,
    pub unanswered: usize,
}

impl SlotSummary {
    fn empty(slot: Slot) -> Self {
        Self {
            slot,
            correct: 0,
            wrong: 0,
            in_progress: 0,
            unanswered: 0,
        }
    }

    /// Correct share of finalized answers, `0` when nothing is finalized.
    #[must_use]
    pub fn correct_rate(&self) -> f64 {
        let finalized = self.correct + self.wrong;
        if finalized == 0 {
            return 0.0;
        }
        // class sizes are tiny; the casts are exact
        #[allow(clippy::cast_precision_loss)]
        let rate = self.correct as f64 / finalized as f64 * 100.0;
        rate
    }
}

#[must_use]
pub fn summarize_slots(students: &[Student]) -> [SlotSummary; SLOT_COUNT] {
    let mut summaries = Slot::ALL.map(SlotSummary::empty);
    for student in students {
        for (slot, state) in student.slots() {
            let summary = &mut summaries[slot.index()];
            match state.status {
                SlotStatus::Correct => summary.correct += 1,
                SlotStatus::Wrong => summary.wrong += 1,
                SlotStatus::InProgress => summary.in_progress += 1,
                SlotStatus::Unanswered => summary.unanswered += 1,
            }
        }
    }
    summaries
}
