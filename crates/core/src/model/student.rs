use serde::{Deserialize, Serialize};

use crate::model::ids::{ClassId, StudentId};
use crate::model::status::SlotStatus;
use crate::slots::{SLOT_COUNT, Slot};

/// Roster row returned by `GET /classes/{class_id}/students`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub student_id: StudentId,
    pub name: String,
    pub class_id: ClassId,
    pub students_number: u32,
}

/// Mutable per-question state of one student.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SlotState {
    pub status: SlotStatus,
    /// Elapsed share of the exercise duration, `0.0..=100.0`.
    pub progress: f64,
    /// Resolved start time in server epoch seconds.
    pub started_at: Option<i64>,
}

/// One dashboard row.
///
/// Identity, seat number and name are fixed at seeding time; only the slots
/// change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Student {
    id: StudentId,
    number: u32,
    name: String,
    slots: [SlotState; SLOT_COUNT],
}

impl Student {
    #[must_use]
    pub fn new(id: StudentId, number: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            number,
            name: name.into(),
            slots: [SlotState::default(); SLOT_COUNT],
        }
    }

    #[must_use]
    pub fn from_roster(entry: &RosterEntry) -> Self {
        Self::new(entry.student_id, entry.students_number, entry.name.clone())
    }

    #[must_use]
    pub fn id(&self) -> StudentId {
        self.id
    }

    #[must_use]
    pub fn number(&self) -> u32 {
        self.number
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn slot(&self, slot: Slot) -> &SlotState {
        &self.slots[slot.index()]
    }

    pub fn slot_mut(&mut self, slot: Slot) -> &mut SlotState {
        &mut self.slots[slot.index()]
    }

    /// Slots in display order.
    pub fn slots(&self) -> impl Iterator<Item = (Slot, &SlotState)> {
        Slot::ALL.into_iter().zip(self.slots.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_student_has_empty_slots() {
        let entry = RosterEntry {
            student_id: StudentId::new(8),
            name: "Aoi".into(),
            class_id: ClassId::new(2),
            students_number: 3,
        };
        let student = Student::from_roster(&entry);

        assert_eq!(student.id(), StudentId::new(8));
        assert_eq!(student.number(), 3);
        assert_eq!(student.name(), "Aoi");
        assert!(student.slots().all(|(_, s)| *s == SlotState::default()));
    }

    #[test]
    fn slot_mut_touches_only_its_slot() {
        let mut student = Student::new(StudentId::new(1), 1, "A");
        let second = Slot::new(2).unwrap();
        student.slot_mut(second).status = SlotStatus::InProgress;

        assert_eq!(student.slot(second).status, SlotStatus::InProgress);
        assert_eq!(student.slot(Slot::ALL[0]).status, SlotStatus::Unanswered);
    }
}
