use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{AnswerRecord, QuestionId};

/// Number of fixed display slots.
pub const SLOT_COUNT: usize = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SlotError {
    #[error("slot number must be between 1 and {SLOT_COUNT}, got {0}")]
    OutOfRange(usize),
}

/// One of the four display positions, numbered `1..=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Slot(u8);

impl Slot {
    pub const ALL: [Slot; SLOT_COUNT] = [Slot(1), Slot(2), Slot(3), Slot(4)];

    /// # Errors
    ///
    /// Returns `SlotError::OutOfRange` unless `number` is in `1..=4`.
    pub fn new(number: usize) -> Result<Self, SlotError> {
        match u8::try_from(number) {
            Ok(n) if (1..=SLOT_COUNT).contains(&number) => Ok(Self(n)),
            _ => Err(SlotError::OutOfRange(number)),
        }
    }

    /// One-based slot number.
    #[must_use]
    pub fn number(self) -> usize {
        usize::from(self.0)
    }

    /// Zero-based array index.
    #[must_use]
    pub fn index(self) -> usize {
        self.number() - 1
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.0)
    }
}

//
// ─── MAPPING ──────────────────────────────────────────────────────────────────
//

/// Association from question id to display slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionSlotMap {
    by_question: BTreeMap<QuestionId, Slot>,
    dropped: Vec<QuestionId>,
}

impl QuestionSlotMap {
    /// Sorts the distinct ids ascending and assigns the first four to slots 1..4.
    ///
    /// Ids past the fourth are kept in `dropped()` and otherwise ignored.
    #[must_use]
    pub fn resolve<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = QuestionId>,
    {
        let mut distinct: Vec<QuestionId> = ids.into_iter().collect();
        distinct.sort_unstable();
        distinct.dedup();

        let dropped = distinct.split_off(distinct.len().min(SLOT_COUNT));
        let by_question = distinct.into_iter().zip(Slot::ALL).collect();

        Self {
            by_question,
            dropped,
        }
    }

    #[must_use]
    pub fn slot_for(&self, question_id: QuestionId) -> Option<Slot> {
        self.by_question.get(&question_id).copied()
    }

    #[must_use]
    pub fn question_for(&self, slot: Slot) -> Option<QuestionId> {
        self.by_question
            .iter()
            .find_map(|(question, s)| (*s == slot).then_some(*question))
    }

    /// Pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Slot, QuestionId)> + '_ {
        // ascending ids map to ascending slots, so key order is slot order
        self.by_question.iter().map(|(q, s)| (*s, *q))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_question.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_question.is_empty()
    }

    /// Question ids seen in the resolving batch that did not fit in a slot.
    #[must_use]
    pub fn dropped(&self) -> &[QuestionId] {
        &self.dropped
    }
}

//
// ─── RESOLVER ─────────────────────────────────────────────────────────────────
//

/// Freezes the slot mapping on the first non-empty batch of a session.
#[derive(Debug, Clone, Default)]
pub struct SlotResolver {
    frozen: Option<QuestionSlotMap>,
}

impl SlotResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a batch to the resolver.
    ///
    /// Returns `true` only for the call that froze the mapping.
    pub fn observe(&mut self, batch: &[AnswerRecord]) -> bool {
        if self.frozen.is_some() || batch.is_empty() {
            return false;
        }
        self.frozen = Some(QuestionSlotMap::resolve(
            batch.iter().map(AnswerRecord::question_id),
        ));
        true
    }

    #[must_use]
    pub fn mapping(&self) -> Option<&QuestionSlotMap> {
        self.frozen.as_ref()
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }
}
