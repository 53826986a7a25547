mod answer;
mod ids;
mod status;
mod student;

pub use answer::{AnswerRecord, QuestionRef};
pub use ids::{ClassId, LessonId, ParseIdError, QuestionId, StudentId, ThemeId};
pub use status::{RawAnswerStatus, SlotStatus};
pub use student::{RosterEntry, SlotState, Student};
