mod reconcile;
mod state;
mod summary;
mod ticker;
mod timer;

pub use reconcile::{MergeMode, ReconcileReport, merge_batch};
pub use state::{DashboardSnapshot, DashboardState};
pub use summary::{SlotSummary, summarize_slots};
pub use ticker::advance_in_progress;
pub use timer::{DashboardPhase, ExerciseTimer};
