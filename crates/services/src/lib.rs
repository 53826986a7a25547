#![forbid(unsafe_code)]

pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod push;
pub mod runtime;
pub mod transport;

pub use classroom_core::Clock;

pub use api::ApiClient;
pub use config::{ApiConfig, CadenceConfig, ExerciseConfig};
pub use dashboard::{
    DashboardPhase, DashboardSnapshot, DashboardState, ExerciseTimer, MergeMode, ReconcileReport,
    SlotSummary,
};
pub use error::{ApiError, ConfigError, PushError, SessionError};
pub use push::{ClassroomCommand, PushChannel, PushEvent, PushPeer};
pub use runtime::{DashboardHandle, DashboardSession, SessionSettings};
pub use transport::{
    AnswerSource, ClassroomBackend, InMemoryBackend, LessonAction, LessonControl, RosterSource,
};
