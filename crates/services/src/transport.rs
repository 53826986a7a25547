use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use classroom_core::model::{AnswerRecord, ClassId, LessonId, RosterEntry, ThemeId};

use crate::error::ApiError;

/// Pull side: all answer records of a lesson.
#[async_trait]
pub trait AnswerSource: Send + Sync {
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` when the lesson has no answers yet, or
    /// another `ApiError` for transport failures.
    async fn fetch_answers(&self, lesson_id: LessonId) -> Result<Vec<AnswerRecord>, ApiError>;
}

/// Roster of a class, ordered by seat number.
#[async_trait]
pub trait RosterSource: Send + Sync {
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for a class without students, or another
    /// `ApiError` for transport failures.
    async fn fetch_roster(&self, class_id: ClassId) -> Result<Vec<RosterEntry>, ApiError>;
}

/// Instructor-initiated lesson actions owned by the backend.
#[async_trait]
pub trait LessonControl: Send + Sync {
    /// Creates the per-student answer rows for a lesson theme.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend rejects the request.
    async fn generate_answer_data(
        &self,
        lesson_id: LessonId,
        theme_id: ThemeId,
    ) -> Result<(), ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` if the backend rejects the request.
    async fn start_exercise(&self, lesson_id: LessonId) -> Result<(), ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` if the backend rejects the request.
    async fn end_exercise(&self, lesson_id: LessonId) -> Result<(), ApiError>;
}

/// Everything a dashboard session needs from the backend.
pub trait ClassroomBackend: AnswerSource + RosterSource + LessonControl {}

impl<T> ClassroomBackend for T where T: AnswerSource + RosterSource + LessonControl {}

//
// ─── IN-MEMORY BACKEND ────────────────────────────────────────────────────────
//

/// Lesson action recorded by `InMemoryBackend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonAction {
    GenerateAnswerData(LessonId, ThemeId),
    StartExercise(LessonId),
    EndExercise(LessonId),
}

#[derive(Default)]
struct BackendData {
    rosters: HashMap<ClassId, Vec<RosterEntry>>,
    answers: HashMap<LessonId, Vec<AnswerRecord>>,
    actions: Vec<LessonAction>,
    answer_fetches: usize,
    failing_fetches: usize,
}

/// Simple in-memory backend for tests and offline demos.
///
/// Missing classes and lessons answer `NotFound`, like the HTTP backend's 404.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    data: Arc<Mutex<BackendData>>,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BackendData>, ApiError> {
        self.data
            .lock()
            .map_err(|e| ApiError::Unavailable(e.to_string()))
    }

    /// # Errors
    ///
    /// Returns `ApiError::Unavailable` if the backing lock is poisoned.
    pub fn set_roster(&self, class_id: ClassId, roster: Vec<RosterEntry>) -> Result<(), ApiError> {
        self.lock()?.rosters.insert(class_id, roster);
        Ok(())
    }

    /// Replaces every answer of the lesson.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unavailable` if the backing lock is poisoned.
    pub fn set_answers(
        &self,
        lesson_id: LessonId,
        answers: Vec<AnswerRecord>,
    ) -> Result<(), ApiError> {
        self.lock()?.answers.insert(lesson_id, answers);
        Ok(())
    }

    /// Makes the next `count` answer fetches fail with `Unavailable`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unavailable` if the backing lock is poisoned.
    pub fn fail_next_fetches(&self, count: usize) -> Result<(), ApiError> {
        self.lock()?.failing_fetches = count;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ApiError::Unavailable` if the backing lock is poisoned.
    pub fn actions(&self) -> Result<Vec<LessonAction>, ApiError> {
        Ok(self.lock()?.actions.clone())
    }

    /// Number of answer fetches served so far, failed ones included.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unavailable` if the backing lock is poisoned.
    pub fn answer_fetches(&self) -> Result<usize, ApiError> {
        Ok(self.lock()?.answer_fetches)
    }
}

#[async_trait]
impl AnswerSource for InMemoryBackend {
    async fn fetch_answers(&self, lesson_id: LessonId) -> Result<Vec<AnswerRecord>, ApiError> {
        let mut guard = self.lock()?;
        guard.answer_fetches += 1;
        if guard.failing_fetches > 0 {
            guard.failing_fetches -= 1;
            return Err(ApiError::Unavailable("injected failure".into()));
        }
        guard.answers.get(&lesson_id).cloned().ok_or(ApiError::NotFound)
    }
}

#[async_trait]
impl RosterSource for InMemoryBackend {
    async fn fetch_roster(&self, class_id: ClassId) -> Result<Vec<RosterEntry>, ApiError> {
        let guard = self.lock()?;
        guard.rosters.get(&class_id).cloned().ok_or(ApiError::NotFound)
    }
}

#[async_trait]
impl LessonControl for InMemoryBackend {
    async fn generate_answer_data(
        &self,
        lesson_id: LessonId,
        theme_id: ThemeId,
    ) -> Result<(), ApiError> {
        self.lock()?
            .actions
            .push(LessonAction::GenerateAnswerData(lesson_id, theme_id));
        Ok(())
    }

    async fn start_exercise(&self, lesson_id: LessonId) -> Result<(), ApiError> {
        self.lock()?.actions.push(LessonAction::StartExercise(lesson_id));
        Ok(())
    }

    async fn end_exercise(&self, lesson_id: LessonId) -> Result<(), ApiError> {
        self.lock()?.actions.push(LessonAction::EndExercise(lesson_id));
        Ok(())
    }
}
