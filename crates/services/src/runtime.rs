//! Dashboard session runtime.
//!
//! One tokio task owns the `DashboardState` and serializes every mutation:
//! control commands, push notifications, the fast and slow reconciliation
//! cadences, the local progress ticker and the exercise countdown. Readers get
//! immutable snapshots through a `watch` channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use classroom_core::model::{ClassId, LessonId, ThemeId};
use classroom_core::progress::ExerciseDuration;
use classroom_core::{Clock, ServerClock};

use crate::config::{CadenceConfig, ExerciseConfig};
use crate::dashboard::{DashboardSnapshot, DashboardState, MergeMode};
use crate::error::SessionError;
use crate::push::{ClassroomCommand, PushChannel, PushEvent};
use crate::transport::ClassroomBackend;

const COMMAND_BUFFER: usize = 16;
const COUNTDOWN_PERIOD: Duration = Duration::from_secs(1);

/// What a session is about and how it paces itself.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub lesson_id: LessonId,
    pub class_id: ClassId,
    pub theme_id: Option<ThemeId>,
    pub exercise: ExerciseConfig,
    pub cadence: CadenceConfig,
    pub clock: Clock,
}

impl SessionSettings {
    #[must_use]
    pub fn new(lesson_id: LessonId, class_id: ClassId) -> Self {
        Self {
            lesson_id,
            class_id,
            theme_id: None,
            exercise: ExerciseConfig::default(),
            cadence: CadenceConfig::default(),
            clock: Clock::default_clock(),
        }
    }

    #[must_use]
    pub fn with_theme(mut self, theme_id: Option<ThemeId>) -> Self {
        self.theme_id = theme_id;
        self
    }

    #[must_use]
    pub fn with_exercise(mut self, exercise: ExerciseConfig) -> Self {
        self.exercise = exercise;
        self
    }

    #[must_use]
    pub fn with_cadence(mut self, cadence: CadenceConfig) -> Self {
        self.cadence = cadence;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

//
// ─── COMMANDS ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy)]
enum CommandKind {
    StartLesson(Option<ThemeId>),
    StartExercise,
    StopExercise,
    SetExerciseMinutes(u32),
    Refresh(MergeMode),
    Shutdown,
}

struct Command {
    kind: CommandKind,
    reply: oneshot::Sender<Result<(), SessionError>>,
}

//
// ─── HANDLE ───────────────────────────────────────────────────────────────────
//

/// Caller side of a running session.
///
/// Dropping the handle stops the session task.
pub struct DashboardHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<DashboardSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl DashboardHandle {
    async fn request(&self, kind: CommandKind) -> Result<(), SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command { kind, reply })
            .await
            .map_err(|_| SessionError::Stopped)?;
        response.await.map_err(|_| SessionError::Stopped)?
    }

    /// Generates the lesson's answer rows and notifies student devices.
    ///
    /// Uses `theme_id`, or the theme the session was configured with.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::MissingTheme` without a theme, or
    /// `SessionError::Api` if the backend rejects the request.
    pub async fn start_lesson(&self, theme_id: Option<ThemeId>) -> Result<(), SessionError> {
        self.request(CommandKind::StartLesson(theme_id)).await
    }

    /// Starts (or resumes) the exercise countdown and the three cadences.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::LessonNotStarted` before `start_lesson`, and
    /// `SessionError::TimeUp` when the countdown is already at zero.
    pub async fn start_exercise(&self) -> Result<(), SessionError> {
        self.request(CommandKind::StartExercise).await
    }

    /// # Errors
    ///
    /// Returns `SessionError::Stopped` if the session is gone.
    pub async fn stop_exercise(&self) -> Result<(), SessionError> {
        self.request(CommandKind::StopExercise).await
    }

    /// Changes the exercise length and refills the countdown.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidDuration` for zero minutes.
    pub async fn set_exercise_minutes(&self, minutes: u32) -> Result<(), SessionError> {
        self.request(CommandKind::SetExerciseMinutes(minutes)).await
    }

    /// Runs one reconciliation cycle outside the cadences.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Stopped` if the session is gone. Fetch failures
    /// are absorbed like any other cycle.
    pub async fn refresh(&self, mode: MergeMode) -> Result<(), SessionError> {
        self.request(CommandKind::Refresh(mode)).await
    }

    #[must_use]
    pub fn snapshot(&self) -> DashboardSnapshot {
        self.snapshots.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshots.clone()
    }

    /// Stops every cadence, detaches push and waits for the task to end.
    pub async fn shutdown(mut self) {
        let _ = self.request(CommandKind::Shutdown).await;
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for DashboardHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

//
// ─── SESSION ──────────────────────────────────────────────────────────────────
//

/// Task-side owner of one lesson's dashboard.
pub struct DashboardSession {
    backend: Arc<dyn ClassroomBackend>,
    state: DashboardState,
    push: Option<PushChannel>,
    cadence: CadenceConfig,
    snapshots: watch::Sender<DashboardSnapshot>,
}

impl DashboardSession {
    /// Seeds the roster and spawns the session task.
    ///
    /// A roster 404 seeds an empty dashboard.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Api` if the roster cannot be fetched.
    pub async fn start(
        backend: Arc<dyn ClassroomBackend>,
        settings: SessionSettings,
        push: Option<PushChannel>,
    ) -> Result<DashboardHandle, SessionError> {
        let roster = match backend.fetch_roster(settings.class_id).await {
            Ok(roster) => roster,
            Err(err) if err.is_not_found() => Vec::new(),
            Err(err) => return Err(err.into()),
        };

        let mut state = DashboardState::new(
            settings.lesson_id,
            ServerClock::new(settings.clock),
            settings.exercise.duration,
        )
        .with_theme(settings.theme_id);
        state.seed_roster(&roster);

        let (snapshots, receiver) = watch::channel(state.snapshot());
        let (commands, inbox) = mpsc::channel(COMMAND_BUFFER);

        info!(
            lesson = %settings.lesson_id,
            class = %settings.class_id,
            students = roster.len(),
            push = push.is_some(),
            "dashboard session started"
        );

        let session = Self {
            backend,
            state,
            push,
            cadence: settings.cadence,
            snapshots,
        };
        let task = tokio::spawn(session.run(inbox));

        Ok(DashboardHandle {
            commands,
            snapshots: receiver,
            task: Some(task),
        })
    }

    async fn run(mut self, mut inbox: mpsc::Receiver<Command>) {
        let mut fast = cadence(self.cadence.fast);
        let mut slow = cadence(self.cadence.slow);
        let mut ticker = cadence(self.cadence.tick);
        let mut countdown = cadence(COUNTDOWN_PERIOD);

        loop {
            let running = self.state.is_running();
            tokio::select! {
                biased;

                command = inbox.recv() => {
                    let Some(Command { kind, reply }) = command else {
                        break;
                    };
                    if matches!(kind, CommandKind::Shutdown) {
                        let _ = reply.send(Ok(()));
                        break;
                    }
                    let result = self.handle(kind).await;
                    if matches!(kind, CommandKind::StartExercise) && result.is_ok() {
                        for interval in [&mut fast, &mut slow, &mut ticker, &mut countdown] {
                            interval.reset();
                        }
                    }
                    let _ = reply.send(result);
                }
                event = next_push(&mut self.push) => match event {
                    Some(event) => {
                        if self.drain_push(event) {
                            self.refresh(MergeMode::Protected).await;
                        }
                    }
                    None => {
                        warn!("push channel closed; continuing with polling only");
                        self.push = None;
                    }
                },
                _ = fast.tick(), if running => self.refresh(MergeMode::Protected).await,
                _ = slow.tick(), if running => self.refresh(MergeMode::Authoritative).await,
                _ = ticker.tick(), if running => {
                    if self.state.tick() > 0 {
                        self.publish();
                    }
                }
                _ = countdown.tick(), if running => {
                    if self.state.timer_mut().tick_second() {
                        info!(lesson = %self.state.lesson_id(), "exercise time is up");
                    }
                    self.publish();
                }
            }
        }

        if let Some(push) = self.push.take() {
            push.disconnect().await;
        }
        info!(lesson = %self.state.lesson_id(), "dashboard session stopped");
    }

    async fn handle(&mut self, kind: CommandKind) -> Result<(), SessionError> {
        let lesson_id = self.state.lesson_id();
        match kind {
            CommandKind::StartLesson(theme_id) => {
                let theme_id = theme_id
                    .or(self.state.theme_id())
                    .ok_or(SessionError::MissingTheme)?;
                self.backend.generate_answer_data(lesson_id, theme_id).await?;
                self.state.set_theme(theme_id);
                self.state.mark_lesson_started();
                self.send_push(ClassroomCommand::LessonStart);
                info!(lesson = %lesson_id, theme = %theme_id, "lesson started");
            }
            CommandKind::StartExercise => {
                if !self.state.lesson_started() {
                    return Err(SessionError::LessonNotStarted);
                }
                if self.state.is_running() {
                    return Ok(());
                }
                if !self.state.timer_mut().start() {
                    return Err(SessionError::TimeUp);
                }
                if let Err(err) = self.backend.start_exercise(lesson_id).await {
                    warn!(%err, "start_exercise request failed");
                }
                let announce = self
                    .state
                    .theme_id()
                    .map_or(ClassroomCommand::ExerciseStart, ClassroomCommand::LessonTheme);
                self.send_push(announce);
                info!(lesson = %lesson_id, "exercise started");
                self.refresh(MergeMode::Protected).await;
            }
            CommandKind::StopExercise => {
                if !self.state.is_running() {
                    return Ok(());
                }
                self.state.timer_mut().stop();
                if let Err(err) = self.backend.end_exercise(lesson_id).await {
                    warn!(%err, "end_exercise request failed");
                }
                self.send_push(ClassroomCommand::ExerciseEnd);
                info!(lesson = %lesson_id, "exercise stopped");
            }
            CommandKind::SetExerciseMinutes(minutes) => {
                let duration =
                    ExerciseDuration::from_minutes(minutes).ok_or(SessionError::InvalidDuration)?;
                self.state.timer_mut().reset(duration);
            }
            CommandKind::Refresh(mode) => self.refresh(mode).await,
            CommandKind::Shutdown => {}
        }
        self.publish();
        Ok(())
    }

    /// Folds `first` and every already queued push event into one decision:
    /// true when at least one of them asks for a refresh of this lesson.
    fn drain_push(&mut self, first: PushEvent) -> bool {
        let lesson_id = self.state.lesson_id();
        let mut pending = Some(first);
        let mut refresh = false;
        let mut collapsed = 0_usize;
        while let Some(event) = pending {
            if event.triggers_refresh_for(lesson_id) {
                refresh = true;
                collapsed += 1;
            } else {
                info!(?event, "ignoring push event");
            }
            pending = self.push.as_mut().and_then(PushChannel::try_recv);
        }
        if refresh {
            debug!(events = collapsed, "push triggered refresh");
        }
        refresh
    }

    /// One fetch-and-merge cycle. Failures keep the previous view-model.
    async fn refresh(&mut self, mode: MergeMode) {
        let lesson_id = self.state.lesson_id();
        let batch = match self.backend.fetch_answers(lesson_id).await {
            Ok(batch) => batch,
            Err(err) if err.is_not_found() => Vec::new(),
            Err(err) => {
                warn!(%err, ?mode, lesson = %lesson_id, "answer fetch failed; skipping cycle");
                return;
            }
        };
        self.state.reconcile(&batch, mode);
        self.publish();
    }

    fn publish(&self) {
        let next = self.state.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    fn send_push(&self, command: ClassroomCommand) {
        let Some(push) = &self.push else {
            return;
        };
        if let Err(err) = push.send(command) {
            warn!(%err, ?command, "push command dropped");
        }
    }
}

fn cadence(period: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn next_push(push: &mut Option<PushChannel>) -> Option<PushEvent> {
    match push {
        Some(channel) => channel.recv().await,
        None => std::future::pending().await,
    }
}
