use serde::Serialize;

use classroom_core::progress::ExerciseDuration;

/// Countdown shown above the dashboard; also gates the cadences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExerciseTimer {
    #[serde(skip)]
    duration: ExerciseDuration,
    seconds_left: u32,
    running: bool,
}

impl ExerciseTimer {
    #[must_use]
    pub fn new(duration: ExerciseDuration) -> Self {
        Self {
            duration,
            seconds_left: duration.as_secs(),
            running: false,
        }
    }

    #[must_use]
    pub fn duration(&self) -> ExerciseDuration {
        self.duration
    }

    #[must_use]
    pub fn seconds_left(&self) -> u32 {
        self.seconds_left
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Starts or resumes. Returns false when there is no time left.
    pub fn start(&mut self) -> bool {
        if self.seconds_left == 0 {
            return false;
        }
        self.running = true;
        true
    }

    /// Pauses, keeping the remaining time.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Sets a new duration and refills the countdown.
    pub fn reset(&mut self, duration: ExerciseDuration) {
        self.duration = duration;
        self.seconds_left = duration.as_secs();
    }

    /// One second elapsed. Returns true when this tick ran the timer out.
    pub fn tick_second(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.seconds_left = self.seconds_left.saturating_sub(1);
        if self.seconds_left == 0 {
            self.running = false;
            return true;
        }
        false
    }

    /// True once started and paused before running out.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        !self.running && self.seconds_left > 0 && self.seconds_left < self.duration.as_secs()
    }

    /// `MM:SS`.
    #[must_use]
    pub fn display(&self) -> String {
        format!("{:02}:{:02}", self.seconds_left / 60, self.seconds_left % 60)
    }
}

/// Where the instructor is in the lesson flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DashboardPhase {
    AwaitingLessonStart,
    AwaitingExerciseStart,
    Running,
    Paused,
}

impl DashboardPhase {
    #[must_use]
    pub fn derive(lesson_started: bool, timer: &ExerciseTimer) -> Self {
        if timer.is_running() {
            Self::Running
        } else if !lesson_started {
            Self::AwaitingLessonStart
        } else if timer.is_paused() {
            Self::Paused
        } else {
            Self::AwaitingExerciseStart
        }
    }

    /// Prompt shown to the instructor.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::AwaitingLessonStart => "Press \"start lesson\" to begin the lesson",
            Self::AwaitingExerciseStart => "Press \"start exercise\" to begin the exercise",
            Self::Running => "Press \"end exercise\" when time is up",
            Self::Paused => "Paused",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_minutes() -> ExerciseDuration {
        ExerciseDuration::from_minutes(2).unwrap()
    }

    #[test]
    fn countdown_stops_itself_at_zero() {
        let mut timer = ExerciseTimer::new(two_minutes());
        assert!(timer.start());
        for _ in 0..119 {
            assert!(!timer.tick_second());
        }
        assert_eq!(timer.display(), "00:01");
        assert!(timer.tick_second());
        assert!(!timer.is_running());
        assert_eq!(timer.seconds_left(), 0);
        assert!(!timer.start());
    }

    #[test]
    fn ticks_are_ignored_while_stopped() {
        let mut timer = ExerciseTimer::new(two_minutes());
        assert!(!timer.tick_second());
        assert_eq!(timer.display(), "02:00");
    }

    #[test]
    fn phase_follows_lesson_and_timer() {
        let mut timer = ExerciseTimer::new(two_minutes());
        assert_eq!(DashboardPhase::derive(false, &timer), DashboardPhase::AwaitingLessonStart);
        assert_eq!(DashboardPhase::derive(true, &timer), DashboardPhase::AwaitingExerciseStart);

        timer.start();
        assert_eq!(DashboardPhase::derive(true, &timer), DashboardPhase::Running);

        timer.tick_second();
        timer.stop();
        assert_eq!(DashboardPhase::derive(true, &timer), DashboardPhase::Paused);

        timer.reset(ExerciseDuration::from_minutes(10).unwrap());
        assert_eq!(timer.display(), "10:00");
        assert_eq!(DashboardPhase::derive(true, &timer), DashboardPhase::AwaitingExerciseStart);
    }
}
