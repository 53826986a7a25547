use crate::time::Clock;

/// A candidate more than this many seconds in the future always trips detection.
pub const FUTURE_SKEW_LIMIT_SECS: i64 = 3_600;

/// A candidate in the future by more than this many seconds trips detection.
pub const EARLY_SKEW_LIMIT_SECS: i64 = 60;

/// Returns true when `server_secs` is far enough ahead of `local_now_secs` to
/// indicate a systematic skew rather than ordinary latency.
#[must_use]
pub fn skew_detected(server_secs: i64, local_now_secs: i64) -> bool {
    let diff = local_now_secs.saturating_sub(server_secs);
    diff < -FUTURE_SKEW_LIMIT_SECS || diff < -EARLY_SKEW_LIMIT_SECS
}

/// Signed offset in milliseconds added to local wall-clock reads.
///
/// Set at most once per session: the first detection wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockOffset {
    offset_ms: Option<i64>,
}

impl ClockOffset {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Considers one server epoch value against the local clock.
    ///
    /// Returns `true` only for the call that fixed the offset. A candidate
    /// whose offset does not fit in milliseconds is ignored and leaves the
    /// offset unset.
    pub fn observe(&mut self, server_secs: i64, local_now_secs: i64) -> bool {
        if self.offset_ms.is_some() || !skew_detected(server_secs, local_now_secs) {
            return false;
        }
        let Some(offset_ms) = server_secs
            .checked_sub(local_now_secs)
            .and_then(|secs| secs.checked_mul(1000))
        else {
            return false;
        };
        self.offset_ms = Some(offset_ms);
        true
    }

    /// Current offset; zero while unset.
    #[must_use]
    pub fn offset_ms(&self) -> i64 {
        self.offset_ms.unwrap_or(0)
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.offset_ms.is_some()
    }

    /// Server-adjusted time in whole seconds for a local millisecond reading.
    #[must_use]
    pub fn server_secs(&self, local_now_ms: i64) -> i64 {
        local_now_ms.saturating_add(self.offset_ms()).div_euclid(1000)
    }
}

/// Wall clock paired with the session's estimated offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerClock {
    clock: Clock,
    offset: ClockOffset,
}

impl ServerClock {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            offset: ClockOffset::new(),
        }
    }

    /// Feed a server epoch value (typically an answer start time).
    pub fn observe(&mut self, server_secs: i64) -> bool {
        let local = self.clock.now_secs();
        self.offset.observe(server_secs, local)
    }

    /// Unadjusted local time in epoch seconds.
    #[must_use]
    pub fn local_now_secs(&self) -> i64 {
        self.clock.now_secs()
    }

    /// Local time shifted by the offset, floored to seconds.
    #[must_use]
    pub fn server_now_secs(&self) -> i64 {
        self.offset.server_secs(self.clock.now_millis())
    }

    #[must_use]
    pub fn offset(&self) -> ClockOffset {
        self.offset
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{FIXED_TEST_TIMESTAMP, fixed_clock};

    const NOW: i64 = FIXED_TEST_TIMESTAMP;

    #[test]
    fn more_than_an_hour_ahead_trips() {
        let mut offset = ClockOffset::new();
        assert!(offset.observe(NOW + 3_700, NOW));
        assert_eq!(offset.offset_ms(), 3_700_000);
    }

    #[test]
    fn five_minutes_ahead_trips_the_early_branch() {
        assert!(skew_detected(NOW + 300, NOW));
        let mut offset = ClockOffset::new();
        assert!(offset.observe(NOW + 300, NOW));
        assert_eq!(offset.offset_ms(), 300_000);
    }

    #[test]
    fn past_or_slightly_ahead_values_do_not_trip() {
        let mut offset = ClockOffset::new();
        assert!(!offset.observe(NOW - 30, NOW));
        assert!(!offset.observe(NOW + 30, NOW));
        assert!(!offset.observe(NOW + 60, NOW));
        assert!(!offset.observe(NOW - 86_400, NOW));
        assert!(!offset.is_set());
        assert_eq!(offset.offset_ms(), 0);
    }

    #[test]
    fn first_detection_wins() {
        let mut offset = ClockOffset::new();
        assert!(offset.observe(NOW + 120, NOW));
        assert!(!offset.observe(NOW + 7_200, NOW));
        assert_eq!(offset.offset_ms(), 120_000);
    }

    #[test]
    fn server_secs_floors_after_shifting() {
        let mut offset = ClockOffset::new();
        offset.observe(NOW + 100, NOW);
        assert_eq!(offset.server_secs(NOW * 1000 + 999), NOW + 100);
        assert_eq!(offset.server_secs(-1), 99);
        assert_eq!(ClockOffset::new().server_secs(-1), -1);
    }

    #[test]
    fn offset_that_does_not_fit_is_ignored() {
        let mut offset = ClockOffset::new();
        assert!(!offset.observe(10_000_000_000_000_000, NOW));
        assert!(!offset.observe(i64::MAX, i64::MIN));
        assert!(!offset.is_set());

        assert!(offset.observe(NOW + 600, NOW));
        assert_eq!(offset.offset_ms(), 600_000);
        assert_eq!(offset.server_secs(i64::MAX), i64::MAX.div_euclid(1000));
    }

    #[test]
    fn server_clock_survives_absurd_start_times() {
        let mut clock = ServerClock::new(fixed_clock());
        assert!(!clock.observe(10_000_000_000_000_000));
        assert_eq!(clock.server_now_secs(), NOW);
    }

    #[test]
    fn server_clock_applies_detected_offset() {
        let mut clock = ServerClock::new(fixed_clock());
        assert_eq!(clock.server_now_secs(), NOW);

        assert!(clock.observe(NOW + 600));
        assert_eq!(clock.server_now_secs(), NOW + 600);
        assert_eq!(clock.local_now_secs(), NOW);
    }
}
