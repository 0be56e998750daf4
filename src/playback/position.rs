use crate::playback::engine::EngineStatus;
use crate::playback::events::PlaybackState;

/// Progress as shown to the user. The engine holds the real clock.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DisplayPosition {
    pub fraction: f64,
    pub elapsed_ms: u64,
    pub total_ms: u64,
}

impl DisplayPosition {
    pub fn elapsed_label(&self) -> String {
        format_time(self.elapsed_ms)
    }

    pub fn total_label(&self) -> String {
        format_time(self.total_ms)
    }

    /// `HH:MM:SS / HH:MM:SS`
    pub fn label(&self) -> String {
        format!("{} / {}", self.elapsed_label(), self.total_label())
    }
}

pub fn format_time(ms: u64) -> String {
    let secs = ms / 1000;
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

/// Derives [`DisplayPosition`] from engine status polls and keeps polls
/// from clobbering an in-progress scrub.
#[derive(Debug, Default)]
pub struct PositionTracker {
    position: DisplayPosition,
    adjusting: bool,
}

impl PositionTracker {
    pub fn position(&self) -> DisplayPosition {
        self.position
    }

    pub fn is_adjusting(&self) -> bool {
        self.adjusting
    }

    /// Whether a poll is due for the given state.
    pub fn should_poll(&self, state: &PlaybackState) -> bool {
        *state == PlaybackState::Playing && !self.adjusting
    }

    /// Applies one poll result. Returns false when the sample was ignored.
    pub fn apply(&mut self, status: EngineStatus) -> bool {
        if self.adjusting || status.total_ms <= 0 {
            return false;
        }
        let total = status.total_ms as u64;
        let elapsed = status.elapsed_ms.clamp(0, status.total_ms) as u64;
        self.position = DisplayPosition {
            fraction: elapsed as f64 / total as f64,
            elapsed_ms: elapsed,
            total_ms: total,
        };
        true
    }

    pub fn begin_adjust(&mut self) {
        self.adjusting = true;
    }

    /// Ends a scrub and returns the clamped fraction to seek to.
    pub fn end_adjust(&mut self, fraction: f64) -> f64 {
        self.adjusting = false;
        if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        }
    }

    pub fn cancel_adjust(&mut self) {
        self.adjusting = false;
    }

    /// Shows a seek target before the engine's next status report.
    pub fn show_seek(&mut self, fraction: f64) {
        let total = self.position.total_ms;
        self.position.fraction = fraction;
        self.position.elapsed_ms = (fraction * total as f64).round() as u64;
    }

    /// Zeroes progress but keeps the last known duration.
    pub fn reset(&mut self) {
        self.position.fraction = 0.0;
        self.position.elapsed_ms = 0;
    }

    pub fn clear(&mut self) {
        self.position = DisplayPosition::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(elapsed_ms: i64, total_ms: i64) -> EngineStatus {
        EngineStatus {
            is_playing: true,
            elapsed_ms,
            total_ms,
        }
    }

    #[test]
    fn formats_hours_minutes_seconds() {
        assert_eq!(format_time(0), "00:00:00");
        assert_eq!(format_time(59_999), "00:00:59");
        assert_eq!(format_time(3_723_000), "01:02:03");
        assert_eq!(format_time(90_000_000), "25:00:00");
    }

    #[test]
    fn apply_computes_fraction() {
        let mut tracker = PositionTracker::default();
        assert!(tracker.apply(status(30_000, 120_000)));

        let pos = tracker.position();
        assert_eq!(pos.fraction, 0.25);
        assert_eq!(pos.label(), "00:00:30 / 00:02:00");
    }

    #[test]
    fn unknown_duration_is_skipped() {
        let mut tracker = PositionTracker::default();
        assert!(!tracker.apply(status(1_000, 0)));
        assert!(!tracker.apply(status(1_000, -1)));
        assert_eq!(tracker.position(), DisplayPosition::default());
    }

    #[test]
    fn polls_are_ignored_while_adjusting() {
        let mut tracker = PositionTracker::default();
        tracker.apply(status(10_000, 100_000));
        tracker.begin_adjust();

        assert!(!tracker.should_poll(&PlaybackState::Playing));
        assert!(!tracker.apply(status(50_000, 100_000)));
        assert_eq!(tracker.position().elapsed_ms, 10_000);

        assert_eq!(tracker.end_adjust(1.7), 1.0);
        assert!(tracker.should_poll(&PlaybackState::Playing));
        assert!(!tracker.should_poll(&PlaybackState::Paused));
    }

    #[test]
    fn reset_keeps_total() {
        let mut tracker = PositionTracker::default();
        tracker.apply(status(10_000, 100_000));
        tracker.reset();

        let pos = tracker.position();
        assert_eq!((pos.fraction, pos.elapsed_ms, pos.total_ms), (0.0, 0, 100_000));
        assert_eq!(pos.elapsed_label(), "00:00:00");
    }
}
