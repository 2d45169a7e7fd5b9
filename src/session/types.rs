use crate::error::SessionConfigError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SMOOTHING_WINDOW: usize = 10;
pub const DEFAULT_SYNC_TOLERANCE_SECONDS: f64 = 1.0;
pub const DEFAULT_COMPLETION_DISPLAY_SECONDS: f64 = 5.0;

/// Static parameters of one exercise session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Exercise name, carried through to the report
    pub exercise_name: String,
    pub reps_per_set: u32,
    pub sets_total: u32,
    pub rest_seconds: u32,
    /// Added to the shoulder baseline to place the upper (green) line
    pub green_offset: f64,
    /// Added to the shoulder baseline to place the lower (red) line
    pub red_offset: f64,
    pub smoothing_window: usize,
    pub sync_tolerance_seconds: f64,
    /// How long the completed session stays on screen before it ends
    pub completion_display_seconds: f64,
}

impl SessionConfig {
    pub fn new<S: Into<String>>(
        exercise_name: S,
        reps_per_set: u32,
        sets_total: u32,
        rest_seconds: u32,
        green_offset: f64,
        red_offset: f64,
    ) -> Self {
        Self {
            exercise_name: exercise_name.into(),
            reps_per_set,
            sets_total,
            rest_seconds,
            green_offset,
            red_offset,
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            sync_tolerance_seconds: DEFAULT_SYNC_TOLERANCE_SECONDS,
            completion_display_seconds: DEFAULT_COMPLETION_DISPLAY_SECONDS,
        }
    }

    pub fn with_smoothing_window(mut self, window: usize) -> Self {
        self.smoothing_window = window;
        self
    }

    pub fn with_sync_tolerance(mut self, seconds: f64) -> Self {
        self.sync_tolerance_seconds = seconds;
        self
    }

    pub fn with_completion_display(mut self, seconds: f64) -> Self {
        self.completion_display_seconds = seconds;
        self
    }

    pub fn validate(&self) -> Result<(), SessionConfigError> {
        if self.reps_per_set == 0 {
            return Err(SessionConfigError::ZeroRepsPerSet);
        }

        if self.sets_total == 0 {
            return Err(SessionConfigError::ZeroSetsTotal);
        }

        if self.smoothing_window == 0 {
            return Err(SessionConfigError::ZeroSmoothingWindow);
        }

        if !self.sync_tolerance_seconds.is_finite() || self.sync_tolerance_seconds < 0.0 {
            return Err(SessionConfigError::InvalidSyncTolerance(
                self.sync_tolerance_seconds,
            ));
        }

        if !self.green_offset.is_finite() {
            return Err(SessionConfigError::NonFiniteOffset {
                name: "green",
                value: self.green_offset,
            });
        }

        if !self.red_offset.is_finite() {
            return Err(SessionConfigError::NonFiniteOffset {
                name: "red",
                value: self.red_offset,
            });
        }

        Ok(())
    }
}

/// Results log marker, one per counted repetition or form error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepOutcome {
    Success,
    Error,
}

/// Why a form error was counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormErrorCause {
    /// Arms went up again without first returning below the red line
    RaisedWithoutLowering,
    /// The two arms did not reach the same region within the tolerance
    Desynchronized,
}

impl FormErrorCause {
    pub fn description(&self) -> &'static str {
        match self {
            FormErrorCause::RaisedWithoutLowering => "raised again without lowering",
            FormErrorCause::Desynchronized => "arms out of sync",
        }
    }
}

/// Counters mutated by the state machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCounters {
    /// Correct repetitions in the current set
    pub reps_in_set: u32,
    /// Form errors across the whole session
    pub errors_total: u32,
    /// 1-indexed; `sets_total + 1` once the session is complete
    pub current_set: u32,
    /// Append-only outcome log for reporting
    pub results_log: Vec<RepOutcome>,
}

impl SessionCounters {
    pub fn new() -> Self {
        Self {
            reps_in_set: 0,
            errors_total: 0,
            current_set: 1,
            results_log: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn total_successes(&self) -> usize {
        self.results_log
            .iter()
            .filter(|outcome| **outcome == RepOutcome::Success)
            .count()
    }
}

impl Default for SessionCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Rest period between sets
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RestTimer {
    pub active: bool,
    pub started_at: Option<f64>,
}

impl RestTimer {
    pub fn start(&mut self, now: f64) {
        self.active = true;
        self.started_at = Some(now);
    }

    pub fn stop(&mut self) {
        self.active = false;
        self.started_at = None;
    }

    pub fn elapsed(&self, now: f64) -> Option<f64> {
        self.started_at
            .filter(|_| self.active)
            .map(|started| (now - started).max(0.0))
    }

    pub fn has_expired(&self, now: f64, rest_seconds: u32) -> bool {
        self.elapsed(now)
            .map(|elapsed| elapsed >= rest_seconds as f64)
            .unwrap_or(false)
    }

    /// Whole seconds left, as shown on the rest countdown
    pub fn remaining_seconds(&self, now: f64, rest_seconds: u32) -> Option<u32> {
        self.elapsed(now).map(|elapsed| {
            let remaining = rest_seconds as i64 - elapsed.floor() as i64;
            remaining.max(0) as u32
        })
    }
}

/// Coarse lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Frames drive the repetition state machine
    Active,
    /// Between sets; frames are ignored until the rest timer expires
    Resting,
    /// All sets done; the completion message is on display
    Completed,
    /// The completion display interval has elapsed
    Finished,
}

/// Read-only view handed to the reporting collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub exercise_name: String,
    pub reps_per_set: u32,
    pub sets_total: u32,
    pub rest_seconds: u32,
    pub green_offset: f64,
    pub red_offset: f64,
    pub reps_in_set: u32,
    pub errors_total: u32,
    pub results_log: Vec<RepOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tuning_values() {
        let config = SessionConfig::new("Lateral raise", 10, 3, 30, -0.15, 0.05);
        assert_eq!(config.smoothing_window, 10);
        assert_eq!(config.sync_tolerance_seconds, 1.0);
        assert_eq!(config.completion_display_seconds, 5.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let base = SessionConfig::new("x", 2, 1, 0, -0.1, 0.1);

        let mut config = base.clone();
        config.reps_per_set = 0;
        assert_eq!(config.validate(), Err(SessionConfigError::ZeroRepsPerSet));

        let mut config = base.clone();
        config.sets_total = 0;
        assert_eq!(config.validate(), Err(SessionConfigError::ZeroSetsTotal));

        let config = base.clone().with_smoothing_window(0);
        assert_eq!(
            config.validate(),
            Err(SessionConfigError::ZeroSmoothingWindow)
        );

        let config = base.clone().with_sync_tolerance(-0.5);
        assert!(matches!(
            config.validate(),
            Err(SessionConfigError::InvalidSyncTolerance(_))
        ));

        let mut config = base;
        config.green_offset = f64::NAN;
        assert!(matches!(
            config.validate(),
            Err(SessionConfigError::NonFiniteOffset { name: "green", .. })
        ));
    }

    #[test]
    fn test_rest_timer() {
        let mut timer = RestTimer::default();
        assert!(!timer.has_expired(100.0, 0));
        assert_eq!(timer.remaining_seconds(100.0, 10), None);

        timer.start(10.0);
        assert!(!timer.has_expired(19.9, 10));
        assert_eq!(timer.remaining_seconds(12.5, 10), Some(8));
        assert!(timer.has_expired(20.0, 10));
        assert_eq!(timer.remaining_seconds(25.0, 10), Some(0));

        timer.stop();
        assert!(!timer.active);
        assert_eq!(timer.started_at, None);
    }

    #[test]
    fn test_counters_reset() {
        let mut counters = SessionCounters::new();
        counters.reps_in_set = 4;
        counters.errors_total = 2;
        counters.current_set = 3;
        counters.results_log.push(RepOutcome::Success);
        counters.results_log.push(RepOutcome::Error);
        assert_eq!(counters.total_successes(), 1);

        counters.reset();
        assert_eq!(counters, SessionCounters::new());
    }
}
