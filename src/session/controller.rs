use super::machine::{RepState, RepetitionMachine, Transition};
use super::types::{
    RepOutcome, RestTimer, SessionConfig, SessionCounters, SessionPhase, SessionSnapshot,
};
use crate::error::SessionConfigError;
use crate::events::SessionEvent;
use crate::frame::{FrameSample, Side};
use crate::tracker::{classify, Region, SmoothingBuffer, SyncTracker, Thresholds};
use tracing::{debug, info, warn};

/// Per-frame diagnostics kept for overlays and logs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameDiagnostics {
    pub thresholds: Thresholds,
    pub left_region: Region,
    pub right_region: Region,
}

/// Owns all mutable state of one exercise session and drives it one frame or
/// one timer tick at a time.
///
/// Every drive call returns the events it produced, in order. Nothing here
/// performs I/O; the caller forwards hardware commands and renders output.
#[derive(Debug, Clone)]
pub struct SessionController {
    config: SessionConfig,
    smoothing: SmoothingBuffer,
    sync: SyncTracker,
    machine: RepetitionMachine,
    counters: SessionCounters,
    rest: RestTimer,
    completed_at: Option<f64>,
    finished: bool,
    last_frame: Option<FrameDiagnostics>,
    inverted_warned: bool,
    frames_processed: u64,
    skipped_frames: u64,
}

impl SessionController {
    /// Start a session, rejecting invalid parameters up front
    pub fn new(config: SessionConfig) -> Result<Self, SessionConfigError> {
        config.validate()?;

        info!(
            "Starting session '{}': {} sets of {} reps, {}s rest, offsets green {:+.3} red {:+.3}",
            config.exercise_name,
            config.sets_total,
            config.reps_per_set,
            config.rest_seconds,
            config.green_offset,
            config.red_offset
        );

        Ok(Self {
            smoothing: SmoothingBuffer::new(config.smoothing_window),
            sync: SyncTracker::new(config.sync_tolerance_seconds),
            machine: RepetitionMachine::new(),
            counters: SessionCounters::new(),
            rest: RestTimer::default(),
            completed_at: None,
            finished: false,
            last_frame: None,
            inverted_warned: false,
            frames_processed: 0,
            skipped_frames: 0,
            config,
        })
    }

    /// Process one pose sample, then advance the timers to its timestamp.
    ///
    /// Samples with non-finite values are observation gaps: they are counted
    /// and skipped, and only the timers advance.
    pub fn update(&mut self, sample: &FrameSample) -> Vec<SessionEvent> {
        if !sample.is_valid() {
            return self.skip_frame(sample.timestamp);
        }

        let now = sample.timestamp;
        let mut events = Vec::new();

        if self.phase() == SessionPhase::Active {
            self.evaluate_frame(sample, &mut events);
        }

        self.advance_timers(now, &mut events);
        events
    }

    /// Record a frame without a usable observation and advance the timers
    pub fn skip_frame(&mut self, now: f64) -> Vec<SessionEvent> {
        self.skipped_frames += 1;
        debug!("Skipping frame without a valid pose observation");

        if now.is_finite() {
            self.tick(now)
        } else {
            Vec::new()
        }
    }

    /// Advance the rest timer and the completion delay without a new frame
    pub fn tick(&mut self, now: f64) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        self.advance_timers(now, &mut events);
        events
    }

    /// Operator reset: clears counters, the results log, synchronization
    /// memory, and any rest or completion state. Configuration is kept.
    pub fn manual_reset(&mut self, now: f64) -> SessionEvent {
        info!(
            "Manual reset (had {} errors, {} log entries)",
            self.counters.errors_total,
            self.counters.results_log.len()
        );

        self.counters.reset();
        self.machine.reset();
        self.sync.clear();
        self.rest.stop();
        self.completed_at = None;
        self.finished = false;

        SessionEvent::ManualReset { timestamp: now }
    }

    fn evaluate_frame(&mut self, sample: &FrameSample, events: &mut Vec<SessionEvent>) {
        let now = sample.timestamp;
        self.frames_processed += 1;

        let smoothed = self.smoothing.update(sample.shoulder_height());
        let thresholds =
            Thresholds::compute(smoothed, self.config.green_offset, self.config.red_offset);

        if thresholds.is_inverted() && !self.inverted_warned {
            warn!(
                "Green line ({:.3}) is below the red line ({:.3}); check the exercise offsets",
                thresholds.upper_bound, thresholds.lower_bound
            );
            self.inverted_warned = true;
        }

        let left_region = classify(sample.elbow_y(Side::Left), &thresholds);
        let right_region = classify(sample.elbow_y(Side::Right), &thresholds);

        self.sync.observe(Side::Left, left_region, now);
        self.sync.observe(Side::Right, right_region, now);

        debug!(
            "State: {}, regions left: {}, right: {}",
            self.machine.state().label(),
            left_region.label(),
            right_region.label()
        );

        self.last_frame = Some(FrameDiagnostics {
            thresholds,
            left_region,
            right_region,
        });

        match self.machine.evaluate(left_region, right_region, &self.sync) {
            Some(Transition::Lowered) => {
                debug!("Arms lowered, ready to raise");
            }
            Some(Transition::RepCompleted) => {
                self.counters.reps_in_set += 1;
                self.counters.results_log.push(RepOutcome::Success);
                events.push(SessionEvent::RepSuccess {
                    set: self.counters.current_set,
                    reps_in_set: self.counters.reps_in_set,
                    timestamp: now,
                });
            }
            Some(Transition::FormError(cause)) => {
                self.counters.errors_total += 1;
                self.counters.results_log.push(RepOutcome::Error);
                events.push(SessionEvent::RepError {
                    cause,
                    errors_total: self.counters.errors_total,
                    timestamp: now,
                });
            }
            None => {}
        }

        if self.counters.reps_in_set >= self.config.reps_per_set {
            info!(
                "Set {} complete, resting for {}s",
                self.counters.current_set, self.config.rest_seconds
            );
            self.rest.start(now);
            events.push(SessionEvent::SetComplete {
                set: self.counters.current_set,
                rest_seconds: self.config.rest_seconds,
                timestamp: now,
            });
        }
    }

    fn advance_timers(&mut self, now: f64, events: &mut Vec<SessionEvent>) {
        if self.rest.has_expired(now, self.config.rest_seconds) {
            self.rest.stop();
            self.counters.reps_in_set = 0;
            self.counters.current_set += 1;
            self.machine.reset();

            if self.counters.current_set > self.config.sets_total {
                info!("All {} sets done", self.config.sets_total);
                self.completed_at = Some(now);
                events.push(SessionEvent::SessionComplete {
                    sets_total: self.config.sets_total,
                    errors_total: self.counters.errors_total,
                    timestamp: now,
                });
            } else {
                info!("Rest over, starting set {}", self.counters.current_set);
            }
        }

        if let Some(completed_at) = self.completed_at {
            if !self.finished && now - completed_at >= self.config.completion_display_seconds {
                debug!("Completion display interval elapsed");
                self.finished = true;
            }
        }
    }

    pub fn phase(&self) -> SessionPhase {
        if self.finished {
            SessionPhase::Finished
        } else if self.completed_at.is_some() {
            SessionPhase::Completed
        } else if self.rest.active {
            SessionPhase::Resting
        } else {
            SessionPhase::Active
        }
    }

    /// True once the completion display interval has elapsed
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn counters(&self) -> &SessionCounters {
        &self.counters
    }

    pub fn rep_state(&self) -> RepState {
        self.machine.state()
    }

    pub fn error_already_counted(&self) -> bool {
        self.machine.error_already_counted()
    }

    pub fn sync_tracker(&self) -> &SyncTracker {
        &self.sync
    }

    pub fn rest_timer(&self) -> &RestTimer {
        &self.rest
    }

    /// Whole seconds of rest left, while resting
    pub fn rest_remaining(&self, now: f64) -> Option<u32> {
        self.rest.remaining_seconds(now, self.config.rest_seconds)
    }

    /// Thresholds and regions computed for the latest evaluated frame
    pub fn last_frame(&self) -> Option<&FrameDiagnostics> {
        self.last_frame.as_ref()
    }

    /// Sets whose repetition target was reached, including one still resting
    pub fn sets_completed(&self) -> u32 {
        if self.rest.active {
            self.counters.current_set
        } else {
            self.counters.current_set.saturating_sub(1)
        }
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn skipped_frames(&self) -> u64 {
        self.skipped_frames
    }

    /// Read-only view for the reporting collaborator
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            exercise_name: self.config.exercise_name.clone(),
            reps_per_set: self.config.reps_per_set,
            sets_total: self.config.sets_total,
            rest_seconds: self.config.rest_seconds,
            green_offset: self.config.green_offset,
            red_offset: self.config.red_offset,
            reps_in_set: self.counters.reps_in_set,
            errors_total: self.counters.errors_total,
            results_log: self.counters.results_log.clone(),
        }
    }
}
