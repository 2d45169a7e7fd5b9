use std::time::Instant;

/// Session clock in seconds.
///
/// Anchored to the most recent sample timestamp so that timer ticks and
/// sample timestamps share one time base.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    anchor_instant: Instant,
    anchor_seconds: f64,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            anchor_instant: Instant::now(),
            anchor_seconds: 0.0,
        }
    }

    /// Current session time
    pub fn now(&self) -> f64 {
        self.anchor_seconds + self.anchor_instant.elapsed().as_secs_f64()
    }

    /// Re-anchor to a timestamp supplied by the pose source.
    ///
    /// The source is the time base once it supplies timestamps: the clock
    /// follows it in either direction and only extrapolates between records.
    pub fn anchor(&mut self, timestamp: f64) {
        if timestamp.is_finite() {
            self.anchor_instant = Instant::now();
            self.anchor_seconds = timestamp;
        }
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_monotonic() {
        let clock = SessionClock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(first >= 0.0);
        assert!(second >= first);
    }

    #[test]
    fn test_anchor_follows_source() {
        let mut clock = SessionClock::new();
        clock.anchor(100.0);
        assert!(clock.now() >= 100.0);

        // A recording that starts behind the wall clock pulls it back
        clock.anchor(0.5);
        let now = clock.now();
        assert!(now >= 0.5 && now < 1.5);

        clock.anchor(f64::NAN);
        assert!(clock.now() < 1.5);
    }
}
