use std::collections::VecDeque;
use tracing::trace;

/// Rolling average over the most recent shoulder-height samples
#[derive(Debug, Clone)]
pub struct SmoothingBuffer {
    samples: VecDeque<f64>,
    window: usize,
}

impl SmoothingBuffer {
    /// Create a buffer averaging over `window` samples.
    ///
    /// A zero window is rejected earlier by session validation; it is treated
    /// as a window of one here.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            samples: VecDeque::with_capacity(window + 1),
            window,
        }
    }

    /// Push a sample, evicting the oldest one once the window is full, and
    /// return the mean of the buffered samples
    pub fn update(&mut self, sample: f64) -> f64 {
        self.samples.push_back(sample);
        if self.samples.len() > self.window {
            self.samples.pop_front();
        }

        let mean = self.mean();
        trace!(
            "Smoothed shoulder height {:.4} over {} samples",
            mean,
            self.samples.len()
        );
        mean
    }

    /// Mean of the buffered samples.
    ///
    /// Accumulated as offsets from the oldest sample so a run of identical
    /// samples averages to exactly that sample.
    pub fn mean(&self) -> f64 {
        let Some(&reference) = self.samples.front() else {
            return 0.0;
        };
        let offset: f64 = self.samples.iter().map(|s| s - reference).sum();
        reference + offset / self.samples.len() as f64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_samples_return_exact_value() {
        let mut buffer = SmoothingBuffer::new(10);
        for _ in 0..10 {
            assert_eq!(buffer.update(0.37), 0.37);
        }
    }

    #[test]
    fn test_oldest_sample_is_evicted() {
        let mut buffer = SmoothingBuffer::new(3);
        buffer.update(1.0);
        buffer.update(2.0);
        buffer.update(3.0);
        assert_eq!(buffer.len(), 3);

        let mean = buffer.update(6.0);
        assert_eq!(buffer.len(), 3);
        assert!((mean - (2.0 + 3.0 + 6.0) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_partial_window_averages_what_it_has() {
        let mut buffer = SmoothingBuffer::new(10);
        buffer.update(0.2);
        let mean = buffer.update(0.4);
        assert!((mean - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_window_of_one_tracks_latest() {
        let mut buffer = SmoothingBuffer::new(1);
        buffer.update(0.1);
        assert_eq!(buffer.update(0.9), 0.9);
    }

    #[test]
    fn test_clear() {
        let mut buffer = SmoothingBuffer::new(4);
        buffer.update(0.5);
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.mean(), 0.0);
    }
}
