use serde::{Deserialize, Serialize};

/// Upper and lower motion thresholds derived from the smoothed shoulder height.
///
/// `upper_bound` is numerically smaller than `lower_bound` in a sane
/// configuration because smaller y means higher on screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub upper_bound: f64,
    pub lower_bound: f64,
}

impl Thresholds {
    /// Derive both bounds from the smoothed baseline, clamped to the frame `[0, 1]`.
    ///
    /// An inverted pair (`upper_bound > lower_bound`) is returned as is.
    pub fn compute(smoothed_height: f64, green_offset: f64, red_offset: f64) -> Self {
        Self {
            upper_bound: (smoothed_height + green_offset).clamp(0.0, 1.0),
            lower_bound: (smoothed_height + red_offset).clamp(0.0, 1.0),
        }
    }

    /// True when the upper (green) line sits below the lower (red) line on screen
    pub fn is_inverted(&self) -> bool {
        self.upper_bound > self.lower_bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_applied_to_baseline() {
        let thresholds = Thresholds::compute(0.4, -0.15, 0.05);
        assert!((thresholds.upper_bound - 0.25).abs() < 1e-12);
        assert!((thresholds.lower_bound - 0.45).abs() < 1e-12);
        assert!(!thresholds.is_inverted());
    }

    #[test]
    fn test_bounds_are_clamped() {
        let thresholds = Thresholds::compute(0.1, -0.3, 1.2);
        assert_eq!(thresholds.upper_bound, 0.0);
        assert_eq!(thresholds.lower_bound, 1.0);
    }

    #[test]
    fn test_inverted_configuration_is_not_corrected() {
        let thresholds = Thresholds::compute(0.5, 0.2, -0.2);
        assert!(thresholds.is_inverted());
        assert!((thresholds.upper_bound - 0.7).abs() < 1e-12);
        assert!((thresholds.lower_bound - 0.3).abs() < 1e-12);
    }
}
