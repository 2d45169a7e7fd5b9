use super::Thresholds;
use serde::{Deserialize, Serialize};

/// Vertical band a tracked joint currently occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    /// Above the green (upper) line: y < upper_bound
    AboveGreen,
    /// Below the red (lower) line: y > lower_bound
    BelowRed,
    /// Anywhere else, including exactly on either line
    Between,
}

impl Region {
    /// Regions that take part in counting and synchronization
    pub fn is_monitored(&self) -> bool {
        !matches!(self, Region::Between)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Region::AboveGreen => "above_green",
            Region::BelowRed => "below_red",
            Region::Between => "between",
        }
    }
}

/// Classify a joint height against the current thresholds.
///
/// The upper bound is checked first, so with an inverted configuration a
/// joint that satisfies both comparisons is `AboveGreen`.
pub fn classify(y: f64, thresholds: &Thresholds) -> Region {
    if y < thresholds.upper_bound {
        Region::AboveGreen
    } else if y > thresholds.lower_bound {
        Region::BelowRed
    } else {
        Region::Between
    }
}
