use serde::{Deserialize, Serialize};

/// Left or right side of the body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn label(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

/// One pose observation per processed video frame.
///
/// Vertical coordinates are normalized to the frame height: 0 is the top of the
/// image and 1 the bottom, so a smaller value is a higher position on screen.
/// `timestamp` is in monotonic session seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSample {
    pub left_shoulder_y: f64,
    pub right_shoulder_y: f64,
    pub left_elbow_y: f64,
    pub right_elbow_y: f64,
    pub timestamp: f64,
}

impl FrameSample {
    pub fn new(
        left_shoulder_y: f64,
        right_shoulder_y: f64,
        left_elbow_y: f64,
        right_elbow_y: f64,
        timestamp: f64,
    ) -> Self {
        Self {
            left_shoulder_y,
            right_shoulder_y,
            left_elbow_y,
            right_elbow_y,
            timestamp,
        }
    }

    /// Mean height of both shoulders, the baseline the thresholds follow
    pub fn shoulder_height(&self) -> f64 {
        (self.left_shoulder_y + self.right_shoulder_y) / 2.0
    }

    pub fn elbow_y(&self, side: Side) -> f64 {
        match side {
            Side::Left => self.left_elbow_y,
            Side::Right => self.right_elbow_y,
        }
    }

    /// A sample is usable only when every coordinate and the timestamp are finite
    pub fn is_valid(&self) -> bool {
        [
            self.left_shoulder_y,
            self.right_shoulder_y,
            self.left_elbow_y,
            self.right_elbow_y,
            self.timestamp,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Raw record produced by the pose-estimation collaborator.
///
/// Any joint may be missing when the estimator lost track of it; such records
/// become observation gaps rather than samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseObservation {
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub left_shoulder_y: Option<f64>,
    #[serde(default)]
    pub right_shoulder_y: Option<f64>,
    #[serde(default)]
    pub left_elbow_y: Option<f64>,
    #[serde(default)]
    pub right_elbow_y: Option<f64>,
}

impl PoseObservation {
    /// Build a sample stamped with `timestamp`, or `None` if any joint is absent or not finite
    pub fn to_sample(&self, timestamp: f64) -> Option<FrameSample> {
        let sample = FrameSample::new(
            self.left_shoulder_y?,
            self.right_shoulder_y?,
            self.left_elbow_y?,
            self.right_elbow_y?,
            timestamp,
        );

        sample.is_valid().then_some(sample)
    }

    pub fn has_all_joints(&self) -> bool {
        self.left_shoulder_y.is_some()
            && self.right_shoulder_y.is_some()
            && self.left_elbow_y.is_some()
            && self.right_elbow_y.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shoulder_height_is_mean() {
        let sample = FrameSample::new(0.30, 0.40, 0.6, 0.6, 0.0);
        assert!((sample.shoulder_height() - 0.35).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_sample_is_invalid() {
        let sample = FrameSample::new(0.3, f64::NAN, 0.6, 0.6, 1.0);
        assert!(!sample.is_valid());

        let sample = FrameSample::new(0.3, 0.3, 0.6, 0.6, f64::INFINITY);
        assert!(!sample.is_valid());
    }

    #[test]
    fn test_observation_with_missing_joint_is_gap() {
        let observation: PoseObservation = serde_json::from_str(
            r#"{"timestamp": 1.0, "left_shoulder_y": 0.3, "right_shoulder_y": 0.3, "left_elbow_y": 0.5}"#,
        )
        .unwrap();

        assert!(!observation.has_all_joints());
        assert!(observation.to_sample(1.0).is_none());
    }

    #[test]
    fn test_observation_to_sample() {
        let observation: PoseObservation = serde_json::from_str(
            r#"{"left_shoulder_y": 0.3, "right_shoulder_y": 0.32, "left_elbow_y": 0.5, "right_elbow_y": 0.51}"#,
        )
        .unwrap();

        assert_eq!(observation.timestamp, None);
        let sample = observation.to_sample(2.5).unwrap();
        assert_eq!(sample.timestamp, 2.5);
        assert_eq!(sample.elbow_y(Side::Right), 0.51);
    }
}
