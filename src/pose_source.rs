use crate::config::TimestampMode;
use crate::error::InputError;
use crate::frame::PoseObservation;
use crate::session::SessionClock;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tracing::{debug, info, warn};

type BoxedReader = Box<dyn AsyncRead + Unpin + Send>;

/// Line-delimited JSON pose observations from a file or stdin
pub struct PoseSource {
    name: String,
    lines: Lines<BufReader<BoxedReader>>,
    line_number: usize,
    malformed_lines: u64,
}

impl PoseSource {
    /// Open `source`, where `-` means stdin
    pub async fn open(source: &str) -> Result<Self, InputError> {
        if source == "-" {
            info!("Reading pose observations from stdin");
            return Ok(Self::from_reader("stdin", tokio::io::stdin()));
        }

        let file = tokio::fs::File::open(source)
            .await
            .map_err(|e| InputError::Open {
                source_name: source.to_string(),
                source: e,
            })?;
        info!("Reading pose observations from {}", source);
        Ok(Self::from_reader(source, file))
    }

    pub fn from_reader<R>(name: &str, reader: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let reader: BoxedReader = Box::new(reader);
        Self {
            name: name.to_string(),
            lines: BufReader::new(reader).lines(),
            line_number: 0,
            malformed_lines: 0,
        }
    }

    /// Next observation, or `None` at end of input.
    ///
    /// Blank lines are skipped. A line that is not a valid record comes back
    /// as an empty observation so the caller treats it as a gap.
    /// Cancel safe: no line is lost if the future is dropped.
    pub async fn next_observation(&mut self) -> Result<Option<PoseObservation>, InputError> {
        loop {
            let Some(line) = self.lines.next_line().await? else {
                debug!("End of pose input from {}", self.name);
                return Ok(None);
            };
            self.line_number += 1;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            return match serde_json::from_str::<PoseObservation>(line) {
                Ok(observation) => Ok(Some(observation)),
                Err(e) => {
                    self.malformed_lines += 1;
                    warn!(
                        "Unreadable pose record on line {} of {}: {}",
                        self.line_number, self.name, e
                    );
                    Ok(Some(PoseObservation::default()))
                }
            };
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn malformed_lines(&self) -> u64 {
        self.malformed_lines
    }
}

/// Session time for an observation.
///
/// `Source` mode re-anchors the clock on the record's timestamp, so timer
/// ticks read the same time base as the samples. Records without one, and
/// every record in `Arrival` mode, take the clock's reading.
pub fn observation_time(
    observation: &PoseObservation,
    mode: TimestampMode,
    clock: &mut SessionClock,
) -> f64 {
    match (mode, observation.timestamp) {
        (TimestampMode::Source, Some(timestamp)) if timestamp.is_finite() => {
            clock.anchor(timestamp);
            timestamp
        }
        _ => clock.now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const RECORDS: &str = r#"{"timestamp": 0.0, "left_shoulder_y": 0.4, "right_shoulder_y": 0.4, "left_elbow_y": 0.7, "right_elbow_y": 0.7}

not json
{"timestamp": 0.5, "left_shoulder_y": 0.4, "right_shoulder_y": 0.4}
"#;

    #[tokio::test]
    async fn test_reads_records_and_gaps() {
        let mut source = PoseSource::from_reader("test", RECORDS.as_bytes());

        let first = source.next_observation().await.unwrap().unwrap();
        assert!(first.to_sample(0.0).is_some());

        let unreadable = source.next_observation().await.unwrap().unwrap();
        assert_eq!(unreadable, PoseObservation::default());
        assert_eq!(source.malformed_lines(), 1);

        let partial = source.next_observation().await.unwrap().unwrap();
        assert_eq!(partial.timestamp, Some(0.5));
        assert!(partial.to_sample(0.5).is_none());

        assert!(source.next_observation().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", RECORDS).unwrap();

        let mut source = PoseSource::open(&file.path().display().to_string())
            .await
            .unwrap();
        assert!(source.next_observation().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poses.jsonl");
        assert!(matches!(
            PoseSource::open(&path.display().to_string()).await,
            Err(InputError::Open { .. })
        ));
    }

    #[test]
    fn test_observation_time_modes() {
        let mut clock = SessionClock::new();
        let observation = PoseObservation {
            timestamp: Some(42.0),
            ..Default::default()
        };

        assert_eq!(
            observation_time(&observation, TimestampMode::Source, &mut clock),
            42.0
        );
        assert!(clock.now() >= 42.0);

        let arrival = observation_time(&observation, TimestampMode::Arrival, &mut clock);
        assert!(arrival >= 42.0);

        let untimed = PoseObservation::default();
        assert!(observation_time(&untimed, TimestampMode::Source, &mut clock) >= 42.0);
    }

    fn pose(elbow: f64, timestamp: f64) -> PoseObservation {
        PoseObservation {
            timestamp: Some(timestamp),
            left_shoulder_y: Some(0.4),
            right_shoulder_y: Some(0.4),
            left_elbow_y: Some(elbow),
            right_elbow_y: Some(elbow),
        }
    }

    #[test]
    fn test_source_time_drives_rest_timer() {
        use crate::session::{SessionConfig, SessionController, SessionPhase};

        let config = SessionConfig::new("Lateral raise", 1, 2, 2, -0.15, 0.05);
        let mut controller = SessionController::new(config).unwrap();

        // Clock running well ahead of a recording that starts at zero
        let mut clock = SessionClock::new();
        clock.anchor(100.0);

        for observation in [pose(0.70, 0.0), pose(0.10, 0.5)] {
            let now = observation_time(&observation, TimestampMode::Source, &mut clock);
            controller.update(&observation.to_sample(now).unwrap());
        }
        assert_eq!(controller.phase(), SessionPhase::Resting);

        assert!(controller.tick(clock.now()).is_empty());
        assert_eq!(controller.phase(), SessionPhase::Resting);
        assert_eq!(controller.counters().current_set, 1);

        let gap = PoseObservation {
            timestamp: Some(2.75),
            ..Default::default()
        };
        let now = observation_time(&gap, TimestampMode::Source, &mut clock);
        assert_eq!(now, 2.75);
        controller.tick(clock.now());
        assert_eq!(controller.phase(), SessionPhase::Active);
        assert_eq!(controller.counters().current_set, 2);
    }
}
