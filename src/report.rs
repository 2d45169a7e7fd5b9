use crate::error::{RepcountError, Result};
use crate::session::{RepOutcome, SessionController};
use crate::transport::TransportStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

/// End-of-session report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub exercise_name: String,
    pub reps_per_set: u32,
    pub sets_total: u32,
    pub rest_seconds: u32,
    pub green_offset: f64,
    pub red_offset: f64,
    pub reps_in_set: u32,
    pub errors_total: u32,
    pub total_successes: usize,
    pub sets_completed: u32,
    pub frames_processed: u64,
    pub skipped_frames: u64,
    pub results_log: Vec<RepOutcome>,
    /// Running success count after each logged outcome
    pub cumulative_successes: Vec<u32>,
    /// Running error count after each logged outcome
    pub cumulative_errors: Vec<u32>,
    #[serde(default)]
    pub transport: Option<TransportStats>,
}

impl SessionReport {
    /// Collect the report from the controller's read-only view
    pub fn from_controller(controller: &SessionController, transport: Option<TransportStats>) -> Self {
        let snapshot = controller.snapshot();
        let (cumulative_successes, cumulative_errors) = cumulative_series(&snapshot.results_log);

        Self {
            session_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            total_successes: cumulative_successes.last().copied().unwrap_or(0) as usize,
            sets_completed: controller.sets_completed(),
            frames_processed: controller.frames_processed(),
            skipped_frames: controller.skipped_frames(),
            exercise_name: snapshot.exercise_name,
            reps_per_set: snapshot.reps_per_set,
            sets_total: snapshot.sets_total,
            rest_seconds: snapshot.rest_seconds,
            green_offset: snapshot.green_offset,
            red_offset: snapshot.red_offset,
            reps_in_set: snapshot.reps_in_set,
            errors_total: snapshot.errors_total,
            results_log: snapshot.results_log,
            cumulative_successes,
            cumulative_errors,
            transport,
        }
    }

    /// File name used by [`SessionReport::write_json`]
    pub fn file_name(&self) -> String {
        let exercise: String = self
            .exercise_name
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        format!("report_{}_{}.json", exercise, self.generated_at.timestamp())
    }

    /// Write the report as pretty JSON into `dir`, creating it if needed
    pub async fn write_json<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let report_json = serde_json::to_string_pretty(self)?;

        let dir = dir.as_ref();
        fs::create_dir_all(dir).await.map_err(|e| {
            RepcountError::component("report", &format!("Failed to create report directory: {}", e))
        })?;

        let report_path = dir.join(self.file_name());
        fs::write(&report_path, report_json).await.map_err(|e| {
            RepcountError::component("report", &format!("Failed to write report file: {}", e))
        })?;

        info!("Session report written to {}", report_path.display());
        Ok(report_path)
    }

    /// Plain-text summary for the terminal
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Exercise: {}", self.exercise_name);
        let _ = writeln!(
            out,
            "Plan: {} sets x {} reps, {}s rest",
            self.sets_total, self.reps_per_set, self.rest_seconds
        );
        let _ = writeln!(
            out,
            "Lines: green {:+.3}, red {:+.3}",
            self.green_offset, self.red_offset
        );
        let _ = writeln!(out, "Sets completed: {}", self.sets_completed);
        let _ = writeln!(out, "Correct repetitions: {}", self.total_successes);
        let _ = writeln!(out, "Errors: {}", self.errors_total);
        let _ = write!(
            out,
            "Frames: {} evaluated, {} skipped",
            self.frames_processed, self.skipped_frames
        );
        if let Some(transport) = &self.transport {
            let _ = write!(
                out,
                "\nHardware commands: {} sent, {} failed",
                transport.sent, transport.failed
            );
            if transport.lagged > 0 {
                let _ = write!(out, ", {} events dropped before delivery", transport.lagged);
            }
        }
        debug!("Rendered summary for session {}", self.session_id);
        out
    }
}

/// Running totals after each logged outcome, the series plotted in reports
pub fn cumulative_series(log: &[RepOutcome]) -> (Vec<u32>, Vec<u32>) {
    let mut successes = 0;
    let mut errors = 0;
    log.iter()
        .map(|outcome| {
            match outcome {
                RepOutcome::Success => successes += 1,
                RepOutcome::Error => errors += 1,
            }
            (successes, errors)
        })
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameSample;
    use crate::session::SessionConfig;

    fn finished_controller() -> SessionController {
        let config = SessionConfig::new("Lateral raise", 2, 1, 0, -0.15, 0.05);
        let mut controller = SessionController::new(config).unwrap();
        let frames = [
            (0.70, 0.0),
            (0.10, 0.5),
            (0.35, 1.0),
            (0.10, 1.5),
            (0.70, 2.0),
            (0.10, 2.5),
        ];
        for (elbow, t) in frames {
            controller.update(&FrameSample::new(0.4, 0.4, elbow, elbow, t));
        }
        controller
    }

    #[test]
    fn test_cumulative_series() {
        let log = [
            RepOutcome::Success,
            RepOutcome::Error,
            RepOutcome::Success,
        ];
        let (successes, errors) = cumulative_series(&log);
        assert_eq!(successes, vec![1, 1, 2]);
        assert_eq!(errors, vec![0, 1, 1]);
        assert_eq!(cumulative_series(&[]), (vec![], vec![]));
    }

    #[test]
    fn test_report_from_controller() {
        let controller = finished_controller();
        let report = SessionReport::from_controller(&controller, None);

        assert_eq!(report.exercise_name, "Lateral raise");
        assert_eq!(
            report.results_log,
            vec![RepOutcome::Success, RepOutcome::Error, RepOutcome::Success]
        );
        assert_eq!(report.total_successes, 2);
        assert_eq!(report.errors_total, 1);
        assert_eq!(report.sets_completed, 1);
        assert_eq!(report.cumulative_errors, vec![0, 1, 1]);

        let summary = report.summary();
        assert!(summary.contains("Correct repetitions: 2"));
        assert!(summary.contains("Errors: 1"));
        assert!(!summary.contains("Hardware commands"));
    }

    #[test]
    fn test_file_name_is_sanitised() {
        let report = SessionReport::from_controller(&finished_controller(), None);
        let name = report.file_name();
        assert!(name.starts_with("report_Lateral_raise_"));
        assert!(name.ends_with(".json"));
    }

    #[tokio::test]
    async fn test_write_json_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("reports");

        let report = SessionReport::from_controller(
            &finished_controller(),
            Some(TransportStats {
                sent: 4,
                failed: 0,
                lagged: 0,
                last_error: None,
            }),
        );
        let path = report.write_json(&target).await.unwrap();
        assert!(path.starts_with(&target));

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: SessionReport = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, report);
        assert!(report.summary().contains("4 sent"));
    }
}
