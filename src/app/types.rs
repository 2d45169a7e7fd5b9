use crate::report::SessionReport;
use std::path::PathBuf;

/// Component lifecycle states
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
}

/// Why the session loop ended
#[derive(Debug, Clone, PartialEq)]
pub enum ShutdownReason {
    /// All sets done and the completion display interval elapsed
    SessionFinished,
    /// Terminate command from the operator
    Operator,
    /// The pose source reached end of input
    InputExhausted,
    Signal(String),
}

/// Result of one session run
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub reason: ShutdownReason,
    pub report: SessionReport,
    /// Where the report was written, when reporting is enabled
    pub report_path: Option<PathBuf>,
}
