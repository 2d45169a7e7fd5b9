use thiserror::Error;

/// Errors raised while building and running a session
#[derive(Error, Debug)]
pub enum RepcountError {
    #[error("Session configuration error: {0}")]
    Session(#[from] SessionConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl RepcountError {
    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Rejected session parameters. Raised before the first frame, never mid-run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionConfigError {
    #[error("reps_per_set must be greater than 0")]
    ZeroRepsPerSet,

    #[error("sets_total must be greater than 0")]
    ZeroSetsTotal,

    #[error("smoothing_window must be at least 1")]
    ZeroSmoothingWindow,

    #[error("sync tolerance must be a non-negative number of seconds, got {0}")]
    InvalidSyncTolerance(f64),

    #[error("{name} offset must be finite, got {value}")]
    NonFiniteOffset { name: &'static str, value: f64 },
}

#[derive(Error, Debug)]
pub enum PresetError {
    #[error("Failed to read preset file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed preset on line {line}: {details}")]
    MalformedLine { line: usize, details: String },

    #[error("Unknown exercise preset: {0}")]
    UnknownPreset(String),

    #[error("No exercise presets defined in {0}")]
    Empty(String),
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to open {device}: {source}")]
    Open {
        device: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to configure {device}: {details}")]
    Configure { device: String, details: String },

    #[error("Failed to write command {command}: {details}")]
    Write { command: char, details: String },
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event channel closed")]
    ChannelClosed,
}

#[derive(Error, Debug)]
pub enum InputError {
    #[error("Failed to open pose source {source_name}: {source}")]
    Open {
        source_name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read from pose source: {0}")]
    Read(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RepcountError>;
