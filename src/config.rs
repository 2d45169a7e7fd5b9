use crate::session::{
    SessionConfig, DEFAULT_COMPLETION_DISPLAY_SECONDS, DEFAULT_SMOOTHING_WINDOW,
    DEFAULT_SYNC_TOLERANCE_SECONDS,
};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Baud rates the serial transport knows how to configure
pub const SUPPORTED_BAUD_RATES: &[u32] = &[
    1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200, 230400,
];

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RepcountConfig {
    pub session: SessionSettings,
    pub exercise: ExerciseSettings,
    pub transport: TransportConfig,
    pub input: InputConfig,
    pub report: ReportConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionSettings {
    /// Number of shoulder samples averaged for the baseline
    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: usize,

    /// Maximum gap between the two arms entering a region
    #[serde(default = "default_sync_tolerance")]
    pub sync_tolerance_seconds: f64,

    /// How long the completion message stays up before the session ends
    #[serde(default = "default_completion_display")]
    pub completion_display_seconds: f64,

    /// Timer tick period while no frames arrive
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExerciseSettings {
    /// Semicolon-separated exercise presets
    #[serde(default = "default_presets_file")]
    pub presets_file: String,

    /// Preset name; the first preset in the file when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TransportConfig {
    /// Forward hardware commands to the microcontroller
    #[serde(default = "default_transport_enabled")]
    pub enabled: bool,

    /// Serial device path
    #[serde(default = "default_transport_device")]
    pub device: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct InputConfig {
    /// Pose observation source, `-` for stdin
    #[serde(default = "default_input_source")]
    pub source: String,

    #[serde(default)]
    pub timestamps: TimestampMode,
}

/// Where frame timestamps come from
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimestampMode {
    /// Session clock at the moment the line is read
    #[default]
    Arrival,
    /// The `timestamp` field of each record
    Source,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReportConfig {
    /// Write a JSON report when the session ends
    #[serde(default = "default_report_enabled")]
    pub enabled: bool,

    /// Directory for report files
    #[serde(default = "default_report_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl RepcountConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("repcount.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("session.smoothing_window", default_smoothing_window() as i64)?
            .set_default("session.sync_tolerance_seconds", default_sync_tolerance())?
            .set_default(
                "session.completion_display_seconds",
                default_completion_display(),
            )?
            .set_default("session.tick_interval_ms", default_tick_interval_ms() as i64)?
            .set_default("exercise.presets_file", default_presets_file())?
            .set_default("transport.enabled", default_transport_enabled())?
            .set_default("transport.device", default_transport_device())?
            .set_default("transport.baud_rate", default_baud_rate() as i64)?
            .set_default("input.source", default_input_source())?
            .set_default("input.timestamps", "arrival")?
            .set_default("report.enabled", default_report_enabled())?
            .set_default("report.path", default_report_path())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .add_source(File::with_name(&path_str).required(false))
            // REPCOUNT_TRANSPORT__DEVICE=/dev/ttyACM0; keys contain underscores
            .add_source(
                Environment::with_prefix("REPCOUNT")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: RepcountConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.smoothing_window == 0 {
            return Err(ConfigError::Message(
                "Session smoothing_window must be greater than 0".to_string(),
            ));
        }

        if !self.session.sync_tolerance_seconds.is_finite()
            || self.session.sync_tolerance_seconds < 0.0
        {
            return Err(ConfigError::Message(
                "Session sync_tolerance_seconds must be a non-negative number".to_string(),
            ));
        }

        if !self.session.completion_display_seconds.is_finite()
            || self.session.completion_display_seconds < 0.0
        {
            return Err(ConfigError::Message(
                "Session completion_display_seconds must be a non-negative number".to_string(),
            ));
        }

        if self.session.tick_interval_ms == 0 {
            return Err(ConfigError::Message(
                "Session tick_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.exercise.presets_file.trim().is_empty() {
            return Err(ConfigError::Message(
                "Exercise presets_file must not be empty".to_string(),
            ));
        }

        if self.transport.enabled && !SUPPORTED_BAUD_RATES.contains(&self.transport.baud_rate) {
            return Err(ConfigError::Message(format!(
                "Unsupported transport baud_rate {} (supported: {:?})",
                self.transport.baud_rate, SUPPORTED_BAUD_RATES
            )));
        }

        if self.input.source.trim().is_empty() {
            return Err(ConfigError::Message(
                "Input source must not be empty".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl SessionSettings {
    /// Apply the tuning values to a session built from a preset
    pub fn apply(&self, config: SessionConfig) -> SessionConfig {
        config
            .with_smoothing_window(self.smoothing_window)
            .with_sync_tolerance(self.sync_tolerance_seconds)
            .with_completion_display(self.completion_display_seconds)
    }
}

impl Default for RepcountConfig {
    fn default() -> Self {
        Self {
            session: SessionSettings {
                smoothing_window: default_smoothing_window(),
                sync_tolerance_seconds: default_sync_tolerance(),
                completion_display_seconds: default_completion_display(),
                tick_interval_ms: default_tick_interval_ms(),
            },
            exercise: ExerciseSettings {
                presets_file: default_presets_file(),
                preset: None,
            },
            transport: TransportConfig {
                enabled: default_transport_enabled(),
                device: default_transport_device(),
                baud_rate: default_baud_rate(),
            },
            input: InputConfig {
                source: default_input_source(),
                timestamps: TimestampMode::default(),
            },
            report: ReportConfig {
                enabled: default_report_enabled(),
                path: default_report_path(),
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
            },
        }
    }
}

// Default value functions
fn default_smoothing_window() -> usize {
    DEFAULT_SMOOTHING_WINDOW
}
fn default_sync_tolerance() -> f64 {
    DEFAULT_SYNC_TOLERANCE_SECONDS
}
fn default_completion_display() -> f64 {
    DEFAULT_COMPLETION_DISPLAY_SECONDS
}
fn default_tick_interval_ms() -> u64 {
    100
}

fn default_presets_file() -> String {
    "exercises.txt".to_string()
}

fn default_transport_enabled() -> bool {
    true
}
fn default_transport_device() -> String {
    "/dev/ttyUSB0".to_string()
}
fn default_baud_rate() -> u32 {
    9600
}

fn default_input_source() -> String {
    "-".to_string()
}

fn default_report_enabled() -> bool {
    true
}
fn default_report_path() -> String {
    "./reports".to_string()
}

fn default_event_bus_capacity() -> usize {
    64
}
