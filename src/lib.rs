pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod frame;
pub mod keyboard_input;
pub mod pose_source;
pub mod presets;
pub mod report;
pub mod session;
pub mod tracker;
pub mod transport;

pub use app::{ComponentState, RepcountOrchestrator, SessionOutcome, ShutdownReason};
pub use config::{RepcountConfig, TimestampMode};
pub use error::{RepcountError, Result};
pub use events::{EventBus, EventFilter, EventReceiver, HardwareCommand, SessionEvent};
pub use frame::{FrameSample, PoseObservation, Side};
pub use keyboard_input::{KeyboardInputHandler, OperatorCommand};
pub use pose_source::PoseSource;
pub use presets::{ExercisePreset, PresetCatalog, PresetOverrides};
pub use report::SessionReport;
pub use session::{
    FormErrorCause, RepOutcome, RepState, SessionConfig, SessionController, SessionPhase,
    SessionSnapshot,
};
pub use tracker::{Region, SmoothingBuffer, SyncTracker, Thresholds};
pub use transport::{
    CommandSink, MockCommandSink, NullCommandSink, SerialCommandSink, TransportForwarder,
    TransportStats,
};
