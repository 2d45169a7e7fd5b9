mod clock;
mod controller;
mod machine;
mod types;


pub use clock::SessionClock;
pub use controller::{FrameDiagnostics, SessionController};
pub use machine::{RepState, RepetitionMachine, Transition};
pub use types::{
    FormErrorCause, RepOutcome, RestTimer, SessionConfig, SessionCounters, SessionPhase,
    SessionSnapshot, DEFAULT_COMPLETION_DISPLAY_SECONDS, DEFAULT_SMOOTHING_WINDOW,
    DEFAULT_SYNC_TOLERANCE_SECONDS,
};
