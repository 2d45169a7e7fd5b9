mod orchestrator;
mod runtime;
mod shutdown;
mod startup;
mod state;
mod types;


pub use orchestrator::RepcountOrchestrator;
pub use types::{ComponentState, SessionOutcome, ShutdownReason};
