//! Per-frame signal processing ahead of the repetition state machine.
//!
//! Shoulder heights are smoothed into a moving baseline, the baseline is
//! turned into upper/lower thresholds, each elbow is classified into a
//! [`Region`], and the [`SyncTracker`] remembers when each side entered a
//! monitored region.

mod region;
mod smoothing;
mod sync;
mod thresholds;

pub use region::{classify, Region};
pub use smoothing::SmoothingBuffer;
pub use sync::{SideMemory, SyncTracker};
pub use thresholds::Thresholds;
