//! Delivery of one-byte hardware commands to the feedback microcontroller.
//!
//! Session events travel over the event bus; the [`TransportForwarder`] picks
//! out the ones that carry a [`HardwareCommand`] and hands them to a
//! [`CommandSink`]. Transport failures are logged and counted, never fatal.

mod forwarder;
mod mock;
mod serial;

pub use forwarder::{TransportForwarder, TransportStats};
pub use mock::{MockCommandSink, NullCommandSink};
pub use serial::SerialCommandSink;

use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::events::HardwareCommand;
use tracing::{info, warn};

/// Destination for hardware commands
#[async_trait::async_trait]
pub trait CommandSink: Send {
    /// Deliver one command byte
    async fn send(&mut self, command: HardwareCommand) -> Result<(), TransportError>;

    /// Get the name of this sink for logging
    fn name(&self) -> &str;
}

/// Build the sink described by the transport configuration.
///
/// A device that cannot be opened degrades to a [`NullCommandSink`] so the
/// session keeps counting without the microcontroller.
pub fn open_sink(config: &TransportConfig) -> Box<dyn CommandSink> {
    if !config.enabled {
        info!("Hardware transport disabled");
        return Box::new(NullCommandSink::new());
    }

    match SerialCommandSink::open(&config.device, config.baud_rate) {
        Ok(sink) => {
            info!(
                "Hardware transport connected on {} at {} baud",
                config.device, config.baud_rate
            );
            Box::new(sink)
        }
        Err(e) => {
            warn!("Continuing without hardware transport: {}", e);
            Box::new(NullCommandSink::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_transport_uses_null_sink() {
        let config = TransportConfig {
            enabled: false,
            device: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
        };
        assert_eq!(open_sink(&config).name(), "null");
    }

    #[test]
    fn test_missing_device_falls_back_to_null_sink() {
        let dir = tempfile::tempdir().unwrap();
        let config = TransportConfig {
            enabled: true,
            device: dir.path().join("ttyMISSING").display().to_string(),
            baud_rate: 9600,
        };
        assert_eq!(open_sink(&config).name(), "null");
    }
}
