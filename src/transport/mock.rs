use super::CommandSink;
use crate::error::TransportError;
use crate::events::HardwareCommand;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Sink used when no microcontroller is attached
#[derive(Debug, Default)]
pub struct NullCommandSink;

impl NullCommandSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl CommandSink for NullCommandSink {
    async fn send(&mut self, command: HardwareCommand) -> Result<(), TransportError> {
        debug!("Dropping hardware command '{}' (no transport)", command.as_char());
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}

/// Records every command it receives. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct MockCommandSink {
    sent: Arc<Mutex<Vec<HardwareCommand>>>,
    failing: Arc<AtomicBool>,
}

impl MockCommandSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Commands delivered so far, in order
    pub fn sent(&self) -> Vec<HardwareCommand> {
        self.sent.lock().clone()
    }

    /// Delivered commands as the bytes a device would have seen
    pub fn sent_bytes(&self) -> Vec<u8> {
        self.sent.lock().iter().map(|c| c.as_byte()).collect()
    }
}

#[async_trait::async_trait]
impl CommandSink for MockCommandSink {
    async fn send(&mut self, command: HardwareCommand) -> Result<(), TransportError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Write {
                command: command.as_char(),
                details: "mock sink set to fail".to_string(),
            });
        }

        self.sent.lock().push(command);
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_sink_records_and_fails() {
        let mock = MockCommandSink::new();
        let mut sink = mock.clone();

        sink.send(HardwareCommand::Success).await.unwrap();
        mock.set_failing(true);
        assert!(sink.send(HardwareCommand::Error).await.is_err());
        mock.set_failing(false);
        sink.send(HardwareCommand::Reset).await.unwrap();

        assert_eq!(mock.sent_bytes(), b"AC".to_vec());
    }

    #[tokio::test]
    async fn test_null_sink_accepts_everything() {
        let mut sink = NullCommandSink::new();
        assert!(sink.send(HardwareCommand::Error).await.is_ok());
    }
}
