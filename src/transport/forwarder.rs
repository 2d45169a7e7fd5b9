use super::CommandSink;
use crate::events::{EventBus, EventFilter, EventReceiver, SessionEvent};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Delivery counters for the hardware transport
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportStats {
    pub sent: u64,
    pub failed: u64,
    /// Events the bus dropped before the forwarder read them; any hardware
    /// commands among them never reached the sink
    #[serde(default)]
    pub lagged: u64,
    pub last_error: Option<String>,
}

/// Forwards hardware commands from the event bus to a sink, in event order
pub struct TransportForwarder {
    sink: Box<dyn CommandSink>,
    receiver: EventReceiver,
    stats: Arc<Mutex<TransportStats>>,
    cancel: CancellationToken,
}

impl TransportForwarder {
    /// Subscribe to the bus; events published after this call are forwarded
    pub fn new(sink: Box<dyn CommandSink>, event_bus: &EventBus, cancel: CancellationToken) -> Self {
        let receiver = EventReceiver::new(
            event_bus.subscribe(),
            EventFilter::HardwareCommands,
            format!("transport:{}", sink.name()),
        );

        Self {
            sink,
            receiver,
            stats: Arc::new(Mutex::new(TransportStats::default())),
            cancel,
        }
    }

    /// Shared view of the delivery counters
    pub fn stats(&self) -> Arc<Mutex<TransportStats>> {
        Arc::clone(&self.stats)
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Forward until cancelled or the bus closes. Commands already queued at
    /// cancellation are still delivered.
    pub async fn run(mut self) {
        info!("Transport forwarder started ({})", self.sink.name());

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    self.drain().await;
                    break;
                }
                result = self.receiver.recv() => match result {
                    Ok(event) => {
                        self.record_lag();
                        self.forward(&event).await;
                    }
                    Err(e) => {
                        debug!("Transport forwarder stopping: {}", e);
                        break;
                    }
                },
            }
        }

        self.record_lag();
        let stats = self.stats.lock().clone();
        info!(
            "Transport forwarder stopped: {} sent, {} failed, {} lagged",
            stats.sent, stats.failed, stats.lagged
        );
    }

    async fn drain(&mut self) {
        while let Ok(Some(event)) = self.receiver.try_recv() {
            self.forward(&event).await;
        }
    }

    fn record_lag(&self) {
        self.stats.lock().lagged = self.receiver.lagged_events();
    }

    async fn forward(&mut self, event: &SessionEvent) {
        let Some(command) = event.hardware_command() else {
            return;
        };

        match self.sink.send(command).await {
            Ok(()) => {
                self.stats.lock().sent += 1;
            }
            Err(e) => {
                warn!("Failed to send hardware command '{}': {}", command.as_char(), e);
                let mut stats = self.stats.lock();
                stats.failed += 1;
                stats.last_error = Some(e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::HardwareCommand;
    use crate::session::FormErrorCause;
    use crate::transport::MockCommandSink;

    fn rep_success(t: f64) -> SessionEvent {
        SessionEvent::RepSuccess {
            set: 1,
            reps_in_set: 1,
            timestamp: t,
        }
    }

    #[tokio::test]
    async fn test_forwards_commands_in_order() {
        let bus = EventBus::new(16);
        let cancel = CancellationToken::new();
        let mock = MockCommandSink::new();
        let forwarder = TransportForwarder::new(Box::new(mock.clone()), &bus, cancel.clone());
        let stats = forwarder.stats();

        bus.publish(rep_success(1.0)).unwrap();
        bus.publish(SessionEvent::SetComplete {
            set: 1,
            rest_seconds: 10,
            timestamp: 1.0,
        })
        .unwrap();
        bus.publish(SessionEvent::RepError {
            cause: FormErrorCause::RaisedWithoutLowering,
            errors_total: 1,
            timestamp: 2.0,
        })
        .unwrap();
        bus.publish(SessionEvent::ManualReset { timestamp: 3.0 })
            .unwrap();

        cancel.cancel();
        forwarder.spawn().await.unwrap();

        assert_eq!(mock.sent_bytes(), b"ABC".to_vec());
        assert_eq!(stats.lock().sent, 3);
        assert_eq!(stats.lock().failed, 0);
    }

    #[tokio::test]
    async fn test_failures_are_counted_not_fatal() {
        let bus = EventBus::new(16);
        let cancel = CancellationToken::new();
        let mock = MockCommandSink::new();
        mock.set_failing(true);

        let forwarder = TransportForwarder::new(Box::new(mock.clone()), &bus, cancel.clone());
        let stats = forwarder.stats();
        let handle = forwarder.spawn();

        bus.publish(rep_success(1.0)).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        mock.set_failing(false);
        bus.publish(rep_success(2.0)).unwrap();

        cancel.cancel();
        handle.await.unwrap();

        let stats = stats.lock().clone();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.sent, 1);
        assert!(stats.last_error.is_some());
        assert_eq!(mock.sent(), vec![HardwareCommand::Success]);
    }

    #[tokio::test]
    async fn test_overrun_commands_are_counted() {
        let bus = EventBus::new(2);
        let cancel = CancellationToken::new();
        let mock = MockCommandSink::new();
        let forwarder = TransportForwarder::new(Box::new(mock.clone()), &bus, cancel.clone());
        let stats = forwarder.stats();

        for t in 1..=4 {
            bus.publish(rep_success(t as f64)).unwrap();
        }

        cancel.cancel();
        forwarder.spawn().await.unwrap();

        let stats = stats.lock().clone();
        assert_eq!(stats.sent, 2);
        assert_eq!(stats.lagged, 2);
        assert_eq!(mock.sent_bytes(), b"AA".to_vec());
    }

    #[tokio::test]
    async fn test_stops_when_bus_closes() {
        let bus = EventBus::new(4);
        let forwarder =
            TransportForwarder::new(Box::new(MockCommandSink::new()), &bus, CancellationToken::new());
        let handle = forwarder.spawn();

        drop(bus);
        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
