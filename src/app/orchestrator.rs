use super::types::ComponentState;
use crate::config::RepcountConfig;
use crate::error::Result;
use crate::events::EventBus;
use crate::keyboard_input::{KeyboardInputHandler, OperatorCommand};
use crate::session::{SessionClock, SessionConfig, SessionController};
use crate::transport::{CommandSink, TransportStats};
use parking_lot::Mutex as StatsMutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Runs one exercise session: pose input in, events out to the bus, the
/// transport and the report
pub struct RepcountOrchestrator {
    pub(super) config: RepcountConfig,
    pub(super) event_bus: Arc<EventBus>,
    pub(super) controller: SessionController,
    pub(super) clock: SessionClock,

    // Components
    pub(super) sink: Option<Box<dyn CommandSink>>,
    pub(super) forwarder_handle: Option<JoinHandle<()>>,
    pub(super) transport_stats: Option<Arc<StatsMutex<TransportStats>>>,
    pub(super) keyboard_handler: Option<KeyboardInputHandler>,
    pub(super) keyboard_enabled: bool,
    pub(super) operator_commands: Option<mpsc::Receiver<OperatorCommand>>,

    // Lifecycle management
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    pub(super) cancellation_token: CancellationToken,
}

impl RepcountOrchestrator {
    /// Create an orchestrator for one session
    pub fn new(config: RepcountConfig, session_config: SessionConfig) -> Result<Self> {
        let controller = SessionController::new(session_config)?;
        let event_bus = Arc::new(EventBus::new(config.system.event_bus_capacity));

        Ok(Self {
            config,
            event_bus,
            controller,
            clock: SessionClock::new(),
            sink: None,
            forwarder_handle: None,
            transport_stats: None,
            keyboard_handler: None,
            keyboard_enabled: false,
            operator_commands: None,
            component_states: Arc::new(Mutex::new(HashMap::new())),
            cancellation_token: CancellationToken::new(),
        })
    }

    /// Enable or disable the keyboard input handler
    pub fn set_keyboard_enabled(&mut self, enabled: bool) {
        self.keyboard_enabled = enabled;
    }

    /// Use this sink instead of the one described by the transport configuration
    pub fn with_command_sink(mut self, sink: Box<dyn CommandSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Take operator commands from another source than the keyboard
    pub fn attach_operator_commands(&mut self, commands: mpsc::Receiver<OperatorCommand>) {
        self.operator_commands = Some(commands);
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// Current transport counters, once the forwarder has started
    pub fn transport_stats(&self) -> Option<TransportStats> {
        self.transport_stats
            .as_ref()
            .map(|stats| stats.lock().clone())
    }
}
