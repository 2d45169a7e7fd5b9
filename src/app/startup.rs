use super::{ComponentState, RepcountOrchestrator};
use crate::error::Result;
use crate::keyboard_input::KeyboardInputHandler;
use crate::transport::{open_sink, TransportForwarder};
use tracing::{error, info};

impl RepcountOrchestrator {
    /// Register the components this session will run
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing repcount components");

        let mut states = self.component_states.lock().await;
        states.insert("transport".to_string(), ComponentState::Stopped);

        // Only register keyboard component if enabled
        if self.keyboard_enabled {
            states.insert("keyboard".to_string(), ComponentState::Stopped);
        }

        drop(states);

        info!("All components initialized successfully");
        Ok(())
    }

    /// Start the transport forwarder and, if enabled, the keyboard handler
    pub async fn start(&mut self) -> Result<()> {
        info!(
            "Starting session for '{}'",
            self.controller.config().exercise_name
        );

        self.set_component_state("transport", ComponentState::Starting)
            .await;
        let sink = match self.sink.take() {
            Some(sink) => sink,
            None => open_sink(&self.config.transport),
        };
        let forwarder =
            TransportForwarder::new(sink, &self.event_bus, self.cancellation_token.child_token());
        self.transport_stats = Some(forwarder.stats());
        self.forwarder_handle = Some(forwarder.spawn());
        self.set_component_state("transport", ComponentState::Running)
            .await;

        if self.keyboard_enabled {
            self.set_component_state("keyboard", ComponentState::Starting)
                .await;

            let (handler, commands) = KeyboardInputHandler::new();
            handler.start().await.map_err(|e| {
                error!("Failed to start keyboard handler: {}", e);
                e
            })?;
            self.keyboard_handler = Some(handler);
            self.operator_commands = Some(commands);

            self.set_component_state("keyboard", ComponentState::Running)
                .await;
            info!("Keyboard controls active: 'l' resets, 't' terminates");
        }

        info!("Repcount session started");
        Ok(())
    }
}
