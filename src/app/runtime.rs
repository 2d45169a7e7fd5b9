use super::{RepcountOrchestrator, SessionOutcome, ShutdownReason};
use crate::error::Result;
use crate::events::SessionEvent;
use crate::frame::PoseObservation;
use crate::keyboard_input::OperatorCommand;
use crate::pose_source::{observation_time, PoseSource};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

impl RepcountOrchestrator {
    /// Run the session until it finishes, the input ends, the operator
    /// terminates it, or a signal arrives
    pub async fn run(&mut self, mut source: PoseSource) -> Result<SessionOutcome> {
        info!("Repcount is running, reading poses from {}", source.name());

        let mut ticker =
            tokio::time::interval(Duration::from_millis(self.config.session.tick_interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let signal = shutdown_signal();
        tokio::pin!(signal);

        let mut operator_commands = self.operator_commands.take();

        let reason = loop {
            if self.controller.is_finished() {
                break ShutdownReason::SessionFinished;
            }

            tokio::select! {
                reason = &mut signal => break reason,
                Some(command) = next_command(&mut operator_commands) => match command {
                    OperatorCommand::Reset => {
                        let event = self.controller.manual_reset(self.clock.now());
                        self.publish(vec![event]);
                    }
                    OperatorCommand::Terminate => break ShutdownReason::Operator,
                },
                line = source.next_observation() => match line {
                    Ok(Some(observation)) => self.handle_observation(&observation),
                    Ok(None) => break ShutdownReason::InputExhausted,
                    Err(e) => {
                        error!("Pose input failed: {}", e);
                        break ShutdownReason::InputExhausted;
                    }
                },
                _ = ticker.tick() => {
                    let events = self.controller.tick(self.clock.now());
                    self.publish(events);
                }
            }
        };

        info!("Shutdown initiated: {:?}", reason);
        if source.malformed_lines() > 0 {
            warn!(
                "{} unreadable pose records were treated as gaps",
                source.malformed_lines()
            );
        }

        self.shutdown(reason).await
    }

    fn handle_observation(&mut self, observation: &PoseObservation) {
        let now = observation_time(observation, self.config.input.timestamps, &mut self.clock);
        let events = match observation.to_sample(now) {
            Some(sample) => self.controller.update(&sample),
            None => self.controller.skip_frame(now),
        };
        self.publish(events);
    }

    /// Publish in order; the controller's state is already final
    fn publish(&self, events: Vec<SessionEvent>) {
        for event in events {
            if let Err(e) = self.event_bus.publish(event) {
                debug!("Event not delivered: {}", e);
            }
        }
    }
}

async fn next_command(
    commands: &mut Option<mpsc::Receiver<OperatorCommand>>,
) -> Option<OperatorCommand> {
    match commands {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

/// Resolves on Ctrl+C, or SIGTERM on Unix
async fn shutdown_signal() -> ShutdownReason {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT signal (Ctrl+C)"),
            Err(e) => {
                warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM signal");
            }
            Err(e) => {
                warn!("Failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => ShutdownReason::Signal("SIGINT".to_string()),
        _ = terminate => ShutdownReason::Signal("SIGTERM".to_string()),
    }
}
