use crate::error::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Commands an operator can issue during a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    /// Clear counters and the results log
    Reset,
    /// End the session now
    Terminate,
}

/// Map a key to an operator command
pub fn command_for_key(code: KeyCode) -> Option<OperatorCommand> {
    match code {
        KeyCode::Char('l') | KeyCode::Char('L') => Some(OperatorCommand::Reset),
        KeyCode::Char('t') | KeyCode::Char('T') | KeyCode::Char('q') | KeyCode::Esc => {
            Some(OperatorCommand::Terminate)
        }
        _ => None,
    }
}

/// Keyboard controls for the operator
pub struct KeyboardInputHandler {
    commands: mpsc::Sender<OperatorCommand>,
    cancellation_token: CancellationToken,
}

impl KeyboardInputHandler {
    /// Create a handler and the receiving end of its command channel
    pub fn new() -> (Self, mpsc::Receiver<OperatorCommand>) {
        let (commands, receiver) = mpsc::channel(8);
        (
            Self {
                commands,
                cancellation_token: CancellationToken::new(),
            },
            receiver,
        )
    }

    /// Start listening for keyboard input
    pub async fn start(&self) -> Result<()> {
        info!("Starting keyboard input handler - press 'l' to reset, 't' to terminate");

        let commands = self.commands.clone();
        let cancellation_token = self.cancellation_token.clone();

        // Spawn a blocking task to handle keyboard input
        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            debug!("Raw mode enabled - keyboard handler active");

            loop {
                if cancellation_token.is_cancelled() {
                    debug!("Keyboard input handler stopping");
                    break;
                }

                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let Ok(Event::Key(key_event)) = event::read() else {
                            continue;
                        };
                        // Only handle key press events (not release)
                        if key_event.kind != KeyEventKind::Press {
                            continue;
                        }

                        let Some(command) = command_for_key(key_event.code) else {
                            debug!("Key pressed: {:?}", key_event.code);
                            continue;
                        };

                        info!("Operator command: {:?}", command);
                        if commands.blocking_send(command).is_err() {
                            debug!("Command receiver dropped");
                            break;
                        }
                        if command == OperatorCommand::Terminate {
                            break;
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            } else {
                debug!("Raw mode disabled");
            }

            debug!("Keyboard input handler task exited");
        });

        Ok(())
    }

    /// Stop the keyboard input handler
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping keyboard input handler");
        self.cancellation_token.cancel();

        // Give the task a moment to clean up and disable raw mode
        tokio::time::sleep(Duration::from_millis(200)).await;

        // Ensure raw mode is disabled even if the task didn't clean up properly
        let _ = disable_raw_mode();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        assert_eq!(command_for_key(KeyCode::Char('l')), Some(OperatorCommand::Reset));
        assert_eq!(
            command_for_key(KeyCode::Char('t')),
            Some(OperatorCommand::Terminate)
        );
        assert_eq!(command_for_key(KeyCode::Esc), Some(OperatorCommand::Terminate));
        assert_eq!(command_for_key(KeyCode::Char(' ')), None);
    }

    #[tokio::test]
    async fn test_keyboard_handler_stop() {
        let (handler, _receiver) = KeyboardInputHandler::new();
        assert!(!handler.cancellation_token.is_cancelled());

        handler.stop().await.unwrap();
        assert!(handler.cancellation_token.is_cancelled());
    }
}
