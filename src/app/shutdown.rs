use super::{ComponentState, RepcountOrchestrator, SessionOutcome, ShutdownReason};
use crate::error::Result;
use crate::report::SessionReport;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

impl RepcountOrchestrator {
    /// Stop the components, then collect and write the session report
    pub async fn shutdown(&mut self, reason: ShutdownReason) -> Result<SessionOutcome> {
        info!("Beginning graceful shutdown");

        if let Some(keyboard_handler) = self.keyboard_handler.take() {
            self.set_component_state("keyboard", ComponentState::Stopping)
                .await;
            match keyboard_handler.stop().await {
                Ok(()) => {
                    self.set_component_state("keyboard", ComponentState::Stopped)
                        .await
                }
                Err(e) => {
                    error!("Error stopping keyboard: {}", e);
                    self.set_component_state("keyboard", ComponentState::Failed)
                        .await;
                }
            }
        }

        // The forwarder drains queued commands before it exits
        self.cancellation_token.cancel();
        if let Some(handle) = self.forwarder_handle.take() {
            self.set_component_state("transport", ComponentState::Stopping)
                .await;
            match timeout(Duration::from_secs(5), handle).await {
                Ok(Ok(())) => {
                    self.set_component_state("transport", ComponentState::Stopped)
                        .await;
                    info!("transport component stopped");
                }
                Ok(Err(e)) => {
                    self.set_component_state("transport", ComponentState::Failed)
                        .await;
                    error!("Transport forwarder task failed: {}", e);
                }
                Err(_) => {
                    self.set_component_state("transport", ComponentState::Failed)
                        .await;
                    error!("transport component stop timeout");
                }
            }
        }

        let report = SessionReport::from_controller(&self.controller, self.transport_stats());

        let report_path = if self.config.report.enabled {
            match report.write_json(&self.config.report.path).await {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("Session report not written: {}", e);
                    None
                }
            }
        } else {
            None
        };

        info!("Graceful shutdown completed ({:?})", reason);
        Ok(SessionOutcome {
            reason,
            report,
            report_path,
        })
    }
}
