use crate::error::EventBusError;
use crate::session::{FormErrorCause, RepOutcome};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// One-byte command understood by the feedback microcontroller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HardwareCommand {
    /// Correct repetition ('A')
    Success,
    /// Form error ('B')
    Error,
    /// Session reset ('C')
    Reset,
}

impl HardwareCommand {
    pub fn as_char(&self) -> char {
        match self {
            HardwareCommand::Success => 'A',
            HardwareCommand::Error => 'B',
            HardwareCommand::Reset => 'C',
        }
    }

    pub fn as_byte(&self) -> u8 {
        self.as_char() as u8
    }
}

/// Events emitted by the session controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A synchronized repetition was counted
    RepSuccess {
        set: u32,
        reps_in_set: u32,
        timestamp: f64,
    },
    /// A form error was counted
    RepError {
        cause: FormErrorCause,
        errors_total: u32,
        timestamp: f64,
    },
    /// The current set reached its repetition target; rest begins
    SetComplete {
        set: u32,
        rest_seconds: u32,
        timestamp: f64,
    },
    /// All sets are done
    SessionComplete {
        sets_total: u32,
        errors_total: u32,
        timestamp: f64,
    },
    /// The operator cleared the session
    ManualReset { timestamp: f64 },
}

impl SessionEvent {
    /// Session time at which the event happened
    pub fn timestamp(&self) -> f64 {
        match self {
            SessionEvent::RepSuccess { timestamp, .. } => *timestamp,
            SessionEvent::RepError { timestamp, .. } => *timestamp,
            SessionEvent::SetComplete { timestamp, .. } => *timestamp,
            SessionEvent::SessionComplete { timestamp, .. } => *timestamp,
            SessionEvent::ManualReset { timestamp } => *timestamp,
        }
    }

    /// Byte to forward to the microcontroller, if any
    pub fn hardware_command(&self) -> Option<HardwareCommand> {
        match self {
            SessionEvent::RepSuccess { .. } => Some(HardwareCommand::Success),
            SessionEvent::RepError { .. } => Some(HardwareCommand::Error),
            SessionEvent::ManualReset { .. } => Some(HardwareCommand::Reset),
            SessionEvent::SetComplete { .. } | SessionEvent::SessionComplete { .. } => None,
        }
    }

    /// Results log entry appended for this event, if any
    pub fn log_entry(&self) -> Option<RepOutcome> {
        match self {
            SessionEvent::RepSuccess { .. } => Some(RepOutcome::Success),
            SessionEvent::RepError { .. } => Some(RepOutcome::Error),
            _ => None,
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            SessionEvent::RepSuccess {
                set, reps_in_set, ..
            } => format!("Set {}: repetition {} counted", set, reps_in_set),
            SessionEvent::RepError {
                cause,
                errors_total,
                ..
            } => format!(
                "Form error ({}), {} errors so far",
                cause.description(),
                errors_total
            ),
            SessionEvent::SetComplete {
                set, rest_seconds, ..
            } => format!("Set {} complete, resting {}s", set, rest_seconds),
            SessionEvent::SessionComplete {
                sets_total,
                errors_total,
                ..
            } => format!(
                "Exercise complete: {} sets, {} errors",
                sets_total, errors_total
            ),
            SessionEvent::ManualReset { .. } => "Session reset by operator".to_string(),
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::RepSuccess { .. } => "rep_success",
            SessionEvent::RepError { .. } => "rep_error",
            SessionEvent::SetComplete { .. } => "set_complete",
            SessionEvent::SessionComplete { .. } => "session_complete",
            SessionEvent::ManualReset { .. } => "manual_reset",
        }
    }
}

/// Broadcast bus carrying session events to the transport and any other consumers
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: SessionEvent) -> Result<usize, EventBusError> {
        match &event {
            SessionEvent::RepSuccess { .. }
            | SessionEvent::SetComplete { .. }
            | SessionEvent::SessionComplete { .. }
            | SessionEvent::ManualReset { .. } => {
                info!("{}", event.description());
            }
            SessionEvent::RepError { .. } => {
                warn!("{}", event.description());
            }
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
    /// Accept events that carry a hardware command
    HardwareCommands,
    /// Custom filter function
    Custom(fn(&SessionEvent) -> bool),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &SessionEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::HardwareCommands => event.hardware_command().is_some(),
            EventFilter::Custom(filter_fn) => filter_fn(event),
        }
    }
}

/// Event receiver with filtering.
///
/// The bus is bounded: a receiver that falls more than its capacity behind
/// loses the oldest events, hardware commands included. The loss is counted
/// in [`EventReceiver::lagged_events`].
pub struct EventReceiver {
    receiver: broadcast::Receiver<SessionEvent>,
    filter: EventFilter,
    name: String,
    lagged: u64,
}

impl EventReceiver {
    pub fn new(
        receiver: broadcast::Receiver<SessionEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
            lagged: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Events dropped because this receiver lagged, filtered or not
    pub fn lagged_events(&self) -> u64 {
        self.lagged
    }

    /// Receive the next filtered event.
    ///
    /// A lagging receiver counts the dropped events and keeps going.
    pub async fn recv(&mut self) -> Result<SessionEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    self.lagged += n;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<Option<SessionEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Ok(Some(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => {
                    return Ok(None);
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    self.lagged += n;
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}
