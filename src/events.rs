use crate::analysis::AnalysisResult;
use crate::error::{ErrorDescriptor, EventBusError};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Events that can occur in an analysis session
#[derive(Debug, Clone)]
pub enum EviveEvent {
    /// The session state machine moved between states
    StateChanged {
        from: &'static str,
        to: &'static str,
        timestamp: SystemTime,
    },
    /// A frame was captured and stored
    CaptureCompleted {
        image_id: u64,
        path: String,
        size_bytes: usize,
    },
    /// The vision model's reply was accepted
    AnalysisCompleted {
        image_id: u64,
        result: AnalysisResult,
    },
    /// A capture or analysis failed and the session is waiting for a retry
    OperationFailed {
        operation: &'static str,
        error: ErrorDescriptor,
    },
    /// A command arrived in a state that does not accept it
    CommandRejected {
        command: &'static str,
        state: &'static str,
    },
    /// A completion arrived for an operation that is no longer current
    StaleSignalDiscarded { operation: &'static str, image_id: u64 },
    /// System shutdown requested
    ShutdownRequested {
        timestamp: SystemTime,
        reason: String,
    },
}

impl EviveEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            EviveEvent::StateChanged { from, to, .. } => {
                format!("Session state {} -> {}", from, to)
            }
            EviveEvent::CaptureCompleted {
                image_id,
                path,
                size_bytes,
            } => {
                format!("Frame {} captured ({} bytes) at {}", image_id, size_bytes, path)
            }
            EviveEvent::AnalysisCompleted { image_id, result } => {
                format!("Frame {} analyzed: {}", image_id, result.summary())
            }
            EviveEvent::OperationFailed { operation, error } => {
                format!("{} failed: {}", operation, error.message)
            }
            EviveEvent::CommandRejected { command, state } => {
                format!("Command '{}' ignored while {}", command, state)
            }
            EviveEvent::StaleSignalDiscarded {
                operation,
                image_id,
            } => {
                format!("Discarded stale {} result for frame {}", operation, image_id)
            }
            EviveEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            EviveEvent::StateChanged { .. } => "state_changed",
            EviveEvent::CaptureCompleted { .. } => "capture_completed",
            EviveEvent::AnalysisCompleted { .. } => "analysis_completed",
            EviveEvent::OperationFailed { .. } => "operation_failed",
            EviveEvent::CommandRejected { .. } => "command_rejected",
            EviveEvent::StaleSignalDiscarded { .. } => "stale_signal_discarded",
            EviveEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Event bus for session notifications using broadcast channels
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EviveEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<EviveEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: EviveEvent) -> Result<usize, EventBusError> {
        match &event {
            EviveEvent::OperationFailed { operation, error } => {
                warn!("{} failed: {}", operation, error);
            }
            EviveEvent::ShutdownRequested { reason, .. } => {
                info!("Shutdown requested: {}", reason);
            }
            _ => debug!("Publishing event: {}", event.description()),
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
    /// Custom filter function
    Custom(fn(&EviveEvent) -> bool),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &EviveEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::Custom(filter_fn) => filter_fn(event),
        }
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<EviveEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    /// Create a new event receiver with a filter
    pub fn new(
        receiver: broadcast::Receiver<EviveEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event; lagging is logged and skipped
    pub async fn recv(&mut self) -> Result<EviveEvent, EventBusError> {
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
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<Option<EviveEvent>, EventBusError> {
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
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tokio::time::{timeout, Duration};

    fn failure() -> EviveEvent {
        EviveEvent::OperationFailed {
            operation: "capture",
            error: ErrorDescriptor::new(ErrorKind::Capture, "camera offline"),
        }
    }

    #[tokio::test]
    async fn test_event_bus_basic_operations() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        let subscriber_count = event_bus.publish(failure()).unwrap();
        assert_eq!(subscriber_count, 1);

        match receiver.recv().await.unwrap() {
            EviveEvent::OperationFailed { operation, error } => {
                assert_eq!(operation, "capture");
                assert_eq!(error.message, "camera offline");
            }
            _ => panic!("Unexpected event type"),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_fails() {
        let event_bus = EventBus::new(10);
        assert!(!event_bus.has_subscribers());
        assert!(event_bus.publish(failure()).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let event_bus = EventBus::new(10);
        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.subscribe();
        assert_eq!(event_bus.subscriber_count(), 2);

        event_bus
            .publish(EviveEvent::CommandRejected {
                command: "analyze",
                state: "Capturing",
            })
            .unwrap();

        let _ = timeout(Duration::from_millis(100), receiver1.recv())
            .await
            .unwrap()
            .unwrap();
        let _ = timeout(Duration::from_millis(100), receiver2.recv())
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_event_filter() {
        let filter = EventFilter::EventTypes(vec!["operation_failed"]);
        let stale = EviveEvent::StaleSignalDiscarded {
            operation: "analysis",
            image_id: 3,
        };

        assert!(filter.matches(&failure()));
        assert!(!filter.matches(&stale));
        assert!(EventFilter::All.matches(&stale));
        assert!(EventFilter::Custom(|e| e.event_type().starts_with("stale")).matches(&stale));
    }

    #[tokio::test]
    async fn test_filtered_receiver() {
        let event_bus = EventBus::new(10);
        let filter = EventFilter::EventTypes(vec!["operation_failed"]);
        let mut filtered =
            EventReceiver::new(event_bus.subscribe(), filter, "test".to_string());

        event_bus
            .publish(EviveEvent::StateChanged {
                from: "Idle",
                to: "Capturing",
                timestamp: SystemTime::now(),
            })
            .unwrap();
        event_bus.publish(failure()).unwrap();

        let received = timeout(Duration::from_millis(100), filtered.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.event_type(), "operation_failed");
        assert!(filtered.try_recv().unwrap().is_none());
    }

    #[test]
    fn test_event_descriptions() {
        let event = EviveEvent::StaleSignalDiscarded {
            operation: "analysis",
            image_id: 4,
        };
        assert_eq!(
            event.description(),
            "Discarded stale analysis result for frame 4"
        );
        assert_eq!(
            failure().description(),
            "capture failed: camera offline"
        );
    }
}
