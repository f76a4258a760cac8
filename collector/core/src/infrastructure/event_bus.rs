// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Trace Events
//
// Provides in-memory event streaming using tokio broadcast channels.
// Carries live monitor alerts and collection outcomes to the CLI and any
// other observers. In-memory only: events published with no subscriber are
// dropped.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::events::{FailureAlert, TraceEvent};

/// Event bus for publishing and subscribing to trace events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<TraceEvent>>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    /// Capacity determines how many events can be buffered before dropping old ones
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (1000)
    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    /// Publish a newly detected failure
    pub fn publish_failure(&self, alert: FailureAlert) {
        self.publish(TraceEvent::FailureDetected(alert));
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: TraceEvent) {
        debug!("Publishing event: {:?}", event);

        // send() only fails when nobody is subscribed
        let receiver_count = self.sender.send(event).unwrap_or(0);

        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    /// Subscribe to all trace events
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to failure alerts only
    pub fn subscribe_failures(&self) -> FailureAlertReceiver {
        FailureAlertReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

fn map_try_recv_error(e: broadcast::error::TryRecvError) -> EventBusError {
    match e {
        broadcast::error::TryRecvError::Empty => EventBusError::Empty,
        broadcast::error::TryRecvError::Closed => EventBusError::Closed,
        broadcast::error::TryRecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Receiver for all trace events
pub struct EventReceiver {
    receiver: broadcast::Receiver<TraceEvent>,
}

impl EventReceiver {
    /// Receive the next event (waits until one is available)
    pub async fn recv(&mut self) -> Result<TraceEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<TraceEvent, EventBusError> {
        self.receiver.try_recv().map_err(map_try_recv_error)
    }
}

/// Receiver that skips everything except failure alerts
pub struct FailureAlertReceiver {
    receiver: broadcast::Receiver<TraceEvent>,
}

impl FailureAlertReceiver {
    pub async fn recv(&mut self) -> Result<FailureAlert, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if let TraceEvent::FailureDetected(alert) = event {
                return Ok(alert);
            }
        }
    }

    /// Next queued failure alert without waiting. `Empty` once only
    /// non-failure events (or nothing) remain.
    pub fn try_recv(&mut self) -> Result<FailureAlert, EventBusError> {
        loop {
            let event = self.receiver.try_recv().map_err(map_try_recv_error)?;
            if let TraceEvent::FailureDetected(alert) = event {
                return Ok(alert);
            }
        }
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}
