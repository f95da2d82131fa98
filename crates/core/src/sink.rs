//! Event Sinks - Delivery of Proposed Changes
//!
//! The core hands each [`TuningEvent`] to an [`EventSink`] synchronously at the
//! point of detection. Sinks must not block: the channel sink drops events when
//! its consumer falls behind rather than stall an observation point.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::warn;

use crate::types::TuningEvent;

/// Consumer of proposed changes
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    /// Take ownership of one event. Must return promptly.
    fn deliver(&self, event: TuningEvent);
}

/// Drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

impl EventSink for DiscardSink {
    fn deliver(&self, _event: TuningEvent) {}
}

/// Buffers events in memory until drained
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<TuningEvent>>,
}

impl CollectingSink {
    /// Create empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffered events
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// No buffered events
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Copy of buffered events
    #[must_use]
    pub fn events(&self) -> Vec<TuningEvent> {
        self.events.lock().clone()
    }

    /// Take all buffered events
    pub fn drain(&self) -> Vec<TuningEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventSink for CollectingSink {
    fn deliver(&self, event: TuningEvent) {
        self.events.lock().push(event);
    }
}

/// Forwards events over a bounded crossbeam channel
#[derive(Debug)]
pub struct ChannelSink {
    sender: Sender<TuningEvent>,
    dropped: AtomicU64,
}

impl ChannelSink {
    /// Create sink plus the receiving end for the consumer
    #[must_use]
    pub fn bounded(capacity: usize) -> (Self, Receiver<TuningEvent>) {
        let (sender, receiver) = channel::bounded(capacity);
        (
            Self {
                sender,
                dropped: AtomicU64::new(0),
            },
            receiver,
        )
    }

    /// Events dropped because the channel was full or disconnected
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl EventSink for ChannelSink {
    fn deliver(&self, event: TuningEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    category = %event.category,
                    parameter = %event.parameter,
                    "tuning event channel full, dropping event"
                );
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
