//! Typed event surface of the coordinator
//!
//! The core never publishes UI strings; it emits [`CoordinatorEvent`]s over a
//! broadcast channel and leaves human-readable formatting to the
//! presentation layer (see [`crate::presenter`]). Multiple consumers can
//! subscribe independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::session::{CallPhase, ConnectionStatus, SignalingCallId};

/// Why a call ended, from the coordinator's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallEndReason {
    /// The remote party hung up
    RemoteEnded,
    /// The local user hung up
    LocalHangup,
    /// Call setup or signaling failed
    Failed,
}

/// A call phase transition
#[derive(Debug, Clone)]
pub struct PhaseChangeInfo {
    /// Native identifier of the affected session, if one was assigned
    pub native_call_id: Option<Uuid>,
    /// Phase before the transition
    pub previous_phase: CallPhase,
    /// Phase after the transition
    pub new_phase: CallPhase,
    /// Reason for the change, when one is known
    pub reason: Option<String>,
    /// When the transition happened
    pub timestamp: DateTime<Utc>,
}

/// Events emitted by the session coordinator
#[derive(Debug, Clone)]
pub enum CoordinatorEvent {
    /// Connection-level status to the signaling service changed
    ConnectionStatusChanged {
        /// The new status
        status: ConnectionStatus,
        /// When the change happened
        timestamp: DateTime<Utc>,
    },

    /// Session creation with the signaling service failed
    ConnectionFailed {
        /// Failure detail as reported by the SDK
        detail: String,
        /// When the failure was observed
        timestamp: DateTime<Utc>,
    },

    /// The call session moved to a new phase
    CallPhaseChanged {
        /// Transition details
        info: PhaseChangeInfo,
    },

    /// The outgoing call is established end to end
    CallConnected {
        /// Native identifier of the call
        native_call_id: Uuid,
        /// Identifier the signaling SDK assigned to the call
        signaling_call_id: SignalingCallId,
        /// When the call connected
        timestamp: DateTime<Utc>,
    },

    /// The call ended and the session was reset
    CallEnded {
        /// Native identifier of the call
        native_call_id: Uuid,
        /// Why it ended
        reason: CallEndReason,
        /// When it ended
        timestamp: DateTime<Utc>,
    },

    /// A call attempt failed before or during setup
    CallFailed {
        /// Native identifier of the failed attempt, if one was assigned
        native_call_id: Option<Uuid>,
        /// Failure detail, suitable for logging or display
        detail: String,
        /// When the failure was observed
        timestamp: DateTime<Utc>,
    },

    /// The native provider reset; any session was torn down unconditionally
    ProviderReset {
        /// When the reset was observed
        timestamp: DateTime<Utc>,
    },
}

/// Stream of coordinator events for a single subscriber
pub type EventStream = BroadcastStream<CoordinatorEvent>;

/// Simple event iterator that doesn't require importing StreamExt
pub struct EventIterator {
    stream: EventStream,
}

impl EventIterator {
    /// Create a new event iterator from a stream
    pub fn new(stream: EventStream) -> Self {
        Self { stream }
    }

    /// Get the next event (async)
    pub async fn next(&mut self) -> Option<CoordinatorEvent> {
        use tokio_stream::StreamExt;
        match self.stream.next().await {
            Some(Ok(event)) => Some(event),
            _ => None,
        }
    }
}

/// Event emitter backing the coordinator's observable surface
#[derive(Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<CoordinatorEvent>,
}

impl EventEmitter {
    /// Create a new event emitter with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event
    pub fn emit(&self, event: CoordinatorEvent) {
        // Ignore send errors (no receivers)
        let _ = self.sender.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> EventStream {
        BroadcastStream::new(self.sender.subscribe())
    }

    /// Subscribe to events with a simple iterator
    pub fn subscribe_simple(&self) -> EventIterator {
        EventIterator::new(self.subscribe())
    }

    /// Get the number of active receivers
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(256)
    }
}
