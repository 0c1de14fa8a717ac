//! Call session state
//!
//! This module defines the single stateful entity of the crate: the
//! [`CallSession`] record that pairs the locally generated native call
//! identifier with the identifier the signaling SDK assigns once an outgoing
//! call exists, plus the closed [`CallPhase`] lifecycle enum and the
//! connection-level [`ConnectionStatus`].
//!
//! The native identifier is always set before any signaling request is
//! issued, so `native_call_id` being `None` implies `signaling_call_id` is
//! `None` as well.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::signaling::SessionErrorReason;

/// Identifier assigned by the signaling SDK once a call exists on its side
pub type SignalingCallId = String;

/// Lifecycle phase of the (at most one) active call session
///
/// The enum is closed and transitions go through [`CallPhase::can_transition`];
/// invalid transitions are rejected by the coordinator rather than asserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallPhase {
    /// No call in progress
    Idle,
    /// User requested a call; native transaction requested, not yet confirmed
    Connecting,
    /// Native subsystem confirmed; outgoing signaling request in flight
    Dialing,
    /// Call established end to end
    Active,
    /// Local hangup in progress
    Ending,
}

impl CallPhase {
    /// Whether a transition from `self` to `next` is part of the lifecycle
    ///
    /// The table intentionally omits the provider-reset override: a reset
    /// forces `Idle` from any phase and is handled before this check.
    pub fn can_transition(&self, next: CallPhase) -> bool {
        use CallPhase::*;
        matches!(
            (self, next),
            (Idle, Connecting)
                | (Connecting, Dialing)
                | (Connecting, Idle)
                | (Dialing, Active)
                | (Dialing, Idle)
                | (Active, Ending)
                | (Active, Idle)
                | (Ending, Idle)
        )
    }

    /// Whether a call is currently in progress (anything but `Idle`)
    pub fn is_in_call(&self) -> bool {
        !matches!(self, CallPhase::Idle)
    }
}

impl std::fmt::Display for CallPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CallPhase::Idle => "Idle",
            CallPhase::Connecting => "Connecting",
            CallPhase::Dialing => "Dialing",
            CallPhase::Active => "Active",
            CallPhase::Ending => "Ending",
        };
        write!(f, "{}", s)
    }
}

/// Login state to the remote signaling service, independent of any call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No session with the signaling service
    Disconnected,
    /// Session creation in flight
    Connecting,
    /// Session established; calls may be placed
    Connected,
    /// Session failed or was lost
    Failed(SessionErrorReason),
}

impl ConnectionStatus {
    /// Whether calls may be placed right now
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

/// The single call session record
///
/// Owned exclusively by the coordinator and mutated only under its lock.
/// Identity set/clear order: `native_call_id` is assigned when the native
/// transaction is requested, `signaling_call_id` when the SDK accepts the
/// outgoing call; both are cleared together on reset.
#[derive(Debug, Clone)]
pub struct CallSession {
    /// Identifier assigned by the signaling SDK, once known
    pub signaling_call_id: Option<SignalingCallId>,
    /// Locally generated identifier correlating with the native subsystem
    pub native_call_id: Option<Uuid>,
    /// Dialed number/handle, set at call start, cleared at reset
    pub destination: String,
    /// Current lifecycle phase
    pub phase: CallPhase,
}

impl CallSession {
    /// An idle session with no identity
    pub fn idle() -> Self {
        Self {
            signaling_call_id: None,
            native_call_id: None,
            destination: String::new(),
            phase: CallPhase::Idle,
        }
    }

    /// Clear all fields back to the idle state
    pub fn reset(&mut self) {
        *self = Self::idle();
    }

    /// Whether `id` is the current session's native call identifier
    pub fn owns_native_id(&self, id: &Uuid) -> bool {
        self.native_call_id.as_ref() == Some(id)
    }

    /// Whether `id` is the current session's signaling call identifier
    pub fn owns_signaling_id(&self, id: &str) -> bool {
        self.signaling_call_id.as_deref() == Some(id)
    }
}

impl Default for CallSession {
    fn default() -> Self {
        Self::idle()
    }
}
