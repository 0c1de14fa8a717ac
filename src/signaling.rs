//! Signaling SDK seam
//!
//! The voice-signaling SDK is a black box: session login, call setup and
//! teardown over the network, transport and codecs are all its problem. The
//! coordinator only needs the small capability set in [`SignalingClient`]
//! plus the asynchronous [`SignalingEvent`] callbacks the SDK delivers from
//! its own network thread.
//!
//! Implementations wrap a real SDK binding; tests substitute recording fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ClientResult;
use crate::session::SignalingCallId;

/// Reasons the signaling session can fail, as reported by the SDK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionErrorReason {
    /// The credential used to create the session expired
    TokenExpired,
    /// The SDK's keepalive ping timed out
    PingTimeout,
    /// The SDK's transport closed unexpectedly
    TransportClosed,
    /// Any other SDK-reported failure
    Unknown,
}

/// Capability set the coordinator needs from the signaling SDK
///
/// All call operations are asynchronous; completion of the returned future is
/// the SDK's completion callback. Audio enable/disable are synchronous
/// passthrough hooks invoked when the native audio session is activated or
/// deactivated.
#[async_trait]
pub trait SignalingClient: Send + Sync {
    /// Log in to the signaling service, returning the session identifier
    async fn create_session(&self, credential: &str) -> ClientResult<String>;

    /// Place an outgoing call described by an SDK-defined destination map
    /// (e.g. `{"to": "15551234"}`), returning the signaling call identifier
    async fn place_outgoing_call(
        &self,
        destination: &Map<String, Value>,
    ) -> ClientResult<SignalingCallId>;

    /// Hang up the call with the given signaling identifier
    async fn hangup(&self, call_id: &str) -> ClientResult<()>;

    /// Route audio into the SDK (native audio session became active)
    fn enable_audio(&self);

    /// Stop routing audio into the SDK (native audio session deactivated)
    fn disable_audio(&self);
}

/// Asynchronous callbacks delivered by the signaling SDK
#[derive(Debug, Clone)]
pub enum SignalingEvent {
    /// A call was hung up on the signaling side
    Hangup {
        /// Signaling identifier of the affected call
        call_id: SignalingCallId,
        /// SDK-reported media quality summary for the call, if any
        quality: Option<String>,
        /// SDK-defined hangup reason (e.g. "remote ended")
        reason: String,
    },
    /// The signaling session itself failed
    SessionError {
        /// Why the session is no longer usable
        reason: SessionErrorReason,
    },
    /// An incoming call invite arrived (not handled by this crate)
    IncomingInvite {
        /// Signaling identifier of the invited call
        call_id: SignalingCallId,
        /// Caller handle as reported by the SDK
        caller: String,
    },
    /// A previously received invite was cancelled (not handled by this crate)
    InviteCancelled {
        /// Signaling identifier of the cancelled invite
        call_id: SignalingCallId,
        /// SDK-defined cancellation reason
        reason: String,
    },
}

/// Build the SDK destination map for a dialed number/handle
pub fn destination_map(to: &str) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("to".to_string(), Value::String(to.to_string()));
    map
}
