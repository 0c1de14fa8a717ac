//! Native call-management seam and bridge
//!
//! The operating system's call-management facility (system call UI, audio
//! routing) is a black box behind the [`NativeProvider`] trait. The
//! [`NativeCallBridge`] in front of it is a pure translator: it turns
//! coordinator requests into provider transactions and one-way reports, and
//! the provider's delegate callbacks surface as [`NativeEvent`]s consumed by
//! the coordinator's event loop. The bridge owns no session state, only the
//! [`ProviderConfig`] it was constructed with.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ClientResult;

/// Handle types the provider accepts for outgoing calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandleType {
    /// Free-form handle
    Generic,
    /// Dialable phone number
    PhoneNumber,
}

/// End reasons reported to the native subsystem so its call UI matches reality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NativeEndReason {
    /// The remote party ended the call
    RemoteEnded,
    /// The call could not be set up or failed mid-flight
    Failed,
}

/// Configuration handed to the native provider at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Maximum simultaneous calls per call group
    pub max_calls_per_group: u32,
    /// Handle types the provider should accept
    pub supported_handle_types: Vec<HandleType>,
}

impl Default for ProviderConfig {
    /// One call at a time, generic and phone-number handles
    fn default() -> Self {
        Self {
            max_calls_per_group: 1,
            supported_handle_types: vec![HandleType::Generic, HandleType::PhoneNumber],
        }
    }
}

/// Capability set the bridge needs from the native call-management subsystem
///
/// Transactions are asynchronous requests whose real confirmation arrives
/// later through the provider's own callbacks; reports are one-way.
#[async_trait]
pub trait NativeProvider: Send + Sync {
    /// Apply the provider configuration (called once by the bridge)
    fn configure(&self, config: &ProviderConfig);

    /// Request a start-call transaction for the given id and handle
    async fn request_start_call_transaction(
        &self,
        native_call_id: Uuid,
        destination: &str,
    ) -> ClientResult<()>;

    /// Request an end-call transaction for the given id
    async fn request_end_call_transaction(&self, native_call_id: Uuid) -> ClientResult<()>;

    /// Report that the outgoing call has started connecting
    fn report_outgoing_call_connecting(&self, native_call_id: Uuid);

    /// Report that the outgoing call is now connected
    fn report_outgoing_call_connected(&self, native_call_id: Uuid);

    /// Report that the call ended, with the reason shown in the system UI
    fn report_call_ended(&self, native_call_id: Uuid, reason: NativeEndReason);

    /// Ask the OS for microphone access; returns whether it was granted
    async fn request_microphone_permission(&self) -> bool;
}

/// Delegate callbacks delivered by the native provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeEvent {
    /// The user-initiated start-call action is ready to be performed
    StartCallAction {
        /// Identifier the transaction was requested with
        native_call_id: Uuid,
    },
    /// The provider reset; all calls are gone, authoritative and unconditional
    ProviderReset,
    /// The native audio session became active
    AudioSessionActivated,
    /// The native audio session was deactivated
    AudioSessionDeactivated,
}

/// Pure event/request translator in front of the native provider
pub struct NativeCallBridge {
    provider: std::sync::Arc<dyn NativeProvider>,
    config: ProviderConfig,
}

impl NativeCallBridge {
    /// Create the bridge and configure the provider
    pub fn new(provider: std::sync::Arc<dyn NativeProvider>, config: ProviderConfig) -> Self {
        provider.configure(&config);
        Self { provider, config }
    }

    /// The configuration the provider was set up with
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Ask the native subsystem to begin a call
    ///
    /// Fire-and-forget from the coordinator's perspective: a successful
    /// transaction request only means the action was accepted for processing.
    /// The confirmation arrives later as [`NativeEvent::StartCallAction`].
    pub async fn request_start_call(
        &self,
        native_call_id: Uuid,
        destination: &str,
    ) -> ClientResult<()> {
        tracing::debug!("Requesting native start-call transaction for {}", native_call_id);
        self.provider
            .request_start_call_transaction(native_call_id, destination)
            .await
    }

    /// Ask the native subsystem to end a call by id
    ///
    /// The coordinator does not wait for a confirmation callback; local
    /// cleanup proceeds once the signaling hangup has completed.
    pub async fn request_end_call(&self, native_call_id: Uuid) -> ClientResult<()> {
        tracing::debug!("Requesting native end-call transaction for {}", native_call_id);
        self.provider.request_end_call_transaction(native_call_id).await
    }

    /// Report to the system call UI that the outgoing call is connected
    pub fn notify_outgoing_connected(&self, native_call_id: Uuid) {
        self.provider.report_outgoing_call_connected(native_call_id);
    }

    /// Report to the system call UI that the call ended
    pub fn notify_call_ended(&self, native_call_id: Uuid, reason: NativeEndReason) {
        self.provider.report_call_ended(native_call_id, reason);
    }

    /// Report to the system call UI that the call failed
    pub fn notify_call_failed(&self, native_call_id: Uuid) {
        self.provider
            .report_call_ended(native_call_id, NativeEndReason::Failed);
    }

    /// Acknowledge a start-call action before the coordinator dials out
    ///
    /// Marks the call as "started connecting" in the system UI, matching the
    /// point where the native subsystem hands the action to the application.
    pub fn acknowledge_start_call(&self, native_call_id: Uuid) {
        self.provider.report_outgoing_call_connecting(native_call_id);
    }

    /// Ask for microphone access (one-time, during setup)
    pub async fn request_microphone_permission(&self) -> bool {
        self.provider.request_microphone_permission().await
    }
}

impl std::fmt::Debug for NativeCallBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeCallBridge")
            .field("config", &self.config)
            .finish()
    }
}
