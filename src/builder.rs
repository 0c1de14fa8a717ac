//! Coordinator construction and event-loop wiring
//!
//! [`CoordinatorBuilder`] injects the two external seams (signaling client,
//! native provider) together with the mpsc receivers their adapters deliver
//! callbacks on, and spawns a single `tokio::select!` loop that fans both
//! sources into the coordinator's serialized handlers.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::coordinator::{CoordinatorConfig, SessionCoordinator};
use crate::error::{ClientError, ClientResult};
use crate::native::{NativeCallBridge, NativeEvent, NativeProvider, ProviderConfig};
use crate::signaling::{SignalingClient, SignalingEvent};

/// Builder for a wired-up [`SessionCoordinator`]
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use voice_client_core::{CoordinatorBuilder, NativeProvider, SignalingClient};
/// # async fn example(
/// #     signaling: Arc<dyn SignalingClient>,
/// #     provider: Arc<dyn NativeProvider>,
/// # ) -> Result<(), Box<dyn std::error::Error>> {
/// let (native_tx, native_rx) = tokio::sync::mpsc::unbounded_channel();
/// let (signaling_tx, signaling_rx) = tokio::sync::mpsc::unbounded_channel();
///
/// let handle = CoordinatorBuilder::new()
///     .credential("JWT")
///     .signaling(signaling)
///     .native_provider(provider)
///     .native_events(native_rx)
///     .signaling_events(signaling_rx)
///     .build()?;
///
/// handle.coordinator().connect().await?;
/// # Ok(())
/// # }
/// ```
pub struct CoordinatorBuilder {
    credential: Option<String>,
    provider_config: ProviderConfig,
    event_capacity: usize,
    signaling: Option<Arc<dyn SignalingClient>>,
    provider: Option<Arc<dyn NativeProvider>>,
    native_events: Option<mpsc::UnboundedReceiver<NativeEvent>>,
    signaling_events: Option<mpsc::UnboundedReceiver<SignalingEvent>>,
}

impl CoordinatorBuilder {
    /// Start a builder with default provider configuration
    pub fn new() -> Self {
        Self {
            credential: None,
            provider_config: ProviderConfig::default(),
            event_capacity: 256,
            signaling: None,
            provider: None,
            native_events: None,
            signaling_events: None,
        }
    }

    /// Credential passed to the signaling SDK at session creation
    pub fn credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    /// Native provider configuration (defaults to one call per group,
    /// generic and phone-number handles)
    pub fn provider_config(mut self, config: ProviderConfig) -> Self {
        self.provider_config = config;
        self
    }

    /// Capacity of the coordinator's broadcast event channel
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// The signaling SDK client
    pub fn signaling(mut self, signaling: Arc<dyn SignalingClient>) -> Self {
        self.signaling = Some(signaling);
        self
    }

    /// The native call-management provider
    pub fn native_provider(mut self, provider: Arc<dyn NativeProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Receiver for the native provider's delegate callbacks
    pub fn native_events(mut self, events: mpsc::UnboundedReceiver<NativeEvent>) -> Self {
        self.native_events = Some(events);
        self
    }

    /// Receiver for the signaling SDK's delegate callbacks
    pub fn signaling_events(mut self, events: mpsc::UnboundedReceiver<SignalingEvent>) -> Self {
        self.signaling_events = Some(events);
        self
    }

    /// Build the coordinator and spawn its event loop
    pub fn build(self) -> ClientResult<CoordinatorHandle> {
        let credential = self
            .credential
            .ok_or_else(|| ClientError::config("credential is required"))?;
        let signaling = self
            .signaling
            .ok_or_else(|| ClientError::config("signaling client is required"))?;
        let provider = self
            .provider
            .ok_or_else(|| ClientError::config("native provider is required"))?;
        let native_events = self
            .native_events
            .ok_or_else(|| ClientError::config("native event receiver is required"))?;
        let signaling_events = self
            .signaling_events
            .ok_or_else(|| ClientError::config("signaling event receiver is required"))?;

        let bridge = Arc::new(NativeCallBridge::new(provider, self.provider_config));
        let config =
            CoordinatorConfig::new(credential).with_event_capacity(self.event_capacity);
        let coordinator = Arc::new(SessionCoordinator::new(signaling, bridge, config));

        let event_loop = tokio::spawn(run_event_loop(
            coordinator.clone(),
            native_events,
            signaling_events,
        ));

        Ok(CoordinatorHandle {
            coordinator,
            event_loop,
        })
    }
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running coordinator plus its event loop task
pub struct CoordinatorHandle {
    coordinator: Arc<SessionCoordinator>,
    event_loop: JoinHandle<()>,
}

impl CoordinatorHandle {
    /// The coordinator
    pub fn coordinator(&self) -> Arc<SessionCoordinator> {
        self.coordinator.clone()
    }

    /// Stop the event loop
    ///
    /// Dropping all event senders ends the loop gracefully; this is the
    /// forceful variant.
    pub fn shutdown(self) {
        self.event_loop.abort();
    }
}

/// Fan both callback sources into the coordinator's serialized handlers
///
/// One task, one `select!` loop: events from the native provider and the
/// signaling SDK are interleaved here and applied one at a time, which is
/// what keeps the session's phase and identifiers race-free.
async fn run_event_loop(
    coordinator: Arc<SessionCoordinator>,
    mut native_events: mpsc::UnboundedReceiver<NativeEvent>,
    mut signaling_events: mpsc::UnboundedReceiver<SignalingEvent>,
) {
    loop {
        tokio::select! {
            Some(event) = native_events.recv() => {
                handle_native_event(&coordinator, event).await;
            }
            Some(event) = signaling_events.recv() => {
                handle_signaling_event(&coordinator, event).await;
            }
            else => break,
        }
    }
    tracing::debug!("Coordinator event loop stopped");
}

async fn handle_native_event(coordinator: &SessionCoordinator, event: NativeEvent) {
    match event {
        NativeEvent::StartCallAction { native_call_id } => {
            // The provider expects its "started connecting" report before the
            // application dials out, mirroring the native action flow.
            coordinator.bridge().acknowledge_start_call(native_call_id);
            coordinator.on_native_call_reported(native_call_id).await;
        }
        NativeEvent::ProviderReset => {
            coordinator.on_native_reset().await;
        }
        NativeEvent::AudioSessionActivated => {
            coordinator.signaling().enable_audio();
        }
        NativeEvent::AudioSessionDeactivated => {
            coordinator.signaling().disable_audio();
        }
    }
}

async fn handle_signaling_event(coordinator: &SessionCoordinator, event: SignalingEvent) {
    match event {
        SignalingEvent::Hangup {
            call_id,
            quality,
            reason,
        } => {
            coordinator
                .on_signaling_hangup(&call_id, quality.as_deref(), &reason)
                .await;
        }
        SignalingEvent::SessionError { reason } => {
            coordinator.on_signaling_session_error(reason).await;
        }
        SignalingEvent::IncomingInvite { call_id, caller } => {
            coordinator.on_incoming_invite(&call_id, &caller).await;
        }
        SignalingEvent::InviteCancelled { call_id, reason } => {
            coordinator.on_invite_cancelled(&call_id, &reason).await;
        }
    }
}
