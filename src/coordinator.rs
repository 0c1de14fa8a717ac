//! Session coordination
//!
//! [`SessionCoordinator`] owns the single active [`CallSession`] and merges
//! three independent input sources into one consistent state machine:
//!
//! - user intents ([`SessionCoordinator::start_call`],
//!   [`SessionCoordinator::end_call`], [`SessionCoordinator::connect`])
//! - native call-management callbacks (start-call action confirmed, provider
//!   reset), delivered by the bridge's event loop
//! - signaling SDK callbacks (hangup, session error), delivered by the SDK's
//!   network side
//!
//! All transitions run under one `tokio::sync::Mutex`, so callbacks arriving
//! from different tasks cannot race on the phase or the call identifiers.
//! Signaling requests are awaited *outside* the lock and their results are
//! re-validated against the session afterwards; a provider reset that lands
//! mid-flight wins and the stale result is discarded.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};
use crate::events::{CallEndReason, CoordinatorEvent, EventEmitter, EventIterator, EventStream, PhaseChangeInfo};
use crate::native::{NativeCallBridge, NativeEndReason};
use crate::session::{CallPhase, CallSession, ConnectionStatus};
use crate::signaling::{destination_map, SessionErrorReason, SignalingClient};

/// Coordinator configuration
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Credential passed to the signaling SDK's session creation
    pub credential: String,
    /// Capacity of the broadcast event channel
    pub event_capacity: usize,
}

impl CoordinatorConfig {
    /// Configuration with the given signaling credential
    pub fn new(credential: impl Into<String>) -> Self {
        Self {
            credential: credential.into(),
            event_capacity: 256,
        }
    }

    /// Override the broadcast event channel capacity
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

/// Mutable coordinator state, guarded as one unit
struct State {
    session: CallSession,
    connection: ConnectionStatus,
}

/// The call-session state machine
///
/// At most one non-idle session exists at any time; a second `start_call`
/// while a call is in progress fails with [`ClientError::InvalidState`].
pub struct SessionCoordinator {
    signaling: Arc<dyn SignalingClient>,
    bridge: Arc<NativeCallBridge>,
    state: Mutex<State>,
    emitter: EventEmitter,
    credential: String,
}

impl SessionCoordinator {
    /// Create a coordinator over the injected signaling client and bridge
    pub fn new(
        signaling: Arc<dyn SignalingClient>,
        bridge: Arc<NativeCallBridge>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            signaling,
            bridge,
            state: Mutex::new(State {
                session: CallSession::idle(),
                connection: ConnectionStatus::Disconnected,
            }),
            emitter: EventEmitter::new(config.event_capacity),
            credential: config.credential,
        }
    }

    /// Subscribe to coordinator events
    pub fn subscribe(&self) -> EventStream {
        self.emitter.subscribe()
    }

    /// Subscribe to coordinator events with a simple iterator
    pub fn subscribe_simple(&self) -> EventIterator {
        self.emitter.subscribe_simple()
    }

    /// The injected signaling client
    pub fn signaling(&self) -> &Arc<dyn SignalingClient> {
        &self.signaling
    }

    /// The native call bridge
    pub fn bridge(&self) -> &Arc<NativeCallBridge> {
        &self.bridge
    }

    /// Current connection-level status
    pub async fn connection_status(&self) -> ConnectionStatus {
        self.state.lock().await.connection.clone()
    }

    /// Current call phase
    pub async fn phase(&self) -> CallPhase {
        self.state.lock().await.session.phase
    }

    /// Snapshot of the current call session
    pub async fn session(&self) -> CallSession {
        self.state.lock().await.session.clone()
    }

    /// One-time setup: microphone permission, then signaling session
    ///
    /// The session is established only if not already connected. The
    /// permission outcome is logged but does not gate session creation; the
    /// platform prompts on first capture anyway.
    pub async fn connect(&self) -> ClientResult<()> {
        {
            let mut state = self.state.lock().await;
            match state.connection {
                ConnectionStatus::Connected => {
                    tracing::debug!("Already connected, skipping session creation");
                    return Ok(());
                }
                ConnectionStatus::Connecting => {
                    return Err(ClientError::invalid_state(
                        "session creation already in progress",
                    ));
                }
                _ => {}
            }
            state.connection = ConnectionStatus::Connecting;
            self.emit_connection(&state);
        }

        let granted = self.bridge.request_microphone_permission().await;
        tracing::info!("Microphone permission granted: {}", granted);

        match self.signaling.create_session(&self.credential).await {
            Ok(session_id) => {
                let mut state = self.state.lock().await;
                state.connection = ConnectionStatus::Connected;
                self.emit_connection(&state);
                tracing::info!("Signaling session established: {}", session_id);
                Ok(())
            }
            Err(e) => {
                let mut state = self.state.lock().await;
                state.connection = ConnectionStatus::Disconnected;
                self.emit_connection(&state);
                self.emitter.emit(CoordinatorEvent::ConnectionFailed {
                    detail: e.to_string(),
                    timestamp: Utc::now(),
                });
                tracing::warn!("Signaling session creation failed: {}", e);
                Err(e)
            }
        }
    }

    /// Start an outgoing call to `destination`
    ///
    /// Requires an idle session and a connected signaling session. On success
    /// the session moves to `Connecting` with a freshly generated native call
    /// identifier and a native start-call transaction in flight; the rest of
    /// the chain is driven by callbacks and observed through events.
    pub async fn start_call(&self, destination: &str) -> ClientResult<Uuid> {
        let destination = destination.trim();
        if destination.is_empty() {
            return Err(ClientError::invalid_destination("destination is empty"));
        }

        let native_call_id = Uuid::new_v4();
        {
            let mut state = self.state.lock().await;
            if !state.connection.is_connected() {
                return Err(ClientError::invalid_state(
                    "signaling session is not connected",
                ));
            }
            if state.session.phase != CallPhase::Idle {
                return Err(ClientError::invalid_state(format!(
                    "cannot start a call in phase {}",
                    state.session.phase
                )));
            }
            state.session.native_call_id = Some(native_call_id);
            state.session.destination = destination.to_string();
            self.apply_phase(
                &mut state.session,
                CallPhase::Connecting,
                Some("call requested".to_string()),
            );
        }

        tracing::info!(
            "Starting call to {} (native call id {})",
            destination,
            native_call_id
        );

        match self.bridge.request_start_call(native_call_id, destination).await {
            Ok(()) => Ok(native_call_id),
            Err(e) => {
                let err = match e {
                    rejected @ ClientError::NativeActionRejected { .. } => rejected,
                    other => ClientError::native_rejected(other.to_string()),
                };
                let mut state = self.state.lock().await;
                if state.session.owns_native_id(&native_call_id) {
                    self.reset_session(
                        &mut state.session,
                        Some("native transaction rejected".to_string()),
                    );
                }
                self.emitter.emit(CoordinatorEvent::CallFailed {
                    native_call_id: Some(native_call_id),
                    detail: err.to_string(),
                    timestamp: Utc::now(),
                });
                Err(err)
            }
        }
    }

    /// End the active call
    ///
    /// Sends the signaling hangup and, whether it succeeds or fails, requests
    /// the native end-call transaction and resets the session. Both outcomes
    /// are terminal for the local call.
    pub async fn end_call(&self) -> ClientResult<()> {
        let (native_call_id, signaling_call_id) = {
            let mut state = self.state.lock().await;
            if state.session.phase != CallPhase::Active {
                return Err(ClientError::invalid_state(format!(
                    "cannot end a call in phase {}",
                    state.session.phase
                )));
            }
            let Some(native_call_id) = state.session.native_call_id else {
                return Err(ClientError::internal("active session has no native call id"));
            };
            let Some(signaling_call_id) = state.session.signaling_call_id.clone() else {
                return Err(ClientError::internal(
                    "active session has no signaling call id",
                ));
            };
            self.apply_phase(
                &mut state.session,
                CallPhase::Ending,
                Some("hangup requested".to_string()),
            );
            (native_call_id, signaling_call_id)
        };

        if let Err(e) = self.signaling.hangup(&signaling_call_id).await {
            // Terminal for the local call regardless; the native teardown
            // below still runs so the system call UI is never left hanging.
            tracing::warn!("Signaling hangup for {} failed: {}", signaling_call_id, e);
        }

        if let Err(e) = self.bridge.request_end_call(native_call_id).await {
            tracing::warn!("Native end-call transaction failed: {}", e);
        }

        let mut state = self.state.lock().await;
        if state.session.owns_native_id(&native_call_id) {
            self.reset_session(&mut state.session, Some("hangup complete".to_string()));
            self.emitter.emit(CoordinatorEvent::CallEnded {
                native_call_id,
                reason: CallEndReason::LocalHangup,
                timestamp: Utc::now(),
            });
        }
        Ok(())
    }

    /// Native subsystem confirmed it is ready to dial
    ///
    /// Only meaningful in `Connecting` for the current session's native id;
    /// anything else is a stale or duplicate callback and is dropped. Issues
    /// the outgoing signaling request with the stored destination; its result
    /// is applied only if the session survived the await.
    pub async fn on_native_call_reported(&self, native_call_id: Uuid) {
        let destination = {
            let mut state = self.state.lock().await;
            if state.session.phase != CallPhase::Connecting {
                tracing::warn!(
                    "Dropping start-call confirmation in phase {}",
                    state.session.phase
                );
                return;
            }
            if !state.session.owns_native_id(&native_call_id) {
                tracing::warn!(
                    "Dropping start-call confirmation for unknown call {}",
                    native_call_id
                );
                return;
            }
            self.apply_phase(
                &mut state.session,
                CallPhase::Dialing,
                Some("native call reported".to_string()),
            );
            state.session.destination.clone()
        };

        let result = self
            .signaling
            .place_outgoing_call(&destination_map(&destination))
            .await;

        let mut state = self.state.lock().await;
        if !state.session.owns_native_id(&native_call_id)
            || state.session.phase != CallPhase::Dialing
        {
            // Provider reset (or equivalent teardown) landed mid-flight.
            tracing::warn!(
                "Discarding outgoing-call result for torn-down session {}",
                native_call_id
            );
            return;
        }

        match result {
            Ok(signaling_call_id) => {
                state.session.signaling_call_id = Some(signaling_call_id.clone());
                self.apply_phase(
                    &mut state.session,
                    CallPhase::Active,
                    Some("outgoing call connected".to_string()),
                );
                self.bridge.notify_outgoing_connected(native_call_id);
                self.emitter.emit(CoordinatorEvent::CallConnected {
                    native_call_id,
                    signaling_call_id: signaling_call_id.clone(),
                    timestamp: Utc::now(),
                });
                tracing::info!(
                    "Call {} connected (signaling call id {})",
                    native_call_id,
                    signaling_call_id
                );
            }
            Err(e) => {
                self.bridge.notify_call_failed(native_call_id);
                self.reset_session(
                    &mut state.session,
                    Some("signaling request failed".to_string()),
                );
                self.emitter.emit(CoordinatorEvent::CallFailed {
                    native_call_id: Some(native_call_id),
                    detail: e.to_string(),
                    timestamp: Utc::now(),
                });
                tracing::warn!("Outgoing call to {} failed: {}", destination, e);
            }
        }
    }

    /// The native provider reset
    ///
    /// Authoritative teardown of any call in any phase; the one transition
    /// that wins over every in-flight operation. Idempotent from `Idle`.
    pub async fn on_native_reset(&self) {
        let mut state = self.state.lock().await;
        if state.session.phase.is_in_call() {
            tracing::info!(
                "Provider reset in phase {}, clearing session",
                state.session.phase
            );
            self.reset_session(&mut state.session, Some("provider reset".to_string()));
        } else {
            tracing::debug!("Provider reset with no active session");
        }
        self.emitter.emit(CoordinatorEvent::ProviderReset {
            timestamp: Utc::now(),
        });
    }

    /// A call was hung up on the signaling side
    ///
    /// No-op unless `call_id` matches the active session's signaling call id
    /// (late callbacks after teardown are idempotent). For an active call the
    /// native subsystem is told the remote ended it and the session resets.
    pub async fn on_signaling_hangup(&self, call_id: &str, quality: Option<&str>, reason: &str) {
        let mut state = self.state.lock().await;
        if !state.session.owns_signaling_id(call_id) {
            tracing::debug!("Ignoring hangup for unknown call {}", call_id);
            return;
        }
        if state.session.phase != CallPhase::Active {
            tracing::debug!(
                "Ignoring hangup for {} in phase {}",
                call_id,
                state.session.phase
            );
            return;
        }
        let Some(native_call_id) = state.session.native_call_id else {
            tracing::warn!("Active session for {} has no native call id", call_id);
            return;
        };
        if let Some(quality) = quality {
            tracing::debug!("Call {} quality at hangup: {}", call_id, quality);
        }
        tracing::info!("Remote hangup for call {}: {}", call_id, reason);
        self.bridge
            .notify_call_ended(native_call_id, NativeEndReason::RemoteEnded);
        self.reset_session(&mut state.session, Some(format!("remote hangup: {}", reason)));
        self.emitter.emit(CoordinatorEvent::CallEnded {
            native_call_id,
            reason: CallEndReason::RemoteEnded,
            timestamp: Utc::now(),
        });
    }

    /// The signaling session failed
    ///
    /// Connection-level only: an in-progress call keeps running, but the next
    /// `start_call` fails because the session is no longer `Connected`.
    pub async fn on_signaling_session_error(&self, reason: SessionErrorReason) {
        let mut state = self.state.lock().await;
        tracing::warn!("Signaling session error: {:?}", reason);
        state.connection = ConnectionStatus::Failed(reason);
        self.emit_connection(&state);
    }

    /// An incoming call invite arrived; intentionally unhandled
    pub async fn on_incoming_invite(&self, call_id: &str, caller: &str) {
        tracing::debug!("Ignoring incoming invite {} from {}", call_id, caller);
    }

    /// A pending invite was cancelled; intentionally unhandled
    pub async fn on_invite_cancelled(&self, call_id: &str, reason: &str) {
        tracing::debug!("Ignoring invite cancel for {}: {}", call_id, reason);
    }

    /// Apply a phase transition, rejecting edges outside the lifecycle table
    fn apply_phase(&self, session: &mut CallSession, next: CallPhase, reason: Option<String>) {
        let previous = session.phase;
        if !previous.can_transition(next) {
            tracing::warn!("Rejecting phase transition {} -> {}", previous, next);
            return;
        }
        session.phase = next;
        self.emitter.emit(CoordinatorEvent::CallPhaseChanged {
            info: PhaseChangeInfo {
                native_call_id: session.native_call_id,
                previous_phase: previous,
                new_phase: next,
                reason,
                timestamp: Utc::now(),
            },
        });
    }

    /// Transition to `Idle` and clear all session fields
    fn reset_session(&self, session: &mut CallSession, reason: Option<String>) {
        self.apply_phase(session, CallPhase::Idle, reason);
        session.reset();
    }

    /// Emit the current connection status
    fn emit_connection(&self, state: &State) {
        self.emitter.emit(CoordinatorEvent::ConnectionStatusChanged {
            status: state.connection.clone(),
            timestamp: Utc::now(),
        });
    }
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("bridge", &self.bridge)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{NativeProvider, ProviderConfig};
    use crate::session::SignalingCallId;
    use serde_json::{Map, Value};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tokio_test::assert_ok;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Report {
        Connecting(Uuid),
        Connected(Uuid),
        Ended(Uuid, NativeEndReason),
    }

    #[derive(Default)]
    struct FakeProvider {
        configured: StdMutex<Option<ProviderConfig>>,
        start_requests: StdMutex<Vec<(Uuid, String)>>,
        end_requests: StdMutex<Vec<Uuid>>,
        reports: StdMutex<Vec<Report>>,
        reject_start: AtomicBool,
    }

    impl FakeProvider {
        fn reports(&self) -> Vec<Report> {
            self.reports.lock().unwrap().clone()
        }

        fn connected_reports(&self, id: Uuid) -> usize {
            self.reports()
                .iter()
                .filter(|r| **r == Report::Connected(id))
                .count()
        }

        fn ended_reports(&self) -> Vec<Report> {
            self.reports()
                .into_iter()
                .filter(|r| matches!(r, Report::Ended(..)))
                .collect()
        }
    }

    #[async_trait::async_trait]
    impl NativeProvider for FakeProvider {
        fn configure(&self, config: &ProviderConfig) {
            *self.configured.lock().unwrap() = Some(config.clone());
        }

        async fn request_start_call_transaction(
            &self,
            native_call_id: Uuid,
            destination: &str,
        ) -> ClientResult<()> {
            if self.reject_start.load(Ordering::SeqCst) {
                return Err(ClientError::native_rejected("transaction refused"));
            }
            self.start_requests
                .lock()
                .unwrap()
                .push((native_call_id, destination.to_string()));
            Ok(())
        }

        async fn request_end_call_transaction(&self, native_call_id: Uuid) -> ClientResult<()> {
            self.end_requests.lock().unwrap().push(native_call_id);
            Ok(())
        }

        fn report_outgoing_call_connecting(&self, native_call_id: Uuid) {
            self.reports
                .lock()
                .unwrap()
                .push(Report::Connecting(native_call_id));
        }

        fn report_outgoing_call_connected(&self, native_call_id: Uuid) {
            self.reports
                .lock()
                .unwrap()
                .push(Report::Connected(native_call_id));
        }

        fn report_call_ended(&self, native_call_id: Uuid, reason: NativeEndReason) {
            self.reports
                .lock()
                .unwrap()
                .push(Report::Ended(native_call_id, reason));
        }

        async fn request_microphone_permission(&self) -> bool {
            true
        }
    }

    #[derive(Default)]
    struct FakeSignaling {
        create_calls: AtomicI32,
        create_results: StdMutex<VecDeque<ClientResult<String>>>,
        place_results: StdMutex<VecDeque<ClientResult<SignalingCallId>>>,
        hangup_results: StdMutex<VecDeque<ClientResult<()>>>,
        placed: StdMutex<Vec<Map<String, Value>>>,
        hangups: StdMutex<Vec<String>>,
        audio_active: AtomicI32,
        place_gate: StdMutex<Option<Arc<tokio::sync::Semaphore>>>,
    }

    impl FakeSignaling {
        fn queue_create(&self, result: ClientResult<String>) {
            self.create_results.lock().unwrap().push_back(result);
        }

        fn queue_place(&self, result: ClientResult<SignalingCallId>) {
            self.place_results.lock().unwrap().push_back(result);
        }

        fn queue_hangup(&self, result: ClientResult<()>) {
            self.hangup_results.lock().unwrap().push_back(result);
        }

        /// Make place_outgoing_call block until a permit is added
        fn gate_place(&self) -> Arc<tokio::sync::Semaphore> {
            let gate = Arc::new(tokio::sync::Semaphore::new(0));
            *self.place_gate.lock().unwrap() = Some(gate.clone());
            gate
        }

        fn placed_to(&self) -> Vec<String> {
            self.placed
                .lock()
                .unwrap()
                .iter()
                .filter_map(|m| m.get("to").and_then(Value::as_str).map(str::to_string))
                .collect()
        }

        fn hangups(&self) -> Vec<String> {
            self.hangups.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl SignalingClient for FakeSignaling {
        async fn create_session(&self, _credential: &str) -> ClientResult<String> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            self.create_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok("SES1".to_string()))
        }

        async fn place_outgoing_call(
            &self,
            destination: &Map<String, Value>,
        ) -> ClientResult<SignalingCallId> {
            self.placed.lock().unwrap().push(destination.clone());
            let gate = self.place_gate.lock().unwrap().clone();
            if let Some(gate) = gate {
                let _permit = gate.acquire().await.unwrap();
            }
            self.place_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok("S1".to_string()))
        }

        async fn hangup(&self, call_id: &str) -> ClientResult<()> {
            self.hangups.lock().unwrap().push(call_id.to_string());
            self.hangup_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(()))
        }

        fn enable_audio(&self) {
            self.audio_active.fetch_add(1, Ordering::SeqCst);
        }

        fn disable_audio(&self) {
            self.audio_active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    struct Harness {
        coordinator: Arc<SessionCoordinator>,
        provider: Arc<FakeProvider>,
        signaling: Arc<FakeSignaling>,
    }

    fn harness() -> Harness {
        let provider = Arc::new(FakeProvider::default());
        let signaling = Arc::new(FakeSignaling::default());
        let bridge = Arc::new(NativeCallBridge::new(
            provider.clone(),
            ProviderConfig::default(),
        ));
        let coordinator = Arc::new(SessionCoordinator::new(
            signaling.clone(),
            bridge,
            CoordinatorConfig::new("JWT"),
        ));
        Harness {
            coordinator,
            provider,
            signaling,
        }
    }

    async fn connected_harness() -> Harness {
        let h = harness();
        assert_ok!(h.coordinator.connect().await);
        h
    }

    /// Drive the session all the way to `Active` with signaling id "S1"
    async fn active_call(h: &Harness) -> Uuid {
        let native_call_id = h.coordinator.start_call("15551234").await.unwrap();
        h.coordinator.on_native_call_reported(native_call_id).await;
        assert_eq!(h.coordinator.phase().await, CallPhase::Active);
        native_call_id
    }

    #[tokio::test]
    async fn connect_establishes_session_and_configures_provider() {
        let h = harness();
        assert_ok!(h.coordinator.connect().await);
        assert!(h.coordinator.connection_status().await.is_connected());

        let config = h.provider.configured.lock().unwrap().clone();
        assert_eq!(config, Some(ProviderConfig::default()));
    }

    #[tokio::test]
    async fn connect_is_skipped_when_already_connected() {
        let h = connected_harness().await;
        assert_ok!(h.coordinator.connect().await);
        assert_eq!(h.signaling.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn connect_failure_leaves_client_disconnected() {
        let h = harness();
        h.signaling
            .queue_create(Err(ClientError::signaling("bad credential")));

        let result = h.coordinator.connect().await;
        assert!(matches!(
            result,
            Err(ClientError::SignalingRequestFailed { .. })
        ));
        assert_eq!(
            h.coordinator.connection_status().await,
            ConnectionStatus::Disconnected
        );
    }

    #[tokio::test]
    async fn start_call_requires_connected_signaling() {
        let h = harness();
        let result = h.coordinator.start_call("15551234").await;
        assert!(matches!(result, Err(ClientError::InvalidState { .. })));
        assert_eq!(h.coordinator.phase().await, CallPhase::Idle);
    }

    #[tokio::test]
    async fn start_call_rejects_empty_destination() {
        let h = connected_harness().await;
        let result = h.coordinator.start_call("   ").await;
        assert!(matches!(result, Err(ClientError::InvalidDestination { .. })));
        assert_eq!(h.coordinator.phase().await, CallPhase::Idle);
    }

    #[tokio::test]
    async fn start_call_requests_native_transaction() {
        let h = connected_harness().await;
        let native_call_id = h.coordinator.start_call("15551234").await.unwrap();

        assert_eq!(h.coordinator.phase().await, CallPhase::Connecting);
        let session = h.coordinator.session().await;
        assert_eq!(session.native_call_id, Some(native_call_id));
        assert_eq!(session.destination, "15551234");
        assert!(session.signaling_call_id.is_none());
        assert_eq!(
            h.provider.start_requests.lock().unwrap().clone(),
            vec![(native_call_id, "15551234".to_string())]
        );
    }

    #[tokio::test]
    async fn second_start_call_fails_without_mutating_session() {
        let h = connected_harness().await;
        let native_call_id = h.coordinator.start_call("15551234").await.unwrap();

        let result = h.coordinator.start_call("999").await;
        assert!(matches!(result, Err(ClientError::InvalidState { .. })));

        let session = h.coordinator.session().await;
        assert_eq!(session.phase, CallPhase::Connecting);
        assert_eq!(session.native_call_id, Some(native_call_id));
        assert_eq!(session.destination, "15551234");
    }

    #[tokio::test]
    async fn native_transaction_rejection_resets_session() {
        let h = connected_harness().await;
        h.provider.reject_start.store(true, Ordering::SeqCst);

        let result = h.coordinator.start_call("15551234").await;
        assert!(matches!(
            result,
            Err(ClientError::NativeActionRejected { .. })
        ));

        let session = h.coordinator.session().await;
        assert_eq!(session.phase, CallPhase::Idle);
        assert!(session.native_call_id.is_none());
        assert!(session.destination.is_empty());
    }

    #[tokio::test]
    async fn outgoing_call_happy_path_reaches_active() {
        let h = connected_harness().await;
        let native_call_id = active_call(&h).await;

        let session = h.coordinator.session().await;
        assert_eq!(session.signaling_call_id.as_deref(), Some("S1"));
        assert_eq!(h.signaling.placed_to(), vec!["15551234".to_string()]);
        assert_eq!(h.provider.connected_reports(native_call_id), 1);
    }

    #[tokio::test]
    async fn outgoing_call_failure_reports_failed_and_resets() {
        let h = connected_harness().await;
        h.signaling.queue_place(Err(ClientError::signaling("busy")));

        let native_call_id = h.coordinator.start_call("15551234").await.unwrap();
        h.coordinator.on_native_call_reported(native_call_id).await;

        assert_eq!(h.coordinator.phase().await, CallPhase::Idle);
        assert_eq!(
            h.provider.ended_reports(),
            vec![Report::Ended(native_call_id, NativeEndReason::Failed)]
        );
        assert!(h.coordinator.session().await.native_call_id.is_none());
    }

    #[tokio::test]
    async fn confirmation_in_idle_phase_is_dropped() {
        let h = connected_harness().await;
        h.coordinator.on_native_call_reported(Uuid::new_v4()).await;

        assert_eq!(h.coordinator.phase().await, CallPhase::Idle);
        assert!(h.signaling.placed_to().is_empty());
    }

    #[tokio::test]
    async fn confirmation_with_stale_id_is_dropped() {
        let h = connected_harness().await;
        h.coordinator.start_call("15551234").await.unwrap();

        h.coordinator.on_native_call_reported(Uuid::new_v4()).await;

        assert_eq!(h.coordinator.phase().await, CallPhase::Connecting);
        assert!(h.signaling.placed_to().is_empty());
    }

    #[tokio::test]
    async fn end_call_requires_active_phase() {
        let h = connected_harness().await;
        let result = h.coordinator.end_call().await;
        assert!(matches!(result, Err(ClientError::InvalidState { .. })));

        h.coordinator.start_call("15551234").await.unwrap();
        let result = h.coordinator.end_call().await;
        assert!(matches!(result, Err(ClientError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn end_call_hangs_up_and_tears_down_native_call() {
        let h = connected_harness().await;
        let native_call_id = active_call(&h).await;

        assert_ok!(h.coordinator.end_call().await);

        assert_eq!(h.signaling.hangups(), vec!["S1".to_string()]);
        assert_eq!(
            h.provider.end_requests.lock().unwrap().clone(),
            vec![native_call_id]
        );
        let session = h.coordinator.session().await;
        assert_eq!(session.phase, CallPhase::Idle);
        assert!(session.signaling_call_id.is_none());
    }

    #[tokio::test]
    async fn end_call_with_hangup_error_still_tears_down() {
        let h = connected_harness().await;
        let native_call_id = active_call(&h).await;
        h.signaling.queue_hangup(Err(ClientError::signaling("timeout")));

        assert_ok!(h.coordinator.end_call().await);

        assert_eq!(
            h.provider.end_requests.lock().unwrap().clone(),
            vec![native_call_id]
        );
        assert_eq!(h.coordinator.phase().await, CallPhase::Idle);
    }

    #[tokio::test]
    async fn native_reset_clears_session_from_connecting_and_active() {
        let h = connected_harness().await;
        h.coordinator.start_call("15551234").await.unwrap();
        h.coordinator.on_native_reset().await;
        assert_eq!(h.coordinator.phase().await, CallPhase::Idle);

        let _ = active_call(&h).await;
        h.coordinator.on_native_reset().await;
        let session = h.coordinator.session().await;
        assert_eq!(session.phase, CallPhase::Idle);
        assert!(session.native_call_id.is_none());
        assert!(session.signaling_call_id.is_none());
    }

    #[tokio::test]
    async fn native_reset_is_idempotent_from_idle() {
        let h = connected_harness().await;
        h.coordinator.on_native_reset().await;
        h.coordinator.on_native_reset().await;
        assert_eq!(h.coordinator.phase().await, CallPhase::Idle);
    }

    #[tokio::test]
    async fn reset_during_inflight_dial_discards_sdk_result() {
        let h = connected_harness().await;
        let gate = h.signaling.gate_place();
        let native_call_id = h.coordinator.start_call("15551234").await.unwrap();

        let coordinator = h.coordinator.clone();
        let dial = tokio::spawn(async move {
            coordinator.on_native_call_reported(native_call_id).await;
        });

        // Wait until the outgoing request is parked on the gate.
        for _ in 0..100 {
            if !h.signaling.placed_to().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert_eq!(h.signaling.placed_to(), vec!["15551234".to_string()]);

        h.coordinator.on_native_reset().await;
        gate.add_permits(1);
        dial.await.unwrap();

        let session = h.coordinator.session().await;
        assert_eq!(session.phase, CallPhase::Idle);
        assert!(session.signaling_call_id.is_none());
        assert_eq!(h.provider.connected_reports(native_call_id), 0);
    }

    #[tokio::test]
    async fn hangup_for_unknown_call_id_is_noop() {
        let h = connected_harness().await;
        let _ = active_call(&h).await;

        h.coordinator
            .on_signaling_hangup("S2", None, "remote ended")
            .await;

        assert_eq!(h.coordinator.phase().await, CallPhase::Active);
        assert!(h.provider.ended_reports().is_empty());
    }

    #[tokio::test]
    async fn remote_hangup_ends_active_call() {
        let h = connected_harness().await;
        let native_call_id = active_call(&h).await;

        h.coordinator
            .on_signaling_hangup("S1", Some("good"), "remote ended")
            .await;

        assert_eq!(
            h.provider.ended_reports(),
            vec![Report::Ended(native_call_id, NativeEndReason::RemoteEnded)]
        );
        let session = h.coordinator.session().await;
        assert_eq!(session.phase, CallPhase::Idle);
        assert!(session.native_call_id.is_none());
    }

    #[tokio::test]
    async fn late_hangup_after_teardown_is_noop() {
        let h = connected_harness().await;
        let _ = active_call(&h).await;
        assert_ok!(h.coordinator.end_call().await);

        h.coordinator
            .on_signaling_hangup("S1", None, "remote ended")
            .await;

        assert_eq!(h.coordinator.phase().await, CallPhase::Idle);
        assert!(h.provider.ended_reports().is_empty());
    }

    #[tokio::test]
    async fn session_error_blocks_new_calls_but_not_the_active_one() {
        let h = connected_harness().await;
        let _ = active_call(&h).await;

        h.coordinator
            .on_signaling_session_error(SessionErrorReason::PingTimeout)
            .await;

        // The in-progress call keeps running.
        assert_eq!(h.coordinator.phase().await, CallPhase::Active);
        assert_eq!(
            h.coordinator.connection_status().await,
            ConnectionStatus::Failed(SessionErrorReason::PingTimeout)
        );

        assert_ok!(h.coordinator.end_call().await);
        let result = h.coordinator.start_call("15551234").await;
        assert!(matches!(result, Err(ClientError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn happy_path_emits_phase_and_call_events() {
        let h = connected_harness().await;
        let mut events = h.coordinator.subscribe_simple();

        let native_call_id = active_call(&h).await;
        assert_ok!(h.coordinator.end_call().await);

        let mut phases = Vec::new();
        let mut connected = 0;
        let mut ended = None;
        while ended.is_none() {
            let event = tokio::time::timeout(Duration::from_secs(1), events.next())
                .await
                .expect("event stream should produce the full lifecycle")
                .expect("event stream open");
            match event {
                CoordinatorEvent::CallPhaseChanged { info } => phases.push(info.new_phase),
                CoordinatorEvent::CallConnected {
                    native_call_id: id, ..
                } => {
                    assert_eq!(id, native_call_id);
                    connected += 1;
                }
                CoordinatorEvent::CallEnded { reason, .. } => ended = Some(reason),
                _ => {}
            }
        }

        assert_eq!(
            phases,
            vec![
                CallPhase::Connecting,
                CallPhase::Dialing,
                CallPhase::Active,
                CallPhase::Ending,
                CallPhase::Idle,
            ]
        );
        assert_eq!(connected, 1);
        assert_eq!(ended, Some(CallEndReason::LocalHangup));
    }
}
