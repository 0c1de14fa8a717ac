//! UI-facing presentation of coordinator events
//!
//! The coordinator emits typed events only; this layer folds them into the
//! two observables a minimal calling UI binds to: a human-readable `status`
//! line and an `is_calling` flag. Keeping the string formatting here means
//! the core state machine never carries display text.

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::events::{CoordinatorEvent, EventStream};
use crate::session::ConnectionStatus;
use crate::signaling::SessionErrorReason;

/// Display state for a calling UI
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiState {
    /// Human-readable connection/error state
    pub status: String,
    /// Whether a call is currently in progress
    pub is_calling: bool,
}

/// Human-readable text for a signaling session error
pub fn session_error_text(reason: SessionErrorReason) -> &'static str {
    match reason {
        SessionErrorReason::TokenExpired => "Expired Token",
        SessionErrorReason::PingTimeout | SessionErrorReason::TransportClosed => "Network Error",
        SessionErrorReason::Unknown => "Unknown",
    }
}

/// Folds coordinator events into a watchable [`UiState`]
pub struct StatusPresenter {
    state_rx: watch::Receiver<UiState>,
    task: JoinHandle<()>,
}

impl StatusPresenter {
    /// Spawn a presenter over a coordinator event stream
    pub fn spawn(mut events: EventStream) -> Self {
        let (state_tx, state_rx) = watch::channel(UiState::default());
        let task = tokio::spawn(async move {
            while let Some(result) = events.next().await {
                // A lagged receiver skips events; the next one resyncs us.
                let Ok(event) = result else { continue };
                let mut state = state_tx.borrow().clone();
                apply(&mut state, &event);
                let _ = state_tx.send(state);
            }
        });
        Self { state_rx, task }
    }

    /// Watch receiver for UI state changes
    pub fn watch(&self) -> watch::Receiver<UiState> {
        self.state_rx.clone()
    }

    /// Current UI state snapshot
    pub fn current(&self) -> UiState {
        self.state_rx.borrow().clone()
    }

    /// Stop the presenter task
    pub fn shutdown(self) {
        self.task.abort();
    }
}

fn apply(state: &mut UiState, event: &CoordinatorEvent) {
    match event {
        CoordinatorEvent::ConnectionStatusChanged { status, .. } => match status {
            ConnectionStatus::Connected => state.status = "Connected".to_string(),
            ConnectionStatus::Disconnected => state.status = "Disconnected".to_string(),
            ConnectionStatus::Failed(reason) => {
                state.status = session_error_text(*reason).to_string()
            }
            // Nothing worth showing while session creation is in flight.
            ConnectionStatus::Connecting => {}
        },
        CoordinatorEvent::ConnectionFailed { detail, .. } => {
            state.status = detail.clone();
        }
        CoordinatorEvent::CallPhaseChanged { info } => {
            state.is_calling = info.new_phase.is_in_call();
        }
        CoordinatorEvent::ProviderReset { .. } => {
            state.is_calling = false;
        }
        CoordinatorEvent::CallConnected { .. }
        | CoordinatorEvent::CallEnded { .. }
        | CoordinatorEvent::CallFailed { .. } => {}
    }
}
