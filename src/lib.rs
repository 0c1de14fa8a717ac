//! # voice-client-core: Call-Session Coordination Layer
//!
//! This crate is the orchestration layer of a minimal VoIP calling client:
//! it sits between a native call-management subsystem (the OS facility that
//! shows calls in the system call UI and routes audio) and a third-party
//! voice-signaling SDK (session login, call setup and teardown over the
//! network), and merges their asynchronous callbacks plus user intents into
//! one consistent call-session state machine.
//!
//! Both external systems are trait seams ([`NativeProvider`],
//! [`SignalingClient`]); the crate implements neither a signaling protocol
//! nor a media pipeline.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voice_client_core::{CoordinatorBuilder, NativeProvider, SignalingClient};
//!
//! # async fn example(
//! #     signaling: Arc<dyn SignalingClient>,
//! #     provider: Arc<dyn NativeProvider>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let (native_tx, native_rx) = tokio::sync::mpsc::unbounded_channel();
//! let (signaling_tx, signaling_rx) = tokio::sync::mpsc::unbounded_channel();
//!
//! let handle = CoordinatorBuilder::new()
//!     .credential("JWT")
//!     .signaling(signaling)
//!     .native_provider(provider)
//!     .native_events(native_rx)
//!     .signaling_events(signaling_rx)
//!     .build()?;
//!
//! let coordinator = handle.coordinator();
//! coordinator.connect().await?;
//!
//! // Place a call; completion is observed through the event stream.
//! let mut events = coordinator.subscribe_simple();
//! coordinator.start_call("15551234").await?;
//! while let Some(event) = events.next().await {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`SessionCoordinator`] owns the single [`CallSession`] and its phase
//!   state machine; every transition runs under one lock so callbacks from
//!   the native subsystem and the SDK's network thread cannot race.
//! - [`NativeCallBridge`] is a stateless translator in front of the native
//!   provider: transactions out, delegate callbacks in.
//! - [`StatusPresenter`] turns typed events into the strings and flags a UI
//!   binds to; the core never formats display text.

#![warn(missing_docs)]

pub mod builder;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod native;
pub mod presenter;
pub mod session;
pub mod signaling;

// Re-export main types
pub use builder::{CoordinatorBuilder, CoordinatorHandle};
pub use coordinator::{CoordinatorConfig, SessionCoordinator};
pub use error::{ClientError, ClientResult};
pub use events::{
    CallEndReason, CoordinatorEvent, EventEmitter, EventIterator, EventStream, PhaseChangeInfo,
};
pub use native::{
    HandleType, NativeCallBridge, NativeEndReason, NativeEvent, NativeProvider, ProviderConfig,
};
pub use presenter::{session_error_text, StatusPresenter, UiState};
pub use session::{CallPhase, CallSession, ConnectionStatus, SignalingCallId};
pub use signaling::{destination_map, SessionErrorReason, SignalingClient, SignalingEvent};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
