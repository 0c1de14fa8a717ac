//! Error types for the voice client coordination layer

use thiserror::Error;

/// Result type for coordinator operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the call-session coordinator
///
/// Errors are surfaced, not retried: a failed signaling request or a rejected
/// native transaction ends the attempt and the caller decides what to do next.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Operation is not valid in the session's current phase
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// The destination handle was empty or unusable
    #[error("Invalid destination: {message}")]
    InvalidDestination { message: String },

    /// A request to the signaling SDK failed
    #[error("Signaling request failed: {detail}")]
    SignalingRequestFailed { detail: String },

    /// The native call-management subsystem rejected a transaction
    #[error("Native call action rejected: {detail}")]
    NativeActionRejected { detail: String },

    /// The signaling session is no longer usable
    #[error("Connection lost: {reason}")]
    ConnectionLost { reason: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ClientError {
    /// Create an invalid state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create an invalid destination error
    pub fn invalid_destination(message: impl Into<String>) -> Self {
        Self::InvalidDestination {
            message: message.into(),
        }
    }

    /// Create a signaling request error
    pub fn signaling(detail: impl Into<String>) -> Self {
        Self::SignalingRequestFailed {
            detail: detail.into(),
        }
    }

    /// Create a native action rejection error
    pub fn native_rejected(detail: impl Into<String>) -> Self {
        Self::NativeActionRejected {
            detail: detail.into(),
        }
    }

    /// Create a connection lost error
    pub fn connection_lost(reason: impl Into<String>) -> Self {
        Self::ConnectionLost {
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
