//! Error types for telemetry capture and processing.
//!
//! Errors are split by the layer that produces them so callers can apply the
//! right propagation policy:
//!
//! - **Decode Errors** ([`DecodeError`]): one bad or foreign datagram. Always
//!   non-fatal; the capture loop logs and drops the packet.
//! - **Transport Errors** ([`TransportError`]): socket failures. A bind
//!   failure stops the capture loop from starting, a receive failure loses
//!   one datagram.
//! - **Store Errors** ([`StoreError`]): only produced by the JSON dump, which
//!   is best-effort.
//!
//! [`TelemetryError`] wraps all of them for APIs that can fail in more than
//! one layer.
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use slipstream::{DecodeError, TelemetryError};
//!
//! let error: TelemetryError = DecodeError::TooShort { expected: 29, actual: 12 }.into();
//! assert!(!error.is_retryable());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for telemetry operations.
pub type Result<T, E = TelemetryError> = std::result::Result<T, E>;

/// Failure to turn one datagram into a typed packet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Packet too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    #[error("Malformed packet while reading {context} at offset {offset}")]
    Malformed { context: &'static str, offset: usize },

    #[error("Unknown packet type id {packet_id}")]
    UnknownType { packet_id: u8 },

    #[error("Unsupported packet format {format}")]
    UnsupportedFormat { format: u16 },
}

/// Socket level failures.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to bind UDP socket on {addr}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("UDP receive failed")]
    ReceiveFailed {
        #[source]
        source: std::io::Error,
    },
}

/// Failures while exporting the store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to serialize store snapshot")]
    SerializationFailed {
        #[source]
        source: serde_json::Error,
    },

    #[error("Store dump I/O error: {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Main error type for telemetry operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TelemetryError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid configuration: {reason}")]
    Config {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl TelemetryError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TelemetryError::Decode(_) => false,
            TelemetryError::Transport(TransportError::BindFailed { .. }) => true,
            TelemetryError::Transport(TransportError::ReceiveFailed { .. }) => true,
            TelemetryError::Store(StoreError::Io { .. }) => true,
            TelemetryError::Store(StoreError::SerializationFailed { .. }) => false,
            TelemetryError::Config { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TelemetryError::Decode(DecodeError::UnsupportedFormat { .. }) => vec![
                "Set the in-game UDP format to 2025",
                "Check that no other game is sending to the same port",
            ],
            TelemetryError::Decode(_) => vec![
                "Verify the game's UDP telemetry settings",
                "Check for other senders on the telemetry port",
                "Capture the datagram for offline inspection",
            ],
            TelemetryError::Transport(TransportError::BindFailed { .. }) => vec![
                "Check that no other application holds the telemetry port",
                "Verify the configured bind address exists on this host",
                "Choose a different port and update the game settings",
            ],
            TelemetryError::Transport(TransportError::ReceiveFailed { .. }) => vec![
                "Check network interface status",
                "Increase the socket receive buffer size",
            ],
            TelemetryError::Store(StoreError::Io { .. }) => vec![
                "Check the dump directory exists and is writable",
                "Ensure sufficient disk space",
            ],
            TelemetryError::Store(StoreError::SerializationFailed { .. }) => {
                vec!["Report the sample values that failed to serialize"]
            }
            TelemetryError::Config { .. } => vec![
                "Check configuration file syntax",
                "Verify environment variable values",
            ],
        }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        TelemetryError::Config { reason: reason.into(), source: None }
    }

    /// Helper constructor for configuration errors with source.
    pub fn config_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        TelemetryError::Config { reason: reason.into(), source: Some(source) }
    }
}

impl DecodeError {
    /// Helper constructor for the common short-buffer case.
    pub fn too_short(expected: usize, actual: usize) -> Self {
        DecodeError::TooShort { expected, actual }
    }
}
