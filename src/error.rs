//! Error types for Flowerpot
//!
//! Provides a unified error type for client/server operations, plus the
//! narrower errors produced by the codec and the dispatcher.

use thiserror::Error;

use crate::dispatcher::DispatchState;
use crate::protocol::Command;

/// Result type alias using FlowerpotError
pub type Result<T> = std::result::Result<T, FlowerpotError>;

/// Unified error type for Flowerpot operations
#[derive(Debug, Error)]
pub enum FlowerpotError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Dispatch Errors
    // -------------------------------------------------------------------------
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Reasons a request frame fails validation.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Declared length is zero, carries no command byte, or disagrees with
    /// the number of body bytes supplied.
    #[error("length mismatch: declared {declared}, got {actual} body bytes")]
    LengthMismatch { declared: u8, actual: usize },

    /// Declared length does not fit the command buffer.
    #[error("frame too long: declared {declared} bytes (max {max})")]
    TooLong { declared: u8, max: usize },

    /// Command requires a quantity byte that was not sent.
    #[error("command {0} requires a quantity")]
    MissingQuantity(Command),

    #[error("unknown command byte: 0x{0:02x}")]
    UnknownCommand(u8),
}

/// Fatal failure of a single request/response cycle.
///
/// Malformed requests are not errors; they are answered with the error frame
/// and reported through `HandledOutcome::Malformed`.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("transport failure in state {state}: {source}")]
    Transport {
        state: DispatchState,
        #[source]
        source: std::io::Error,
    },
}
