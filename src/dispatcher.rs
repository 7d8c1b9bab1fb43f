//! Command Dispatcher
//!
//! Drives exactly one request/response exchange over a [`Transport`].
//!
//! ## Per-call state machine
//!
//! ```text
//! AwaitLength ─► AwaitBody ─► Decoded ─► Dispatched ─► ResponseSent ─┬─► ConnectionClosed (QUIT)
//!      │             │           │                                   └─► Idle
//!      └─────────────┴───────────┴──► error frame [2, 255], Malformed outcome
//! ```
//!
//! Nothing survives between calls. The core enforces no timeout; a stalled
//! read or a slow handler blocks for as long as the transport allows.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::error::{DecodeError, DispatchError};
use crate::network::Transport;
use crate::protocol::{
    decode_request, encode_response, validate_length, Command, ServerStatus, ERROR_FRAME,
    MAX_CMD_LENGTH,
};

/// Device-control callback that executes a decoded command
///
/// Must return promptly; the dispatcher places no bound on it. The returned
/// float is only sent when the command carries response data.
pub trait Handler {
    fn handle(&mut self, command: Command, qty: u8) -> (ServerStatus, f32);
}

impl<F> Handler for F
where
    F: FnMut(Command, u8) -> (ServerStatus, f32),
{
    fn handle(&mut self, command: Command, qty: u8) -> (ServerStatus, f32) {
        self(command, qty)
    }
}

/// Where a request/response cycle currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    AwaitLength,
    AwaitBody,
    Decoded,
    Dispatched,
    ResponseSent,
    ConnectionClosed,
    Idle,
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DispatchState::AwaitLength => "AwaitLength",
            DispatchState::AwaitBody => "AwaitBody",
            DispatchState::Decoded => "Decoded",
            DispatchState::Dispatched => "Dispatched",
            DispatchState::ResponseSent => "ResponseSent",
            DispatchState::ConnectionClosed => "ConnectionClosed",
            DispatchState::Idle => "Idle",
        };
        f.write_str(name)
    }
}

/// Why a request was answered with the error frame
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedRequest {
    #[error("end of stream before length byte")]
    EndOfStream,

    #[error("short read: expected {expected} body bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    #[error("transport read failed: {0:?}")]
    Transport(io::ErrorKind),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Result of one call to [`handle_one_request`]
#[derive(Debug, Clone, PartialEq)]
pub enum HandledOutcome {
    /// A well-formed request was executed and answered
    Handled {
        command: Command,
        qty: u8,

        /// Status the handler returned (ERR is still a handled request)
        status: ServerStatus,

        /// True when the command was QUIT and the connection was closed
        closed: bool,
    },

    /// The request failed validation and the error frame was sent
    Malformed(MalformedRequest),
}

impl HandledOutcome {
    /// True only for a fully well-formed exchange
    pub fn is_handled(&self) -> bool {
        matches!(self, HandledOutcome::Handled { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, HandledOutcome::Handled { closed: true, .. })
    }
}

/// Read one request from `conn`, run it through `handler` and write the reply
///
/// Malformed input never escapes as an error: it is answered with
/// `[2, 255]` and reported as [`HandledOutcome::Malformed`]. Only a failure
/// to write or flush a frame is returned as `Err`.
pub fn handle_one_request<T, H>(
    conn: &mut T,
    handler: &mut H,
) -> Result<HandledOutcome, DispatchError>
where
    T: Transport + ?Sized,
    H: Handler + ?Sized,
{
    // AwaitLength
    let declared = match conn.read_byte() {
        Ok(Some(byte)) => byte,
        Ok(None) => return reject(conn, DispatchState::AwaitLength, MalformedRequest::EndOfStream),
        Err(e) => {
            return reject(
                conn,
                DispatchState::AwaitLength,
                MalformedRequest::Transport(e.kind()),
            )
        }
    };

    // Oversize and empty frames are refused before the body is touched
    let body_len = match validate_length(declared) {
        Ok(len) => len,
        Err(e) => return reject(conn, DispatchState::AwaitLength, e.into()),
    };

    // AwaitBody
    let mut body = [0u8; MAX_CMD_LENGTH];
    let read = match conn.read_up_to(&mut body[..body_len]) {
        Ok(n) => n,
        Err(e) => {
            return reject(
                conn,
                DispatchState::AwaitBody,
                MalformedRequest::Transport(e.kind()),
            )
        }
    };
    tracing::trace!("Raw command: {:02x?} (length={})", &body[..read], read);

    if read != body_len {
        return reject(
            conn,
            DispatchState::AwaitBody,
            MalformedRequest::ShortRead {
                expected: body_len,
                actual: read,
            },
        );
    }

    // Decoded
    let request = match decode_request(declared, &body[..read]) {
        Ok(request) => request,
        Err(e) => return reject(conn, DispatchState::Decoded, e.into()),
    };
    tracing::debug!("Handling command: {} (qty={})", request.command, request.qty);

    // Dispatched
    let (status, data) = handler.handle(request.command, request.qty);
    let has_data = request.command.has_data();
    if has_data {
        tracing::debug!("Data={}", data);
    }

    let frame = encode_response(status, has_data, data);
    tracing::trace!("Raw response: {:02x?}", frame.as_bytes());
    send(conn, DispatchState::Dispatched, frame.as_bytes())?;

    // ResponseSent
    let closed = request.command == Command::Quit;
    if closed {
        if let Err(e) = conn.close() {
            tracing::debug!("Error closing connection after QUIT: {}", e);
        }
    }

    let next = if closed {
        DispatchState::ConnectionClosed
    } else {
        DispatchState::Idle
    };
    tracing::trace!("{} -> {}", DispatchState::ResponseSent, next);

    Ok(HandledOutcome::Handled {
        command: request.command,
        qty: request.qty,
        status,
        closed,
    })
}

/// Answer a malformed request with the canonical error frame
fn reject<T: Transport + ?Sized>(
    conn: &mut T,
    state: DispatchState,
    reason: MalformedRequest,
) -> Result<HandledOutcome, DispatchError> {
    tracing::debug!("Rejecting request in state {}: {}", state, reason);
    send(conn, state, &ERROR_FRAME)?;
    Ok(HandledOutcome::Malformed(reason))
}

fn send<T: Transport + ?Sized>(
    conn: &mut T,
    state: DispatchState,
    bytes: &[u8],
) -> Result<(), DispatchError> {
    conn.write_all(bytes)
        .and_then(|_| conn.flush())
        .map_err(|source| DispatchError::Transport { state, source })
}
