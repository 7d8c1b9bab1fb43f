//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬──────────────────┐
//! │ Len (1)  │ Cmd (1)  │ Qty (1, optional)│
//! └──────────┴──────────┴──────────────────┘
//! ```
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Len (1)  │Status(1) │ Data (4, f32 LE, optional)  │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! In both directions the length byte is the size of the whole frame,
//! including the length byte itself.

use std::io::{Read, Write};

use bytes::{Buf, BufMut};

use super::{Command, Request, Response, ServerStatus};
use crate::error::{DecodeError, FlowerpotError, Result};

/// Maximum number of bytes in a request frame
pub const MAX_CMD_LENGTH: usize = 20;

/// Length byte + status byte
pub const RESPONSE_HEADER_LEN: usize = 2;

/// Size of the little-endian f32 data field
pub const RESPONSE_DATA_LEN: usize = std::mem::size_of::<f32>();

/// Largest possible response frame
pub const RESPONSE_MAX_LEN: usize = RESPONSE_HEADER_LEN + RESPONSE_DATA_LEN;

/// Canonical reply to any malformed request
pub const ERROR_FRAME: [u8; RESPONSE_HEADER_LEN] =
    [RESPONSE_HEADER_LEN as u8, ServerStatus::Err as u8];

// =============================================================================
// Request Decoding (server side)
// =============================================================================

/// Check a declared request length before any body byte is read
///
/// Returns the number of body bytes that follow the length byte.
pub fn validate_length(declared: u8) -> std::result::Result<usize, DecodeError> {
    if declared as usize >= MAX_CMD_LENGTH {
        return Err(DecodeError::TooLong {
            declared,
            max: MAX_CMD_LENGTH - 1,
        });
    }

    // A frame needs at least the length byte and a command byte
    if declared < 2 {
        return Err(DecodeError::LengthMismatch {
            declared,
            actual: 0,
        });
    }

    Ok(declared as usize - 1)
}

/// Decode a request body (the bytes after the length byte)
pub fn decode_request(declared: u8, body: &[u8]) -> std::result::Result<Request, DecodeError> {
    let expected = validate_length(declared).map_err(|e| match e {
        DecodeError::LengthMismatch { declared, .. } => DecodeError::LengthMismatch {
            declared,
            actual: body.len(),
        },
        other => other,
    })?;

    if body.len() != expected {
        return Err(DecodeError::LengthMismatch {
            declared,
            actual: body.len(),
        });
    }

    let command = Command::try_from(body[0])?;

    if command.requires_qty() && body.len() < 2 {
        return Err(DecodeError::MissingQuantity(command));
    }

    let qty = body.get(1).copied().unwrap_or(0);

    Ok(Request { command, qty })
}

// =============================================================================
// Response Encoding (server side)
// =============================================================================

/// A fully encoded response frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseFrame {
    buf: [u8; RESPONSE_MAX_LEN],
    len: usize,
}

#[allow(clippy::len_without_is_empty)]
impl ResponseFrame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }
}

/// Encode a response frame
///
/// Format: len (1) + status (1) + data (4, only if `has_data`)
pub fn encode_response(status: ServerStatus, has_data: bool, data: f32) -> ResponseFrame {
    let len = if has_data {
        RESPONSE_MAX_LEN
    } else {
        RESPONSE_HEADER_LEN
    };

    let mut buf = [0u8; RESPONSE_MAX_LEN];
    {
        let mut cursor = &mut buf[..];
        cursor.put_u8(len as u8);
        cursor.put_u8(status as u8);
        if has_data {
            cursor.put_f32_le(data);
        }
    }

    ResponseFrame { buf, len }
}

// =============================================================================
// Request Encoding (client side)
// =============================================================================

/// A command to send to the server, with its quantity if it needs one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestMessage {
    command: Command,
    qty: Option<u8>,
}

impl RequestMessage {
    /// Build a message, rejecting a missing quantity for commands that need one
    ///
    /// A quantity passed with a command that takes none is dropped.
    pub fn new(command: Command, qty: Option<u8>) -> Result<Self> {
        if command.requires_qty() && qty.is_none() {
            return Err(DecodeError::MissingQuantity(command).into());
        }

        let qty = if command.requires_qty() { qty } else { None };
        Ok(Self { command, qty })
    }

    /// Message for a command without a quantity
    pub fn simple(command: Command) -> Result<Self> {
        Self::new(command, None)
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn qty(&self) -> Option<u8> {
        self.qty
    }
}

/// Encode a request to bytes
///
/// Format: len (1) + cmd (1) + qty (1, only for commands that require one)
pub fn encode_request(message: &RequestMessage) -> Vec<u8> {
    let mut frame = Vec::with_capacity(3);
    frame.put_u8(0);
    frame.put_u8(message.command.wire_byte());
    if let Some(qty) = message.qty {
        frame.put_u8(qty);
    }
    frame[0] = frame.len() as u8;
    frame
}

// =============================================================================
// Response Decoding (client side)
// =============================================================================

/// Decode a complete response frame
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    if bytes.len() < RESPONSE_HEADER_LEN {
        return Err(FlowerpotError::Protocol(format!(
            "Incomplete response: expected at least {} bytes, got {}",
            RESPONSE_HEADER_LEN,
            bytes.len()
        )));
    }

    let declared = bytes[0] as usize;
    if declared != bytes.len() {
        return Err(FlowerpotError::Protocol(format!(
            "Malformed response: declared length {}, got {} bytes",
            declared,
            bytes.len()
        )));
    }

    if declared != RESPONSE_HEADER_LEN && declared != RESPONSE_MAX_LEN {
        return Err(FlowerpotError::Protocol(format!(
            "Invalid response length: {}",
            declared
        )));
    }

    let status = ServerStatus::try_from(bytes[1])?;

    let data = if status.is_ok() && declared == RESPONSE_MAX_LEN {
        let mut field = &bytes[RESPONSE_HEADER_LEN..];
        Some(field.get_f32_le())
    } else {
        None
    };

    Ok(Response { status, data })
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Write a request to a stream
pub fn write_request<W: Write>(writer: &mut W, message: &RequestMessage) -> Result<()> {
    let bytes = encode_request(message);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
///
/// Blocks until a complete frame is received or an error occurs
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let mut frame = [0u8; RESPONSE_MAX_LEN];
    reader.read_exact(&mut frame[..1])?;

    let len = frame[0] as usize;
    if len != RESPONSE_HEADER_LEN && len != RESPONSE_MAX_LEN {
        return Err(FlowerpotError::Protocol(format!(
            "Invalid response length: {}",
            len
        )));
    }

    reader.read_exact(&mut frame[1..len])?;
    decode_response(&frame[..len])
}
