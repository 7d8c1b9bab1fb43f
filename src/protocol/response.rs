//! Response definitions
//!
//! Represents responses to clients.

use std::fmt;

use crate::error::FlowerpotError;

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServerStatus {
    /// Server completed command successfully
    Ok = 0,

    /// An error occurred while retrieving or executing command
    Err = 255,
}

impl ServerStatus {
    pub fn is_ok(self) -> bool {
        self == ServerStatus::Ok
    }
}

impl TryFrom<u8> for ServerStatus {
    type Error = FlowerpotError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0 => Ok(ServerStatus::Ok),
            255 => Ok(ServerStatus::Err),
            other => Err(FlowerpotError::Protocol(format!(
                "Unknown response status: 0x{:02x}",
                other
            ))),
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerStatus::Ok => f.write_str("OK"),
            ServerStatus::Err => f.write_str("ERR"),
        }
    }
}

/// A response as seen by the client
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Response {
    /// Status code
    pub status: ServerStatus,

    /// Sensor value, present only for successful data-bearing commands
    pub data: Option<f32>,
}

impl Response {
    /// Create an OK response with optional data
    pub fn ok(data: Option<f32>) -> Self {
        Self {
            status: ServerStatus::Ok,
            data,
        }
    }

    /// Create an ERR response
    pub fn error() -> Self {
        Self {
            status: ServerStatus::Err,
            data: None,
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data {
            Some(data) => write!(f, "status={} data={}", self.status, data),
            None => write!(f, "status={}", self.status),
        }
    }
}
