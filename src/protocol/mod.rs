//! Protocol Module
//!
//! Defines the wire protocol between the flowerpot and its client.
//!
//! ## Request Format
//! ```text
//! ┌──────────┬──────────┬──────────────────┐
//! │ Len (1)  │ Cmd (1)  │ Qty (1, optional)│
//! └──────────┴──────────┴──────────────────┘
//! ```
//!
//! ### Commands
//! - 't': GET_TEMPERATURE
//! - 'h': GET_HUMIDITY
//! - 'l': GET_LIGHT
//! - 'w': GET_WATER
//! - 'm': GET_MOISTURE
//! - 'f': GET_FERTILIZER
//! - 'W': DISPENSE_WATER - Qty: millilitres
//! - 'Q': QUIT
//!
//! ## Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Len (1)  │Status(1) │ Data (4, f32 LE, optional)  │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: OK
//! - 0xFF: ERR

mod command;
mod response;
mod codec;

pub use command::{Command, Request};
pub use response::{Response, ServerStatus};
pub use codec::{
    decode_request, decode_response, encode_request, encode_response, read_response,
    validate_length, write_request, RequestMessage, ResponseFrame, ERROR_FRAME, MAX_CMD_LENGTH,
    RESPONSE_DATA_LEN, RESPONSE_HEADER_LEN, RESPONSE_MAX_LEN,
};
