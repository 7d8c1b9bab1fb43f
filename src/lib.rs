//! # Flowerpot
//!
//! Remote-control protocol for a networked flowerpot:
//! - Sensor queries (temperature, humidity, light, water, moisture, fertilizer)
//! - One actuator command (dispense water)
//! - Length-prefixed single-byte command frames, at most 20 bytes
//! - One client at a time over a byte-oriented transport
//! - Client-side periodic sensor monitoring with a bounded history
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │              (one client, polled per cycle)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Transport
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Command Dispatcher                           │
//! │          (one request/response per call)                     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Codec     │          │  Handler    │
//!   │   (pure)    │          │  (device)   │
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod dispatcher;
pub mod network;
pub mod device;
pub mod client;
pub mod monitor;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{DecodeError, DispatchError, FlowerpotError, Result};
pub use config::Config;
pub use dispatcher::{handle_one_request, Handler, HandledOutcome};
pub use client::Client;
pub use monitor::{Monitor, PollSchedule};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of Flowerpot
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
