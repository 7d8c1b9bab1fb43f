//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - One listener, polled without blocking
//! - At most one client at a time, one request per poll cycle
//! - Requests routed through the dispatcher to a `Handler`

mod transport;
mod server;
mod connection;

pub use transport::Transport;
pub use server::{Server, ShutdownHandle};
pub use connection::{Connection, Readiness};
