//! TCP Server
//!
//! Polls for one client at a time and services one request per cycle.

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::connection::{Connection, Readiness};
use crate::config::Config;
use crate::dispatcher::{handle_one_request, Handler, HandledOutcome, MalformedRequest};
use crate::error::{FlowerpotError, Result};

/// Cloneable flag that stops [`Server::run`]
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Signal the server to stop after the current cycle
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Single-client TCP server for a flowerpot
pub struct Server<H> {
    config: Config,
    listener: TcpListener,
    handler: H,
    client: Option<Connection>,
    shutdown: ShutdownHandle,
}

impl<H: Handler> Server<H> {
    /// Bind the listen address from `config`
    pub fn bind(config: Config, handler: H) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            FlowerpotError::Network(format!("failed to bind {}: {}", config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;

        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            config,
            listener,
            handler,
            client: None,
            shutdown: ShutdownHandle::default(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Consume the server, returning the handler and its final state
    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Start the server (blocking until shutdown)
    pub fn run(&mut self) -> Result<()> {
        let idle = Duration::from_millis(self.config.poll_interval_ms);

        while !self.shutdown.is_shutdown() {
            if !self.poll_once()? {
                thread::sleep(idle);
            }
        }

        if let Some(conn) = self.client.take() {
            tracing::debug!("Dropping client {} on shutdown", conn.peer_addr());
        }
        tracing::info!("Server stopped");
        Ok(())
    }

    /// Run one polling cycle. Returns false when there was nothing to do.
    pub fn poll_once(&mut self) -> Result<bool> {
        if self.client.is_none() {
            return self.accept();
        }
        let conn = match self.client.as_mut() {
            Some(conn) => conn,
            None => return Ok(false),
        };

        match conn.readiness() {
            Ok(Readiness::Ready) => {}
            Ok(Readiness::Idle) => return Ok(false),
            Ok(Readiness::Disconnected) => {
                tracing::debug!("Client {} disconnected", conn.peer_addr());
                self.client = None;
                return Ok(true);
            }
            Err(e) => {
                tracing::warn!("Error polling {}: {}", conn.peer_addr(), e);
                self.client = None;
                return Ok(true);
            }
        }

        match handle_one_request(conn, &mut self.handler) {
            Ok(HandledOutcome::Handled {
                command,
                status,
                closed,
                ..
            }) => {
                tracing::debug!("{} -> {} for {}", command, status, conn.peer_addr());
                if closed {
                    tracing::debug!("Client {} quit", conn.peer_addr());
                    self.client = None;
                }
            }
            Ok(HandledOutcome::Malformed(MalformedRequest::EndOfStream)) => {
                tracing::debug!("Client {} disconnected", conn.peer_addr());
                self.client = None;
            }
            Ok(HandledOutcome::Malformed(reason)) => {
                tracing::warn!("Malformed request from {}: {}", conn.peer_addr(), reason);
            }
            Err(e) => {
                // The client disconnected before the reply could be sent
                tracing::debug!("Dropping client {}: {}", conn.peer_addr(), e);
                self.client = None;
            }
        }

        Ok(true)
    }

    fn accept(&mut self) -> Result<bool> {
        let (stream, addr) = match self.listener.accept() {
            Ok(pair) => pair,
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(false),
            Err(e) => {
                tracing::warn!("Accept failed: {}", e);
                return Ok(false);
            }
        };

        let conn = Connection::new(stream).and_then(|mut conn| {
            conn.set_timeouts(self.config.read_timeout_ms, self.config.write_timeout_ms)?;
            Ok(conn)
        });
        let conn = match conn {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!("Failed to set up connection from {}: {}", addr, e);
                return Ok(true);
            }
        };
        tracing::debug!("Connection established from {}", addr);

        self.client = Some(conn);
        Ok(true)
    }
}
