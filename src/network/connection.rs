//! Connection Handler
//!
//! TCP implementation of the transport contract for a single client.

use std::io::{self, BufReader, BufWriter, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use super::transport::{self, Transport};
use crate::error::Result;

/// Whether a client has bytes waiting, checked without blocking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// At least one byte can be read
    Ready,

    /// Connected, nothing to read yet
    Idle,

    /// Peer closed the connection
    Disconnected,
}

/// A single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered so a frame leaves in one segment on flush)
    writer: BufWriter<TcpStream>,

    /// Peer address for logging
    peer_addr: String,

    /// Set once `close` has run
    closed: bool,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O on a blocking stream
    pub fn new(stream: TcpStream) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Accepted sockets may inherit non-blocking mode from the listener
        stream.set_nonblocking(false)?;

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            peer_addr,
            closed: false,
        })
    }

    /// Configure socket timeouts. Zero leaves the timeout disabled.
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let read_stream = self.reader.get_ref();
        let write_stream = self.writer.get_ref();

        if read_ms > 0 {
            read_stream.set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            write_stream.set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }

        Ok(())
    }

    /// Check for pending input without blocking
    pub fn readiness(&mut self) -> Result<Readiness> {
        if self.closed {
            return Ok(Readiness::Disconnected);
        }
        if !self.reader.buffer().is_empty() {
            return Ok(Readiness::Ready);
        }

        let stream = self.reader.get_ref();
        stream.set_nonblocking(true)?;
        let mut peeked = [0u8; 1];
        let result = stream.peek(&mut peeked);
        stream.set_nonblocking(false)?;

        match result {
            Ok(0) => Ok(Readiness::Disconnected),
            Ok(_) => Ok(Readiness::Ready),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Ok(Readiness::Idle),
            Err(ref e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted
                ) =>
            {
                Ok(Readiness::Disconnected)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Transport for Connection {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if self.closed {
            return Ok(None);
        }
        let mut byte = [0u8; 1];
        match transport::read_up_to(&mut self.reader, &mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    fn read_up_to(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed {
            return Ok(0);
        }
        transport::read_up_to(&mut self.reader, buf)
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.writer.flush()?;
        match self.writer.get_ref().shutdown(Shutdown::Both) {
            Err(ref e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}
