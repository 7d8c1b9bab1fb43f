//! Flowerpot client
//!
//! Blocking TCP client that sends one command at a time and waits for the
//! reply.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};

use crate::error::{FlowerpotError, Result};
use crate::protocol::{read_response, write_request, Command, RequestMessage, Response};

/// A connection to a flowerpot server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    peer_addr: String,
    closed: bool,
}

impl Client {
    /// Connect to a server
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| FlowerpotError::Network(format!("failed to connect: {}", e)))?;
        stream.set_nodelay(true)?;

        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        tracing::debug!("Connected to {}", peer_addr);

        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            peer_addr,
            closed: false,
        })
    }

    /// Send a message and wait for the response
    ///
    /// Sending QUIT closes this side of the connection once the reply arrives.
    pub fn send(&mut self, message: &RequestMessage) -> Result<Response> {
        if self.closed {
            return Err(FlowerpotError::Network(
                "connection already closed".to_string(),
            ));
        }

        write_request(&mut self.writer, message)?;
        let response = read_response(&mut self.reader)?;
        tracing::debug!(
            "Sent {} (qty={:?}) to {}: {}",
            message.command(),
            message.qty(),
            self.peer_addr,
            response
        );

        if message.command() == Command::Quit {
            self.close();
        }

        Ok(response)
    }

    /// Send a command that takes no quantity
    pub fn command(&mut self, command: Command) -> Result<Response> {
        self.send(&RequestMessage::simple(command)?)
    }

    /// Ask the device to dispense `ml` millilitres of water
    pub fn dispense_water(&mut self, ml: u8) -> Result<Response> {
        self.send(&RequestMessage::new(Command::DispenseWater, Some(ml))?)
    }

    /// Tell the server to close the connection
    pub fn quit(&mut self) -> Result<Response> {
        self.command(Command::Quit)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    /// Close the connection between the client and the server
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
    }
}
