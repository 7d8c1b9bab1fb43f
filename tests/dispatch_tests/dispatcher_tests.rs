//! Tests for the Command Dispatcher
//!
//! These tests verify:
//! - Well-formed requests reach the handler and are answered
//! - Malformed requests get the canonical error frame
//! - Oversize frames are refused before the body is read
//! - QUIT closes the connection, nothing else does
//! - Transport write failures surface as errors

use std::io::{self, Cursor, Read};

use flowerpot::dispatcher::{DispatchState, MalformedRequest};
use flowerpot::network::Transport;
use flowerpot::protocol::{Command, ServerStatus, ERROR_FRAME};
use flowerpot::{handle_one_request, DecodeError, DispatchError, HandledOutcome};

// =============================================================================
// Helper Types
// =============================================================================

/// In-memory transport recording everything the dispatcher does
#[derive(Default)]
struct MockTransport {
    input: Cursor<Vec<u8>>,
    output: Vec<u8>,
    flushes: usize,
    closed: bool,
    body_reads: usize,
    fail_writes: bool,
    body_error: Option<io::ErrorKind>,
    fail_close: bool,
}

impl MockTransport {
    fn new(input: &[u8]) -> Self {
        Self {
            input: Cursor::new(input.to_vec()),
            ..Default::default()
        }
    }

    fn failing_writes(input: &[u8]) -> Self {
        Self {
            fail_writes: true,
            ..Self::new(input)
        }
    }

    fn failing_body(input: &[u8], kind: io::ErrorKind) -> Self {
        Self {
            body_error: Some(kind),
            ..Self::new(input)
        }
    }

    fn failing_close(input: &[u8]) -> Self {
        Self {
            fail_close: true,
            ..Self::new(input)
        }
    }

    fn remaining(&self) -> usize {
        self.input.get_ref().len() - self.input.position() as usize
    }
}

impl Transport for MockTransport {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.input.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    fn read_up_to(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.body_reads += 1;
        if let Some(kind) = self.body_error {
            return Err(io::Error::new(kind, "body read failed"));
        }
        self.input.read(buf)
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"));
        }
        self.output.extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        if self.fail_close {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "already gone"));
        }
        Ok(())
    }
}

/// Transport whose reads always fail
struct BrokenReadTransport {
    output: Vec<u8>,
}

impl Transport for BrokenReadTransport {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
    }

    fn read_up_to(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.output.extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Handler that records every call and answers with fixed values
struct RecordingHandler {
    calls: Vec<(Command, u8)>,
    status: ServerStatus,
    data: f32,
}

impl RecordingHandler {
    fn new(status: ServerStatus, data: f32) -> Self {
        Self {
            calls: Vec::new(),
            status,
            data,
        }
    }
}

impl flowerpot::Handler for RecordingHandler {
    fn handle(&mut self, command: Command, qty: u8) -> (ServerStatus, f32) {
        self.calls.push((command, qty));
        (self.status, self.data)
    }
}

fn data_frame(status: ServerStatus, data: f32) -> Vec<u8> {
    let mut frame = vec![6, status as u8];
    frame.extend_from_slice(&data.to_le_bytes());
    frame
}

// =============================================================================
// Well-formed Exchanges
// =============================================================================

#[test]
fn test_get_temperature() {
    let mut conn = MockTransport::new(&[2, b't']);
    let mut handler = RecordingHandler::new(ServerStatus::Ok, 23.5);

    let outcome = handle_one_request(&mut conn, &mut handler).unwrap();

    assert!(outcome.is_handled());
    assert_eq!(conn.output, data_frame(ServerStatus::Ok, 23.5));
    assert_eq!(handler.calls, vec![(Command::GetTemperature, 0)]);
    assert_eq!(conn.flushes, 1);
    assert!(!conn.closed);
}

#[test]
fn test_dispense_water_has_no_data() {
    let mut conn = MockTransport::new(&[3, b'W', 10]);
    let mut handler = RecordingHandler::new(ServerStatus::Ok, 0.0);

    let outcome = handle_one_request(&mut conn, &mut handler).unwrap();

    assert_eq!(
        outcome,
        HandledOutcome::Handled {
            command: Command::DispenseWater,
            qty: 10,
            status: ServerStatus::Ok,
            closed: false,
        }
    );
    assert_eq!(conn.output, vec![2, 0]);
    assert_eq!(handler.calls, vec![(Command::DispenseWater, 10)]);
}

#[test]
fn test_quit_closes_connection() {
    for status in [ServerStatus::Ok, ServerStatus::Err] {
        let mut conn = MockTransport::new(&[2, b'Q']);
        let mut handler = RecordingHandler::new(status, 0.0);

        let outcome = handle_one_request(&mut conn, &mut handler).unwrap();

        assert!(outcome.is_closed());
        assert_eq!(conn.output, vec![2, status as u8]);
        assert!(conn.closed);
    }
}

#[test]
fn test_close_failure_after_quit_is_not_propagated() {
    let mut conn = MockTransport::failing_close(&[2, b'Q']);
    let mut handler = RecordingHandler::new(ServerStatus::Ok, 0.0);

    let outcome = handle_one_request(&mut conn, &mut handler).unwrap();

    assert_eq!(
        outcome,
        HandledOutcome::Handled {
            command: Command::Quit,
            qty: 0,
            status: ServerStatus::Ok,
            closed: true,
        }
    );
    assert_eq!(conn.output, vec![2, 0]);
    assert_eq!(conn.flushes, 1);
    assert!(conn.closed);
}

#[test]
fn test_handler_error_is_still_handled() {
    let mut conn = MockTransport::new(&[2, b'h']);
    let mut handler = RecordingHandler::new(ServerStatus::Err, 0.0);

    let outcome = handle_one_request(&mut conn, &mut handler).unwrap();

    assert!(outcome.is_handled());
    // Data field is sent because GET_HUMIDITY carries data
    assert_eq!(conn.output, data_frame(ServerStatus::Err, 0.0));
}

#[test]
fn test_data_presence_ignores_handler_value() {
    let mut conn = MockTransport::new(&[2, b'Q']);
    let mut handler = RecordingHandler::new(ServerStatus::Ok, 99.0);

    handle_one_request(&mut conn, &mut handler).unwrap();

    assert_eq!(conn.output, vec![2, 0]);
}

#[test]
fn test_closure_handler() {
    let mut conn = MockTransport::new(&[2, b'm']);
    let mut handler = |command: Command, _qty: u8| match command {
        Command::GetMoisture => (ServerStatus::Ok, 41.0),
        _ => (ServerStatus::Err, 0.0),
    };

    handle_one_request(&mut conn, &mut handler).unwrap();

    assert_eq!(conn.output, data_frame(ServerStatus::Ok, 41.0));
}

#[test]
fn test_consecutive_requests_on_one_connection() {
    let mut conn = MockTransport::new(&[2, b'l', 3, b'W', 5, 2, b'Q']);
    let mut handler = RecordingHandler::new(ServerStatus::Ok, 7.0);

    for _ in 0..3 {
        assert!(handle_one_request(&mut conn, &mut handler).unwrap().is_handled());
    }

    let mut expected = data_frame(ServerStatus::Ok, 7.0);
    expected.extend_from_slice(&[2, 0, 2, 0]);
    assert_eq!(conn.output, expected);
    assert_eq!(
        handler.calls,
        vec![
            (Command::GetLight, 0),
            (Command::DispenseWater, 5),
            (Command::Quit, 0)
        ]
    );
    assert!(conn.closed);
}

// =============================================================================
// Malformed Requests
// =============================================================================

#[test]
fn test_zero_length_frame() {
    let mut conn = MockTransport::new(&[0]);
    let mut handler = RecordingHandler::new(ServerStatus::Ok, 0.0);

    let outcome = handle_one_request(&mut conn, &mut handler).unwrap();

    assert!(!outcome.is_handled());
    assert!(matches!(
        outcome,
        HandledOutcome::Malformed(MalformedRequest::Decode(DecodeError::LengthMismatch { .. }))
    ));
    assert_eq!(conn.output, ERROR_FRAME.to_vec());
    assert_eq!(conn.flushes, 1);
    assert!(handler.calls.is_empty());
}

#[test]
fn test_length_one_frame_has_no_command() {
    let mut conn = MockTransport::new(&[1, b't']);
    let mut handler = RecordingHandler::new(ServerStatus::Ok, 0.0);

    let outcome = handle_one_request(&mut conn, &mut handler).unwrap();

    assert_eq!(
        outcome,
        HandledOutcome::Malformed(MalformedRequest::Decode(DecodeError::LengthMismatch {
            declared: 1,
            actual: 0
        }))
    );
    assert_eq!(conn.output, ERROR_FRAME.to_vec());
    assert_eq!(conn.body_reads, 0);
    // The stray byte is left for the next cycle
    assert_eq!(conn.remaining(), 1);
    assert!(handler.calls.is_empty());
}

#[test]
fn test_oversize_frame_not_read() {
    for declared in [20u8, 21, 200, 255] {
        let mut input = vec![declared];
        input.extend_from_slice(&[b't'; 30]);
        let mut conn = MockTransport::new(&input);
        let mut handler = RecordingHandler::new(ServerStatus::Ok, 0.0);

        let outcome = handle_one_request(&mut conn, &mut handler).unwrap();

        assert!(matches!(
            outcome,
            HandledOutcome::Malformed(MalformedRequest::Decode(DecodeError::TooLong { .. }))
        ));
        assert_eq!(conn.output, ERROR_FRAME.to_vec());
        assert_eq!(conn.body_reads, 0);
        assert_eq!(conn.remaining(), 30);
    }
}

#[test]
fn test_largest_frame_accepted() {
    let mut input = vec![19, b'W', 8];
    input.extend_from_slice(&[0u8; 16]);
    let mut conn = MockTransport::new(&input);
    let mut handler = RecordingHandler::new(ServerStatus::Ok, 0.0);

    let outcome = handle_one_request(&mut conn, &mut handler).unwrap();

    assert!(outcome.is_handled());
    assert_eq!(handler.calls, vec![(Command::DispenseWater, 8)]);
    assert_eq!(conn.remaining(), 0);
}

#[test]
fn test_dispense_without_quantity() {
    let mut conn = MockTransport::new(&[2, b'W']);
    let mut handler = RecordingHandler::new(ServerStatus::Ok, 0.0);

    let outcome = handle_one_request(&mut conn, &mut handler).unwrap();

    assert_eq!(
        outcome,
        HandledOutcome::Malformed(MalformedRequest::Decode(DecodeError::MissingQuantity(
            Command::DispenseWater
        )))
    );
    assert_eq!(conn.output, ERROR_FRAME.to_vec());
    assert!(handler.calls.is_empty());
}

#[test]
fn test_unknown_command_keeps_connection_open() {
    let mut conn = MockTransport::new(&[2, b'X']);
    let mut handler = RecordingHandler::new(ServerStatus::Ok, 0.0);

    let outcome = handle_one_request(&mut conn, &mut handler).unwrap();

    assert_eq!(
        outcome,
        HandledOutcome::Malformed(MalformedRequest::Decode(DecodeError::UnknownCommand(b'X')))
    );
    assert_eq!(conn.output, vec![2, 255]);
    assert!(!conn.closed);
    assert!(handler.calls.is_empty());
}

#[test]
fn test_short_body() {
    let mut conn = MockTransport::new(&[5, b'W', 1]);
    let mut handler = RecordingHandler::new(ServerStatus::Ok, 0.0);

    let outcome = handle_one_request(&mut conn, &mut handler).unwrap();

    assert_eq!(
        outcome,
        HandledOutcome::Malformed(MalformedRequest::ShortRead {
            expected: 4,
            actual: 2
        })
    );
    assert_eq!(conn.output, ERROR_FRAME.to_vec());
}

#[test]
fn test_end_of_stream() {
    let mut conn = MockTransport::new(&[]);
    let mut handler = RecordingHandler::new(ServerStatus::Ok, 0.0);

    let outcome = handle_one_request(&mut conn, &mut handler).unwrap();

    assert_eq!(outcome, HandledOutcome::Malformed(MalformedRequest::EndOfStream));
    assert_eq!(conn.output, ERROR_FRAME.to_vec());
}

#[test]
fn test_read_failure_is_malformed() {
    let mut conn = BrokenReadTransport { output: Vec::new() };
    let mut handler = RecordingHandler::new(ServerStatus::Ok, 0.0);

    let outcome = handle_one_request(&mut conn, &mut handler).unwrap();

    assert_eq!(
        outcome,
        HandledOutcome::Malformed(MalformedRequest::Transport(io::ErrorKind::ConnectionReset))
    );
    assert_eq!(conn.output, ERROR_FRAME.to_vec());
}

#[test]
fn test_body_read_timeout_is_malformed() {
    let mut conn = MockTransport::failing_body(&[2, b't'], io::ErrorKind::TimedOut);
    let mut handler = RecordingHandler::new(ServerStatus::Ok, 0.0);

    let outcome = handle_one_request(&mut conn, &mut handler).unwrap();

    assert_eq!(
        outcome,
        HandledOutcome::Malformed(MalformedRequest::Transport(io::ErrorKind::TimedOut))
    );
    assert_eq!(conn.output, ERROR_FRAME.to_vec());
    assert_eq!(conn.flushes, 1);
    assert_eq!(conn.body_reads, 1);
    assert!(!conn.closed);
    assert!(handler.calls.is_empty());
}

#[test]
fn test_malformed_frame_does_not_corrupt_next() {
    let mut conn = MockTransport::new(&[2, b'X', 2, b'f']);
    let mut handler = RecordingHandler::new(ServerStatus::Ok, 80.0);

    let first = handle_one_request(&mut conn, &mut handler).unwrap();
    let second = handle_one_request(&mut conn, &mut handler).unwrap();

    assert!(!first.is_handled());
    assert!(second.is_handled());

    let mut expected = ERROR_FRAME.to_vec();
    expected.extend_from_slice(&data_frame(ServerStatus::Ok, 80.0));
    assert_eq!(conn.output, expected);
}

// =============================================================================
// Transport Failures
// =============================================================================

#[test]
fn test_write_failure_is_error() {
    let mut conn = MockTransport::failing_writes(&[2, b't']);
    let mut handler = RecordingHandler::new(ServerStatus::Ok, 1.0);

    let result = handle_one_request(&mut conn, &mut handler);

    match result {
        Err(DispatchError::Transport { state, source }) => {
            assert_eq!(state, DispatchState::Dispatched);
            assert_eq!(source.kind(), io::ErrorKind::BrokenPipe);
        }
        other => panic!("Expected transport error, got {:?}", other),
    }
    // The handler ran before the write failed
    assert_eq!(handler.calls.len(), 1);
}

#[test]
fn test_error_frame_write_failure_is_error() {
    let mut conn = MockTransport::failing_writes(&[0]);
    let mut handler = RecordingHandler::new(ServerStatus::Ok, 1.0);

    let result = handle_one_request(&mut conn, &mut handler);

    assert!(matches!(
        result,
        Err(DispatchError::Transport {
            state: DispatchState::AwaitLength,
            ..
        })
    ));
}
