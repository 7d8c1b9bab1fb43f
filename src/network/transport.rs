//! Transport contract
//!
//! The minimal byte-oriented connection the dispatcher runs over. Any stream
//! (socket, serial port, in-memory buffer) can be adapted to it.

use std::io;

/// A connected client, as seen by the dispatcher
pub trait Transport {
    /// Read a single byte. `Ok(None)` means end of stream.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Read until `buf` is full or the stream ends.
    ///
    /// Returns the number of bytes read, which is short only at end of stream.
    fn read_up_to(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Queue `bytes` for sending.
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Push queued bytes out to the peer.
    fn flush(&mut self) -> io::Result<()>;

    /// Close the connection. Further reads report end of stream.
    fn close(&mut self) -> io::Result<()>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        (**self).read_byte()
    }

    fn read_up_to(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_up_to(buf)
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// Fill `buf` from `reader`, stopping early only at end of stream
pub(crate) fn read_up_to<R: io::Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
