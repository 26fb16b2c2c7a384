//! Newline-delimited framing shared by both ends of a connection.
//!
//! Each frame is written with a single `write_all` so concurrent writers that
//! hold the connection's write lock never interleave partial frames.

use std::io::{self, BufRead, Write};

use crate::TransportError;

/// Reads one newline-terminated frame, stripping the terminator.
///
/// Returns `Ok(None)` when the peer closed the stream before sending any
/// bytes. A final unterminated frame before end of stream is returned as-is.
///
/// # Errors
///
/// Returns [`TransportError::FrameTooLarge`] once the frame grows past
/// `limit`, or [`TransportError::Io`] when the underlying read fails.
pub fn read_frame<R: BufRead>(
    reader: &mut R,
    limit: usize,
) -> Result<Option<Vec<u8>>, TransportError> {
    let mut frame = Vec::new();
    loop {
        let available = match reader.fill_buf() {
            Ok(buffer) => buffer,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(TransportError::Io(error)),
        };

        if available.is_empty() {
            return Ok((!frame.is_empty()).then(|| strip_carriage_return(frame)));
        }

        match available.iter().position(|byte| *byte == b'\n') {
            Some(position) => {
                let (line, _) = available.split_at(position);
                frame.extend_from_slice(line);
                reader.consume(position + 1);
                enforce_limit(frame.len(), limit)?;
                return Ok(Some(strip_carriage_return(frame)));
            }
            None => {
                let consumed = available.len();
                frame.extend_from_slice(available);
                reader.consume(consumed);
                enforce_limit(frame.len(), limit)?;
            }
        }
    }
}

/// Writes `payload` followed by a newline in one call and flushes.
///
/// # Errors
///
/// Propagates the underlying write or flush error.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let mut frame = Vec::with_capacity(payload.len() + 1);
    frame.extend_from_slice(payload);
    frame.push(b'\n');
    writer.write_all(&frame)?;
    writer.flush()
}

fn strip_carriage_return(mut frame: Vec<u8>) -> Vec<u8> {
    if frame.last() == Some(&b'\r') {
        frame.pop();
    }
    frame
}

fn enforce_limit(size: usize, limit: usize) -> Result<(), TransportError> {
    if size > limit {
        return Err(TransportError::FrameTooLarge { size, limit });
    }
    Ok(())
}
