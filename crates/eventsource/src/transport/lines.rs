//! Newline splitting for chunked response bodies
//!
//! Chunks arrive on arbitrary byte boundaries; `LineDecoder` buffers partial
//! lines until their terminator shows up.

use bytes::Bytes;

use crate::error::TransportError;

/// Default upper bound for a single line, in bytes
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// Incremental line splitter
#[derive(Debug)]
pub struct LineDecoder {
    /// Buffer for incomplete lines; never contains a `\n`
    buffer: Vec<u8>,
    max_line: usize,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::with_max_line(DEFAULT_MAX_LINE_BYTES)
    }
}

impl LineDecoder {
    /// Create a new line decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder rejecting lines longer than `max_line` bytes
    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_line,
        }
    }

    /// Feed bytes into the decoder and extract any complete lines
    ///
    /// Only the new bytes are scanned. Fails once a line, complete or not,
    /// exceeds the configured maximum.
    pub fn feed(&mut self, bytes: &Bytes) -> Result<Vec<String>, TransportError> {
        let mut pos = self.buffer.len();
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[pos..].iter().position(|&b| b == b'\n') {
            let end = pos + offset;
            self.check_length(end - start)?;
            lines.push(decode_line(&self.buffer[start..end]));
            start = end + 1;
            pos = start;
        }
        self.buffer.drain(..start);
        self.check_length(self.buffer.len())?;

        Ok(lines)
    }

    /// Flush a trailing line that was never terminated
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.buffer);
        Some(decode_line(&raw))
    }

    fn check_length(&self, len: usize) -> Result<(), TransportError> {
        if len > self.max_line {
            return Err(TransportError::LineTooLong {
                limit: self.max_line,
            });
        }
        Ok(())
    }
}

/// Strip a `\r` left over from `\r\n` endings and decode as UTF-8
///
/// Invalid sequences are replaced rather than rejected.
fn decode_line(line: &[u8]) -> String {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}
