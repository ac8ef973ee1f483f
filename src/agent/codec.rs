//! NDJSON codec for agent CLI output.
//!
//! Wraps [`tokio_util::codec::LinesCodec`] with a maximum line length so a
//! misbehaving agent process cannot make the server buffer an unbounded
//! line.

use std::io::ErrorKind;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};
use tracing::warn;

use crate::{AppError, Result};

/// Maximum line length accepted from the agent: 1 MiB.
pub const MAX_LINE_BYTES: usize = 1_048_576;

/// Line decoder for newline-delimited JSON from the agent's stdout.
///
/// Lines longer than [`MAX_LINE_BYTES`] and lines that are not valid UTF-8
/// are logged and skipped; decoding resumes at the next newline. The codec
/// never yields a decode error, so a `FramedRead` over it only stops at EOF
/// or on a read error from the pipe itself.
///
/// ```rust,ignore
/// use tokio_util::codec::FramedRead;
/// use edu_assistant::agent::codec::NdjsonCodec;
///
/// let lines = FramedRead::new(child_stdout, NdjsonCodec::new());
/// ```
#[derive(Debug)]
pub struct NdjsonCodec(LinesCodec);

impl NdjsonCodec {
    /// Create a codec with the default [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self(LinesCodec::new_with_max_length(MAX_LINE_BYTES))
    }
}

impl Default for NdjsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for NdjsonCodec {
    type Item = String;
    type Error = AppError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            match self.0.decode(src) {
                Ok(line) => return Ok(line),
                Err(err) => skip_line(err)?,
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            match self.0.decode_eof(src) {
                Ok(line) => return Ok(line),
                Err(err) => skip_line(err)?,
            }
        }
    }
}

/// Decide whether a `LinesCodec` error only spoils the current line.
///
/// After `MaxLineLengthExceeded` the inner codec is in discard mode and the
/// next call drops bytes up to the next newline; an invalid UTF-8 line has
/// already been consumed. Both leave the codec ready for the next line.
fn skip_line(err: LinesCodecError) -> Result<()> {
    match err {
        LinesCodecError::MaxLineLengthExceeded => {
            warn!(max_bytes = MAX_LINE_BYTES, "agent output: skipping over-long line");
            Ok(())
        }
        LinesCodecError::Io(io_err) if io_err.kind() == ErrorKind::InvalidData => {
            warn!(%io_err, "agent output: skipping non-UTF-8 line");
            Ok(())
        }
        LinesCodecError::Io(io_err) => Err(AppError::Io(io_err.to_string())),
    }
}
