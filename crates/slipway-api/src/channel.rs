//! JSON Lines framing for the control channel.
//!
//! The framing is deliberately generic over its reader and writer halves:
//! the host wraps a child's piped stdio, a backend wraps its own standard
//! streams, and tests wrap in-memory buffers.

use std::io::{self, BufRead, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::protocol::{ControlRequest, ControlResponse};

/// Failures while moving frames across the control channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The underlying stream failed.
    #[error("control channel i/o failed")]
    Io(#[from] io::Error),
    /// A frame failed to encode or decode.
    #[error("control channel frame was not valid JSON")]
    Codec(#[from] serde_json::Error),
    /// The peer closed its end of the channel.
    #[error("control channel closed by peer")]
    Closed,
}

/// Host-side view of a control channel.
///
/// The adapter only ever sends a request and reads the matching reply, so the
/// trait stays narrow enough for scripted test doubles.
pub trait ControlChannel {
    /// Sends one request frame.
    ///
    /// # Errors
    ///
    /// Returns a [`ChannelError`] when the frame cannot be written.
    fn send(&mut self, request: &ControlRequest) -> Result<(), ChannelError>;

    /// Receives the next response frame.
    ///
    /// # Errors
    ///
    /// Returns a [`ChannelError`] when no frame can be read.
    fn recv(&mut self) -> Result<ControlResponse, ChannelError>;
}

/// Newline-delimited JSON over arbitrary reader/writer halves.
#[derive(Debug)]
pub struct JsonlChannel<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> JsonlChannel<R, W> {
    /// Wraps a reader/writer pair in JSONL framing.
    pub const fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Writes one frame followed by a newline and flushes.
    ///
    /// # Errors
    ///
    /// Returns a [`ChannelError`] when encoding or the write fails.
    pub fn write_frame<T: Serialize>(&mut self, frame: &T) -> Result<(), ChannelError> {
        let encoded = serde_json::to_string(frame)?;
        self.writer.write_all(encoded.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Reads the next line and decodes it as a frame.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] at end of input, otherwise a
    /// [`ChannelError`] when the line cannot be read or decoded.
    pub fn read_frame<T: DeserializeOwned>(&mut self) -> Result<T, ChannelError> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line)?;
        if read == 0 {
            return Err(ChannelError::Closed);
        }
        Ok(serde_json::from_str(line.trim_end())?)
    }
}

impl<R: BufRead, W: Write> ControlChannel for JsonlChannel<R, W> {
    fn send(&mut self, request: &ControlRequest) -> Result<(), ChannelError> {
        self.write_frame(request)
    }

    fn recv(&mut self) -> Result<ControlResponse, ChannelError> {
        self.read_frame()
    }
}
