//! Frame codec: one logical message <-> bounded physical chunks.
//!
//! Chunk boundaries carry no meaning. Only concatenation order does, so the
//! receiving side reproduces the original bytes exactly.

use crate::DEFAULT_MAX_MESSAGE_BYTES;
use crate::error::NotificationError;

use log::{trace, warn};

/// One outbound piece of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundChunk {
    /// Position within the message, starting at zero.
    pub index: usize,
    pub data: Vec<u8>,
    /// Set on the last chunk only.
    pub is_final: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    Text,
    Binary,
    Close,
}

/// One physical unit read from the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFragment {
    pub kind: FragmentKind,
    pub data: Vec<u8>,
    pub end_of_message: bool,
}

impl InboundFragment {
    pub fn text(data: impl Into<Vec<u8>>, end_of_message: bool) -> Self {
        Self {
            kind: FragmentKind::Text,
            data: data.into(),
            end_of_message,
        }
    }

    pub fn binary(data: impl Into<Vec<u8>>, end_of_message: bool) -> Self {
        Self {
            kind: FragmentKind::Binary,
            data: data.into(),
            end_of_message,
        }
    }

    pub fn close() -> Self {
        Self {
            kind: FragmentKind::Close,
            data: Vec::new(),
            end_of_message: true,
        }
    }
}

/// Split `message` into chunks of at most `max_chunk` bytes.
///
/// A zero `max_chunk` is treated as 1. An empty message still yields one
/// (empty) final chunk so the peer observes a complete message.
pub fn split_message(message: &[u8], max_chunk: usize) -> Vec<OutboundChunk> {
    let max_chunk = max_chunk.max(1);

    if message.is_empty() {
        return vec![OutboundChunk {
            index: 0,
            data: Vec::new(),
            is_final: true,
        }];
    }

    let count = message.len().div_ceil(max_chunk);
    message
        .chunks(max_chunk)
        .enumerate()
        .map(|(index, data)| OutboundChunk {
            index,
            data: data.to_vec(),
            is_final: index + 1 == count,
        })
        .collect()
}

/// Outcome of feeding one fragment to a [`FrameAssembler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reassembly {
    /// More fragments are needed.
    Incomplete,
    /// A full text message.
    Complete(String),
    /// The peer closed the stream; any partial message was discarded.
    Closed,
}

/// Accumulates inbound fragments until end-of-message.
#[derive(Debug)]
pub struct FrameAssembler {
    buffer: Vec<u8>,
    max_message_bytes: usize,
    discarding: bool,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_MESSAGE_BYTES)
    }

    pub fn with_limit(max_message_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_message_bytes,
            discarding: false,
        }
    }

    /// Bytes currently held for an unfinished message.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Feed one fragment.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::Decode`] when a completed message is not
    /// valid UTF-8 or a message outgrows the size limit. The assembler is reset
    /// either way and stays usable for the next message.
    pub fn push(&mut self, fragment: InboundFragment) -> Result<Reassembly, NotificationError> {
        if fragment.kind == FragmentKind::Close {
            if !self.buffer.is_empty() {
                warn!(
                    "Close received mid-message, discarding {} buffered bytes",
                    self.buffer.len()
                );
            }
            self.reset();
            return Ok(Reassembly::Closed);
        }

        if self.discarding {
            if fragment.end_of_message {
                self.discarding = false;
            }
            return Ok(Reassembly::Incomplete);
        }

        if self.buffer.len() + fragment.data.len() > self.max_message_bytes {
            let attempted = self.buffer.len() + fragment.data.len();
            self.reset();
            self.discarding = !fragment.end_of_message;
            return Err(NotificationError::decode(format!(
                "message exceeds {} bytes (got at least {attempted})",
                self.max_message_bytes
            )));
        }

        self.buffer.extend_from_slice(&fragment.data);

        if !fragment.end_of_message {
            trace!("Buffered fragment, {} bytes pending", self.buffer.len());
            return Ok(Reassembly::Incomplete);
        }

        let bytes = std::mem::take(&mut self.buffer);
        String::from_utf8(bytes)
            .map(Reassembly::Complete)
            .map_err(|e| NotificationError::decode(format!("message is not valid UTF-8: {e}")))
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.discarding = false;
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}
