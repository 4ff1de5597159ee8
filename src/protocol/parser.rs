// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Command frame decoder with resynchronization.
//!
//! The transport delivers arbitrary chunks: half frames, several frames at once, or line noise.
//! [`scan`] finds the next frame in a byte slice; [`Parser`] keeps the unconsumed tail between
//! polls in a fixed receive buffer.

use crate::error::DecodeError;
use crate::protocol::messages::{CommandFrame, CMD_LEN, CMD_MAGIC};

/// Receive buffer capacity.
pub const RX_BUFFER_LEN: usize = 64;

/// Result of one decode attempt.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Decoded {
    /// A valid frame.
    Frame(CommandFrame),
    /// One frame's worth of bytes failed validation and was dropped.
    Rejected(DecodeError),
    /// No complete frame yet.
    Incomplete,
}

/// Decode at most one command frame from the front of `bytes`.
///
/// Returns how many bytes may be discarded along with the outcome. Leading bytes that cannot start
/// a frame are always consumed; a partial frame starting at a magic byte is left in place.
pub fn scan(bytes: &[u8]) -> (usize, Decoded) {
    let start = match bytes.iter().position(|&b| b == CMD_MAGIC) {
        Some(i) => i,
        None => return (bytes.len(), Decoded::Incomplete),
    };

    let end = start + CMD_LEN;
    if end > bytes.len() {
        return (start, Decoded::Incomplete);
    }

    let decoded = match CommandFrame::from_bytes(&bytes[start..end]) {
        Ok(frame) => Decoded::Frame(frame),
        Err(e) => Decoded::Rejected(e),
    };
    (end, decoded)
}

pub struct Parser {
    buf: [u8; RX_BUFFER_LEN],
    len: usize,
}

impl Parser {
    pub const fn new() -> Self {
        Self {
            buf: [0; RX_BUFFER_LEN],
            len: 0,
        }
    }

    /// Bytes currently buffered.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Unused tail of the buffer. Fill it and call [`commit`](Self::commit).
    pub fn free_space(&mut self) -> &mut [u8] {
        &mut self.buf[self.len..]
    }

    /// Mark `n` bytes of [`free_space`](Self::free_space) as received.
    pub fn commit(&mut self, n: usize) {
        self.len = (self.len + n).min(RX_BUFFER_LEN);
    }

    /// Append as much of `bytes` as fits, returning the count taken.
    pub fn extend(&mut self, bytes: &[u8]) -> usize {
        let free = self.free_space();
        let n = bytes.len().min(free.len());
        free[..n].copy_from_slice(&bytes[..n]);
        self.commit(n);
        n
    }

    /// Decode the next frame from the buffer, discarding everything in front of it.
    pub fn decode(&mut self) -> Decoded {
        let (consumed, decoded) = scan(&self.buf[..self.len]);
        self.buf.copy_within(consumed..self.len, 0);
        self.len -= consumed;
        decoded
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}
