// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Error types.
//!
//! None of these are fatal to the flight loop: a rejected frame is dropped, and a failed sensor
//! read makes the loop fall back to zero motor output for that tick.

use core::fmt;

/// Why an inbound frame was rejected.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum DecodeError {
    /// First byte is not the expected magic/type byte.
    BadMagic(u8),
    /// Trailing XOR checksum does not match the frame contents.
    BadChecksum { expected: u8, found: u8 },
    /// Fewer bytes than one frame.
    Truncated,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::BadMagic(b) => write!(f, "bad magic 0x{:02X}", b),
            DecodeError::BadChecksum { expected, found } => {
                write!(f, "bad checksum (expected 0x{:02X}, found 0x{:02X})", expected, found)
            }
            DecodeError::Truncated => f.write_str("truncated frame"),
        }
    }
}

/// Errors raised by board-level drivers.
#[derive(Debug)]
pub enum Error<E> {
    /// Underlying bus transfer failed.
    Bus(E),
    /// Device identity register returned an unexpected value.
    WrongDevice(u8),
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::Bus(e)
    }
}
