// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Binary message protocol spoken with the ground station.
//!
//! Every frame is fixed length: a type byte, big-endian fields, then an XOR of all preceding
//! bytes. Angles and rates travel as `i16` hundredths.

use crate::error::DecodeError;

/// Inbound command frame type byte.
pub const CMD_MAGIC: u8 = 0xC1;

// Telemetry frame type bytes
pub const PKT_FAST: u8 = 0xA1;
pub const PKT_ANGLES: u8 = 0xA2;
pub const PKT_DEBUG: u8 = 0xA3;

// Frame lengths, checksum included
pub const CMD_LEN: usize = 10;
pub const FAST_LEN: usize = 24;
pub const ANGLES_LEN: usize = 20;
pub const DEBUG_LEN: usize = 14;

/// Largest outbound frame.
pub const MAX_TELEMETRY_LEN: usize = FAST_LEN;

// Command modes
pub const MODE_STOP: u8 = 0;
pub const MODE_FLY: u8 = 1;

/// XOR of every byte in `bytes`.
#[inline]
pub fn xor_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// Convert a value to fixed-point hundredths, saturating at the `i16` range.
///
/// The fractional remainder is truncated toward zero.
#[inline]
pub fn to_centi(v: f32) -> i16 {
    (v * 100.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

#[inline]
pub fn from_centi(c: i16) -> f32 {
    c as f32 / 100.0
}

/// Fixed-size frame writer. Fields are appended big-endian; `finish` appends the checksum.
pub(crate) struct FrameWriter<const N: usize> {
    buf: [u8; N],
    pos: usize,
}

impl<const N: usize> FrameWriter<N> {
    pub(crate) fn new(kind: u8) -> Self {
        let mut buf = [0u8; N];
        buf[0] = kind;
        Self { buf, pos: 1 }
    }

    pub(crate) fn u8(mut self, v: u8) -> Self {
        self.buf[self.pos] = v;
        self.pos += 1;
        self
    }

    pub(crate) fn u16(mut self, v: u16) -> Self {
        self.buf[self.pos..self.pos + 2].copy_from_slice(&v.to_be_bytes());
        self.pos += 2;
        self
    }

    pub(crate) fn i16(self, v: i16) -> Self {
        self.u16(v as u16)
    }

    pub(crate) fn centi(self, v: f32) -> Self {
        self.i16(to_centi(v))
    }

    pub(crate) fn finish(mut self) -> [u8; N] {
        debug_assert_eq!(self.pos, N - 1);
        self.buf[N - 1] = xor_checksum(&self.buf[..N - 1]);
        self.buf
    }
}

#[inline]
fn be_u16(b: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([b[at], b[at + 1]])
}

/// Flight command from the ground station.
///
/// `[C1][mode][base][roll_c:2][pitch_c:2][seq:2][csum]`
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct CommandFrame {
    /// 0 = stop, anything else = fly
    pub mode: u8,
    pub base_power: u8,
    /// Desired roll in hundredths of a degree
    pub roll_centi: i16,
    /// Desired pitch in hundredths of a degree
    pub pitch_centi: i16,
    pub seq: u16,
}

impl CommandFrame {
    pub fn new(mode: u8, base_power: u8, roll_deg: f32, pitch_deg: f32, seq: u16) -> Self {
        Self {
            mode,
            base_power,
            roll_centi: to_centi(roll_deg),
            pitch_centi: to_centi(pitch_deg),
            seq,
        }
    }

    /// Parse one frame from the first [`CMD_LEN`] bytes of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < CMD_LEN {
            return Err(DecodeError::Truncated);
        }
        let b = &bytes[..CMD_LEN];

        if b[0] != CMD_MAGIC {
            return Err(DecodeError::BadMagic(b[0]));
        }

        let expected = xor_checksum(&b[..CMD_LEN - 1]);
        let found = b[CMD_LEN - 1];
        if expected != found {
            return Err(DecodeError::BadChecksum { expected, found });
        }

        Ok(Self {
            mode: b[1],
            base_power: b[2],
            roll_centi: be_u16(b, 3) as i16,
            pitch_centi: be_u16(b, 5) as i16,
            seq: be_u16(b, 7),
        })
    }

    pub fn to_bytes(&self) -> [u8; CMD_LEN] {
        FrameWriter::<CMD_LEN>::new(CMD_MAGIC)
            .u8(self.mode)
            .u8(self.base_power)
            .i16(self.roll_centi)
            .i16(self.pitch_centi)
            .u16(self.seq)
            .finish()
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.mode != MODE_STOP
    }

    #[inline]
    pub fn roll_deg(&self) -> f32 {
        from_centi(self.roll_centi)
    }

    #[inline]
    pub fn pitch_deg(&self) -> f32 {
        from_centi(self.pitch_centi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_layout_is_big_endian() {
        let cmd = CommandFrame {
            mode: MODE_FLY,
            base_power: 120,
            roll_centi: 250,
            pitch_centi: -100,
            seq: 0x1234,
        };
        let b = cmd.to_bytes();
        assert_eq!(&b[..9], &[0xC1, 0x01, 120, 0x00, 0xFA, 0xFF, 0x9C, 0x12, 0x34]);
        assert_eq!(b[9], xor_checksum(&b[..9]));
        assert_eq!(xor_checksum(&b), 0);
        assert_eq!(CommandFrame::from_bytes(&b), Ok(cmd));
    }

    #[test]
    fn any_single_bit_flip_is_rejected() {
        let good = CommandFrame::new(MODE_FLY, 150, -3.5, 7.25, 999).to_bytes();
        for i in 0..CMD_LEN {
            for bit in 0..8 {
                let mut b = good;
                b[i] ^= 1 << bit;
                let err = CommandFrame::from_bytes(&b).unwrap_err();
                if i == 0 {
                    assert_eq!(err, DecodeError::BadMagic(b[0]));
                } else {
                    assert!(matches!(err, DecodeError::BadChecksum { .. }));
                }
            }
        }
    }

    #[test]
    fn short_input_is_truncated() {
        let b = CommandFrame::default().to_bytes();
        assert_eq!(
            CommandFrame::from_bytes(&b[..CMD_LEN - 1]),
            Err(DecodeError::Truncated)
        );
    }

    #[test]
    fn degrees_survive_the_wire() {
        let cmd = CommandFrame::new(MODE_FLY, 100, 12.5, -0.75, 1);
        let back = CommandFrame::from_bytes(&cmd.to_bytes()).unwrap();
        assert_eq!(back.roll_deg(), 12.5);
        assert_eq!(back.pitch_deg(), -0.75);
        assert!(back.is_armed());
    }

    #[test]
    fn centi_truncates_and_saturates() {
        assert_eq!(to_centi(0.5), 50);
        assert_eq!(to_centi(-1.25), -125);
        assert_eq!(to_centi(1.999), 199);
        assert_eq!(to_centi(-1.999), -199);
        assert_eq!(to_centi(327.5), 32750);
        assert_eq!(to_centi(327.67), i16::MAX);
        assert_eq!(to_centi(-327.68), i16::MIN);
        assert_eq!(to_centi(327.68), i16::MAX);
        assert_eq!(to_centi(-327.69), i16::MIN);
        assert_eq!(to_centi(400.0), i16::MAX);
        assert_eq!(to_centi(-400.0), i16::MIN);
    }
}
