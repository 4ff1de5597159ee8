// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Outbound telemetry frames.
//!
//! | Type | Len | Layout |
//! | ---- | --- | ------ |
//! | `0xA1` fast   | 24 | seq, loop_us, bat_adc, mot×4, ax, ay, az, gx, gy, gz |
//! | `0xA2` angles | 20 | seq, loop_us, bat_adc, mot×4, roll, pitch, gx, gy |
//! | `0xA3` debug  | 14 | seq, loop_us, e_roll, e_pitch, u_roll, u_pitch |
//!
//! The sequence number is supplied at encode time by the link.

use crate::io::{InertialSample, MotorOutputs};
use crate::protocol::messages::*;

/// Which periodic frame the flight loop streams.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum TelemetryKind {
    Fast,
    Angles,
    Debug,
}

impl TelemetryKind {
    pub const fn packet_type(self) -> u8 {
        match self {
            TelemetryKind::Fast => PKT_FAST,
            TelemetryKind::Angles => PKT_ANGLES,
            TelemetryKind::Debug => PKT_DEBUG,
        }
    }

    pub const fn frame_len(self) -> usize {
        match self {
            TelemetryKind::Fast => FAST_LEN,
            TelemetryKind::Angles => ANGLES_LEN,
            TelemetryKind::Debug => DEBUG_LEN,
        }
    }
}

/// Raw sensor stream.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FastTelemetry {
    pub loop_us: u16,
    pub bat_adc: u16,
    pub motors: MotorOutputs,
    pub sample: InertialSample,
}

impl FastTelemetry {
    pub fn encode(&self, seq: u16) -> [u8; FAST_LEN] {
        let m = self.motors;
        let s = &self.sample;
        FrameWriter::<FAST_LEN>::new(PKT_FAST)
            .u16(seq)
            .u16(self.loop_us)
            .u16(self.bat_adc)
            .u8(m.fl)
            .u8(m.fr)
            .u8(m.bl)
            .u8(m.br)
            .centi(s.accel_x)
            .centi(s.accel_y)
            .centi(s.accel_z)
            .centi(s.gyro_x)
            .centi(s.gyro_y)
            .centi(s.gyro_z)
            .finish()
    }
}

/// Attitude stream.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct AnglesTelemetry {
    pub loop_us: u16,
    pub bat_adc: u16,
    pub motors: MotorOutputs,
    /// Trimmed roll/pitch (deg)
    pub roll_deg: f32,
    pub pitch_deg: f32,
    /// Raw rates (deg/s)
    pub gyro_x_dps: f32,
    pub gyro_y_dps: f32,
}

impl AnglesTelemetry {
    pub fn encode(&self, seq: u16) -> [u8; ANGLES_LEN] {
        let m = self.motors;
        FrameWriter::<ANGLES_LEN>::new(PKT_ANGLES)
            .u16(seq)
            .u16(self.loop_us)
            .u16(self.bat_adc)
            .u8(m.fl)
            .u8(m.fr)
            .u8(m.bl)
            .u8(m.br)
            .centi(self.roll_deg)
            .centi(self.pitch_deg)
            .centi(self.gyro_x_dps)
            .centi(self.gyro_y_dps)
            .finish()
    }
}

/// Controller internals for tuning.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct DebugTelemetry {
    pub loop_us: u16,
    pub err_roll: f32,
    pub err_pitch: f32,
    pub out_roll: f32,
    pub out_pitch: f32,
}

impl DebugTelemetry {
    pub fn encode(&self, seq: u16) -> [u8; DEBUG_LEN] {
        FrameWriter::<DEBUG_LEN>::new(PKT_DEBUG)
            .u16(seq)
            .u16(self.loop_us)
            .centi(self.err_roll)
            .centi(self.err_pitch)
            .centi(self.out_roll)
            .centi(self.out_pitch)
            .finish()
    }
}

/// Any outbound frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TelemetryFrame {
    Fast(FastTelemetry),
    Angles(AnglesTelemetry),
    Debug(DebugTelemetry),
}

impl TelemetryFrame {
    pub fn kind(&self) -> TelemetryKind {
        match self {
            TelemetryFrame::Fast(_) => TelemetryKind::Fast,
            TelemetryFrame::Angles(_) => TelemetryKind::Angles,
            TelemetryFrame::Debug(_) => TelemetryKind::Debug,
        }
    }

    /// Encode into `out`, returning the frame length.
    pub fn encode_into(&self, seq: u16, out: &mut [u8; MAX_TELEMETRY_LEN]) -> usize {
        match self {
            TelemetryFrame::Fast(t) => copy_frame(&t.encode(seq), out),
            TelemetryFrame::Angles(t) => copy_frame(&t.encode(seq), out),
            TelemetryFrame::Debug(t) => copy_frame(&t.encode(seq), out),
        }
    }
}

fn copy_frame(frame: &[u8], out: &mut [u8]) -> usize {
    out[..frame.len()].copy_from_slice(frame);
    frame.len()
}
