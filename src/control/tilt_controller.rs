// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Roll/pitch stabilization with X-quad motor mixing.
//!
//! Each axis runs its own [`Pid`]; the two efforts are mixed onto the four motors around the
//! commanded base power:
//!
//! ```text
//!        front
//!    FL (0)   FR (1)
//!        \   /
//!         \ /
//!         / \
//!        /   \
//!    BL (2)   BR (3)
//!        back
//!
//! FL = base - u_pitch + u_roll      FR = base - u_pitch - u_roll
//! BL = base + u_pitch + u_roll      BR = base + u_pitch - u_roll
//! ```
//!
//! Outputs are clamped to 0..=255 and truncated.

use crate::control::pid::{Gains, Pid};
use crate::io::MotorOutputs;

/// A roll/pitch pair (deg or deg/s depending on context).
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Tilt {
    pub roll: f32,
    pub pitch: f32,
}

impl Tilt {
    pub const LEVEL: Self = Self::new(0.0, 0.0);

    pub const fn new(roll: f32, pitch: f32) -> Self {
        Self { roll, pitch }
    }
}

pub struct TiltController {
    roll: Pid,
    pitch: Pid,
}

impl TiltController {
    pub fn new(roll: Gains, pitch: Gains) -> Self {
        Self {
            roll: Pid::new(roll),
            pitch: Pid::new(pitch),
        }
    }

    /// Reset both integrators (stream start, disarm).
    pub fn zero_integrators(&mut self) {
        self.roll.reset();
        self.pitch.reset();
    }

    /// Run one control step.
    ///
    /// `rate` is the gyro rate about each axis; `dt` must already be positive (the caller
    /// substitutes the nominal period for a bad measurement).
    pub fn update(
        &mut self,
        desired: Tilt,
        measured: Tilt,
        rate: Tilt,
        dt: f32,
        base: MotorOutputs,
    ) -> MotorOutputs {
        let ur = self.roll.update(desired.roll, measured.roll, rate.roll, dt);
        let up = self.pitch.update(desired.pitch, measured.pitch, rate.pitch, dt);

        MotorOutputs {
            fl: mix(base.fl, -up + ur),
            fr: mix(base.fr, -up - ur),
            bl: mix(base.bl, up + ur),
            br: mix(base.br, up - ur),
        }
    }

    /// Integrator state (roll, pitch).
    pub fn integrals(&self) -> Tilt {
        Tilt::new(self.roll.integral(), self.pitch.integral())
    }

    /// Last computed error (roll, pitch).
    pub fn last_error(&self) -> Tilt {
        Tilt::new(self.roll.last_error(), self.pitch.last_error())
    }

    /// Last computed control effort (roll, pitch).
    pub fn last_output(&self) -> Tilt {
        Tilt::new(self.roll.last_output(), self.pitch.last_output())
    }
}

#[inline]
fn mix(base: u8, delta: f32) -> u8 {
    (base as f32 + delta).clamp(0.0, 255.0) as u8
}
