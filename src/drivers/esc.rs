// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Four hobby ESCs on timer PWM.
//!
//! Standard servo-style signalling: a 50 Hz frame with a 1000 µs (stop) to 2000 µs (full thrust)
//! pulse. Motor commands on the 0..255 scale map linearly onto that range.

use stm32f7xx_hal::prelude::*;

use crate::io::{MotorOutputs, Motors};

/// PWM frame length at 50 Hz.
pub const FRAME_US: u32 = 20_000;
pub const MIN_PULSE_US: u32 = 1_000;
pub const MAX_PULSE_US: u32 = 2_000;

/// Pulse width for a 0..255 motor command.
#[inline]
pub fn pulse_width_us(cmd: u8) -> u32 {
    MIN_PULSE_US + cmd as u32 * (MAX_PULSE_US - MIN_PULSE_US) / 255
}

/// ESC bank in X order (front-left, front-right, back-left, back-right).
///
/// The four channels must share one timer running at 50 Hz.
pub struct Escs<Fl, Fr, Bl, Br> {
    fl: Fl,
    fr: Fr,
    bl: Bl,
    br: Br,
}

impl<Fl, Fr, Bl, Br> Escs<Fl, Fr, Bl, Br>
where
    Fl: _embedded_hal_PwmPin<Duty = u16>,
    Fr: _embedded_hal_PwmPin<Duty = u16>,
    Bl: _embedded_hal_PwmPin<Duty = u16>,
    Br: _embedded_hal_PwmPin<Duty = u16>,
{
    /// Enable all channels at the stop pulse. Most ESCs need a couple of seconds of stop pulses
    /// before they arm.
    pub fn new(mut fl: Fl, mut fr: Fr, mut bl: Bl, mut br: Br) -> Self {
        fl.enable();
        fr.enable();
        bl.enable();
        br.enable();

        let mut escs = Self { fl, fr, bl, br };
        escs.safe_stop();
        escs
    }

    fn set<C: _embedded_hal_PwmPin<Duty = u16>>(ch: &mut C, cmd: u8) {
        let max = ch.get_max_duty() as u32;
        let duty = max * pulse_width_us(cmd) / FRAME_US;
        ch.set_duty(duty as u16);
    }
}

impl<Fl, Fr, Bl, Br> Motors for Escs<Fl, Fr, Bl, Br>
where
    Fl: _embedded_hal_PwmPin<Duty = u16>,
    Fr: _embedded_hal_PwmPin<Duty = u16>,
    Bl: _embedded_hal_PwmPin<Duty = u16>,
    Br: _embedded_hal_PwmPin<Duty = u16>,
{
    fn write_all(&mut self, out: MotorOutputs) {
        Self::set(&mut self.fl, out.fl);
        Self::set(&mut self.fr, out.fr);
        Self::set(&mut self.bl, out.bl);
        Self::set(&mut self.br, out.br);
    }
}
