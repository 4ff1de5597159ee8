// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! TIM3 four-channel PWM at servo frame rate.
//!
//! The timer ticks at 1 MHz, so a channel's duty value is its pulse width in microseconds and
//! the maximum duty is the frame length. Channels are handed out as independent
//! [`PwmPin`](stm32f7xx_hal::prelude::_embedded_hal_PwmPin) implementations.
//!
//! Example:
//! ```ignore
//! let (fl, fr, bl, br) = pwm::tim3(dp.TIM3, pins.esc, 16_000_000, 50);
//! let escs = Escs::new(fl, fr, bl, br);
//! ```

use core::ops::Deref;

use stm32f7xx_hal::{pac, prelude::_embedded_hal_PwmPin};

use super::pins::EscPins;

/// OCxM value for PWM mode 1 (active while CNT < CCRx).
const OCM_PWM1: u8 = 0b110;

type Tim3Regs = <pac::TIM3 as Deref>::Target;

/// TIM3 register block for the channel handles, which share the timer.
#[inline]
fn regs() -> &'static Tim3Regs {
    unsafe { &*pac::TIM3::ptr() }
}

/// Start TIM3 at `frame_hz` and return its four channels, all disabled at zero duty.
///
/// Consumes the timer and the ESC pins so nothing else can reconfigure them. `timer_clk_hz` is
/// the APB1 timer clock and must be a whole number of MHz.
pub fn tim3(
    tim: pac::TIM3,
    _pins: EscPins,
    timer_clk_hz: u32,
    frame_hz: u32,
) -> (Tim3Channel<1>, Tim3Channel<2>, Tim3Channel<3>, Tim3Channel<4>) {
    let rcc = unsafe { &*pac::RCC::ptr() };
    rcc.apb1enr.modify(|_, w| w.tim3en().set_bit());

    let frame_us = (1_000_000 / frame_hz.max(16)).min(0xFFFF);

    // Disable counter while configuring
    tim.cr1.modify(|_, w| w.cen().clear_bit());

    // 1 MHz tick, one frame per overflow
    let psc = (timer_clk_hz / 1_000_000).saturating_sub(1) as u16;
    tim.psc.write(|w| w.psc().bits(psc));
    tim.arr.write(|w| unsafe { w.bits(frame_us - 1) });

    // CH1..CH4 as outputs in PWM mode 1 with compare preload
    tim.ccmr1_output().write(|w| unsafe {
        w.cc1s()
            .bits(0b00)
            .oc1m()
            .bits(OCM_PWM1)
            .oc1pe()
            .set_bit()
            .cc2s()
            .bits(0b00)
            .oc2m()
            .bits(OCM_PWM1)
            .oc2pe()
            .set_bit()
    });
    tim.ccmr2_output().write(|w| unsafe {
        w.cc3s()
            .bits(0b00)
            .oc3m()
            .bits(OCM_PWM1)
            .oc3pe()
            .set_bit()
            .cc4s()
            .bits(0b00)
            .oc4m()
            .bits(OCM_PWM1)
            .oc4pe()
            .set_bit()
    });

    // Outputs stay off until a channel is enabled
    tim.ccer.write(|w| unsafe { w.bits(0) });
    tim.ccr1.write(|w| unsafe { w.bits(0) });
    tim.ccr2.write(|w| unsafe { w.bits(0) });
    tim.ccr3.write(|w| unsafe { w.bits(0) });
    tim.ccr4.write(|w| unsafe { w.bits(0) });

    // Latch PSC/ARR and the preloaded compare values, then run with ARR preload
    tim.egr.write(|w| w.ug().set_bit());
    tim.cnt.write(|w| unsafe { w.bits(0) });
    tim.cr1.modify(|_, w| w.arpe().set_bit().cen().set_bit());

    let max = frame_us as u16;
    (
        Tim3Channel { max },
        Tim3Channel { max },
        Tim3Channel { max },
        Tim3Channel { max },
    )
}

/// One TIM3 compare channel (1..=4).
pub struct Tim3Channel<const C: u8> {
    max: u16,
}

impl<const C: u8> Tim3Channel<C> {
    fn set_output(&mut self, on: bool) {
        regs().ccer.modify(|_, w| match C {
            1 => w.cc1e().bit(on),
            2 => w.cc2e().bit(on),
            3 => w.cc3e().bit(on),
            _ => w.cc4e().bit(on),
        });
    }
}

impl<const C: u8> _embedded_hal_PwmPin for Tim3Channel<C> {
    type Duty = u16;

    fn disable(&mut self) {
        self.set_output(false);
    }

    fn enable(&mut self) {
        self.set_output(true);
    }

    fn get_duty(&self) -> u16 {
        let tim = regs();
        let ccr = match C {
            1 => tim.ccr1.read().bits(),
            2 => tim.ccr2.read().bits(),
            3 => tim.ccr3.read().bits(),
            _ => tim.ccr4.read().bits(),
        };
        ccr as u16
    }

    fn get_max_duty(&self) -> u16 {
        self.max
    }

    fn set_duty(&mut self, duty: u16) {
        let tim = regs();
        let duty = duty.min(self.max) as u32;
        match C {
            1 => tim.ccr1.write(|w| unsafe { w.bits(duty) }),
            2 => tim.ccr2.write(|w| unsafe { w.bits(duty) }),
            3 => tim.ccr3.write(|w| unsafe { w.bits(duty) }),
            _ => tim.ccr4.write(|w| unsafe { w.bits(duty) }),
        }
    }
}
