// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Free-running microsecond clock on TIM2.
//!
//! TIM2 is 32 bits wide and ticks at 1 MHz, so the raw counter wraps every ~71.6 minutes. Each
//! `now_us` call folds wraps into a 64-bit timestamp; it must be called at least once per wrap
//! period, which the flight loop does thousands of times a second.

use stm32f7xx_hal::pac;

pub struct MicrosClock {
    tim: pac::TIM2,
    last_raw: u32,
    high: u64,
}

impl MicrosClock {
    /// Start TIM2 counting microseconds. `timer_clk_hz` is the TIM2 kernel clock (APB1 timer
    /// clock) and must be a whole number of MHz.
    pub fn tim2(tim2: pac::TIM2, timer_clk_hz: u32) -> Self {
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb1enr.modify(|_, w| w.tim2en().set_bit());

        let tim = tim2;

        // Disable counter while configuring
        tim.cr1.modify(|_, w| w.cen().clear_bit());

        // 1 MHz tick
        let psc = (timer_clk_hz / 1_000_000).saturating_sub(1) as u16;
        tim.psc.write(|w| w.psc().bits(psc));

        // Auto-reload: max 32-bit
        tim.arr.write(|w| w.bits(0xFFFF_FFFF));

        // Latch the prescaler, then start from zero
        tim.egr.write(|w| w.ug().set_bit());
        tim.cnt.write(|w| w.bits(0));
        tim.cr1.modify(|_, w| w.cen().set_bit());

        Self {
            tim,
            last_raw: 0,
            high: 0,
        }
    }

    #[inline]
    pub fn raw(&self) -> u32 {
        self.tim.cnt.read().cnt().bits()
    }

    /// Microseconds since the clock was started.
    pub fn now_us(&mut self) -> u64 {
        let raw = self.raw();
        if raw < self.last_raw {
            self.high += 1 << 32;
        }
        self.last_raw = raw;
        self.high | raw as u64
    }

    /// Busy-wait for `ms` milliseconds.
    pub fn delay_ms(&mut self, ms: u32) {
        let end = self.now_us() + ms as u64 * 1_000;
        while self.now_us() < end {
            cortex_m::asm::nop();
        }
    }
}
