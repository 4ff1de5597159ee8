// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! ADC1 battery sense using direct PAC register access.
//!
//! Blocking single-channel conversions, 12-bit right aligned. The battery pack feeds the pin
//! through a resistive divider; the raw code is reported as-is and scaled on the ground.
//!
//! Example:
//! ```ignore
//! let mut battery = BatteryMonitor::new(Adc1::new(dp.ADC1), pins.battery);
//! let raw = battery.read_adc();
//! ```

use stm32f7xx_hal::{
    gpio::{gpioa, Analog},
    pac,
};

use crate::io::BatterySensor;

/// Initialized ADC1.
pub struct Adc1 {
    adc: pac::ADC1,
}

impl Adc1 {
    pub fn new(adc: pac::ADC1) -> Self {
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb2enr.modify(|_, w| w.adc1en().set_bit());

        // ADC prescaler: PCLK2 / 4
        let common = unsafe { &*pac::ADC_COMMON::ptr() };
        common.ccr.modify(|_, w| w.adcpre().div4());

        // Power off to configure
        adc.cr2.modify(|_, w| w.adon().clear_bit());

        // 12-bit, right-aligned, software trigger, single conversion
        adc.cr1.modify(|_, w| w.res().bits(0b00));
        adc.cr2.modify(|_, w| {
            w.cont().clear_bit();
            w.align().right();
            w.exten().disabled();
            w
        });

        // One conversion per sequence
        adc.sqr1.modify(|_, w| w.l().bits(0));

        adc.cr2.modify(|_, w| w.adon().set_bit());

        Self { adc }
    }

    /// Convert one channel (0..=15) with the longest sample time.
    pub fn read(&mut self, channel: u8) -> u16 {
        let adc = &self.adc;
        let channel = channel & 0x0F;

        // 480 cycles: the divider has a high source impedance
        if channel <= 9 {
            let shift = 3 * channel as u32;
            adc.smpr2
                .modify(|r, w| unsafe { w.bits(r.bits() | (0b111 << shift)) });
        } else {
            let shift = 3 * (channel - 10) as u32;
            adc.smpr1
                .modify(|r, w| unsafe { w.bits(r.bits() | (0b111 << shift)) });
        }

        adc.sqr3.modify(|_, w| unsafe { w.sq1().bits(channel) });
        adc.cr2.modify(|_, w| w.swstart().set_bit());

        while adc.sr.read().eoc().bit_is_clear() {}

        adc.dr.read().data().bits()
    }
}

/// Analog pin routed to an ADC1 input.
pub trait Adc1Pin {
    const CHANNEL: u8;
}

macro_rules! adc1_pins {
    ($($pin:ident => $ch:literal),* $(,)?) => {
        $(
            impl Adc1Pin for gpioa::$pin<Analog> {
                const CHANNEL: u8 = $ch;
            }
        )*
    };
}

adc1_pins!(PA0 => 0, PA1 => 1, PA2 => 2, PA3 => 3, PA4 => 4, PA5 => 5, PA6 => 6, PA7 => 7);

/// Battery divider on one ADC1 input.
pub struct BatteryMonitor<PIN> {
    adc: Adc1,
    _pin: PIN,
}

impl<PIN: Adc1Pin> BatteryMonitor<PIN> {
    pub fn new(adc: Adc1, pin: PIN) -> Self {
        Self { adc, _pin: pin }
    }
}

impl<PIN: Adc1Pin> BatterySensor for BatteryMonitor<PIN> {
    fn read_adc(&mut self) -> u16 {
        self.adc.read(PIN::CHANNEL)
    }
}
