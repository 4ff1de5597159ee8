// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Pin definitions for the STM32F777 flight board.

use stm32f7xx_hal::{
    gpio::{gpioa, gpiob, gpiod, gpioe, Alternate, Analog, Floating, Input, Output, PushPull},
    pac,
    prelude::*,
};

/// All board pins. Construct this once at startup using:
///
/// ```ignore
/// let pins = BoardPins::new(dp.GPIOA, dp.GPIOB, dp.GPIOD, dp.GPIOE);
/// ```
pub struct BoardPins {
    pub leds: LedPins,
    pub usart1: Usart1Pins,
    pub usart2: Usart2Pins,
    pub spi4: Spi4Pins,
    pub esc: EscPins,
    pub battery: gpioa::PA3<Analog>, // ADC1_IN3
}

pub struct LedPins {
    pub red: gpiod::PD8<Output<PushPull>>,
    pub green: gpiod::PD10<Output<PushPull>>,
}

/// Debug console
pub struct Usart1Pins {
    pub tx: gpioa::PA9<Alternate<7>>,
    pub rx: gpioa::PA10<Alternate<7>>,
}

/// Wi-Fi bridge UART and its client-connected line
pub struct Usart2Pins {
    pub tx: gpiod::PD5<Alternate<7>>,
    pub rx: gpiod::PD6<Alternate<7>>,
    pub client: gpiod::PD7<Input<Floating>>,
}

/// SPI4 SCK/MISO/MOSI and the IMU chip select
pub struct Spi4Pins {
    pub sck: gpioe::PE12<Alternate<5>>,
    pub miso: gpioe::PE13<Alternate<5>>,
    pub mosi: gpioe::PE14<Alternate<5>>,
    pub cs_imu: gpioe::PE4<Output<PushPull>>,
}

/// ESC signal outputs, TIM3 CH1..CH4
pub struct EscPins {
    pub fl: gpioa::PA6<Alternate<2>>,
    pub fr: gpioa::PA7<Alternate<2>>,
    pub bl: gpiob::PB0<Alternate<2>>,
    pub br: gpiob::PB1<Alternate<2>>,
}

impl BoardPins {
    /// Create all named pins from raw GPIO peripherals.
    pub fn new(gpioa: pac::GPIOA, gpiob: pac::GPIOB, gpiod: pac::GPIOD, gpioe: pac::GPIOE) -> Self {
        let gpioa = gpioa.split();
        let gpiob = gpiob.split();
        let gpiod = gpiod.split();
        let gpioe = gpioe.split();

        Self {
            leds: LedPins {
                red: gpiod.pd8.into_push_pull_output(),
                green: gpiod.pd10.into_push_pull_output(),
            },

            usart1: Usart1Pins {
                tx: gpioa.pa9.into_alternate::<7>(),
                rx: gpioa.pa10.into_alternate::<7>(),
            },

            usart2: Usart2Pins {
                tx: gpiod.pd5.into_alternate::<7>(),
                rx: gpiod.pd6.into_alternate::<7>(),
                client: gpiod.pd7.into_floating_input(),
            },

            spi4: Spi4Pins {
                sck: gpioe.pe12.into_alternate::<5>(),
                miso: gpioe.pe13.into_alternate::<5>(),
                mosi: gpioe.pe14.into_alternate::<5>(),
                cs_imu: gpioe.pe4.into_push_pull_output(),
            },

            esc: EscPins {
                fl: gpioa.pa6.into_alternate::<2>(),
                fr: gpioa.pa7.into_alternate::<2>(),
                bl: gpiob.pb0.into_alternate::<2>(),
                br: gpiob.pb1.into_alternate::<2>(),
            },

            battery: gpioa.pa3.into_analog(),
        }
    }
}
