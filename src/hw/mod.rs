// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # MCU-Level Wrappers
//!
//! ## Modules
//!
//! - [`adc`] - ADC1 single conversions and the battery monitor.
//! - [`backup`] - Reset cause and RTC backup-register boot store.
//! - [`clock`] - 1 MHz free-running TIM2 clock.
//! - [`led`] - Status LED.
//! - [`pins`] - Board pin map.
//! - [`pwm`] - TIM3 PWM channels for the ESCs.
//! - [`serial_link`] - Ground-link transport over the USART2 Wi-Fi bridge.
//! - [`spi`] - SPI bus and chip select.
//! - [`usart`] - Debug console.

pub mod adc;
pub mod backup;
pub mod clock;
pub mod led;
pub mod pins;
pub mod pwm;
pub mod serial_link;
pub mod spi;
pub mod usart;

pub use adc::{Adc1, Adc1Pin, BatteryMonitor};
pub use backup::BackupRegisters;
pub use clock::MicrosClock;
pub use led::Led;
pub use pins::BoardPins;
pub use pwm::Tim3Channel;
pub use serial_link::{BridgeConn, BridgeListener};
pub use spi::{ChipSelect, Selected, SpiBus};
pub use usart::Console;
