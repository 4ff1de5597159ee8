// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # tiltlink Firmware
//!
//! Tilt-stabilization firmware for a small quadrotor, written in Rust, targeting an STM32F777 MCU.
//! The vehicle holds roll and pitch from an inertial sensor, streams telemetry to a ground
//! station over a wireless link, and takes binary flight commands back.
//!
//! ## Crate Structure
//!
//! | Module | Purpose |
//! | ------ | -------- |
//! | [`scheduler`] | Drift-compensated periodic ticks |
//! | [`attitude`] | Complementary-filter estimator and level calibration |
//! | [`control`] | Tilt PID and X-quad motor mixing |
//! | [`protocol`] | Command and telemetry wire frames |
//! | [`link`] | Client handshake state machine and boot record |
//! | [`flight`] | The cooperative flight loop tying everything together |
//! | [`io`] | Interfaces to sensors, motors, and transport |
//! | [`config`] | Rates, gains, and limits |
//! | `hw` | MCU-level wrappers around USART, SPI, ADC, timers, etc. (`board` feature) |
//! | `drivers` | Device-level drivers (MPU-9250, ESCs) (`board` feature) |
//!
//! Everything except `hw` and `drivers` is hardware independent and builds on the host, which is
//! where the unit tests run.
//!
//! ## Getting Started
//!
//! Run the tests on the host:
//!
//! ```bash
//! cargo test
//! ```
//!
//! Flash the board:
//!
//! ```bash
//! cargo run --release --features board --target thumbv7em-none-eabihf
//! ```
//!
//! ## License
//!
//! Licensed under the **MIT License**.
//! See the `LICENSE` file in the repository root for full terms.
//!
//! © 2025–2026 Christopher Liu

#![cfg_attr(not(test), no_std)]

pub mod attitude;
pub mod config;
pub mod control;
pub mod error;
pub mod flight;
pub mod io;
pub mod link;
pub mod protocol;
pub mod scheduler;

#[cfg(feature = "board")]
pub mod drivers;
#[cfg(feature = "board")]
pub mod hw;

pub use config::FlightConfig;
pub use flight::{FlightController, Silent};
