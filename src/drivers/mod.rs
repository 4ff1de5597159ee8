// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Device-Specific Drivers
//!
//! This module contains device-specific drivers that sit above the raw `hw/` layer and implement
//! the [`io`](crate::io) interfaces the flight loop consumes.
//!
//! ## Existing drivers
//!
//! - [`mpu9250`] – InvenSense MPU-9250 6-axis IMU over SPI
//! - [`esc`] – Four PWM-driven electronic speed controllers

pub mod esc;
pub mod mpu9250;

pub use esc::Escs;
pub use mpu9250::Mpu9250;
