// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Attitude Estimation
//!
//! ## Modules
//!
//! - [`estimator`] - Complementary filter fusing gyro rate with accelerometer tilt.
//! - [`calibration`] - Timed level calibration producing roll/pitch trims.

pub mod calibration;
pub mod estimator;

pub use calibration::{CalibrationOutcome, LevelCalibration};
pub use estimator::AttitudeEstimator;
