// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Control Algorithms
//!
//! Closed-loop tilt stabilization for the airframe.
//!
//! ## Modules
//!
//! - [`pid`] - Single-axis PID with rate feedback and integrator clamp.
//! - [`tilt_controller`] - Roll/pitch controller with X-quad motor mixing.

pub mod pid;
pub mod tilt_controller;

pub use pid::{Gains, Pid};
pub use tilt_controller::{Tilt, TiltController};
