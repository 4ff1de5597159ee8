// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Wire Protocol
//!
//! ## Modules
//!
//! - [`messages`] - Frame constants, checksum, fixed-point helpers and the command frame.
//! - [`telemetry`] - Outbound telemetry frames.
//! - [`parser`] - Resynchronizing command decoder.

pub mod messages;
pub mod parser;
pub mod telemetry;

pub use messages::CommandFrame;
pub use parser::{Decoded, Parser};
pub use telemetry::{
    AnglesTelemetry, DebugTelemetry, FastTelemetry, TelemetryFrame, TelemetryKind,
};
