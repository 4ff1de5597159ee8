// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Flight configuration.
//!
//! Fixed constants live at module level; everything a board bring-up may want to tune is carried
//! in [`FlightConfig`], which is handed to [`FlightController::new`](crate::flight::FlightController::new).

use crate::control::Gains;
use crate::protocol::TelemetryKind;
use crate::scheduler::period_us_for_hz;

/// TCP port the Wi-Fi bridge listens on for the operator station.
pub const LINK_PORT: u16 = 2323;

/// Attitude + tilt control rate.
pub const CONTROL_HZ: u32 = 500;

/// Telemetry frame rate.
pub const TELEMETRY_HZ: u32 = 50;

/// Complementary filter weight on the integrated gyro estimate.
pub const DEFAULT_ALPHA: f32 = 0.98;

/// Anti-windup bound applied to both integrators (degree-seconds).
pub const INTEGRAL_LIMIT: f32 = 50.0;

/// Fewest fused samples a level calibration needs before it may commit trims.
pub const LEVEL_CAL_MIN_SAMPLES: u32 = 200;

/// Default level calibration window.
pub const LEVEL_CAL_WINDOW_US: u64 = 2_000_000;

/// Commands older than this are treated as a disarm.
pub const COMMAND_TIMEOUT_US: u64 = 500_000;

/// Ceiling for the commanded base power (0..255 actuator scale).
pub const POWER_LIMIT: u8 = 180;

/// Idle delay applied by the board loop while no client is connected.
pub const IDLE_DELAY_MS: u32 = 1;

pub const DEFAULT_ROLL_GAINS: Gains = Gains::new(0.12, 0.02, 0.0015);
pub const DEFAULT_PITCH_GAINS: Gains = Gains::new(0.12, 0.02, 0.0015);

/// Tunable flight loop parameters.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct FlightConfig {
    pub control_period_us: u64,
    pub telemetry_period_us: u64,
    pub alpha: f32,
    pub roll_gains: Gains,
    pub pitch_gains: Gains,

    /// Run a level calibration of this length as soon as the loop starts.
    pub boot_level_cal_us: Option<u64>,

    /// `None` disables the stale-command disarm.
    pub command_timeout_us: Option<u64>,
    pub max_base_power: u8,

    /// Frame kind sent on regular telemetry ticks.
    pub telemetry: TelemetryKind,
    /// Every n-th telemetry tick carries a debug frame instead (0 disables).
    pub debug_every: u8,
}

impl FlightConfig {
    pub const fn new() -> Self {
        Self {
            control_period_us: 1_000_000 / CONTROL_HZ as u64,
            telemetry_period_us: 1_000_000 / TELEMETRY_HZ as u64,
            alpha: DEFAULT_ALPHA,
            roll_gains: DEFAULT_ROLL_GAINS,
            pitch_gains: DEFAULT_PITCH_GAINS,
            boot_level_cal_us: Some(LEVEL_CAL_WINDOW_US),
            command_timeout_us: Some(COMMAND_TIMEOUT_US),
            max_base_power: POWER_LIMIT,
            telemetry: TelemetryKind::Angles,
            debug_every: 0,
        }
    }

    /// Set both loop rates. A zero rate is treated as 1 Hz.
    pub const fn with_rates(mut self, control_hz: u32, telemetry_hz: u32) -> Self {
        self.control_period_us = period_us_for_hz(control_hz);
        self.telemetry_period_us = period_us_for_hz(telemetry_hz);
        self
    }

    pub const fn with_gains(mut self, roll: Gains, pitch: Gains) -> Self {
        self.roll_gains = roll;
        self.pitch_gains = pitch;
        self
    }

    pub const fn with_boot_level_cal(mut self, window_us: Option<u64>) -> Self {
        self.boot_level_cal_us = window_us;
        self
    }

    pub const fn with_command_timeout(mut self, timeout_us: Option<u64>) -> Self {
        self.command_timeout_us = timeout_us;
        self
    }

    pub const fn with_telemetry(mut self, kind: TelemetryKind, debug_every: u8) -> Self {
        self.telemetry = kind;
        self.debug_every = debug_every;
        self
    }

    /// Nominal control period in seconds, used when a measured `dt` is unusable.
    #[inline]
    pub fn nominal_dt(&self) -> f32 {
        self.control_period_us as f32 * 1e-6
    }
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rates_match_constants() {
        let cfg = FlightConfig::default();
        assert_eq!(cfg.control_period_us, 2_000);
        assert_eq!(cfg.telemetry_period_us, 20_000);
        assert!((cfg.nominal_dt() - 0.002).abs() < 1e-9);
    }

    #[test]
    fn zero_rates_do_not_divide_by_zero() {
        let cfg = FlightConfig::new().with_rates(0, 0);
        assert_eq!(cfg.control_period_us, 1_000_000);
        assert_eq!(cfg.telemetry_period_us, 1_000_000);
    }

    #[test]
    fn builders_override_fields() {
        let cfg = FlightConfig::new()
            .with_rates(250, 100)
            .with_command_timeout(None)
            .with_telemetry(TelemetryKind::Fast, 5);
        assert_eq!(cfg.control_period_us, 4_000);
        assert_eq!(cfg.telemetry_period_us, 10_000);
        assert_eq!(cfg.command_timeout_us, None);
        assert_eq!(cfg.telemetry, TelemetryKind::Fast);
        assert_eq!(cfg.debug_every, 5);
    }
}
