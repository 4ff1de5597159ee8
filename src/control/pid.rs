// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Single-axis PID for tilt stabilization.
//!
//! Works in `no_std` and does not allocate memory. The derivative term acts on the measured
//! angular rate (straight from the gyro), not on the differentiated error.

use crate::config::INTEGRAL_LIMIT;

/// PID gain set for one axis.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Gains {
    /// Proportional gain
    pub kp: f32,
    /// Integral gain
    pub ki: f32,
    /// Rate (derivative) gain
    pub kd: f32,
}

impl Gains {
    pub const fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self { kp, ki, kd }
    }
}

/// PID controller with rate feedback and integral anti-windup.
#[derive(Clone, Debug)]
pub struct Pid {
    gains: Gains,

    /// Integrator state
    integral: f32,

    /// Integral anti-windup clamp (symmetric)
    int_limit: f32,

    /// Last error and output, kept for diagnostics
    last_error: f32,
    last_output: f32,
}

impl Pid {
    /// Create a new controller with the standard tilt anti-windup bound.
    pub const fn new(gains: Gains) -> Self {
        Self {
            gains,
            integral: 0.0,
            int_limit: INTEGRAL_LIMIT,
            last_error: 0.0,
            last_output: 0.0,
        }
    }

    /// Set a different symmetric integral limit.
    pub fn with_integral_limit(mut self, limit: f32) -> Self {
        self.int_limit = if limit < 0.0 { -limit } else { limit };
        self
    }

    #[inline]
    pub fn gains(&self) -> Gains {
        self.gains
    }

    /// Clear the integrator.
    pub fn reset(&mut self) {
        self.integral = 0.0;
    }

    #[inline]
    pub fn integral(&self) -> f32 {
        self.integral
    }

    #[inline]
    pub fn last_error(&self) -> f32 {
        self.last_error
    }

    #[inline]
    pub fn last_output(&self) -> f32 {
        self.last_output
    }

    /// Update the controller.
    ///
    /// `setpoint`: desired angle (deg)
    /// `measurement`: current angle (deg)
    /// `rate`: current angular rate about the same axis (deg/s)
    /// `dt`: timestep in seconds (e.g. 0.002 for a 500 Hz loop)
    ///
    /// Returns the unclamped control effort in actuator units.
    pub fn update(&mut self, setpoint: f32, measurement: f32, rate: f32, dt: f32) -> f32 {
        let error = setpoint - measurement;

        // ----- I term -----
        self.integral += error * dt;

        // Anti-windup clamp
        if self.integral > self.int_limit {
            self.integral = self.int_limit;
        }
        if self.integral < -self.int_limit {
            self.integral = -self.int_limit;
        }

        let Gains { kp, ki, kd } = self.gains;
        let out = kp * error + ki * self.integral - kd * rate;

        self.last_error = error;
        self.last_output = out;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proportional_integral_and_rate_terms() {
        let mut pid = Pid::new(Gains::new(2.0, 1.0, 0.5));
        let out = pid.update(5.0, 3.0, 4.0, 0.1);
        // error 2, integral 0.2, rate 4
        assert!((out - (4.0 + 0.2 - 2.0)).abs() < 1e-6);
        assert!((pid.integral() - 0.2).abs() < 1e-6);
        assert_eq!(pid.last_error(), 2.0);
        assert!((pid.last_output() - out).abs() < 1e-9);
    }

    #[test]
    fn integral_is_clamped_both_ways() {
        let mut pid = Pid::new(Gains::new(0.0, 1.0, 0.0));
        for _ in 0..10_000 {
            pid.update(90.0, -90.0, 0.0, 0.01);
            assert!(pid.integral() <= INTEGRAL_LIMIT);
        }
        assert_eq!(pid.integral(), INTEGRAL_LIMIT);

        for _ in 0..20_000 {
            pid.update(-90.0, 90.0, 0.0, 0.01);
            assert!(pid.integral() >= -INTEGRAL_LIMIT);
        }
        assert_eq!(pid.integral(), -INTEGRAL_LIMIT);
    }

    #[test]
    fn custom_limit_and_reset() {
        let mut pid = Pid::new(Gains::new(0.0, 1.0, 0.0)).with_integral_limit(-2.0);
        for _ in 0..100 {
            pid.update(10.0, 0.0, 0.0, 0.1);
        }
        assert_eq!(pid.integral(), 2.0);
        pid.reset();
        assert_eq!(pid.integral(), 0.0);
    }
}
