// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Complementary filter for roll and pitch.
//!
//! The accelerometer gives an absolute but noisy tilt, the gyro a clean but drifting rate. Each
//! step blends the gyro-integrated angle with the accelerometer angle:
//!
//! ```text
//! fused = alpha * (fused + rate * dt) + (1 - alpha) * accel_angle
//! ```
//!
//! Calibration trims are added on read, so [`roll_deg`](AttitudeEstimator::roll_deg) and
//! [`pitch_deg`](AttitudeEstimator::pitch_deg) are what the controller and telemetry see.

use micromath::F32Ext;

use crate::attitude::calibration::{CalibrationOutcome, LevelCalibration};
use crate::config::DEFAULT_ALPHA;
use crate::io::InertialSample;

const RAD_TO_DEG: f32 = 57.29578;

/// Tilt angles implied by the gravity vector alone, in degrees.
///
/// `micromath`'s `atan2` approximation is off by up to about 0.17° over ±89° of roll. Level trims
/// cancel the error at the calibration attitude only.
pub fn accel_tilt_deg(sample: &InertialSample) -> (f32, f32) {
    let (ax, ay, az) = (sample.accel_x, sample.accel_y, sample.accel_z);
    let roll = F32Ext::atan2(ay, az) * RAD_TO_DEG;
    let pitch = F32Ext::atan2(-ax, F32Ext::sqrt(ay * ay + az * az)) * RAD_TO_DEG;
    (roll, pitch)
}

/// Roll/pitch estimator with level-calibration trims.
#[derive(Clone, Debug)]
pub struct AttitudeEstimator {
    alpha: f32,

    /// Fused angles, untrimmed (deg)
    roll: f32,
    pitch: f32,

    /// Last raw rates (deg/s)
    gx: f32,
    gy: f32,

    trim_roll: f32,
    trim_pitch: f32,

    cal: LevelCalibration,
}

impl AttitudeEstimator {
    /// `alpha` close to 1.0 trusts the gyro more; lower values follow the accelerometer faster.
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            roll: 0.0,
            pitch: 0.0,
            gx: 0.0,
            gy: 0.0,
            trim_roll: 0.0,
            trim_pitch: 0.0,
            cal: LevelCalibration::new(),
        }
    }

    /// Overwrite the fused state. Trims are kept.
    pub fn reset(&mut self, roll0: f32, pitch0: f32) {
        self.roll = roll0;
        self.pitch = pitch0;
    }

    /// Advance the filter by one sample taken `dt` seconds after the previous one.
    ///
    /// Returns the calibration outcome on the tick a running calibration finishes.
    pub fn update(
        &mut self,
        sample: &InertialSample,
        dt: f32,
        now_us: u64,
    ) -> Option<CalibrationOutcome> {
        self.gx = sample.gyro_x;
        self.gy = sample.gyro_y;

        let (roll_acc, pitch_acc) = accel_tilt_deg(sample);
        let a = self.alpha;
        self.roll = a * (self.roll + self.gx * dt) + (1.0 - a) * roll_acc;
        self.pitch = a * (self.pitch + self.gy * dt) + (1.0 - a) * pitch_acc;

        // Accumulate after fusion so trims cancel exactly what is exposed.
        let outcome = self.cal.accumulate(self.roll, self.pitch, now_us);
        if let Some(CalibrationOutcome::Committed {
            trim_roll_deg,
            trim_pitch_deg,
            ..
        }) = outcome
        {
            self.trim_roll = trim_roll_deg;
            self.trim_pitch = trim_pitch_deg;
        }
        outcome
    }

    /// Fused roll plus trim (deg).
    #[inline]
    pub fn roll_deg(&self) -> f32 {
        self.roll + self.trim_roll
    }

    /// Fused pitch plus trim (deg).
    #[inline]
    pub fn pitch_deg(&self) -> f32 {
        self.pitch + self.trim_pitch
    }

    #[inline]
    pub fn gyro_x_dps(&self) -> f32 {
        self.gx
    }

    #[inline]
    pub fn gyro_y_dps(&self) -> f32 {
        self.gy
    }

    #[inline]
    pub fn trims(&self) -> (f32, f32) {
        (self.trim_roll, self.trim_pitch)
    }

    /// Start a level calibration at `now_us`. Restarts a session already in progress.
    pub fn start_level_cal(&mut self, now_us: u64, window_us: u64) {
        self.cal.start(now_us, window_us);
    }

    pub fn is_level_cal_running(&self) -> bool {
        self.cal.is_running()
    }

    pub fn is_level_cal_done(&self) -> bool {
        self.cal.is_done()
    }

    /// Abort the running calibration without touching trims.
    pub fn cancel_level_cal(&mut self) {
        self.cal.cancel();
    }
}

impl Default for AttitudeEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.002;

    /// Gravity vector for a vehicle held at the given tilt.
    fn tilted(roll_deg: f32, pitch_deg: f32) -> InertialSample {
        let (r, p) = (roll_deg.to_radians(), pitch_deg.to_radians());
        InertialSample {
            accel_x: -p.sin(),
            accel_y: p.cos() * r.sin(),
            accel_z: p.cos() * r.cos(),
            ..InertialSample::default()
        }
    }

    #[test]
    fn accel_tilt_error_stays_within_approximation_bound() {
        let mut worst: f32 = 0.0;
        for deg in -89..=89 {
            let deg = deg as f32;
            let (roll, _) = accel_tilt_deg(&tilted(deg, 0.0));
            worst = worst.max((roll - deg).abs());
        }
        assert!(worst < 0.2, "worst error {} deg", worst);
    }

    #[test]
    fn accel_tilt_roughly_recovers_angles() {
        let (roll, pitch) = accel_tilt_deg(&tilted(10.0, -5.0));
        assert!((roll - 10.0).abs() < 0.5, "roll {}", roll);
        assert!((pitch + 5.0).abs() < 0.5, "pitch {}", pitch);
    }

    #[test]
    fn fusion_converges_monotonically() {
        let sample = tilted(12.0, -7.0);
        let (target_roll, target_pitch) = accel_tilt_deg(&sample);

        for (r0, p0) in [(0.0, 0.0), (-40.0, 30.0), (25.0, -25.0)] {
            let mut est = AttitudeEstimator::default();
            est.reset(r0, p0);

            let mut prev_r = (est.roll_deg() - target_roll).abs();
            let mut prev_p = (est.pitch_deg() - target_pitch).abs();
            for i in 0..2_000u64 {
                est.update(&sample, DT, i * 2_000);
                let err_r = (est.roll_deg() - target_roll).abs();
                let err_p = (est.pitch_deg() - target_pitch).abs();
                assert!(err_r <= prev_r + 1e-4);
                assert!(err_p <= prev_p + 1e-4);
                prev_r = err_r;
                prev_p = err_p;
            }
            assert!(prev_r < 0.01);
            assert!(prev_p < 0.01);
        }
    }

    #[test]
    fn gyro_rate_integrates_between_accel_corrections() {
        let mut est = AttitudeEstimator::new(1.0);
        let sample = InertialSample {
            gyro_x: 100.0,
            gyro_y: -50.0,
            ..InertialSample::LEVEL
        };
        for i in 0..100u64 {
            est.update(&sample, 0.01, i * 10_000);
        }
        assert!((est.roll_deg() - 100.0).abs() < 1e-2);
        assert!((est.pitch_deg() + 50.0).abs() < 1e-2);
        assert_eq!(est.gyro_x_dps(), 100.0);
        assert_eq!(est.gyro_y_dps(), -50.0);
    }

    #[test]
    fn level_calibration_cancels_steady_tilt() {
        let sample = tilted(3.0, -2.0);
        let mut est = AttitudeEstimator::default();

        // Let the filter settle before calibrating.
        let mut now = 0u64;
        for _ in 0..1_000 {
            now += 2_000;
            est.update(&sample, DT, now);
        }

        est.start_level_cal(now, 500_000);
        assert!(est.is_level_cal_running());

        let mut outcome = None;
        while outcome.is_none() {
            now += 2_000;
            outcome = est.update(&sample, DT, now);
        }

        match outcome {
            Some(CalibrationOutcome::Committed { samples, .. }) => assert!(samples >= 200),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(est.is_level_cal_done());

        now += 2_000;
        est.update(&sample, DT, now);
        assert!(est.roll_deg().abs() < 0.01, "roll {}", est.roll_deg());
        assert!(est.pitch_deg().abs() < 0.01, "pitch {}", est.pitch_deg());
    }

    #[test]
    fn starved_calibration_keeps_previous_trims() {
        let sample = tilted(3.0, -2.0);
        let mut est = AttitudeEstimator::default();
        est.reset(3.0, -2.0);

        est.start_level_cal(0, 100_000);
        // Only a handful of samples arrive before the window closes.
        est.update(&sample, DT, 10_000);
        let outcome = est.update(&sample, DT, 150_000);

        assert_eq!(outcome, Some(CalibrationOutcome::Starved { samples: 2 }));
        assert!(est.is_level_cal_done());
        assert_eq!(est.trims(), (0.0, 0.0));
    }

    #[test]
    fn reset_keeps_trims() {
        // alpha = 1 holds the fused state still under zero rates.
        let mut est = AttitudeEstimator::new(1.0);
        est.reset(4.0, -1.0);
        est.start_level_cal(0, 500_000);

        let mut now = 0u64;
        let mut outcome = None;
        while outcome.is_none() {
            now += 2_000;
            outcome = est.update(&InertialSample::LEVEL, DT, now);
        }
        assert!(matches!(outcome, Some(CalibrationOutcome::Committed { .. })));

        est.reset(1.0, 2.0);
        assert!((est.roll_deg() + 3.0).abs() < 1e-5);
        assert!((est.pitch_deg() - 3.0).abs() < 1e-5);
    }

    #[test]
    fn cancel_stops_accumulating() {
        let mut est = AttitudeEstimator::default();
        est.start_level_cal(0, 10_000);
        est.cancel_level_cal();
        assert!(!est.is_level_cal_running());
        assert_eq!(est.update(&InertialSample::LEVEL, DT, 20_000), None);
        assert!(!est.is_level_cal_done());
    }
}
