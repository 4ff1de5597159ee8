// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Timed auto-level calibration.
//!
//! While running, the session sums the fused (untrimmed) roll/pitch of every tick. Once the window
//! has elapsed it produces trims equal to the negated averages, provided enough samples were seen.

use crate::config::LEVEL_CAL_MIN_SAMPLES;

/// How a calibration session ended.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum CalibrationOutcome {
    /// New trims were computed.
    Committed {
        trim_roll_deg: f32,
        trim_pitch_deg: f32,
        samples: u32,
    },
    /// Too few samples arrived inside the window; trims are unchanged.
    Starved { samples: u32 },
}

/// One level calibration session.
#[derive(Clone, Debug, Default)]
pub struct LevelCalibration {
    running: bool,
    done: bool,
    start_us: u64,
    window_us: u64,
    samples: u32,
    sum_roll: f64,
    sum_pitch: f64,
}

impl LevelCalibration {
    pub const fn new() -> Self {
        Self {
            running: false,
            done: false,
            start_us: 0,
            window_us: 0,
            samples: 0,
            sum_roll: 0.0,
            sum_pitch: 0.0,
        }
    }

    /// Begin (or restart) a session at `now_us` lasting `window_us`.
    pub fn start(&mut self, now_us: u64, window_us: u64) {
        *self = Self {
            running: true,
            start_us: now_us,
            window_us,
            ..Self::new()
        };
    }

    /// Abort without producing trims.
    pub fn cancel(&mut self) {
        self.running = false;
        self.done = false;
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.done
    }

    #[inline]
    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Add one fused sample; returns the outcome on the tick the window closes.
    pub fn accumulate(
        &mut self,
        roll_deg: f32,
        pitch_deg: f32,
        now_us: u64,
    ) -> Option<CalibrationOutcome> {
        if !self.running {
            return None;
        }

        self.sum_roll += roll_deg as f64;
        self.sum_pitch += pitch_deg as f64;
        self.samples = self.samples.saturating_add(1);

        if now_us.saturating_sub(self.start_us) < self.window_us {
            return None;
        }

        self.running = false;
        self.done = true;

        if self.samples < LEVEL_CAL_MIN_SAMPLES {
            return Some(CalibrationOutcome::Starved {
                samples: self.samples,
            });
        }

        let n = self.samples as f64;
        Some(CalibrationOutcome::Committed {
            trim_roll_deg: -(self.sum_roll / n) as f32,
            trim_pitch_deg: -(self.sum_pitch / n) as f32,
            samples: self.samples,
        })
    }
}
