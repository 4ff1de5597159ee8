// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Drift-compensated periodic tick generator.
//!
//! Each [`Periodic`] keeps a "next due" timestamp that only ever advances by whole periods, so
//! repeated firing never accumulates rounding drift from measured elapsed times. After a stall the
//! schedule jumps forward past `now` instead of bursting catch-up ticks.
//!
//! ```ignore
//! let mut control = Periodic::from_hz(500);
//!
//! loop {
//!     if let Some(tick) = control.poll(clock.now_us()) {
//!         estimator.update(&sample, tick.dt_seconds(), now);
//!     }
//! }
//! ```

/// Result of a fired tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Tick {
    /// Time of this fire (µs).
    pub now_us: u64,
    /// Real elapsed time since the previous fire, or the nominal period on the first fire.
    pub dt_us: u64,
    /// Whole periods that were skipped because the caller polled late.
    pub skipped: u32,
}

impl Tick {
    #[inline]
    pub fn dt_seconds(&self) -> f32 {
        self.dt_us as f32 * 1e-6
    }
}

/// Fixed-period scheduler slot.
/// Period of a `hz` rate in µs, with a zero rate treated as 1 Hz.
pub const fn period_us_for_hz(hz: u32) -> u64 {
    let hz = if hz == 0 { 1 } else { hz };
    1_000_000 / hz as u64
}

#[derive(Clone, Debug)]
pub struct Periodic {
    period_us: u64,
    next_due_us: u64,
    last_fire_us: Option<u64>,
}

impl Periodic {
    /// Create a slot that fires on its first poll and every `period_us` after that.
    pub const fn new(period_us: u64) -> Self {
        Self {
            period_us: if period_us == 0 { 1 } else { period_us },
            next_due_us: 0,
            last_fire_us: None,
        }
    }

    /// A zero rate is treated as 1 Hz.
    pub const fn from_hz(hz: u32) -> Self {
        Self::new(period_us_for_hz(hz))
    }

    #[inline]
    pub fn period_us(&self) -> u64 {
        self.period_us
    }

    /// Timestamp of the next fire, once the slot has fired at least once.
    #[inline]
    pub fn next_due_us(&self) -> Option<u64> {
        self.last_fire_us.map(|_| self.next_due_us)
    }

    /// Forget all timing history; the next poll fires immediately.
    pub fn reset(&mut self) {
        self.next_due_us = 0;
        self.last_fire_us = None;
    }

    /// Fire if the slot is due at `now_us`.
    pub fn poll(&mut self, now_us: u64) -> Option<Tick> {
        let Some(last) = self.last_fire_us else {
            self.last_fire_us = Some(now_us);
            self.next_due_us = now_us + self.period_us;
            return Some(Tick {
                now_us,
                dt_us: self.period_us,
                skipped: 0,
            });
        };

        if now_us < self.next_due_us {
            return None;
        }

        // Advance by whole periods until the schedule is strictly ahead of `now`.
        let late = now_us - self.next_due_us;
        let periods = late / self.period_us + 1;
        self.next_due_us += periods * self.period_us;
        self.last_fire_us = Some(now_us);

        Some(Tick {
            now_us,
            dt_us: now_us.saturating_sub(last),
            skipped: (periods - 1).min(u32::MAX as u64) as u32,
        })
    }
}
