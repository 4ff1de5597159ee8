// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Boot counter and reset-cause record.
//!
//! The record lives in two words of reset-surviving storage:
//!
//! ```text
//! word 0: [31:16] tag 0xB007 | [15:9] 0 | [8] report pending | [7:0] reset cause code
//! word 1: boot count
//! ```
//!
//! A store without the tag (cold power-up, first flash) counts as empty.

use core::fmt::{self, Write};

use heapless::String;

use crate::io::BootStore;

const RECORD_TAG: u32 = 0xB007;

/// Longest banner: `RST:DEEPSLEEP,BOOT:4294967295,PEND:1\n`.
pub const BANNER_CAPACITY: usize = 40;

pub type Banner = String<BANNER_CAPACITY>;

/// Why the MCU last came out of reset.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum ResetCause {
    PowerOn,
    ExternalPin,
    Software,
    Panic,
    InterruptWatchdog,
    TaskWatchdog,
    Watchdog,
    DeepSleep,
    Brownout,
    Sdio,
    Unknown,
}

impl ResetCause {
    /// Short name used in the link banner.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            ResetCause::PowerOn => "POWERON",
            ResetCause::ExternalPin => "EXT_PIN",
            ResetCause::Software => "SW_RESET",
            ResetCause::Panic => "PANIC",
            ResetCause::InterruptWatchdog => "INT_WDT",
            ResetCause::TaskWatchdog => "TASK_WDT",
            ResetCause::Watchdog => "WDT",
            ResetCause::DeepSleep => "DEEPSLEEP",
            ResetCause::Brownout => "BROWNOUT",
            ResetCause::Sdio => "SDIO",
            ResetCause::Unknown => "UNKNOWN",
        }
    }

    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => ResetCause::PowerOn,
            1 => ResetCause::ExternalPin,
            2 => ResetCause::Software,
            3 => ResetCause::Panic,
            4 => ResetCause::InterruptWatchdog,
            5 => ResetCause::TaskWatchdog,
            6 => ResetCause::Watchdog,
            7 => ResetCause::DeepSleep,
            8 => ResetCause::Brownout,
            9 => ResetCause::Sdio,
            _ => ResetCause::Unknown,
        }
    }
}

impl fmt::Display for ResetCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct BootRecord {
    pub boot_count: u32,
    pub last_reset: ResetCause,
    /// Set on every boot, cleared once reported to a client.
    pub report_pending: bool,
}

impl Default for BootRecord {
    fn default() -> Self {
        Self {
            boot_count: 0,
            last_reset: ResetCause::Unknown,
            report_pending: false,
        }
    }
}

impl BootRecord {
    pub fn to_words(&self) -> [u32; 2] {
        let header = (RECORD_TAG << 16)
            | ((self.report_pending as u32) << 8)
            | self.last_reset.code() as u32;
        [header, self.boot_count]
    }

    /// `None` if the words do not carry the record tag.
    pub fn from_words(words: [u32; 2]) -> Option<Self> {
        let [header, boot_count] = words;
        if header >> 16 != RECORD_TAG {
            return None;
        }
        Some(Self {
            boot_count,
            last_reset: ResetCause::from_code(header as u8),
            report_pending: header & (1 << 8) != 0,
        })
    }
}

/// Boot record bound to its backing store. Every mutation is written through.
pub struct BootLog<S: BootStore> {
    store: S,
    record: BootRecord,
}

impl<S: BootStore> BootLog<S> {
    /// Load the previous record, count this boot and mark it for reporting.
    pub fn open(mut store: S, cause: ResetCause) -> Self {
        let prev = store
            .load()
            .and_then(BootRecord::from_words)
            .unwrap_or_default();

        let record = BootRecord {
            boot_count: prev.boot_count.wrapping_add(1),
            last_reset: cause,
            report_pending: true,
        };
        store.save(record.to_words());

        Self { store, record }
    }

    #[inline]
    pub fn record(&self) -> BootRecord {
        self.record
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Clear the pending flag, returning the record as it was if a report was due.
    pub fn take_pending(&mut self) -> Option<BootRecord> {
        if !self.record.report_pending {
            return None;
        }
        let due = self.record;
        self.record.report_pending = false;
        self.store.save(self.record.to_words());
        Some(due)
    }

    /// One-line status banner for a newly streaming client. Consumes the pending report.
    pub fn banner(&mut self) -> Banner {
        let mut line = Banner::new();
        // Capacity covers the longest cause and count.
        let _ = match self.take_pending() {
            Some(rec) => write!(
                line,
                "RST:{},BOOT:{},PEND:1\n",
                rec.last_reset, rec.boot_count
            ),
            None => line.write_str("RST:OK,BOOT:NA,PEND:0\n"),
        };
        line
    }
}
