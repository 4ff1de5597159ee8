// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Reset cause and RTC backup registers.
//!
//! The RTC backup registers live in the backup domain and keep their contents across every reset
//! except a full power loss (unless VBAT is fitted), which makes them a natural home for the boot
//! record.

use stm32f7xx_hal::pac;

use crate::io::BootStore;
use crate::link::ResetCause;

// RCC_CSR reset flags
const LPWRRSTF: u32 = 1 << 31;
const WWDGRSTF: u32 = 1 << 30;
const IWDGRSTF: u32 = 1 << 29;
const SFTRSTF: u32 = 1 << 28;
const PORRSTF: u32 = 1 << 27;
const PINRSTF: u32 = 1 << 26;
const BORRSTF: u32 = 1 << 25;

/// Decode the RCC_CSR reset flags.
///
/// The pin flag is set on every reset because the reset pulse is driven out, and a power-on sets
/// the brown-out flag too, so the more specific flags are checked first.
pub fn reset_cause_from_flags(csr: u32) -> ResetCause {
    if csr & LPWRRSTF != 0 {
        ResetCause::DeepSleep
    } else if csr & IWDGRSTF != 0 {
        ResetCause::Watchdog
    } else if csr & WWDGRSTF != 0 {
        ResetCause::TaskWatchdog
    } else if csr & SFTRSTF != 0 {
        ResetCause::Software
    } else if csr & PORRSTF != 0 {
        ResetCause::PowerOn
    } else if csr & BORRSTF != 0 {
        ResetCause::Brownout
    } else if csr & PINRSTF != 0 {
        ResetCause::ExternalPin
    } else {
        ResetCause::Unknown
    }
}

/// Read and clear the reset flags. Call once, early in `main`.
pub fn take_reset_cause() -> ResetCause {
    let rcc = unsafe { &*pac::RCC::ptr() };
    let cause = reset_cause_from_flags(rcc.csr.read().bits());
    rcc.csr.modify(|_, w| w.rmvf().set_bit());
    cause
}

/// Two RTC backup registers (BKP0R, BKP1R) as a [`BootStore`].
pub struct BackupRegisters {
    rtc: pac::RTC,
}

impl BackupRegisters {
    /// Enable the RTC register interface and unlock backup-domain writes.
    pub fn new(rtc: pac::RTC) -> Self {
        let rcc = unsafe { &*pac::RCC::ptr() };
        let pwr = unsafe { &*pac::PWR::ptr() };

        // RTC and backup registers sit behind their own APB clock gate on the F76x/F77x
        rcc.apb1enr
            .modify(|_, w| w.pwren().set_bit().rtcapben().set_bit());
        pwr.cr1.modify(|_, w| w.dbp().set_bit());

        Self { rtc }
    }

    #[inline]
    fn read(&self, index: usize) -> u32 {
        self.rtc.bkpr[index].read().bits()
    }

    #[inline]
    fn write(&mut self, index: usize, value: u32) {
        self.rtc.bkpr[index].write(|w| unsafe { w.bits(value) });
    }
}

impl BootStore for BackupRegisters {
    fn load(&mut self) -> Option<[u32; 2]> {
        let words = [self.read(0), self.read(1)];
        // Cleared backup domain
        if words == [0, 0] {
            return None;
        }
        Some(words)
    }

    fn save(&mut self, words: [u32; 2]) {
        self.write(0, words[0]);
        self.write(1, words[1]);
    }
}
