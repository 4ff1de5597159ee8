// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Debug console on a USART.
//!
//! The flight loop writes `[TAG] message\r\n` lines here through `core::fmt::Write`. Output is
//! blocking; at 115200 baud a typical log line costs a few milliseconds, so the loop only logs on
//! state changes.
//!
//! To access the terminal on the host machine, connect to the debug USB port and use
//! ```text
//! $ screen /dev/tty.usbmodem* 115200
//! ```
//!
//! To close the debug terminal, press `Ctrl+A` then `Ctrl+\` then `y`.

use core::fmt;
use nb::block;

use stm32f7xx_hal::{
    prelude::*,
    serial::{Instance, Pins, Serial, Tx},
};

/// Transmit-only console. The receive half is unused.
pub struct Console<U: Instance> {
    tx: Tx<U>,
}

impl<U: Instance> Console<U> {
    pub fn new<PINS: Pins<U>>(serial: Serial<U, PINS>) -> Self {
        let (tx, _rx) = serial.split();
        Self { tx }
    }

    #[inline]
    fn write_byte(&mut self, b: u8) {
        let _ = block!(self.tx.write(b));
    }

    /// Block until the last byte has left the shift register.
    #[inline]
    pub fn flush(&mut self) {
        let _ = block!(self.tx.flush());
    }
}

impl<U: Instance> fmt::Write for Console<U> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for &b in s.as_bytes() {
            self.write_byte(b);
        }
        Ok(())
    }
}
