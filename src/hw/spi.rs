// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! SPI bus with guarded chip selects.
//!
//! A device transaction is `cs.select()` followed by one or more transfers; the returned
//! [`Selected`] guard releases the line when it goes out of scope, including on the `?` path.
//!
//! ```ignore
//! let mut bus = SpiBus::new(spi4);
//! let mut cs = ChipSelect::active_low(pins.spi4.cs_imu);
//! let mut buf = [0x75 | 0x80, 0x00];
//! bus.transaction(&mut cs, &mut buf)?;
//! ```

use stm32f7xx_hal::{
    gpio::{self, Output, PinState, PushPull},
    prelude::*,
    spi::{self, Enabled, Spi},
};

/// Enabled HAL SPI instance moving 8-bit words.
pub struct SpiBus<I, P> {
    spi: Spi<I, P, Enabled<u8>>,
}

impl<I, P> SpiBus<I, P>
where
    I: spi::Instance,
    P: spi::Pins<I>,
{
    pub fn new(spi: Spi<I, P, Enabled<u8>>) -> Self {
        Self { spi }
    }

    /// Full-duplex transfer; `buf` is replaced with the bytes clocked in.
    pub fn transfer_in_place(&mut self, buf: &mut [u8]) -> Result<(), spi::Error> {
        self.spi.transfer(buf)?;
        Ok(())
    }

    /// Select `cs`, transfer `buf`, release `cs`.
    pub fn transaction<const CP: char, const CN: u8>(
        &mut self,
        cs: &mut ChipSelect<CP, CN>,
        buf: &mut [u8],
    ) -> Result<(), spi::Error> {
        let _selected = cs.select();
        self.transfer_in_place(buf)
    }
}

/// Active-low chip-select line.
pub struct ChipSelect<const P: char, const N: u8> {
    pin: gpio::Pin<P, N, Output<PushPull>>,
}

impl<const P: char, const N: u8> ChipSelect<P, N> {
    /// Take `pin` as a chip select, starting released (high).
    pub fn active_low<MODE>(pin: gpio::Pin<P, N, MODE>) -> Self {
        let mut pin = pin.into_push_pull_output();
        pin.set_state(PinState::High);
        Self { pin }
    }

    /// Assert the line until the guard is dropped.
    pub fn select(&mut self) -> Selected<'_, P, N> {
        self.pin.set_low();
        Selected { cs: self }
    }

    #[inline]
    pub fn is_selected(&self) -> bool {
        self.pin.is_set_low()
    }
}

/// Asserted chip select; released on drop.
pub struct Selected<'a, const P: char, const N: u8> {
    cs: &'a mut ChipSelect<P, N>,
}

impl<const P: char, const N: u8> Drop for Selected<'_, P, N> {
    fn drop(&mut self) {
        self.cs.pin.set_high();
    }
}
