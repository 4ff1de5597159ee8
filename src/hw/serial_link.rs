// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Ground-link transport over a serial Wi-Fi bridge.
//!
//! The bridge module (ESP-01 class, transparent TCP server on port 2323) forwards one TCP client
//! to USART2 byte for byte and drives a "client connected" line high while that client is
//! attached. The listener turns a rising edge on that line into a new [`BridgeConn`].
//!
//! The HAL's USART2 halves live in a static shared by the listener, which flushes stale input on
//! attach, and the connection handed out to the link.
//!
//! ```text
//!  MCU USART2 TX (PD5) ---> bridge RX
//!  MCU USART2 RX (PD6) <--- bridge TX
//!  MCU PD7 (input)     <--- bridge "client" GPIO
//! ```

use core::cell::RefCell;
use core::convert::Infallible;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use cortex_m::interrupt::{self, Mutex};
use nb::block;
use stm32f7xx_hal::{
    gpio::{self, Floating, Input},
    pac::USART2,
    prelude::*,
    serial::{Pins, Rx, Serial, Tx},
};

use crate::io::{Connection, Listener};

/// USART2 halves, installed once by [`BridgeListener::new`].
static PORT: Mutex<RefCell<Option<(Tx<USART2>, Rx<USART2>)>>> = Mutex::new(RefCell::new(None));

/// Level of the connected line at the last listener poll.
static LINE_UP: AtomicBool = AtomicBool::new(false);

/// Id of the connection currently attached to the line.
static SESSION: AtomicU32 = AtomicU32::new(0);

/// Run `f` on the installed port; `None` before the listener exists.
fn with_port<R>(f: impl FnOnce(&mut Tx<USART2>, &mut Rx<USART2>) -> R) -> Option<R> {
    interrupt::free(|cs| {
        PORT.borrow(cs)
            .borrow_mut()
            .as_mut()
            .map(|(tx, rx)| f(tx, rx))
    })
}

/// Move up to `buf.len()` pending bytes into `buf`.
///
/// A framing or overrun error ends this read; the lost bytes are left to the command decoder's
/// resynchronization.
fn read_pending(buf: &mut [u8]) -> usize {
    with_port(|_, rx| {
        let mut n = 0;
        while n < buf.len() {
            match rx.read() {
                Ok(b) => {
                    buf[n] = b;
                    n += 1;
                }
                Err(nb::Error::WouldBlock) | Err(nb::Error::Other(_)) => break,
            }
        }
        n
    })
    .unwrap_or(0)
}

fn write_all(buf: &[u8]) -> usize {
    with_port(|tx, _| {
        for &b in buf {
            let _ = block!(tx.write(b));
        }
        buf.len()
    })
    .unwrap_or(0)
}

/// Accepts bridge clients.
pub struct BridgeListener<const P: char, const N: u8> {
    detect: gpio::Pin<P, N, Input<Floating>>,
    attached: bool,
    next_session: u32,
}

impl<const P: char, const N: u8> BridgeListener<P, N> {
    /// Take over an already configured USART2 and the bridge's connected line.
    pub fn new<PINS: Pins<USART2>>(
        serial: Serial<USART2, PINS>,
        detect: gpio::Pin<P, N, Input<Floating>>,
    ) -> Self {
        let halves = serial.split();
        interrupt::free(|cs| PORT.borrow(cs).replace(Some(halves)));
        Self {
            detect,
            attached: false,
            next_session: 1,
        }
    }
}

impl<const P: char, const N: u8> Listener for BridgeListener<P, N> {
    type Conn = BridgeConn;

    fn accept_if_any(&mut self) -> Option<BridgeConn> {
        let up = self.detect.is_high();
        LINE_UP.store(up, Ordering::Relaxed);

        if !up {
            self.attached = false;
            return None;
        }
        if self.attached {
            return None;
        }

        // Discard whatever the bridge sent before the client showed up.
        let mut scratch = [0u8; 16];
        while read_pending(&mut scratch) > 0 {}

        self.attached = true;
        let session = self.next_session;
        self.next_session = self.next_session.wrapping_add(1);
        SESSION.store(session, Ordering::Relaxed);

        Some(BridgeConn {
            session,
            open: true,
        })
    }
}

/// The TCP client currently attached to the bridge.
pub struct BridgeConn {
    session: u32,
    open: bool,
}

impl Connection for BridgeConn {
    type Error = Infallible;

    fn is_connected(&mut self) -> bool {
        self.open
            && LINE_UP.load(Ordering::Relaxed)
            && SESSION.load(Ordering::Relaxed) == self.session
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Infallible> {
        if !self.is_connected() {
            return Ok(0);
        }
        Ok(read_pending(buf))
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, Infallible> {
        if !self.is_connected() {
            return Ok(0);
        }
        Ok(write_all(buf))
    }

    /// The bridge keeps the TCP session open; this side just stops talking until the line drops
    /// and a new client attaches.
    fn close(&mut self) {
        self.open = false;
    }
}
