// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Ground Link
//!
//! Connection lifecycle over the radio transport:
//!
//! ```text
//!   WaitingForClient --accept--> WaitingForHandshake --"HELLO"--> Streaming
//!          ^                          |                              |
//!          +------- "BYE" / lost -----+------------- lost -----------+
//! ```
//!
//! Commands are only decoded and telemetry only written while streaming. A new connection always
//! replaces the current one.
//!
//! ## Modules
//!
//! - [`boot`] - Boot counter and reset-cause record reported in the stream banner.

pub mod boot;

use heapless::Vec;

use crate::io::{BootStore, Connection, Listener};
use crate::protocol::messages::MAX_TELEMETRY_LEN;
use crate::protocol::{CommandFrame, Decoded, Parser, TelemetryFrame};

pub use boot::{Banner, BootLog, BootRecord, ResetCause};

/// Handshake line buffer capacity. Longer lines are dropped.
pub const LINE_CAPACITY: usize = 32;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum LinkState {
    WaitingForClient,
    WaitingForHandshake,
    Streaming,
}

/// Transition reported by [`Link::handle`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum LinkEvent {
    /// A client connected while none was present.
    ClientAccepted,
    /// A client connected and the previous one was closed.
    ClientReplaced,
    /// Handshake completed.
    StreamStarted,
    /// The client said `BYE`, disconnected, or the transport failed.
    ClientLeft,
}

pub struct Link<L: Listener, S: BootStore> {
    listener: L,
    conn: Option<L::Conn>,
    state: LinkState,

    /// Banner already sent on the current connection
    banner_sent: bool,
    banner: Banner,

    line: Vec<u8, LINE_CAPACITY>,
    line_overflow: bool,

    rx: Parser,
    tx_seq: u16,

    /// Event detected outside `handle` (I/O error during read/write)
    deferred: Option<LinkEvent>,

    boot: BootLog<S>,
}

impl<L: Listener, S: BootStore> Link<L, S> {
    pub fn new(listener: L, boot: BootLog<S>) -> Self {
        Self {
            listener,
            conn: None,
            state: LinkState::WaitingForClient,
            banner_sent: false,
            banner: Banner::new(),
            line: Vec::new(),
            line_overflow: false,
            rx: Parser::new(),
            tx_seq: 0,
            deferred: None,
            boot,
        }
    }

    #[inline]
    pub fn state(&self) -> LinkState {
        self.state
    }

    #[inline]
    pub fn is_streaming(&self) -> bool {
        self.state == LinkState::Streaming
    }

    /// Sequence number the next telemetry frame will carry.
    #[inline]
    pub fn tx_sequence(&self) -> u16 {
        self.tx_seq
    }

    /// Banner sent on the most recent stream start.
    pub fn banner(&self) -> &str {
        self.banner.as_str()
    }

    pub fn boot_log(&self) -> &BootLog<S> {
        &self.boot
    }

    /// Connection housekeeping. Call once per loop iteration.
    pub fn handle(&mut self) -> Option<LinkEvent> {
        if let Some(event) = self.deferred.take() {
            return Some(event);
        }

        if let Some(conn) = self.listener.accept_if_any() {
            let replaced = match self.conn.take() {
                Some(mut old) => {
                    old.close();
                    true
                }
                None => false,
            };
            self.conn = Some(conn);
            self.state = LinkState::WaitingForHandshake;
            self.banner_sent = false;
            self.reset_buffers();

            return Some(if replaced {
                LinkEvent::ClientReplaced
            } else {
                LinkEvent::ClientAccepted
            });
        }

        if self.state == LinkState::WaitingForClient {
            return None;
        }

        let connected = match self.conn.as_mut() {
            Some(conn) => conn.is_connected(),
            None => false,
        };
        if !connected {
            self.drop_peer();
            return Some(LinkEvent::ClientLeft);
        }

        match self.state {
            LinkState::WaitingForHandshake => self.poll_handshake(),
            _ => None,
        }
    }

    /// Drain every complete command frame currently available and return the newest valid one.
    pub fn read_command(&mut self) -> Option<CommandFrame> {
        if !self.is_streaming() {
            return None;
        }

        let mut latest = None;
        loop {
            let conn = self.conn.as_mut()?;
            let read = match conn.read_available(self.rx.free_space()) {
                Ok(n) => n,
                Err(_) => {
                    self.lose_peer();
                    return latest;
                }
            };
            self.rx.commit(read);

            loop {
                match self.rx.decode() {
                    Decoded::Frame(frame) => latest = Some(frame),
                    Decoded::Rejected(_) => {}
                    Decoded::Incomplete => break,
                }
            }

            if read == 0 {
                return latest;
            }
        }
    }

    /// Write raw bytes to the client. Returns the count written (0 outside streaming).
    ///
    /// A short write leaves a torn frame on the wire, so it drops the peer like an I/O error.
    pub fn write_telemetry(&mut self, bytes: &[u8]) -> usize {
        if !self.is_streaming() {
            return 0;
        }
        let Some(conn) = self.conn.as_mut() else {
            return 0;
        };
        match conn.write(bytes) {
            Ok(n) if n >= bytes.len() => n,
            Ok(n) => {
                self.lose_peer();
                n
            }
            Err(_) => {
                self.lose_peer();
                0
            }
        }
    }

    /// Stamp `frame` with the next sequence number and send it.
    ///
    /// The sequence only advances when the whole frame was written.
    pub fn send_telemetry(&mut self, frame: &TelemetryFrame) -> bool {
        if !self.is_streaming() {
            return false;
        }
        let mut buf = [0u8; MAX_TELEMETRY_LEN];
        let len = frame.encode_into(self.tx_seq, &mut buf);
        let sent = self.write_telemetry(&buf[..len]) == len;
        if sent {
            self.tx_seq = self.tx_seq.wrapping_add(1);
        }
        sent
    }

    /// Close the current connection, if any.
    pub fn close(&mut self) {
        self.drop_peer();
    }

    fn poll_handshake(&mut self) -> Option<LinkEvent> {
        // One byte at a time so data after the HELLO line stays in the transport.
        let mut byte = [0u8; 1];
        loop {
            let conn = self.conn.as_mut()?;
            match conn.read_available(&mut byte) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(_) => {
                    self.drop_peer();
                    return Some(LinkEvent::ClientLeft);
                }
            }

            if byte[0] != b'\n' {
                if self.line.push(byte[0]).is_err() {
                    self.line_overflow = true;
                }
                continue;
            }

            let overflow = core::mem::replace(&mut self.line_overflow, false);
            let line = core::mem::take(&mut self.line);
            if overflow {
                continue;
            }

            match core::str::from_utf8(&line).map(str::trim) {
                Ok("HELLO") => return self.start_stream(),
                Ok("BYE") => {
                    self.drop_peer();
                    return Some(LinkEvent::ClientLeft);
                }
                _ => {}
            }
        }
    }

    fn start_stream(&mut self) -> Option<LinkEvent> {
        self.state = LinkState::Streaming;
        self.rx.clear();

        if !self.banner_sent {
            self.banner = self.boot.banner();
            self.banner_sent = true;
            let line = self.banner.clone();
            let written = self.write_telemetry(line.as_bytes());
            if written != line.len() && !self.is_streaming() {
                return self.deferred.take();
            }
        }

        Some(LinkEvent::StreamStarted)
    }

    /// Peer lost outside `handle`; report it on the next call.
    fn lose_peer(&mut self) {
        self.drop_peer();
        self.deferred = Some(LinkEvent::ClientLeft);
    }

    fn drop_peer(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            conn.close();
        }
        self.state = LinkState::WaitingForClient;
        self.reset_buffers();
    }

    fn reset_buffers(&mut self) {
        self.line.clear();
        self.line_overflow = false;
        self.rx.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::RamBootStore;
    use crate::protocol::messages::{xor_checksum, MODE_FLY, PKT_DEBUG};
    use crate::protocol::DebugTelemetry;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::vec::Vec as StdVec;

    #[derive(Default)]
    struct Wire {
        rx: VecDeque<u8>,
        tx: StdVec<u8>,
        connected: bool,
        closed: bool,
        fail_io: bool,
        /// Cap on bytes accepted per write
        write_limit: Option<usize>,
    }

    #[derive(Clone)]
    struct MockConn(Rc<RefCell<Wire>>);

    impl Connection for MockConn {
        type Error = ();

        fn is_connected(&mut self) -> bool {
            self.0.borrow().connected
        }

        fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
            let mut w = self.0.borrow_mut();
            if w.fail_io {
                return Err(());
            }
            let n = buf.len().min(w.rx.len());
            for slot in buf.iter_mut().take(n) {
                *slot = w.rx.pop_front().unwrap();
            }
            Ok(n)
        }

        fn write(&mut self, buf: &[u8]) -> Result<usize, ()> {
            let mut w = self.0.borrow_mut();
            if w.fail_io {
                return Err(());
            }
            let n = w.write_limit.map_or(buf.len(), |limit| limit.min(buf.len()));
            w.tx.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn close(&mut self) {
            let mut w = self.0.borrow_mut();
            w.connected = false;
            w.closed = true;
        }
    }

    #[derive(Clone, Default)]
    struct MockListener(Rc<RefCell<VecDeque<MockConn>>>);

    impl MockListener {
        fn connect(&self) -> Rc<RefCell<Wire>> {
            let wire = Rc::new(RefCell::new(Wire {
                connected: true,
                ..Wire::default()
            }));
            self.0.borrow_mut().push_back(MockConn(wire.clone()));
            wire
        }
    }

    impl Listener for MockListener {
        type Conn = MockConn;

        fn accept_if_any(&mut self) -> Option<MockConn> {
            self.0.borrow_mut().pop_front()
        }
    }

    fn link() -> (MockListener, Link<MockListener, RamBootStore>) {
        let listener = MockListener::default();
        let boot = BootLog::open(RamBootStore::new(), ResetCause::PowerOn);
        (listener.clone(), Link::new(listener, boot))
    }

    fn feed(wire: &Rc<RefCell<Wire>>, bytes: &[u8]) {
        wire.borrow_mut().rx.extend(bytes.iter().copied());
    }

    fn streaming() -> (
        MockListener,
        Link<MockListener, RamBootStore>,
        Rc<RefCell<Wire>>,
    ) {
        let (listener, mut link) = link();
        let wire = listener.connect();
        assert_eq!(link.handle(), Some(LinkEvent::ClientAccepted));
        feed(&wire, b"HELLO\n");
        assert_eq!(link.handle(), Some(LinkEvent::StreamStarted));
        wire.borrow_mut().tx.clear();
        (listener, link, wire)
    }

    fn cmd(seq: u16) -> CommandFrame {
        CommandFrame::new(MODE_FLY, 120, 2.0, -3.0, seq)
    }

    #[test]
    fn idle_without_client() {
        let (_listener, mut link) = link();
        assert_eq!(link.handle(), None);
        assert_eq!(link.state(), LinkState::WaitingForClient);
        assert_eq!(link.read_command(), None);
        assert_eq!(link.write_telemetry(&[1, 2, 3]), 0);
    }

    #[test]
    fn no_protocol_io_before_handshake() {
        let (listener, mut link) = link();
        let wire = listener.connect();
        link.handle();
        feed(&wire, &cmd(1).to_bytes());

        assert_eq!(link.handle(), None);
        assert_eq!(link.state(), LinkState::WaitingForHandshake);
        assert_eq!(link.read_command(), None);
        assert_eq!(link.write_telemetry(&[0xA2; 20]), 0);
        assert!(!link.send_telemetry(&TelemetryFrame::Debug(DebugTelemetry::default())));
        assert!(wire.borrow().tx.is_empty());
        assert_eq!(link.tx_sequence(), 0);
    }

    #[test]
    fn hello_starts_stream_and_leaves_following_bytes() {
        let (listener, mut link) = link();
        let wire = listener.connect();
        link.handle();

        feed(&wire, b"  HELLO \r\n");
        feed(&wire, &cmd(7).to_bytes());
        assert_eq!(link.handle(), Some(LinkEvent::StreamStarted));
        assert!(link.is_streaming());
        assert_eq!(wire.borrow().tx.as_slice(), b"RST:POWERON,BOOT:1,PEND:1\n");
        assert_eq!(link.banner(), "RST:POWERON,BOOT:1,PEND:1\n");

        assert_eq!(link.read_command(), Some(cmd(7)));
    }

    #[test]
    fn banner_pending_is_consumed_by_first_client() {
        let (listener, mut link) = link();
        let first = listener.connect();
        link.handle();
        feed(&first, b"HELLO\n");
        link.handle();

        first.borrow_mut().connected = false;
        assert_eq!(link.handle(), Some(LinkEvent::ClientLeft));

        let second = listener.connect();
        assert_eq!(link.handle(), Some(LinkEvent::ClientAccepted));
        feed(&second, b"HELLO\n");
        link.handle();
        assert_eq!(second.borrow().tx.as_slice(), b"RST:OK,BOOT:NA,PEND:0\n");
        assert!(!link.boot_log().record().report_pending);
        assert_eq!(link.boot_log().record().boot_count, 1);
    }

    #[test]
    fn bye_and_unknown_lines() {
        let (listener, mut link) = link();
        let wire = listener.connect();
        link.handle();

        feed(&wire, b"PING\nhello\n");
        assert_eq!(link.handle(), None);
        assert_eq!(link.state(), LinkState::WaitingForHandshake);

        feed(&wire, b"BYE\n");
        assert_eq!(link.handle(), Some(LinkEvent::ClientLeft));
        assert_eq!(link.state(), LinkState::WaitingForClient);
        assert!(wire.borrow().closed);
    }

    #[test]
    fn overlong_line_is_discarded() {
        let (listener, mut link) = link();
        let wire = listener.connect();
        link.handle();

        // Ends in HELLO, but the line overflowed.
        let mut long = [b'x'; 40];
        long[35..].copy_from_slice(b"HELLO");
        feed(&wire, &long);
        feed(&wire, b"\n");
        assert_eq!(link.handle(), None);
        assert!(!link.is_streaming());

        feed(&wire, b"HELLO\n");
        assert_eq!(link.handle(), Some(LinkEvent::StreamStarted));
    }

    #[test]
    fn read_command_keeps_newest_valid_frame() {
        let (_listener, mut link, wire) = streaming();

        let mut bad = cmd(3).to_bytes();
        bad[2] ^= 0x01;
        feed(&wire, &[0x00, 0x11]);
        feed(&wire, &cmd(1).to_bytes());
        feed(&wire, &cmd(2).to_bytes());
        feed(&wire, &bad);
        let next = cmd(4).to_bytes();
        feed(&wire, &next[..6]);

        assert_eq!(link.read_command(), Some(cmd(2)));
        assert_eq!(link.read_command(), None);

        feed(&wire, &next[6..]);
        assert_eq!(link.read_command(), Some(cmd(4)));
    }

    #[test]
    fn drains_more_than_one_buffer_of_frames() {
        let (_listener, mut link, wire) = streaming();
        for seq in 0..20 {
            feed(&wire, &cmd(seq).to_bytes());
        }
        assert_eq!(link.read_command(), Some(cmd(19)));
        assert!(wire.borrow().rx.is_empty());
    }

    #[test]
    fn telemetry_is_sequenced() {
        let (_listener, mut link, wire) = streaming();
        let frame = TelemetryFrame::Debug(DebugTelemetry::default());

        assert!(link.send_telemetry(&frame));
        assert!(link.send_telemetry(&frame));
        assert_eq!(link.tx_sequence(), 2);

        let tx = wire.borrow().tx.clone();
        assert_eq!(tx.len(), 28);
        assert_eq!(tx[0], PKT_DEBUG);
        assert_eq!(&tx[1..3], &[0, 0]);
        assert_eq!(&tx[15..17], &[0, 1]);
        assert_eq!(xor_checksum(&tx[14..]), 0);
    }

    #[test]
    fn new_client_replaces_streaming_one() {
        let (listener, mut link, old) = streaming();

        let new = listener.connect();
        assert_eq!(link.handle(), Some(LinkEvent::ClientReplaced));
        assert!(old.borrow().closed);
        assert_eq!(link.state(), LinkState::WaitingForHandshake);

        // Banner goes out again on the new connection.
        feed(&new, b"HELLO\n");
        assert_eq!(link.handle(), Some(LinkEvent::StreamStarted));
        assert_eq!(new.borrow().tx.as_slice(), b"RST:OK,BOOT:NA,PEND:0\n");
    }

    #[test]
    fn disconnect_while_streaming() {
        let (_listener, mut link, wire) = streaming();
        wire.borrow_mut().connected = false;
        assert_eq!(link.handle(), Some(LinkEvent::ClientLeft));
        assert_eq!(link.read_command(), None);
    }

    #[test]
    fn transport_error_counts_as_peer_loss() {
        let (_listener, mut link, wire) = streaming();
        wire.borrow_mut().fail_io = true;

        assert_eq!(link.write_telemetry(&[1]), 0);
        assert_eq!(link.state(), LinkState::WaitingForClient);
        assert!(wire.borrow().closed);
        assert_eq!(link.handle(), Some(LinkEvent::ClientLeft));
        assert_eq!(link.handle(), None);
    }

    #[test]
    fn short_write_drops_peer() {
        let (_listener, mut link, wire) = streaming();
        wire.borrow_mut().write_limit = Some(5);
        let frame = TelemetryFrame::Debug(DebugTelemetry::default());

        assert!(!link.send_telemetry(&frame));
        assert_eq!(wire.borrow().tx.len(), 5);
        assert_eq!(link.tx_sequence(), 0);
        assert!(!link.is_streaming());
        assert!(wire.borrow().closed);
        assert_eq!(link.handle(), Some(LinkEvent::ClientLeft));

        // Nothing more reaches the torn connection.
        assert!(!link.send_telemetry(&frame));
        assert_eq!(wire.borrow().tx.len(), 5);
    }

    #[test]
    fn short_banner_write_drops_peer() {
        let (listener, mut link) = link();
        let wire = listener.connect();
        wire.borrow_mut().write_limit = Some(3);
        link.handle();

        feed(&wire, b"HELLO\n");
        assert_eq!(link.handle(), Some(LinkEvent::ClientLeft));
        assert_eq!(link.state(), LinkState::WaitingForClient);
        assert!(wire.borrow().closed);
    }

    #[test]
    fn close_returns_to_waiting() {
        let (_listener, mut link, wire) = streaming();
        link.close();
        assert_eq!(link.state(), LinkState::WaitingForClient);
        assert!(wire.borrow().closed);
    }
}
