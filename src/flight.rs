// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Cooperative flight loop.
//!
//! [`FlightController::step`] is called as often as possible from the main loop. Each call runs,
//! in order:
//!
//! 1. link housekeeping (accept, handshake, disconnect),
//! 2. command drain, keeping only the newest frame,
//! 3. at most one control tick (IMU, estimator, controller, motors),
//! 4. at most one telemetry frame.
//!
//! Nothing in here blocks. Diagnostics go to a `core::fmt::Write` console as `[TAG] message`
//! lines.

use core::fmt::{self, Write};

use crate::attitude::{AttitudeEstimator, CalibrationOutcome};
use crate::config::FlightConfig;
use crate::control::{Tilt, TiltController};
use crate::io::{BatterySensor, BootStore, Imu, InertialSample, Listener, MotorOutputs, Motors};
use crate::link::{Link, LinkEvent, LinkState};
use crate::protocol::messages::MODE_STOP;
use crate::protocol::{
    AnglesTelemetry, CommandFrame, DebugTelemetry, FastTelemetry, TelemetryFrame, TelemetryKind,
};
use crate::scheduler::{Periodic, Tick};

/// Console that discards everything.
#[derive(Copy, Clone, Debug, Default)]
pub struct Silent;

impl fmt::Write for Silent {
    fn write_str(&mut self, _s: &str) -> fmt::Result {
        Ok(())
    }
}

/// Latest operator command.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct CommandState {
    pub mode: u8,
    pub base_power: u8,
    /// Desired roll/pitch (deg)
    pub desired: Tilt,
    pub last_seq: u16,
    /// When the last valid frame arrived (µs), `None` before the first one
    pub last_rx_us: Option<u64>,
}

impl CommandState {
    pub fn apply(&mut self, frame: &CommandFrame, now_us: u64) {
        self.mode = frame.mode;
        self.base_power = frame.base_power;
        self.desired = Tilt::new(frame.roll_deg(), frame.pitch_deg());
        self.last_seq = frame.seq;
        self.last_rx_us = Some(now_us);
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.mode != MODE_STOP
    }

    /// Whether no frame arrived within `timeout_us` of `now_us`.
    pub fn is_stale(&self, now_us: u64, timeout_us: Option<u64>) -> bool {
        match (timeout_us, self.last_rx_us) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(t), Some(rx)) => now_us.saturating_sub(rx) > t,
        }
    }
}

pub struct FlightController<L, S, I, M, B, W>
where
    L: Listener,
    S: BootStore,
    I: Imu,
    M: Motors,
    B: BatterySensor,
    W: Write,
{
    config: FlightConfig,

    link: Link<L, S>,
    imu: I,
    motors: M,
    battery: B,
    console: W,

    estimator: AttitudeEstimator,
    controller: TiltController,

    control_timer: Periodic,
    telemetry_timer: Periodic,

    command: CommandState,
    outputs: MotorOutputs,
    last_sample: InertialSample,
    /// Measured control period, saturated (µs)
    loop_us: u16,

    armed: bool,
    imu_ok: bool,
    frames_sent: u32,

    /// Level calibration to start on the first control tick
    boot_level_cal: Option<u64>,
}

impl<L, S, I, M, B, W> FlightController<L, S, I, M, B, W>
where
    L: Listener,
    S: BootStore,
    I: Imu,
    M: Motors,
    B: BatterySensor,
    W: Write,
{
    pub fn new(
        config: FlightConfig,
        link: Link<L, S>,
        imu: I,
        mut motors: M,
        battery: B,
        mut console: W,
    ) -> Self {
        motors.safe_stop();

        let boot = link.boot_log().record();
        let _ = write!(
            console,
            "[BOOT] #{} reset {}\r\n",
            boot.boot_count, boot.last_reset
        );

        Self {
            config,
            link,
            imu,
            motors,
            battery,
            console,
            estimator: AttitudeEstimator::new(config.alpha),
            controller: TiltController::new(config.roll_gains, config.pitch_gains),
            control_timer: Periodic::new(config.control_period_us),
            telemetry_timer: Periodic::new(config.telemetry_period_us),
            command: CommandState::default(),
            outputs: MotorOutputs::ZERO,
            last_sample: InertialSample::LEVEL,
            loop_us: 0,
            armed: false,
            imu_ok: true,
            frames_sent: 0,
            boot_level_cal: config.boot_level_cal_us,
        }
    }

    /// Run one loop iteration at time `now_us`.
    pub fn step(&mut self, now_us: u64) {
        if let Some(event) = self.link.handle() {
            self.on_link_event(event);
        }

        if let Some(frame) = self.link.read_command() {
            self.command.apply(&frame, now_us);
        }

        if let Some(tick) = self.control_timer.poll(now_us) {
            self.control_tick(tick);
        }

        if self.telemetry_timer.poll(now_us).is_some() {
            self.telemetry_tick();
        }
    }

    /// Begin a level calibration; the vehicle should sit still on a level surface.
    pub fn start_level_cal(&mut self, now_us: u64, window_us: u64) {
        self.boot_level_cal = None;
        self.estimator.start_level_cal(now_us, window_us);
        let _ = write!(self.console, "[CAL] level calibration started\r\n");
    }

    /// No client connected; the caller may idle briefly.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.link.state() == LinkState::WaitingForClient
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    #[inline]
    pub fn outputs(&self) -> MotorOutputs {
        self.outputs
    }

    #[inline]
    pub fn command(&self) -> &CommandState {
        &self.command
    }

    pub fn config(&self) -> &FlightConfig {
        &self.config
    }

    pub fn estimator(&self) -> &AttitudeEstimator {
        &self.estimator
    }

    pub fn controller(&self) -> &TiltController {
        &self.controller
    }

    pub fn link(&self) -> &Link<L, S> {
        &self.link
    }

    pub fn motors(&self) -> &M {
        &self.motors
    }

    pub fn console(&self) -> &W {
        &self.console
    }

    fn on_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::ClientAccepted => {
                let _ = write!(self.console, "[LINK] client connected\r\n");
            }
            LinkEvent::ClientReplaced => {
                let _ = write!(self.console, "[LINK] client replaced\r\n");
                self.command = CommandState::default();
            }
            LinkEvent::StreamStarted => {
                let _ = write!(
                    self.console,
                    "[LINK] streaming, banner {}\r\n",
                    self.link.banner().trim_end()
                );
                self.command = CommandState::default();
                self.controller.zero_integrators();
                self.frames_sent = 0;
            }
            LinkEvent::ClientLeft => {
                let _ = write!(self.console, "[LINK] client left\r\n");
                self.command = CommandState::default();
            }
        }
    }

    fn control_tick(&mut self, tick: Tick) {
        let now_us = tick.now_us;
        self.loop_us = tick.dt_us.min(u16::MAX as u64) as u16;
        let mut dt = tick.dt_seconds();
        if !(dt > 0.0) {
            dt = self.config.nominal_dt();
        }

        if let Some(window_us) = self.boot_level_cal.take() {
            self.start_level_cal(now_us, window_us);
        }

        let sample = match self.imu.read_sample() {
            Ok(sample) => {
                if !self.imu_ok {
                    let _ = write!(self.console, "[IMU] recovered\r\n");
                    self.imu_ok = true;
                }
                sample
            }
            Err(e) => {
                if self.imu_ok {
                    let _ = write!(self.console, "[IMU] read failed: {:?}\r\n", e);
                    self.imu_ok = false;
                }
                self.set_armed(false);
                self.controller.zero_integrators();
                self.outputs = MotorOutputs::ZERO;
                self.motors.safe_stop();
                return;
            }
        };
        self.last_sample = sample;

        match self.estimator.update(&sample, dt, now_us) {
            Some(CalibrationOutcome::Committed {
                trim_roll_deg,
                trim_pitch_deg,
                samples,
            }) => {
                let _ = write!(
                    self.console,
                    "[CAL] trims roll {:.2} pitch {:.2} ({} samples)\r\n",
                    trim_roll_deg, trim_pitch_deg, samples
                );
            }
            Some(CalibrationOutcome::Starved { samples }) => {
                let _ = write!(
                    self.console,
                    "[CAL] too few samples ({}), trims unchanged\r\n",
                    samples
                );
            }
            None => {}
        }

        let armed = self.link.is_streaming()
            && self.command.is_armed()
            && !self
                .command
                .is_stale(now_us, self.config.command_timeout_us);
        self.set_armed(armed);

        if !armed {
            self.controller.zero_integrators();
            self.outputs = MotorOutputs::ZERO;
            self.motors.write_all(self.outputs);
            return;
        }

        let base = self.command.base_power.min(self.config.max_base_power);
        let measured = Tilt::new(self.estimator.roll_deg(), self.estimator.pitch_deg());
        let rates = Tilt::new(self.estimator.gyro_x_dps(), self.estimator.gyro_y_dps());

        self.outputs = self.controller.update(
            self.command.desired,
            measured,
            rates,
            dt,
            MotorOutputs::splat(base),
        );
        self.motors.write_all(self.outputs);
    }

    fn set_armed(&mut self, armed: bool) {
        if armed == self.armed {
            return;
        }
        self.armed = armed;
        let _ = if armed {
            write!(self.console, "[CTRL] armed\r\n")
        } else {
            write!(self.console, "[CTRL] disarmed\r\n")
        };
    }

    fn telemetry_tick(&mut self) {
        if !self.link.is_streaming() {
            return;
        }

        let kind = match self.config.debug_every {
            n if n > 0 && self.frames_sent % (n as u32 + 1) == n as u32 => TelemetryKind::Debug,
            _ => self.config.telemetry,
        };
        let frame = self.build_frame(kind);

        if self.link.send_telemetry(&frame) {
            self.frames_sent = self.frames_sent.wrapping_add(1);
        }
    }

    fn build_frame(&mut self, kind: TelemetryKind) -> TelemetryFrame {
        match kind {
            TelemetryKind::Fast => TelemetryFrame::Fast(FastTelemetry {
                loop_us: self.loop_us,
                bat_adc: self.battery.read_adc(),
                motors: self.outputs,
                sample: self.last_sample,
            }),
            TelemetryKind::Angles => TelemetryFrame::Angles(AnglesTelemetry {
                loop_us: self.loop_us,
                bat_adc: self.battery.read_adc(),
                motors: self.outputs,
                roll_deg: self.estimator.roll_deg(),
                pitch_deg: self.estimator.pitch_deg(),
                gyro_x_dps: self.estimator.gyro_x_dps(),
                gyro_y_dps: self.estimator.gyro_y_dps(),
            }),
            TelemetryKind::Debug => {
                let err = self.controller.last_error();
                let out = self.controller.last_output();
                TelemetryFrame::Debug(DebugTelemetry {
                    loop_us: self.loop_us,
                    err_roll: err.roll,
                    err_pitch: err.pitch,
                    out_roll: out.roll,
                    out_pitch: out.pitch,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{Connection, RamBootStore};
    use crate::link::{BootLog, ResetCause};
    use crate::protocol::messages::{MODE_FLY, PKT_ANGLES, PKT_DEBUG};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::string::String;
    use std::vec::Vec;

    #[derive(Default)]
    struct Wire {
        rx: VecDeque<u8>,
        tx: Vec<u8>,
        connected: bool,
    }

    struct Conn(Rc<RefCell<Wire>>);

    impl Connection for Conn {
        type Error = ();

        fn is_connected(&mut self) -> bool {
            self.0.borrow().connected
        }

        fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
            let mut w = self.0.borrow_mut();
            let n = buf.len().min(w.rx.len());
            for slot in buf.iter_mut().take(n) {
                *slot = w.rx.pop_front().unwrap_or(0);
            }
            Ok(n)
        }

        fn write(&mut self, buf: &[u8]) -> Result<usize, ()> {
            self.0.borrow_mut().tx.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn close(&mut self) {
            self.0.borrow_mut().connected = false;
        }
    }

    #[derive(Default)]
    struct OneShot(Option<Conn>);

    impl Listener for OneShot {
        type Conn = Conn;

        fn accept_if_any(&mut self) -> Option<Conn> {
            self.0.take()
        }
    }

    struct FlakyImu {
        fail: Rc<RefCell<bool>>,
        sample: InertialSample,
    }

    impl Imu for FlakyImu {
        type Error = &'static str;

        fn read_sample(&mut self) -> Result<InertialSample, Self::Error> {
            if *self.fail.borrow() {
                Err("bus")
            } else {
                Ok(self.sample)
            }
        }
    }

    #[derive(Default)]
    struct Recorder(Vec<MotorOutputs>);

    impl Motors for Recorder {
        fn write_all(&mut self, out: MotorOutputs) {
            self.0.push(out);
        }
    }

    struct Battery;

    impl BatterySensor for Battery {
        fn read_adc(&mut self) -> u16 {
            2048
        }
    }

    type Fc = FlightController<OneShot, RamBootStore, FlakyImu, Recorder, Battery, String>;

    struct Rig {
        fc: Fc,
        wire: Rc<RefCell<Wire>>,
        imu_fail: Rc<RefCell<bool>>,
        now: u64,
    }

    impl Rig {
        fn new(config: FlightConfig) -> Self {
            let wire = Rc::new(RefCell::new(Wire {
                connected: true,
                ..Wire::default()
            }));
            let boot = BootLog::open(RamBootStore::new(), ResetCause::ExternalPin);
            let link = Link::new(OneShot(Some(Conn(wire.clone()))), boot);
            let imu_fail = Rc::new(RefCell::new(false));
            let imu = FlakyImu {
                fail: imu_fail.clone(),
                sample: InertialSample::LEVEL,
            };
            let fc = FlightController::new(
                config,
                link,
                imu,
                Recorder::default(),
                Battery,
                String::new(),
            );
            Self {
                fc,
                wire,
                imu_fail,
                now: 0,
            }
        }

        fn send(&self, bytes: &[u8]) {
            self.wire.borrow_mut().rx.extend(bytes.iter().copied());
        }

        /// Advance in 100 µs steps.
        fn run_for(&mut self, us: u64) {
            let end = self.now + us;
            while self.now < end {
                self.now += 100;
                self.fc.step(self.now);
            }
        }

        fn handshake(&mut self) {
            self.fc.step(self.now);
            self.send(b"HELLO\n");
            self.fc.step(self.now);
            assert!(self.fc.link().is_streaming());
        }
    }

    fn config() -> FlightConfig {
        FlightConfig::new()
            .with_boot_level_cal(None)
            .with_command_timeout(None)
    }

    #[test]
    fn disarmed_until_streaming_and_commanded() {
        let mut rig = Rig::new(config());
        rig.run_for(20_000);
        assert!(!rig.fc.is_armed());
        assert!(rig.fc.motors().0.iter().all(|m| m.is_zero()));

        rig.handshake();
        rig.run_for(20_000);
        assert!(!rig.fc.is_armed());

        rig.send(&CommandFrame::new(MODE_FLY, 100, 0.0, 0.0, 1).to_bytes());
        rig.run_for(4_000);
        assert!(rig.fc.is_armed());
        assert_eq!(rig.fc.outputs(), MotorOutputs::splat(100));

        rig.send(&CommandFrame::new(MODE_STOP, 100, 0.0, 0.0, 2).to_bytes());
        rig.run_for(4_000);
        assert!(!rig.fc.is_armed());
        assert_eq!(rig.fc.outputs(), MotorOutputs::ZERO);
        assert_eq!(rig.fc.controller().integrals(), Tilt::LEVEL);
    }

    #[test]
    fn base_power_is_limited() {
        let mut rig = Rig::new(config());
        rig.handshake();
        rig.send(&CommandFrame::new(MODE_FLY, 250, 0.0, 0.0, 1).to_bytes());
        rig.run_for(4_000);
        assert_eq!(rig.fc.outputs(), MotorOutputs::splat(180));
    }

    #[test]
    fn stale_command_disarms() {
        let mut rig = Rig::new(config().with_command_timeout(Some(50_000)));
        rig.handshake();
        rig.send(&CommandFrame::new(MODE_FLY, 100, 0.0, 0.0, 1).to_bytes());
        rig.run_for(10_000);
        assert!(rig.fc.is_armed());

        rig.run_for(60_000);
        assert!(!rig.fc.is_armed());
        assert_eq!(rig.fc.outputs(), MotorOutputs::ZERO);
    }

    #[test]
    fn imu_failure_stops_motors() {
        let mut rig = Rig::new(config());
        rig.handshake();
        rig.send(&CommandFrame::new(MODE_FLY, 100, 0.0, 0.0, 1).to_bytes());
        rig.run_for(4_000);
        assert!(rig.fc.is_armed());

        *rig.imu_fail.borrow_mut() = true;
        rig.run_for(4_000);
        assert_eq!(rig.fc.outputs(), MotorOutputs::ZERO);
        assert_eq!(rig.fc.motors().0.last(), Some(&MotorOutputs::ZERO));
        assert_eq!(rig.fc.console().matches("[IMU] read failed").count(), 1);

        *rig.imu_fail.borrow_mut() = false;
        rig.run_for(4_000);
        assert!(rig.fc.is_armed());
        assert!(rig.fc.console().contains("[IMU] recovered"));
    }

    #[test]
    fn telemetry_interleaves_debug_frames() {
        let mut rig = Rig::new(config().with_telemetry(TelemetryKind::Angles, 2));
        rig.handshake();
        rig.wire.borrow_mut().tx.clear();

        // 50 Hz: one frame every 20 ms after the stream starts.
        rig.run_for(120_000);

        let tx = rig.wire.borrow().tx.clone();
        let mut kinds = Vec::new();
        let mut at = 0;
        while at < tx.len() {
            kinds.push(tx[at]);
            at += if tx[at] == PKT_DEBUG { 14 } else { 20 };
        }
        assert_eq!(
            kinds,
            [PKT_ANGLES, PKT_ANGLES, PKT_DEBUG, PKT_ANGLES, PKT_ANGLES, PKT_DEBUG]
        );
    }

    #[test]
    fn boot_level_calibration_runs_on_first_tick() {
        let mut rig = Rig::new(config().with_boot_level_cal(Some(100_000)));
        rig.run_for(1_000);
        assert!(rig.fc.estimator().is_level_cal_running());

        rig.run_for(200_000);
        assert!(rig.fc.estimator().is_level_cal_done());
        // 500 Hz for 100 ms is only ~50 samples.
        assert!(rig.fc.console().contains("[CAL] too few samples"));
    }

    #[test]
    fn console_logs_lifecycle() {
        let mut rig = Rig::new(config());
        rig.handshake();
        rig.wire.borrow_mut().connected = false;
        rig.run_for(1_000);

        let log = rig.fc.console();
        assert!(log.starts_with("[BOOT] #1 reset EXT_PIN\r\n"));
        assert!(log.contains("[LINK] client connected\r\n"));
        assert!(log.contains("[LINK] streaming, banner RST:EXT_PIN,BOOT:1,PEND:1\r\n"));
        assert!(log.contains("[LINK] client left\r\n"));
        assert!(rig.fc.is_idle());
    }
}
