// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Collaborator interfaces consumed by the flight loop.
//!
//! The core never touches peripherals directly. The board layer (`hw`, `drivers`) implements these
//! traits for real hardware; tests implement them with plain buffers.

use core::fmt::Debug;

/// One inertial measurement in physical units.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct InertialSample {
    /// Acceleration (g)
    pub accel_x: f32,
    pub accel_y: f32,
    pub accel_z: f32,
    /// Angular rate (°/s)
    pub gyro_x: f32,
    pub gyro_y: f32,
    pub gyro_z: f32,
}

impl InertialSample {
    /// A sample at rest with gravity along +Z.
    pub const LEVEL: Self = Self {
        accel_x: 0.0,
        accel_y: 0.0,
        accel_z: 1.0,
        gyro_x: 0.0,
        gyro_y: 0.0,
        gyro_z: 0.0,
    };
}

/// Four actuator commands on the 0..255 scale, X-configuration order.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct MotorOutputs {
    pub fl: u8,
    pub fr: u8,
    pub bl: u8,
    pub br: u8,
}

impl MotorOutputs {
    pub const ZERO: Self = Self::splat(0);

    pub const fn new(fl: u8, fr: u8, bl: u8, br: u8) -> Self {
        Self { fl, fr, bl, br }
    }

    pub const fn splat(v: u8) -> Self {
        Self::new(v, v, v, v)
    }

    #[inline]
    pub fn as_array(&self) -> [u8; 4] {
        [self.fl, self.fr, self.bl, self.br]
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

/// Inertial sensor producing calibrated samples.
pub trait Imu {
    type Error: Debug;

    fn read_sample(&mut self) -> Result<InertialSample, Self::Error>;
}

/// Motor output stage.
pub trait Motors {
    fn write_all(&mut self, out: MotorOutputs);

    /// Drive every motor to zero.
    fn safe_stop(&mut self) {
        self.write_all(MotorOutputs::ZERO);
    }
}

/// Raw battery voltage divider reading.
pub trait BatterySensor {
    /// Raw 12-bit ADC code (0..4095).
    fn read_adc(&mut self) -> u16;
}

/// Incoming connection source of the radio transport.
pub trait Listener {
    type Conn: Connection;

    /// Non-blocking accept.
    fn accept_if_any(&mut self) -> Option<Self::Conn>;
}

/// A single peer byte stream. All calls are non-blocking.
pub trait Connection {
    type Error: Debug;

    fn is_connected(&mut self) -> bool;

    /// Read whatever is available into `buf`, returning the byte count (0 if nothing is pending).
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;

    fn close(&mut self);
}

/// Word storage that survives resets (RTC backup registers, retained RAM, ...).
pub trait BootStore {
    /// `None` when the store holds no valid record (e.g. after a cold power-up).
    fn load(&mut self) -> Option<[u32; 2]>;

    fn save(&mut self, words: [u32; 2]);
}

/// Volatile store, mainly for hosts and tests.
#[derive(Clone, Debug, Default)]
pub struct RamBootStore {
    words: Option<[u32; 2]>,
}

impl RamBootStore {
    pub const fn new() -> Self {
        Self { words: None }
    }

    pub fn words(&self) -> Option<[u32; 2]> {
        self.words
    }
}

impl BootStore for RamBootStore {
    fn load(&mut self) -> Option<[u32; 2]> {
        self.words
    }

    fn save(&mut self, words: [u32; 2]) {
        self.words = Some(words);
    }
}
