// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! InvenSense MPU-9250 over SPI (accelerometer and gyroscope only).
//!
//! SPI mode 3, MSB first, at most 1 MHz for register configuration. Register reads set bit 7 of
//! the address byte; burst reads auto-increment.
//!
//! The sensor is configured for ±2 g and ±2000 °/s with the 41/44 Hz digital low-pass filters and
//! a 200 Hz internal sample rate.

use stm32f7xx_hal::spi;

use crate::error::Error;
use crate::hw::{ChipSelect, SpiBus};
use crate::io::{Imu, InertialSample};

// Register addresses
pub mod reg {
    pub const SMPLRT_DIV: u8 = 0x19;
    pub const CONFIG: u8 = 0x1A;
    pub const GYRO_CONFIG: u8 = 0x1B;
    pub const ACCEL_CONFIG: u8 = 0x1C;
    pub const ACCEL_CONFIG2: u8 = 0x1D;
    pub const ACCEL_XOUT_H: u8 = 0x3B;
    pub const PWR_MGMT_1: u8 = 0x6B;
    pub const PWR_MGMT_2: u8 = 0x6C;
    pub const WHO_AM_I: u8 = 0x75;
}

/// WHO_AM_I values of the MPU-9250 family (9250, 9255, 6500).
pub const KNOWN_IDS: [u8; 3] = [0x71, 0x73, 0x70];

const READ: u8 = 0x80;

/// ±2 g full scale
const ACCEL_G_PER_LSB: f32 = 1.0 / 16384.0;

/// ±2000 °/s full scale
const GYRO_DPS_PER_LSB: f32 = 1.0 / 16.4;

/// Accel XYZ, temperature, gyro XYZ
const BURST_LEN: usize = 14;

/// Convert one burst read starting at ACCEL_XOUT_H to physical units.
pub fn sample_from_burst(raw: &[u8; BURST_LEN]) -> InertialSample {
    let word = |i: usize| i16::from_be_bytes([raw[i], raw[i + 1]]) as f32;
    InertialSample {
        accel_x: word(0) * ACCEL_G_PER_LSB,
        accel_y: word(2) * ACCEL_G_PER_LSB,
        accel_z: word(4) * ACCEL_G_PER_LSB,
        // raw[6..8] is the die temperature
        gyro_x: word(8) * GYRO_DPS_PER_LSB,
        gyro_y: word(10) * GYRO_DPS_PER_LSB,
        gyro_z: word(12) * GYRO_DPS_PER_LSB,
    }
}

/// MPU-9250 driver owning its SPI bus and chip select.
pub struct Mpu9250<I, PINS, const P: char, const N: u8> {
    spi: SpiBus<I, PINS>,
    cs: ChipSelect<P, N>,
    who_am_i: u8,
}

impl<I, PINS, const P: char, const N: u8> Mpu9250<I, PINS, P, N>
where
    I: spi::Instance,
    PINS: spi::Pins<I>,
{
    pub fn new(spi: SpiBus<I, PINS>, cs: ChipSelect<P, N>) -> Self {
        Self {
            spi,
            cs,
            who_am_i: 0,
        }
    }

    /// Reset and configure the sensor, then check its identity.
    ///
    /// `delay_ms` is used to wait out the post-reset start-up time.
    pub fn init<D: FnMut(u32)>(&mut self, mut delay_ms: D) -> Result<(), Error<spi::Error>> {
        // Device reset
        self.write_reg(reg::PWR_MGMT_1, 0x80)?;
        delay_ms(100);

        // Auto-select the PLL clock source
        self.write_reg(reg::PWR_MGMT_1, 0x01)?;
        // All accel and gyro axes on
        self.write_reg(reg::PWR_MGMT_2, 0x00)?;
        // Gyro DLPF 41 Hz
        self.write_reg(reg::CONFIG, 0x03)?;
        // 1 kHz / (1 + 4) = 200 Hz
        self.write_reg(reg::SMPLRT_DIV, 0x04)?;
        // ±2000 °/s
        self.write_reg(reg::GYRO_CONFIG, 0x18)?;
        // ±2 g
        self.write_reg(reg::ACCEL_CONFIG, 0x00)?;
        // Accel DLPF 44.8 Hz
        self.write_reg(reg::ACCEL_CONFIG2, 0x03)?;

        self.who_am_i = self.read_reg(reg::WHO_AM_I)?;
        if !KNOWN_IDS.contains(&self.who_am_i) {
            return Err(Error::WrongDevice(self.who_am_i));
        }
        Ok(())
    }

    /// WHO_AM_I value read by the last `init`.
    #[inline]
    pub fn who_am_i(&self) -> u8 {
        self.who_am_i
    }

    pub fn write_reg(&mut self, addr: u8, value: u8) -> Result<(), spi::Error> {
        let mut buf = [addr & !READ, value];
        self.spi.transaction(&mut self.cs, &mut buf)
    }

    pub fn read_reg(&mut self, addr: u8) -> Result<u8, spi::Error> {
        let mut buf = [addr | READ, 0x00];
        self.spi.transaction(&mut self.cs, &mut buf)?;
        Ok(buf[1])
    }

    /// Burst-read accel, temperature and gyro registers.
    pub fn read_raw(&mut self) -> Result<[u8; BURST_LEN], spi::Error> {
        let mut buf = [0u8; BURST_LEN + 1];
        buf[0] = reg::ACCEL_XOUT_H | READ;
        self.spi.transaction(&mut self.cs, &mut buf)?;

        let mut raw = [0u8; BURST_LEN];
        raw.copy_from_slice(&buf[1..]);
        Ok(raw)
    }
}

impl<I, PINS, const P: char, const N: u8> Imu for Mpu9250<I, PINS, P, N>
where
    I: spi::Instance,
    PINS: spi::Pins<I>,
{
    type Error = Error<spi::Error>;

    fn read_sample(&mut self) -> Result<InertialSample, Self::Error> {
        let raw = self.read_raw()?;
        Ok(sample_from_burst(&raw))
    }
}
