// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

#![no_main]
#![no_std]

use core::fmt::Write;

use cortex_m_rt::entry;
use panic_halt as _;

use hal::{
    pac,
    prelude::*,
    serial::{Config, Serial},
    spi::{Mode, Phase, Polarity, Spi},
};
use stm32f7xx_hal as hal;

use tiltlink::{
    config::{IDLE_DELAY_MS, LINK_PORT},
    drivers::{Escs, Mpu9250},
    hw::{
        backup, pwm, Adc1, BackupRegisters, BatteryMonitor, BoardPins, BridgeListener,
        ChipSelect, Console, Led, MicrosClock, SpiBus,
    },
    link::{BootLog, Link},
    FlightConfig, FlightController,
};

const BRIDGE_BAUD: u32 = 921_600;

const ESC_FRAME_HZ: u32 = 50;

#[entry]
fn main() -> ! {
    // Before anything else touches RCC_CSR
    let reset_cause = backup::take_reset_cause();

    // Peripherals
    let dp = pac::Peripherals::take().unwrap();

    // Clocks
    let rcc = dp.RCC.constrain();
    let clocks = rcc.cfgr.freeze();
    let mut apb2 = rcc.apb2;
    let timer_clk_hz = clocks.timclk1().raw();

    // GPIO
    let pins = BoardPins::new(dp.GPIOA, dp.GPIOB, dp.GPIOD, dp.GPIOE);

    // LED
    let mut led_red = Led::active_low(pins.leds.red);
    let mut led_green = Led::active_low(pins.leds.green);
    led_red.set(true);

    // USART1 (DBG)
    let usart_cfg = Config {
        baud_rate: 115_200.bps(),
        ..Default::default()
    };
    let serial = Serial::new(
        dp.USART1,
        (pins.usart1.tx, pins.usart1.rx),
        &clocks,
        usart_cfg,
    );
    let mut console = Console::new(serial);
    let _ = write!(console, "\r\n[BOOT] tiltlink, reset {}\r\n", reset_cause);

    // Free-running microsecond clock
    let mut clock = MicrosClock::tim2(dp.TIM2, timer_clk_hz);

    // SPI4 + IMU
    let spi_mode = Mode {
        polarity: Polarity::IdleHigh,
        phase: Phase::CaptureOnSecondTransition,
    };
    let spi4 = Spi::new(dp.SPI4, (pins.spi4.sck, pins.spi4.miso, pins.spi4.mosi))
        .enable::<u8>(spi_mode, 1.MHz(), &clocks, &mut apb2);
    let cs_imu = ChipSelect::active_low(pins.spi4.cs_imu);
    let mut imu = Mpu9250::new(SpiBus::new(spi4), cs_imu);

    match imu.init(|ms| clock.delay_ms(ms)) {
        Ok(()) => {
            let _ = write!(console, "[IMU] MPU-9250 id 0x{:02X}\r\n", imu.who_am_i());
        }
        Err(e) => {
            let _ = write!(console, "[IMU] init failed: {:?}\r\n", e);
        }
    }

    // ESCs on TIM3
    let (fl, fr, bl, br) = pwm::tim3(dp.TIM3, pins.esc, timer_clk_hz, ESC_FRAME_HZ);
    let escs = Escs::new(fl, fr, bl, br);

    // Battery
    let battery = BatteryMonitor::new(Adc1::new(dp.ADC1), pins.battery);

    // USART2 Wi-Fi bridge
    let bridge_cfg = Config {
        baud_rate: BRIDGE_BAUD.bps(),
        ..Default::default()
    };
    let bridge = Serial::new(
        dp.USART2,
        (pins.usart2.tx, pins.usart2.rx),
        &clocks,
        bridge_cfg,
    );
    let listener = BridgeListener::new(bridge, pins.usart2.client);
    let _ = write!(console, "[LINK] bridge on tcp port {}\r\n", LINK_PORT);

    // Boot record
    let boot = BootLog::open(BackupRegisters::new(dp.RTC), reset_cause);
    let link = Link::new(listener, boot);

    let mut fc = FlightController::new(FlightConfig::new(), link, imu, escs, battery, console);
    led_red.set(false);

    loop {
        fc.step(clock.now_us());
        led_green.set(fc.link().is_streaming());

        if fc.is_idle() {
            clock.delay_ms(IDLE_DELAY_MS);
        }
    }
}
