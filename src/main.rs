//! RosinPress firmware: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  I2cDriver        LogEventSink   NvsAdapter   MonotonicClock   │
//! │  (HardwareBus)    ChannelSink    RecordStore                   │
//! │  ButtonLines      (EventSink)    (Config+PressStore)           │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            PressOrchestrator (press logic)             │    │
//! │  │  PhaseMachine · RelayController · TemperatureController│    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  ButtonInterlock (own poll period) · COMMAND_CHANNEL inbound   │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use anyhow::Result;
use log::{error, info, warn};

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{PinDriver, Pull};
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;

use rosinpress::adapters::channels::{COMMAND_CHANNEL, ChannelSink, EVENT_CHANNEL};
use rosinpress::adapters::log_sink::LogEventSink;
use rosinpress::adapters::nvs::NvsAdapter;
use rosinpress::adapters::record_store::RecordStore;
use rosinpress::adapters::time::MonotonicClock;
use rosinpress::app::ports::ConfigPort;
use rosinpress::app::service::PressOrchestrator;
use rosinpress::config::PressConfig;
use rosinpress::drivers::bus::HardwareBus;
use rosinpress::drivers::button::{ButtonInterlock, ButtonLines};
use rosinpress::pins;
use rosinpress::scheduler::OneShot;

/// Main loop granularity.
const LOOP_PERIOD_MS: u32 = 10;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  RosinPress v{}                     ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            warn!("NVS init failed ({}), retrying once", e);
            NvsAdapter::new()?
        }
    };
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            PressConfig::default()
        }
    };
    config.validate()?;
    info!(
        "Config: {:?}, travel {} ms, max {:.1}\u{00b0}C",
        config.actuation,
        config.travel_time_ms(),
        config.max_temp_c
    );

    // ── 3. Peripherals ────────────────────────────────────────
    let p = Peripherals::take()?;
    info!(
        "I2C on SDA {} / SCL {} at {} Hz",
        pins::I2C_SDA_GPIO,
        pins::I2C_SCL_GPIO,
        pins::I2C_BAUD_HZ
    );
    let i2c = I2cDriver::new(
        p.i2c0,
        p.pins.gpio21,
        p.pins.gpio22,
        &I2cConfig::new().baudrate(Hertz(pins::I2C_BAUD_HZ)),
    )?;
    let bus = HardwareBus::new(i2c);

    let mut start_pin = PinDriver::input(p.pins.gpio17)?;
    start_pin.set_pull(Pull::Up)?;
    let mut emergency_pin = PinDriver::input(p.pins.gpio27)?;
    emergency_pin.set_pull(Pull::Up)?;
    info!(
        "Buttons: start GPIO{}, emergency GPIO{}",
        pins::START_BUTTON_GPIO,
        pins::EMERGENCY_BUTTON_GPIO
    );
    let mut lines = ButtonLines::new(start_pin, emergency_pin);
    let mut interlock = ButtonInterlock::new(&config);

    // ── 4. Orchestrator ───────────────────────────────────────
    let clock = MonotonicClock::new();
    let mut store = RecordStore::new(nvs);
    let mut sink = (LogEventSink::new(), ChannelSink::new(&EVENT_CHANNEL));

    let button_poll_ms = config.button_poll_ms;
    let mut press = PressOrchestrator::new(config, &bus);
    if let Err(e) = press.start(clock.now_ms(), &store, &mut sink) {
        error!("Press start failed: {} (bus scan: {:02x?})", e, bus.scan());
        return Err(e.into());
    }

    let mut button_poll = OneShot::new("button-poll");
    button_poll.arm(clock.now_ms(), 0, ());

    info!("System ready. Entering control loop.");

    // ── 5. Control loop ───────────────────────────────────────
    loop {
        let now = clock.now_ms();

        if button_poll.take_due(now).is_some() {
            let signals = interlock.sample(now, lines.read());
            press.on_interlock(now, signals, interlock.state(), &mut sink);
            button_poll.arm(now, button_poll_ms, ());
        }

        while let Ok(cmd) = COMMAND_CHANNEL.try_receive() {
            // Rejections are already reported through the sink.
            let _ = press.handle_command(cmd, now, &mut store, &mut sink);
        }

        press.tick(now, &mut store, &mut sink);

        FreeRtos::delay_ms(LOOP_PERIOD_MS);
    }
}
