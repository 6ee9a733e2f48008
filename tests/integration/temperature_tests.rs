//! Heater control loop: duty application, cutoff, resample failures and
//! the heater-fault latch.

use super::mock_hw::{Board, make_bus};

use rosinpress::config::PressConfig;
use rosinpress::control::temperature::{LoopTick, TemperatureController};
use rosinpress::drivers::relay::RelayController;
use rosinpress::error::{Device, Error};
use rosinpress::pins::{BOTTOM_SENSOR_ADDR, RELAY_EXPANDER_ADDR, TOP_SENSOR_ADDR};
use rosinpress::sensors::Platen;
use rosinpress::sensors::thermocouple::{SampleOutcome, Thermocouple, encode};

#[test]
fn start_configures_top_then_bottom() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let config = PressConfig::default();
    let mut heat = TemperatureController::new(&bus, &config);
    heat.start(0).unwrap();

    board.with(|b| {
        let expected = vec![(0x05, 0x07), (0x06, 0x7C)];
        assert_eq!(b.sensor_config.get(&TOP_SENSOR_ADDR), Some(&expected));
        assert_eq!(b.sensor_config.get(&BOTTOM_SENSOR_ADDR), Some(&expected));
    });
    assert!(heat.is_running());
    assert_eq!(heat.next_tick_ms(), Some(0));
}

#[test]
fn start_fails_if_a_sensor_is_missing() {
    let board = Board::new(20.0, 20.0);
    board.set_failing(BOTTOM_SENSOR_ADDR, true);
    let bus = make_bus(&board);
    let mut heat = TemperatureController::new(&bus, &PressConfig::default());
    assert_eq!(
        heat.start(0),
        Err(Error::I2cCommunication(Device::BottomSensor))
    );
}

#[test]
fn cold_platens_run_full_duty() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let config = PressConfig::default();
    let relay = RelayController::new(&bus, config.profile());
    relay.start().unwrap();
    let mut heat = TemperatureController::new(&bus, &config);
    heat.set_top_target(0, 80.0);
    heat.set_bottom_target(0, 75.0);
    heat.start(0).unwrap();

    let mut now = 0;
    for _ in 0..10 {
        assert_eq!(
            heat.poll(now, &relay),
            Some(LoopTick::Applied {
                top: true,
                bottom: true
            })
        );
        assert_eq!(board.heaters(), (true, true));
        now += config.control_tick_ms;
    }
    assert_eq!(heat.top().percentage(), 1.0);
    assert_eq!(heat.top().current_c(), 20.0);
}

#[test]
fn loop_waits_for_its_tick() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let config = PressConfig::default();
    let relay = RelayController::new(&bus, config.profile());
    relay.start().unwrap();
    let mut heat = TemperatureController::new(&bus, &config);
    heat.start(0).unwrap();

    assert!(heat.poll(0, &relay).is_some());
    assert!(heat.poll(99, &relay).is_none());
    assert!(heat.poll(100, &relay).is_some());
}

#[test]
fn ramp_window_splits_slots() {
    // 2 °C under an 80 °C target: 0.6 − 0.25·(5/7) ≈ 0.42, so slots 0..=4 run.
    let board = Board::new(78.0, 78.0);
    let bus = make_bus(&board);
    let config = PressConfig::default();
    let relay = RelayController::new(&bus, config.profile());
    relay.start().unwrap();
    let mut heat = TemperatureController::new(&bus, &config);
    heat.set_top_target(0, 80.0);
    heat.set_bottom_target(0, 70.0);
    heat.start(0).unwrap();

    let mut top_on = 0;
    for i in 0..10 {
        if let Some(LoopTick::Applied { top, bottom }) = heat.poll(i * 100, &relay) {
            top_on += usize::from(top);
            assert!(!bottom, "bottom is above target");
        }
    }
    assert_eq!(top_on, 5);
    assert_eq!(board.heaters(), (false, false));
}

#[test]
fn over_temperature_cuts_both_heaters_on_next_tick() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let config = PressConfig::default();
    let relay = RelayController::new(&bus, config.profile());
    relay.start().unwrap();
    let mut heat = TemperatureController::new(&bus, &config);
    heat.set_top_target(0, 170.0);
    heat.set_bottom_target(0, 170.0);
    heat.start(0).unwrap();
    heat.poll(0, &relay);
    assert_eq!(board.heaters(), (true, true));

    // Bottom platen runs away while the top schedule still says "on".
    board.set_temps(100.0, 180.0);
    heat.set_bottom_target(50, 170.0);
    assert_eq!(heat.poll(50, &relay), Some(LoopTick::CutOff));
    assert_eq!(board.heaters(), (false, false));
    assert!(heat.over_temperature());

    // Stays off while over the limit, whatever the schedule.
    assert_eq!(heat.poll(150, &relay), Some(LoopTick::CutOff));
    assert_eq!(board.heaters(), (false, false));
}

#[test]
fn resample_failure_stops_both_heaters_and_backs_off() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let config = PressConfig::default();
    let relay = RelayController::new(&bus, config.profile());
    relay.start().unwrap();
    let mut heat = TemperatureController::new(&bus, &config);
    heat.set_top_target(0, 80.0);
    heat.set_bottom_target(0, 80.0);
    heat.start(0).unwrap();
    heat.poll(0, &relay);
    assert_eq!(board.heaters(), (true, true));

    board.set_failing(TOP_SENSOR_ADDR, true);
    heat.set_top_target(10, 80.0);
    assert_eq!(
        heat.poll(10, &relay),
        Some(LoopTick::Failed(Error::I2cCommunication(Device::TopSensor)))
    );
    assert_eq!(board.heaters(), (false, false));
    assert!(!heat.heater_fault());
    assert_eq!(heat.next_tick_ms(), Some(10 + config.retry_tick_ms));
}

#[test]
fn failed_shutoff_latches_until_a_stop_succeeds() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let config = PressConfig::default();
    let relay = RelayController::new(&bus, config.profile());
    relay.start().unwrap();
    let mut heat = TemperatureController::new(&bus, &config);
    heat.set_top_target(0, 80.0);
    heat.set_bottom_target(0, 80.0);
    heat.start(0).unwrap();
    heat.poll(0, &relay);

    board.set_failing(TOP_SENSOR_ADDR, true);
    board.set_failing(RELAY_EXPANDER_ADDR, true);
    heat.set_top_target(10, 80.0);
    assert!(matches!(heat.poll(10, &relay), Some(LoopTick::Failed(_))));
    assert!(heat.heater_fault());

    // Retries on the slow cadence while the expander stays down.
    assert_eq!(heat.poll(500, &relay), None);
    assert_eq!(
        heat.poll(1_010, &relay),
        Some(LoopTick::Failed(Error::I2cCommunication(
            Device::RelayExpander
        )))
    );
    assert!(heat.heater_fault());
    assert_eq!(heat.next_tick_ms(), Some(2_010));

    board.set_failing(RELAY_EXPANDER_ADDR, false);
    assert_eq!(heat.poll(2_010, &relay), Some(LoopTick::Recovered));
    assert!(!heat.heater_fault());
    assert_eq!(board.heaters(), (false, false));
}

#[test]
fn repeated_relay_failures_force_a_stop() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let config = PressConfig {
        max_loop_failures: 2,
        ..PressConfig::default()
    };
    let relay = RelayController::new(&bus, config.profile());
    relay.start().unwrap();
    let mut heat = TemperatureController::new(&bus, &config);
    heat.set_top_target(0, 80.0);
    heat.set_bottom_target(0, 80.0);
    heat.start(0).unwrap();
    heat.poll(0, &relay);

    // Top heater bit refuses to stay set: every "on" slot mismatches.
    board.with(|b| b.stuck_low = 1 << 4);
    assert!(matches!(heat.poll(100, &relay), Some(LoopTick::Failed(_))));
    assert!(matches!(heat.poll(1_100, &relay), Some(LoopTick::Failed(_))));
    // Budget spent on the second failure: both heaters forced off.
    assert_eq!(board.heaters(), (false, false));
    assert!(!heat.heater_fault());
}

#[test]
fn repeated_raw_sample_is_stalled() {
    let board = Board::new(80.0, 20.0);
    let bus = make_bus(&board);
    let mut sensor = Thermocouple::new(Platen::Top);

    assert_eq!(sensor.sample(&bus), Ok(SampleOutcome::Fresh(80.0)));
    assert_eq!(sensor.sample(&bus), Ok(SampleOutcome::Stalled));
    assert_eq!(sensor.celsius(), 80.0);

    board.set_temps(81.5, 20.0);
    assert_eq!(sensor.sample(&bus), Ok(SampleOutcome::Fresh(81.5)));
    assert_eq!(sensor.celsius(), 81.5);
}

#[test]
fn stalled_sensor_keeps_last_reading_and_schedule() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let config = PressConfig::default();
    let relay = RelayController::new(&bus, config.profile());
    relay.start().unwrap();
    let mut heat = TemperatureController::new(&bus, &config);
    heat.set_top_target(0, 80.0);
    heat.set_bottom_target(0, 80.0);
    heat.start(0).unwrap();
    heat.poll(0, &relay);

    // Platens warm up, but the top converter keeps returning the old bytes.
    board.hold_raw(TOP_SENSOR_ADDR, Some(encode(20.0)));
    board.set_temps(79.0, 79.0);
    heat.set_top_target(10, 80.0);
    assert!(matches!(
        heat.poll(10, &relay),
        Some(LoopTick::Applied { top: true, .. })
    ));
    assert_eq!(heat.top().current_c(), 20.0);
    assert_eq!(heat.top().percentage(), 1.0);
    assert_eq!(heat.top().schedule().on_slots(), 10);
    assert_eq!(heat.bottom().current_c(), 79.0);
    assert!(heat.bottom().schedule().on_slots() < 10);

    board.hold_raw(TOP_SENSOR_ADDR, None);
    heat.set_top_target(20, 80.0);
    heat.poll(20, &relay);
    assert_eq!(heat.top().current_c(), 79.0);
    assert!(heat.top().percentage() < 1.0);
}
