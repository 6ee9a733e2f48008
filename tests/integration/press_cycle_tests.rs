//! Full press cycles through the orchestrator on the simulated board.

use super::mock_hw::{Board, FailingStore, Harness, make_bus, memory_store};

use rosinpress::adapters::record_store::RecordStore;
use rosinpress::app::commands::PressCommand;
use rosinpress::app::events::PressEvent;
use rosinpress::app::ports::PressStore;
use rosinpress::config::{ActuationType, PressConfig};
use rosinpress::error::{Error, StoreError};
use rosinpress::fsm::PressPhase;
use rosinpress::fsm::context::{PressOutcome, PressSession, SessionMetadata};

const MOVEMENT_BITS: u8 = 0b0000_1111;

#[test]
fn complete_cycle_records_press_and_yield() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let mut h = Harness::new(&bus, PressConfig::default(), memory_store());
    h.boot();
    h.configure_session(80.0, 75.0, 20);
    h.sink.clear();

    h.command(PressCommand::StartPress).unwrap();
    assert_eq!(h.phase(), PressPhase::Closing);
    assert_eq!(h.press.snapshot(h.now).remaining_secs, 26);
    assert!(board.bit(2) && board.bit(3));

    h.advance(3_000);
    assert_eq!(h.phase(), PressPhase::Pressing);
    assert_eq!(h.press.snapshot(h.now).remaining_secs, 23);

    h.advance(10_000);
    assert_eq!(h.press.snapshot(h.now).remaining_secs, 13);

    h.advance(10_000);
    assert_eq!(h.phase(), PressPhase::Opening);

    h.advance(3_000);
    assert_eq!(h.phase(), PressPhase::Yield);
    assert_eq!(board.gpio() & MOVEMENT_BITS, 0);

    assert_eq!(
        h.sink.phase_changes(),
        vec![
            (PressPhase::Idle, PressPhase::Closing),
            (PressPhase::Closing, PressPhase::Pressing),
            (PressPhase::Pressing, PressPhase::Opening),
            (PressPhase::Opening, PressPhase::Yield),
        ]
    );
    assert!(
        h.sink
            .events
            .iter()
            .any(|e| matches!(e, PressEvent::PressRecorded { id: 1 }))
    );

    let id = h.press.last_press_id().unwrap();
    assert_eq!(h.press.snapshot(h.now).last_press_id, Some(id));
    let record = h.store.load_press(id).unwrap();
    assert_eq!(record.duration_secs, 20);
    assert_eq!(record.top_temp_c, 80.0);
    assert_eq!(record.bottom_temp_c, 75.0);
    assert_eq!(record.yield_weight_g, None);
    assert_eq!(record.completed_at_ms - record.started_at_ms, 26_000);

    h.command(PressCommand::RecordYield(3.5)).unwrap();
    assert_eq!(h.phase(), PressPhase::Idle);
    assert_eq!(h.press.outcome(), Some(PressOutcome::Completed));
    assert_eq!(h.press.snapshot(h.now).last_press_id, None);
    assert_eq!(h.store.load_press(id).unwrap().yield_weight_g, Some(3.5));
    assert_eq!(h.store.next_id().unwrap(), 2);
}

#[test]
fn countdown_never_increases_through_a_cycle() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let mut h = Harness::new(&bus, PressConfig::default(), memory_store());
    h.boot();
    h.configure_session(80.0, 75.0, 20);
    h.command(PressCommand::StartPress).unwrap();

    let mut last = h.press.snapshot(h.now).remaining_secs;
    while h.phase() != PressPhase::Yield {
        h.advance(10);
        let snap = h.press.snapshot(h.now);
        assert!(
            snap.remaining_secs <= last,
            "{:?} at {} ms: {} after {}",
            snap.phase,
            h.now,
            snap.remaining_secs,
            last
        );
        last = snap.remaining_secs;
    }
    assert_eq!(last, 0);
}

#[test]
fn hydraulic_cycle_uses_longer_travel() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let config = PressConfig {
        actuation: ActuationType::Hydraulic,
        ..PressConfig::default()
    };
    let mut h = Harness::new(&bus, config, memory_store());
    h.boot();
    h.configure_session(90.0, 90.0, 5);

    h.command(PressCommand::StartPress).unwrap();
    assert_eq!(h.press.snapshot(h.now).remaining_secs, 25);
    h.advance(9_990);
    assert_eq!(h.phase(), PressPhase::Closing);
    h.advance(10);
    assert_eq!(h.phase(), PressPhase::Pressing);
    h.advance(5_000 + 10_000);
    assert_eq!(h.phase(), PressPhase::Yield);
    assert_eq!(board.gpio() & MOVEMENT_BITS, 0);
}

#[test]
fn start_requires_complete_session() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let mut h = Harness::new(&bus, PressConfig::default(), memory_store());
    h.boot();
    h.command(PressCommand::SetTopTemperature(80.0)).unwrap();

    assert_eq!(
        h.command(PressCommand::StartPress),
        Err(Error::InvalidSessionState)
    );
    assert_eq!(h.phase(), PressPhase::Idle);
    assert_eq!(
        h.sink.rejections(),
        vec![("start_press", Error::InvalidSessionState)]
    );
    assert_eq!(board.gpio() & MOVEMENT_BITS, 0);
}

#[test]
fn second_start_is_rejected_while_running() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let mut h = Harness::new(&bus, PressConfig::default(), memory_store());
    h.boot();
    h.configure_session(80.0, 75.0, 20);
    h.command(PressCommand::StartPress).unwrap();

    assert_eq!(
        h.command(PressCommand::StartPress),
        Err(Error::PressInProgress)
    );
    assert_eq!(h.phase(), PressPhase::Closing);
}

#[test]
fn session_edits_do_not_touch_running_press() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let mut h = Harness::new(&bus, PressConfig::default(), memory_store());
    h.boot();
    h.configure_session(80.0, 75.0, 20);
    h.command(PressCommand::StartPress).unwrap();
    h.command(PressCommand::SetDuration(300)).unwrap();

    h.advance(3_000 + 20_000 + 3_000);
    assert_eq!(h.phase(), PressPhase::Yield);
    let id = h.press.last_press_id().unwrap();
    assert_eq!(h.store.load_press(id).unwrap().duration_secs, 20);
    assert_eq!(h.press.session().duration_secs, Some(300));
}

#[test]
fn confirm_in_yield_skips_weight() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let mut h = Harness::new(&bus, PressConfig::default(), memory_store());
    h.boot();
    h.configure_session(80.0, 75.0, 1);
    h.command(PressCommand::StartPress).unwrap();
    h.advance(3_000 + 1_000 + 3_000);
    assert_eq!(h.phase(), PressPhase::Yield);

    h.command(PressCommand::ConfirmCancel).unwrap();
    assert_eq!(h.phase(), PressPhase::Idle);
    assert_eq!(h.store.load_press(1).unwrap().yield_weight_g, None);
}

#[test]
fn record_yield_outside_yield_is_rejected() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let mut h = Harness::new(&bus, PressConfig::default(), memory_store());
    h.boot();
    assert_eq!(
        h.command(PressCommand::RecordYield(2.0)),
        Err(Error::InvalidSessionState)
    );
}

#[test]
fn cancel_during_pressing_opens_without_record() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let mut h = Harness::new(&bus, PressConfig::default(), memory_store());
    h.boot();
    h.configure_session(80.0, 75.0, 20);
    h.command(PressCommand::StartPress).unwrap();
    h.advance(3_000 + 5_000);
    assert_eq!(h.phase(), PressPhase::Pressing);

    h.command(PressCommand::CancelPress).unwrap();
    assert_eq!(h.phase(), PressPhase::Cancelling);
    assert_eq!(h.press.snapshot(h.now).remaining_secs, 3);

    h.advance(3_000);
    assert_eq!(h.phase(), PressPhase::Idle);
    assert_eq!(h.press.outcome(), Some(PressOutcome::Cancelled));
    assert_eq!(board.gpio() & MOVEMENT_BITS, 0);
    assert_eq!(h.store.next_id().unwrap(), 1);

    // The superseded dwell never fires.
    h.advance(20_000);
    assert_eq!(h.phase(), PressPhase::Idle);

    h.command(PressCommand::ConfirmCancel).unwrap();
    assert_eq!(h.press.outcome(), None);
}

#[test]
fn cancel_outside_motion_is_ignored() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let mut h = Harness::new(&bus, PressConfig::default(), memory_store());
    h.boot();
    h.configure_session(80.0, 75.0, 1);
    h.command(PressCommand::StartPress).unwrap();
    h.advance(3_000 + 1_000);
    assert_eq!(h.phase(), PressPhase::Opening);

    h.command(PressCommand::CancelPress).unwrap();
    assert_eq!(h.phase(), PressPhase::Opening);
    h.advance(3_000);
    assert_eq!(h.phase(), PressPhase::Yield);
}

#[test]
fn failed_record_save_ends_in_idle() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let store = FailingStore {
        fail_press: true,
        ..FailingStore::default()
    };
    let mut h = Harness::new(&bus, PressConfig::default(), store);
    h.boot();
    h.configure_session(80.0, 75.0, 2);
    h.command(PressCommand::StartPress).unwrap();

    h.advance(3_000 + 2_000 + 3_000);
    assert_eq!(h.phase(), PressPhase::Idle);
    assert_eq!(h.press.outcome(), Some(PressOutcome::Failed));
    assert!(h.sink.hardware_faults() >= 1);
    assert!(h.sink.events.iter().any(|e| matches!(
        e,
        PressEvent::HardwareFault(Error::Store(StoreError::Full))
    )));
    assert!(h.store.saved.is_empty());

    // The safety re-open finishes quietly.
    h.advance(3_000);
    assert_eq!(h.phase(), PressPhase::Idle);
    assert_eq!(board.gpio() & MOVEMENT_BITS, 0);
}

#[test]
fn session_save_failure_keeps_change_in_memory() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let store = FailingStore {
        fail_session: true,
        ..FailingStore::default()
    };
    let mut h = Harness::new(&bus, PressConfig::default(), store);
    h.boot();

    h.command(PressCommand::SetDuration(45)).unwrap();
    assert_eq!(h.press.session().duration_secs, Some(45));
    assert_eq!(h.store.session, None);
}

#[test]
fn stored_session_is_restored_on_boot() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let mut metadata = SessionMetadata::default();
    metadata.strain.push_str("Papaya").unwrap();
    let session = PressSession {
        top_temp_c: Some(88.0),
        bottom_temp_c: Some(82.0),
        duration_secs: Some(90),
        metadata,
    };
    let store = FailingStore {
        session: Some(session.clone()),
        ..FailingStore::default()
    };
    let mut h = Harness::new(&bus, PressConfig::default(), store);
    h.boot();

    assert_eq!(h.press.session(), &session);
    assert_eq!(h.press.temperature().top().target_c(), 88.0);
    assert_eq!(h.press.temperature().bottom().target_c(), 82.0);
    assert_eq!(board.heaters(), (true, true));

    // A restored session is immediately startable.
    h.command(PressCommand::StartPress).unwrap();
    assert_eq!(h.phase(), PressPhase::Closing);
}

#[test]
fn session_persists_across_store_instances() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let mut h = Harness::new(&bus, PressConfig::default(), memory_store());
    h.boot();
    h.configure_session(95.0, 90.0, 120);

    let store = RecordStore::new(h.store.into_inner());
    let restored = store.load_current_session().unwrap().unwrap();
    assert_eq!(restored.top_temp_c, Some(95.0));
    assert_eq!(restored.duration_secs, Some(120));
}

#[test]
fn out_of_range_setpoints_are_rejected() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let mut h = Harness::new(&bus, PressConfig::default(), memory_store());
    h.boot();

    assert!(matches!(
        h.command(PressCommand::SetTopTemperature(200.0)),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        h.command(PressCommand::SetBottomTemperature(f32::NAN)),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        h.command(PressCommand::SetDuration(601)),
        Err(Error::InvalidParameter(_))
    ));
    let names: Vec<_> = h.sink.rejections().into_iter().map(|(c, _)| c).collect();
    assert_eq!(
        names,
        vec!["set_top_temperature", "set_bottom_temperature", "set_duration"]
    );
    assert_eq!(h.press.session(), &PressSession::default());
}

#[test]
fn periodic_snapshots_flow_while_idle() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let mut h = Harness::new(&bus, PressConfig::default(), memory_store());
    h.boot();
    h.sink.clear();

    h.advance(5_000);
    let snapshots = h.sink.snapshots();
    assert!((4..=6).contains(&snapshots), "got {snapshots}");
}

#[test]
fn over_temperature_trip_is_reported_once() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let mut h = Harness::new(&bus, PressConfig::default(), memory_store());
    h.boot();
    h.configure_session(170.0, 170.0, 20);
    h.sink.clear();

    board.set_temps(180.0, 20.0);
    h.advance(3_000);
    let trips = h
        .sink
        .events
        .iter()
        .filter(|e| matches!(e, PressEvent::HeaterTrip(Error::OverTemperature)))
        .count();
    assert_eq!(trips, 1);
    assert_eq!(board.heaters(), (false, false));
    assert!(h.press.snapshot(h.now).over_temperature);
    assert_eq!(h.phase(), PressPhase::Idle);
}
