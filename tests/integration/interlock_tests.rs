//! Start and emergency buttons driving the orchestrator.

use super::mock_hw::{Board, FailingStore, Harness, make_bus, memory_store};

use rosinpress::app::commands::PressCommand;
use rosinpress::app::events::PressEvent;
use rosinpress::config::PressConfig;
use rosinpress::error::Error;
use rosinpress::fsm::PressPhase;
use rosinpress::fsm::context::{PressOutcome, PressSession};

fn ready_session() -> PressSession {
    PressSession {
        top_temp_c: Some(80.0),
        bottom_temp_c: Some(75.0),
        duration_secs: Some(20),
        ..PressSession::default()
    }
}

#[test]
fn held_emergency_blocks_every_start() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let store = FailingStore {
        session: Some(ready_session()),
        ..FailingStore::default()
    };
    let mut h = Harness::new(&bus, PressConfig::default(), store);
    h.lines.emergency = Some(false);
    h.press.start(h.now, &h.store, &mut h.sink).unwrap();
    h.advance(1_000);
    assert!(h.interlock.emergency_engaged());

    assert_eq!(
        h.command(PressCommand::StartPress),
        Err(Error::InterlockViolation)
    );

    // Press and hold the start button: nothing happens.
    h.lines.start = Some(false);
    h.advance(500);
    assert_eq!(h.phase(), PressPhase::Idle);
    assert!(h.sink.rejections().iter().all(|(c, _)| *c != "start_button"));
    assert_eq!(board.gpio() & 0b1111, 0);
}

#[test]
fn emergency_cancels_closing_within_one_poll() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let mut h = Harness::new(&bus, PressConfig::default(), memory_store());
    h.boot();
    h.configure_session(80.0, 75.0, 20);
    h.command(PressCommand::StartPress).unwrap();
    h.advance(1_000);
    assert_eq!(h.phase(), PressPhase::Closing);

    h.lines.emergency = Some(false);
    h.advance(50);
    assert_eq!(h.phase(), PressPhase::Cancelling);

    h.advance(3_000);
    assert_eq!(h.phase(), PressPhase::Idle);
    assert_eq!(h.press.outcome(), Some(PressOutcome::Cancelled));
    assert_eq!(board.gpio() & 0b1111, 0);
}

#[test]
fn emergency_cancels_pressing() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let mut h = Harness::new(&bus, PressConfig::default(), memory_store());
    h.boot();
    h.configure_session(80.0, 75.0, 20);
    h.command(PressCommand::StartPress).unwrap();
    h.advance(3_000 + 2_000);
    assert_eq!(h.phase(), PressPhase::Pressing);

    h.lines.emergency = Some(false);
    h.advance(50);
    assert_eq!(h.phase(), PressPhase::Cancelling);
    assert!(h.sink.phase_changes().contains(&(PressPhase::Pressing, PressPhase::Cancelling)));
}

#[test]
fn emergency_lets_opening_finish() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let mut h = Harness::new(&bus, PressConfig::default(), memory_store());
    h.boot();
    h.configure_session(80.0, 75.0, 1);
    h.command(PressCommand::StartPress).unwrap();
    h.advance(3_000 + 1_000);
    assert_eq!(h.phase(), PressPhase::Opening);

    h.lines.emergency = Some(false);
    h.advance(3_000);
    assert_eq!(h.phase(), PressPhase::Yield);
}

#[test]
fn start_needs_emergency_released_for_its_window() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let mut h = Harness::new(&bus, PressConfig::default(), memory_store());
    h.boot();
    h.configure_session(80.0, 75.0, 20);

    h.lines.emergency = Some(false);
    h.advance(100);
    assert_eq!(
        h.command(PressCommand::StartPress),
        Err(Error::InterlockViolation)
    );

    h.lines.emergency = Some(true);
    h.advance(300);
    assert_eq!(
        h.command(PressCommand::StartPress),
        Err(Error::InterlockViolation)
    );

    h.advance(400);
    h.command(PressCommand::StartPress).unwrap();
    assert_eq!(h.phase(), PressPhase::Closing);
}

#[test]
fn start_button_settles_before_starting() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let mut h = Harness::new(&bus, PressConfig::default(), memory_store());
    h.boot();
    h.configure_session(80.0, 75.0, 20);

    h.lines.start = Some(false);
    h.advance(50);
    assert_eq!(h.phase(), PressPhase::Idle);
    assert!(h.press.snapshot(h.now).interlock.start_depressed);

    h.advance(250);
    assert_eq!(h.phase(), PressPhase::Closing);

    // Holding the button does not retrigger.
    h.advance(3_000);
    assert_eq!(h.phase(), PressPhase::Pressing);
}

#[test]
fn start_held_through_boot_is_ignored() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let store = FailingStore {
        session: Some(ready_session()),
        ..FailingStore::default()
    };
    let mut h = Harness::new(&bus, PressConfig::default(), store);
    h.lines.start = Some(false);
    h.boot();
    h.advance(500);
    assert_eq!(h.phase(), PressPhase::Idle);

    h.lines.start = Some(true);
    h.advance(100);
    h.lines.start = Some(false);
    h.advance(300);
    assert_eq!(h.phase(), PressPhase::Closing);
}

#[test]
fn emergency_during_settle_drops_the_start() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let mut h = Harness::new(&bus, PressConfig::default(), memory_store());
    h.boot();
    h.configure_session(80.0, 75.0, 20);

    h.lines.start = Some(false);
    h.advance(100);
    h.lines.emergency = Some(false);
    h.advance(50);
    h.lines.emergency = Some(true);
    h.advance(1_000);
    assert_eq!(h.phase(), PressPhase::Idle);
}

#[test]
fn rejected_button_start_is_reported() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let mut h = Harness::new(&bus, PressConfig::default(), memory_store());
    h.boot();

    h.lines.start = Some(false);
    h.advance(300);
    assert_eq!(h.phase(), PressPhase::Idle);
    assert_eq!(
        h.sink.rejections(),
        vec![("start_button", Error::InvalidSessionState)]
    );
}

#[test]
fn emergency_edge_publishes_snapshot() {
    let board = Board::new(20.0, 20.0);
    let bus = make_bus(&board);
    let mut h = Harness::new(&bus, PressConfig::default(), memory_store());
    h.boot();
    h.sink.clear();

    h.lines.emergency = Some(false);
    h.advance(50);
    let engaged = h.sink.events.iter().any(|e| match e {
        PressEvent::Snapshot(s) => s.interlock.emergency_depressed,
        _ => false,
    });
    assert!(engaged);
}
