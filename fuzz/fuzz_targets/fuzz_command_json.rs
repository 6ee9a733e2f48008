//! Fuzz target: inbound `PressCommand` JSON
//!
//! Feeds arbitrary bytes to the command decoder the UI channel uses and
//! checks that anything accepted survives a re-encode unchanged.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - Every decoded command has a non-empty name
//! - decode(encode(cmd)) == cmd for finite payloads
//!
//! cargo fuzz run fuzz_command_json

#![no_main]

use libfuzzer_sys::fuzz_target;
use rosinpress::app::commands::PressCommand;

fuzz_target!(|data: &[u8]| {
    let Ok(cmd) = serde_json::from_slice::<PressCommand>(data) else {
        return;
    };
    assert!(!cmd.name().is_empty());

    let finite = match &cmd {
        PressCommand::SetTopTemperature(c)
        | PressCommand::SetBottomTemperature(c)
        | PressCommand::RecordYield(c) => c.is_finite(),
        PressCommand::SetMetadata(m) => m.input_weight_g.is_none_or(f32::is_finite),
        _ => true,
    };
    if !finite {
        return;
    }

    let json = serde_json::to_vec(&cmd).expect("encode decoded command");
    let back: PressCommand = serde_json::from_slice(&json).expect("re-decode");
    assert_eq!(back, cmd);
});
