mod helpers;

use helpers::*;
use iopmp::{AccessStatus, AddressMode, IopmpConfig, OpenBus};

fn non_prio_model() -> iopmp::Iopmp {
    let mut dev = model(IopmpConfig {
        prio_entry: 0,
        non_prio_en: true,
        ..exclusive_config()
    });
    set_mdcfg_top(&mut dev, 0, 4);
    dev
}

#[test]
fn first_denying_match_is_recorded_when_nothing_grants() {
    let mut dev = non_prio_model();
    let mut bus = OpenBus;

    // Covers bytes [0, 0x1000) with no permissions at all.
    program_entry(
        &mut dev,
        0,
        napot_word_addr(0, 0x1000),
        cfg_bits(false, false, false, AddressMode::Napot),
    );

    let result = dev.validate_access(&read_req(0, 0x0, 2, 0), &mut bus);
    assert_eq!(result.rsp.status, AccessStatus::Error);

    let info = err_info(&mut dev);
    assert_eq!(info.etype, 0x01, "illegal read access");
    assert_eq!(err_reqid(&mut dev), (0, 0), "entry 0 was the first illegal access");
}

#[test]
fn later_granting_entry_overrides_earlier_non_priority_denial() {
    let mut dev = non_prio_model();
    let mut bus = OpenBus;

    program_entry(
        &mut dev,
        0,
        napot_word_addr(0, 0x1000),
        cfg_bits(false, false, false, AddressMode::Napot),
    );
    program_entry(
        &mut dev,
        1,
        napot_word_addr(0, 0x1000),
        cfg_bits(true, false, false, AddressMode::Napot),
    );

    // Denial by entry 0 is deferred; entry 1 grants.
    let result = dev.validate_access(&read_req(0, 0x0, 2, 0), &mut bus);
    assert_eq!(result.rsp.status, AccessStatus::Success);
    assert!(!err_info(&mut dev).v);
}

#[test]
fn partial_matches_are_ignored_off_the_priority_region() {
    let mut dev = non_prio_model();
    let mut bus = OpenBus;

    // Entry 0 covers [0, 0x8) only; the transaction spills past it.
    program_entry(
        &mut dev,
        0,
        napot_word_addr(0, 0x8),
        cfg_bits(true, false, false, AddressMode::Napot),
    );
    program_entry(
        &mut dev,
        1,
        napot_word_addr(0, 0x1000),
        cfg_bits(true, false, false, AddressMode::Napot),
    );

    let result = dev.validate_access(&read_req(0, 0x0, 2, 3), &mut bus);
    assert_eq!(result.rsp.status, AccessStatus::Success);
}
