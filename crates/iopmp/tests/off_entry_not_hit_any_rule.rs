mod helpers;

use helpers::*;
use iopmp::{AccessStatus, AddressMode, OpenBus};

#[test]
fn off_entry_never_matches_and_faults_as_not_hit() {
    let mut dev = exclusive_model(16);
    let mut bus = OpenBus;

    // An OFF entry denies even a transaction its address would cover.
    program_entry(&mut dev, 0, 0x1000, cfg_bits(true, true, false, AddressMode::Off));

    let result = dev.validate_access(&read_req(0, 0x4000, 2, 0), &mut bus);
    assert_eq!(result.rsp.status, AccessStatus::Error);

    let info = err_info(&mut dev);
    assert!(info.v);
    assert_eq!(info.ttype, 1, "read access");
    assert_eq!(info.etype, 0x05, "not hit any rule");
    assert_eq!(err_reqaddr(&mut dev), 0x1000, "captured address bits [33:2]");
    assert_eq!(err_reqid(&mut dev).0, 0);
}

#[test]
fn off_entry_stays_off_for_any_address() {
    let mut dev = exclusive_model(16);
    let mut bus = OpenBus;
    program_entry(&mut dev, 0, napot_word_addr(0, 0x10000), cfg_bits(true, true, false, AddressMode::Off));

    // Even the exact encoded range does not match an OFF entry.
    let result = dev.validate_access(&read_req(0, 0x0, 2, 0), &mut bus);
    assert_eq!(result.rsp.status, AccessStatus::Error);
    assert_eq!(err_info(&mut dev).etype, 0x05);
}
