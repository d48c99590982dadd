mod helpers;

use helpers::*;
use iopmp::regs::{MDSTALL_OFFSET, RRIDSCP_OFFSET};
use iopmp::{IopmpConfig, OpenBus};

fn direct_model() -> iopmp::Iopmp {
    let mut dev = model(IopmpConfig {
        md_num: 4,
        rrid_num: 4,
        entry_num: 16,
        prio_entry: 16,
        ..Default::default()
    });
    associate_md(&mut dev, 1, 2);
    dev
}

/// MDSTALL.md selects MD m at raw bit m+1 (bit 0 is exempt).
fn mdstall_select(md: u8) -> u64 {
    1 << (md + 1)
}

#[test]
fn mdstall_stalls_requesters_of_selected_domains() {
    let mut dev = direct_model();
    let mut bus = OpenBus;

    dev.write_register(MDSTALL_OFFSET, mdstall_select(2), 4);

    // RRID 1 is associated with MD 2 and parks.
    let result = dev.validate_access(&read_req(1, 0x100, 2, 0), &mut bus);
    assert!(result.rsp.rrid_stalled);

    // RRID 0 has no association and proceeds to normal checking.
    let result = dev.validate_access(&read_req(0, 0x100, 2, 0), &mut bus);
    assert!(!result.rsp.rrid_stalled);

    // is_busy reads zero: transitions settle within the write.
    assert_eq!(dev.read_register(MDSTALL_OFFSET, 4) & 1, 0);
}

#[test]
fn exempt_inverts_the_selection() {
    let mut dev = direct_model();
    let mut bus = OpenBus;

    dev.write_register(MDSTALL_OFFSET, mdstall_select(2) | 1, 4);

    let result = dev.validate_access(&read_req(1, 0x100, 2, 0), &mut bus);
    assert!(!result.rsp.rrid_stalled, "associated requester is exempt");

    let result = dev.validate_access(&read_req(0, 0x100, 2, 0), &mut bus);
    assert!(result.rsp.rrid_stalled, "everyone else stalls");
}

#[test]
fn rridscp_queries_and_overrides_individual_requesters() {
    let mut dev = direct_model();

    dev.write_register(MDSTALL_OFFSET, mdstall_select(2), 4);

    dev.write_register(RRIDSCP_OFFSET, 1, 4);
    assert_eq!(dev.read_register(RRIDSCP_OFFSET, 4) >> 30 & 0x3, 1, "stalled");

    // op 2: resume just this requester.
    dev.write_register(RRIDSCP_OFFSET, 1 | 2 << 30, 4);
    assert_eq!(dev.read_register(RRIDSCP_OFFSET, 4) >> 30 & 0x3, 2, "not stalled");

    // An out-of-range RRID reports stat 3.
    dev.write_register(RRIDSCP_OFFSET, 99, 4);
    assert_eq!(dev.read_register(RRIDSCP_OFFSET, 4) >> 30 & 0x3, 3);
}
