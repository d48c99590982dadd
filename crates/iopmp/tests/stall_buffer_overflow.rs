mod helpers;

use helpers::*;
use iopmp::regs::{ERR_CFG_OFFSET, MDSTALL_OFFSET, RRIDSCP_OFFSET};
use iopmp::{AccessStatus, IopmpConfig, MdcfgFmt, OpenBus, SrcmdFmt};

fn stall_model() -> iopmp::Iopmp {
    let mut dev = model(IopmpConfig {
        md_num: 8,
        rrid_num: 8,
        entry_num: 16,
        prio_entry: 16,
        srcmd_fmt: SrcmdFmt::Exclusive,
        mdcfg_fmt: MdcfgFmt::Table,
        stall_buf_depth: 1,
        ..Default::default()
    });
    // Fault stalled transactions once the buffer overflows.
    dev.write_register(ERR_CFG_OFFSET, 1 << 4, 4);
    // Stall RRID 7.
    dev.write_register(RRIDSCP_OFFSET, 7 | 1 << 30, 4);
    dev
}

#[test]
fn parked_then_overflow_faults_as_stalled_transaction() {
    let mut dev = stall_model();
    let mut bus = OpenBus;

    // First transaction parks in the stall buffer: no error capture.
    let result = dev.validate_access(&read_req(7, 0x100, 2, 0), &mut bus);
    assert!(result.rsp.rrid_stalled);
    assert!(!err_info(&mut dev).v);

    // The buffer is full now; the second transaction faults.
    let result = dev.validate_access(&read_req(7, 0x100, 2, 0), &mut bus);
    assert!(!result.rsp.rrid_stalled);
    assert_eq!(result.rsp.status, AccessStatus::Error);
    let info = err_info(&mut dev);
    assert!(info.v);
    assert_eq!(info.etype, 0x07, "stalled transaction");
    assert_eq!(err_reqid(&mut dev).0, 7);
}

#[test]
fn overflow_without_stall_violation_falls_through_to_the_rules() {
    let mut dev = stall_model();
    let mut bus = OpenBus;
    // Turn stall-violation faulting back off.
    dev.write_register(ERR_CFG_OFFSET, 0, 4);

    dev.validate_access(&read_req(7, 0x100, 2, 0), &mut bus);

    // Buffer full, violations disabled: the transaction is checked
    // normally and misses every rule.
    let result = dev.validate_access(&read_req(7, 0x100, 2, 0), &mut bus);
    assert!(!result.rsp.rrid_stalled);
    assert_eq!(result.rsp.status, AccessStatus::Error);
    assert_eq!(err_info(&mut dev).etype, 0x05);
}

#[test]
fn resume_drains_the_buffer_and_unstalls() {
    let mut dev = stall_model();
    let mut bus = OpenBus;

    dev.validate_access(&read_req(7, 0x100, 2, 0), &mut bus);

    // MDSTALL written to zero resumes everything.
    dev.write_register(MDSTALL_OFFSET, 0, 4);

    // Query reports not stalled.
    dev.write_register(RRIDSCP_OFFSET, 7, 4);
    let stat = dev.read_register(RRIDSCP_OFFSET, 4) >> 30 & 0x3;
    assert_eq!(stat, 2);

    // And transactions flow into normal validation again.
    let result = dev.validate_access(&read_req(7, 0x100, 2, 0), &mut bus);
    assert!(!result.rsp.rrid_stalled);
    assert_eq!(result.rsp.status, AccessStatus::Error);
    assert_eq!(err_info(&mut dev).etype, 0x05);
}
