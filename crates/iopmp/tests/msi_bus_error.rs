mod helpers;

use helpers::*;
use iopmp::{AccessStatus, IopmpConfig};

const MSI_TARGET: u64 = 0x8000_0000;

fn msi_model() -> iopmp::Iopmp {
    let mut dev = model(IopmpConfig {
        addrh_en: false,
        ..exclusive_config()
    });
    // ERR_MSIADDR holds address bits [33:2].
    enable_msi(&mut dev, (MSI_TARGET >> 2) as u32, 0x2a);
    dev
}

#[test]
fn msi_write_failure_latches_werr_and_inhibits_retries() {
    let mut dev = msi_model();
    let mut bus = RecordingBus::failing_at(MSI_TARGET);

    // First fault: MSI attempted, bus errors, werr latches, no wired
    // interrupt while MSI is enabled.
    let result = dev.validate_access(&read_req(0, 0x4000, 2, 0), &mut bus);
    assert_eq!(result.rsp.status, AccessStatus::Error);
    assert!(!result.wired_intrpt);
    assert_eq!(bus.attempts, 1);
    let info = err_info(&mut dev);
    assert!(info.v);
    assert!(info.msi_werr);

    // Second fault: no new MSI attempt while werr is pending; it lands in
    // the multi-faults record instead.
    let result = dev.validate_access(&read_req(1, 0x4000, 2, 0), &mut bus);
    assert_eq!(result.rsp.status, AccessStatus::Error);
    assert!(!result.wired_intrpt);
    assert_eq!(bus.attempts, 1, "werr inhibits further MSI");
    assert!(err_info(&mut dev).svc, "subsequent violation recorded");
}

#[test]
fn msi_resumes_after_software_clears_werr() {
    let mut dev = msi_model();
    let mut bus = RecordingBus::failing_at(MSI_TARGET);

    dev.validate_access(&read_req(0, 0x4000, 2, 0), &mut bus);
    assert!(err_info(&mut dev).msi_werr);

    // Clear both werr and the primary capture, then stop failing.
    dev.write_register(iopmp::regs::ERR_INFO_OFFSET, 1 | 1 << 3, 4);
    bus.fail_addrs.clear();

    let result = dev.validate_access(&read_req(0, 0x4000, 2, 0), &mut bus);
    assert_eq!(result.rsp.status, AccessStatus::Error);
    assert!(!result.wired_intrpt, "MSI takes over wired delivery");
    assert_eq!(bus.attempts, 2);
    assert_eq!(bus.writes.len(), 1);
    let (addr, data) = &bus.writes[0];
    assert_eq!(*addr, MSI_TARGET);
    assert_eq!(data.as_slice(), &0x2au32.to_le_bytes());
    assert!(!err_info(&mut dev).msi_werr);
}

#[test]
fn wired_interrupt_fires_when_msi_is_disabled() {
    let mut dev = model(exclusive_config());
    let mut bus = RecordingBus::new();
    // ie only, no msi_en.
    dev.write_register(iopmp::regs::ERR_CFG_OFFSET, 1 << 1, 4);

    let result = dev.validate_access(&read_req(0, 0x4000, 2, 0), &mut bus);
    assert_eq!(result.rsp.status, AccessStatus::Error);
    assert!(result.wired_intrpt);
    assert_eq!(bus.attempts, 0);

    // While the capture record stays valid, later faults raise no new
    // primary interrupt.
    let result = dev.validate_access(&read_req(0, 0x4000, 2, 0), &mut bus);
    assert!(!result.wired_intrpt);
}

#[test]
fn msi_address_concatenates_high_half_when_addrh_is_present() {
    let mut dev = model(exclusive_config());
    let mut bus = RecordingBus::new();
    enable_msi(&mut dev, 0x1000_0000, 0x7);
    dev.write_register(iopmp::regs::ERR_MSIADDRH_OFFSET, 0x1, 4);

    dev.validate_access(&read_req(0, 0x4000, 2, 0), &mut bus);
    assert_eq!(bus.writes.len(), 1);
    // {ERR_MSIADDRH, ERR_MSIADDR}, no shifting.
    assert_eq!(bus.writes[0].0, 0x1_1000_0000);
}
