#![allow(dead_code)]

use iopmp::regs::{
    ENTRYOFFSET_OFFSET, ERR_CFG_OFFSET, ERR_INFO_OFFSET, ERR_MSIADDR_OFFSET, ERR_REQADDR_OFFSET,
    ERR_REQID_OFFSET, MDCFG_TABLE_OFFSET, SRCMD_STRIDE, SRCMD_TABLE_OFFSET,
};
use iopmp::{
    AddressMode, BusError, EntryCfg, Iopmp, IopmpConfig, MdcfgFmt, MemoryBus, Permission,
    SrcmdFmt, TransReq,
};

/// Memory stub that records MSI writes and can fail selected addresses
/// with a bus error.
#[derive(Debug, Default)]
pub struct RecordingBus {
    /// Successful writes, in order.
    pub writes: Vec<(u64, Vec<u8>)>,
    /// Every write attempt, including failed ones.
    pub attempts: usize,
    pub fail_addrs: Vec<u64>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(addr: u64) -> Self {
        RecordingBus {
            fail_addrs: vec![addr],
            ..Self::default()
        }
    }
}

impl MemoryBus for RecordingBus {
    fn write_physical(&mut self, addr: u64, data: &[u8]) -> Result<(), BusError> {
        self.attempts += 1;
        if self.fail_addrs.contains(&addr) {
            return Err(BusError);
        }
        self.writes.push((addr, data.to_vec()));
        Ok(())
    }
}

/// Small instance with RRID s bound exclusively to MD s and a
/// format-0 MDCFG table: program `MDCFG(0).t` and entries, then drive
/// transactions from RRID 0.
pub fn exclusive_config() -> IopmpConfig {
    IopmpConfig {
        md_num: 4,
        rrid_num: 4,
        entry_num: 16,
        prio_entry: 16,
        srcmd_fmt: SrcmdFmt::Exclusive,
        mdcfg_fmt: MdcfgFmt::Table,
        ..Default::default()
    }
}

pub fn model(cfg: IopmpConfig) -> Iopmp {
    Iopmp::new(cfg).expect("valid test configuration")
}

/// Instance from `exclusive_config` with MD 0 covering the first
/// `entries` entries.
pub fn exclusive_model(entries: u16) -> Iopmp {
    let mut dev = model(exclusive_config());
    set_mdcfg_top(&mut dev, 0, entries);
    dev
}

pub fn set_mdcfg_top(dev: &mut Iopmp, md: u8, top: u16) {
    dev.write_register(MDCFG_TABLE_OFFSET + u64::from(md) * 4, u64::from(top), 4);
}

/// Associates MD `md` with RRID `rrid` in the format-0 SRCMD table.
/// Bit 0 of SRCMD_EN is the lock, so MD m sits at raw bit m+1.
pub fn associate_md(dev: &mut Iopmp, rrid: u16, md: u8) {
    let base = SRCMD_TABLE_OFFSET + u64::from(rrid) * SRCMD_STRIDE;
    if md < 31 {
        let old = dev.read_register(base, 4);
        dev.write_register(base, old | 1 << (md + 1), 4);
    } else {
        let old = dev.read_register(base + 4, 4);
        dev.write_register(base + 4, old | 1 << (md - 31), 4);
    }
}

pub fn cfg_bits(r: bool, w: bool, x: bool, a: AddressMode) -> u32 {
    EntryCfg {
        r,
        w,
        x,
        a,
        ..Default::default()
    }
    .to_bits()
}

/// Programs entry `index` through the register interface.
pub fn program_entry(dev: &mut Iopmp, index: u16, word_addr: u64, cfg: u32) {
    let base = dev.read_register(ENTRYOFFSET_OFFSET, 4) + u64::from(index) * 16;
    dev.write_register(base, word_addr & 0xffff_ffff, 4);
    dev.write_register(base + 4, word_addr >> 32, 4);
    dev.write_register(base + 8, u64::from(cfg), 4);
}

/// NAPOT word address covering `size` bytes at `base` (both powers of
/// two, size at least 8 bytes, base size-aligned).
pub fn napot_word_addr(base: u64, size: u64) -> u64 {
    assert!(size.is_power_of_two() && size >= 8);
    assert_eq!(base % size, 0);
    (base >> 2) | (size >> 3) - 1
}

pub fn read_req(rrid: u16, addr: u64, size: u32, length: u32) -> TransReq {
    TransReq {
        rrid,
        addr,
        length,
        size,
        perm: Permission::Read,
        is_amo: false,
    }
}

pub fn write_req(rrid: u16, addr: u64, size: u32, length: u32) -> TransReq {
    TransReq {
        perm: Permission::Write,
        ..read_req(rrid, addr, size, length)
    }
}

pub fn amo_req(rrid: u16, addr: u64, size: u32, length: u32) -> TransReq {
    TransReq {
        is_amo: true,
        ..write_req(rrid, addr, size, length)
    }
}

pub fn fetch_req(rrid: u16, addr: u64, size: u32, length: u32) -> TransReq {
    TransReq {
        perm: Permission::InstrFetch,
        ..read_req(rrid, addr, size, length)
    }
}

/// Decoded view of ERR_INFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrInfoView {
    pub v: bool,
    pub ttype: u8,
    pub msi_werr: bool,
    pub etype: u8,
    pub svc: bool,
}

pub fn err_info(dev: &mut Iopmp) -> ErrInfoView {
    let bits = dev.read_register(ERR_INFO_OFFSET, 4) as u32;
    ErrInfoView {
        v: bits & 1 != 0,
        ttype: (bits >> 1 & 0x3) as u8,
        msi_werr: bits >> 3 & 1 != 0,
        etype: (bits >> 4 & 0xf) as u8,
        svc: bits >> 8 & 1 != 0,
    }
}

pub fn err_reqaddr(dev: &mut Iopmp) -> u64 {
    dev.read_register(ERR_REQADDR_OFFSET, 4)
}

/// Captured `(rrid, eid)` from ERR_REQID.
pub fn err_reqid(dev: &mut Iopmp) -> (u16, u16) {
    let bits = dev.read_register(ERR_REQID_OFFSET, 4) as u32;
    ((bits & 0xffff) as u16, (bits >> 16) as u16)
}

pub fn clear_err_valid(dev: &mut Iopmp) {
    dev.write_register(ERR_INFO_OFFSET, 1, 4);
}

/// Enables interrupts and MSI with the given target address and payload.
pub fn enable_msi(dev: &mut Iopmp, msiaddr_reg: u32, msidata: u16) {
    dev.write_register(ERR_MSIADDR_OFFSET, u64::from(msiaddr_reg), 4);
    let bits = 1 << 1 | 1 << 3 | u64::from(msidata) << 8;
    dev.write_register(ERR_CFG_OFFSET, bits, 4);
}
