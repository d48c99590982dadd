//! Reference model of an I/O Physical Memory Protection (IOPMP) unit.
//!
//! The model mediates memory transactions issued by I/O initiators: for
//! each transaction it decides, against a programmable rule set, whether
//! the requested access is permitted, latches error-capture state on a
//! violation, and raises a wired or message-signaled interrupt. It is
//! intended to run inside a verification harness computing golden
//! responses for a design under test, so the register layout, the rule
//! evaluation order, and the interrupt protocol are all bit-exact
//! observable contracts.
//!
//! The harness drives the model through three entry points:
//! [`Iopmp::read_register`] / [`Iopmp::write_register`] for the
//! memory-mapped programming interface, and [`Iopmp::validate_access`]
//! for transaction checking. MSI delivery writes through the injectable
//! [`MemoryBus`] seam so tests can observe it or fail it deterministically.
//!
//! Every call runs to completion; an instance owns all of its state and
//! callers sharing one across threads must serialize externally.

mod bus;
mod capture;
mod config;
mod error;
mod interrupt;
mod mmio;
pub mod regs;
mod rule;
mod stall;
mod txn;
mod validate;

pub use bus::{BusError, MemoryBus, OpenBus};
pub use capture::ErrorType;
pub use config::{IopmpConfig, MdcfgFmt, SrcmdFmt};
pub use error::ConfigError;
pub use regs::{AddressMode, Entry, EntryCfg};
pub use rule::MatchStatus;
pub use txn::{AccessResult, AccessStatus, Permission, TransReq, TransRsp};

use regs::{
    ErrReqId, Hwcfg0, Hwcfg1, Hwcfg2, Hwcfg3, Mdcfg, RegFile, SrcmdDirect, SrcmdPerm, SrcmdTable,
    Version,
};

/// One IOPMP instance: the register file, the entry table, the error
/// capture record, and the stall state.
#[derive(Debug, Clone)]
pub struct Iopmp {
    pub(crate) cfg: IopmpConfig,
    pub(crate) regs: RegFile,
    pub(crate) entries: Vec<Entry>,
    /// Subsequent-violation windows, 16 RRIDs each (`mfr_en` only).
    pub(crate) sv_windows: Vec<u16>,
    /// `ERR_MFR.svi` search cursor.
    pub(crate) sv_cursor: u16,
    pub(crate) rrid_stall: Vec<bool>,
    /// Transactions currently parked in the stall buffer.
    pub(crate) stall_cntr: u32,
}

impl Iopmp {
    /// Builds an instance in its reset state.
    pub fn new(cfg: IopmpConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let regs = Self::reset_regs(&cfg);
        let sv_windows = if cfg.mfr_en {
            vec![0u16; usize::from(cfg.rrid_num).div_ceil(16)]
        } else {
            Vec::new()
        };
        Ok(Iopmp {
            entries: vec![Entry::default(); usize::from(cfg.entry_num)],
            sv_windows,
            sv_cursor: 0,
            rrid_stall: vec![false; usize::from(cfg.rrid_num)],
            stall_cntr: 0,
            regs,
            cfg,
        })
    }

    /// Returns the instance to its reset state, dropping all programmed
    /// rules, captured errors, and stall state.
    pub fn reset(&mut self) {
        self.regs = Self::reset_regs(&self.cfg);
        self.entries.fill(Entry::default());
        self.sv_windows.fill(0);
        self.sv_cursor = 0;
        self.rrid_stall.fill(false);
        self.stall_cntr = 0;
    }

    /// The static configuration this instance was built with.
    pub fn config(&self) -> &IopmpConfig {
        &self.cfg
    }

    fn reset_regs(cfg: &IopmpConfig) -> RegFile {
        let mdcfg = if cfg.mdcfg_fmt == MdcfgFmt::Table {
            vec![Mdcfg::default(); usize::from(cfg.md_num)]
        } else {
            Vec::new()
        };
        let srcmd = match cfg.srcmd_fmt {
            SrcmdFmt::Direct => {
                SrcmdTable::Direct(vec![SrcmdDirect::default(); usize::from(cfg.rrid_num)])
            }
            SrcmdFmt::Exclusive => SrcmdTable::Exclusive,
            SrcmdFmt::MdIndexed => {
                SrcmdTable::MdIndexed(vec![SrcmdPerm::default(); usize::from(cfg.md_num)])
            }
        };
        RegFile {
            version: Version {
                vendor: cfg.vendor,
                specver: cfg.specver,
            },
            implementation: cfg.impid,
            hwcfg0: Hwcfg0 {
                enable: cfg.enable,
                hwcfg2_en: cfg.non_prio_en
                    || cfg.chk_x
                    || cfg.peis
                    || cfg.pees
                    || cfg.sps_en
                    || cfg.stall_en
                    || cfg.mfr_en,
                hwcfg3_en: cfg.mdcfg_fmt != MdcfgFmt::Table
                    || cfg.srcmd_fmt != SrcmdFmt::Direct
                    || cfg.no_x
                    || cfg.no_w
                    || cfg.rrid_transl_en,
                md_num: cfg.md_num,
                addrh_en: cfg.addrh_en,
                tor_en: cfg.tor_en,
            },
            hwcfg1: Hwcfg1 {
                rrid_num: cfg.rrid_num,
                entry_num: cfg.entry_num,
            },
            hwcfg2: Hwcfg2 {
                prio_entry: cfg.prio_entry,
                prio_ent_prog: cfg.prio_ent_prog,
                non_prio_en: cfg.non_prio_en,
                chk_x: cfg.chk_x,
                peis: cfg.peis,
                pees: cfg.pees,
                sps_en: cfg.sps_en,
                stall_en: cfg.stall_en,
                mfr_en: cfg.mfr_en,
            },
            hwcfg3: Hwcfg3 {
                mdcfg_fmt: cfg.mdcfg_fmt,
                srcmd_fmt: cfg.srcmd_fmt,
                md_entry_num: cfg.md_entry_num,
                no_x: cfg.no_x,
                no_w: cfg.no_w,
                rrid_transl_en: cfg.rrid_transl_en,
                // Wired to zero unless translation is supported.
                rrid_transl_prog: cfg.rrid_transl_en && cfg.rrid_transl_prog,
                rrid_transl: if cfg.rrid_transl_en {
                    cfg.rrid_transl
                } else {
                    0
                },
            },
            entryoffset: cfg.entry_offset,
            mdstall: Default::default(),
            mdstallh: 0,
            rridscp: Default::default(),
            mdlck: Default::default(),
            mdcfglck: Default::default(),
            entrylck: Default::default(),
            err_cfg: Default::default(),
            err_info: Default::default(),
            err_reqaddr: 0,
            err_reqaddrh: 0,
            err_reqid: ErrReqId {
                rrid: 0,
                // Wired to all-ones when the entry index record is not
                // implemented.
                eid: if cfg.imp_err_reqid_eid { 0 } else { 0xffff },
            },
            err_msiaddr: 0,
            err_msiaddrh: 0,
            mdcfg,
            srcmd,
        }
    }
}
