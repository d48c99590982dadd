//! Reset-time configuration of an IOPMP instance.
//!
//! Everything here is fixed when the device is constructed; the runtime-
//! programmable state lives in the register file. Counts and feature
//! toggles mirror the hardware configuration reported through
//! `HWCFG0..HWCFG3`, plus the implementation choices that never surface in
//! a register (stall buffer depth, source enforcement, the suppressed-
//! response user token).

use crate::error::ConfigError;

/// MDCFG table format (`HWCFG3.mdcfg_fmt`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MdcfgFmt {
    /// Format 0: a programmable MDCFG table maps each MD to a top entry
    /// index.
    #[default]
    Table = 0,
    /// Format 1: no table; every MD owns exactly `md_entry_num + 1`
    /// entries and the stride is fixed at reset.
    FixedStride = 1,
    /// Format 2: like format 1, but `md_entry_num` stays programmable
    /// until the checker is enabled.
    ProgStride = 2,
}

impl MdcfgFmt {
    pub(crate) const fn to_bits(self) -> u32 {
        self as u32
    }
}

/// SRCMD table format (`HWCFG3.srcmd_fmt`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SrcmdFmt {
    /// Format 0: per-RRID MD association bitmaps (`SRCMD_EN`), optionally
    /// with secondary per-permission bitmaps when `sps_en`.
    #[default]
    Direct = 0,
    /// Format 1: no table; RRID s is bound exclusively to MD s.
    Exclusive = 1,
    /// Format 2: per-MD permission words holding a read/write bit pair for
    /// every RRID (`SRCMD_PERM`).
    MdIndexed = 2,
}

impl SrcmdFmt {
    pub(crate) const fn to_bits(self) -> u32 {
        self as u32
    }
}

/// Static configuration consumed once at reset.
#[derive(Debug, Clone)]
pub struct IopmpConfig {
    /// JEDEC manufacturer ID (24 bits).
    pub vendor: u32,
    /// Specification version reported in `VERSION.specver`.
    pub specver: u8,
    /// User-defined implementation ID.
    pub impid: u32,
    /// Whether the checker is enabled at reset. `HWCFG0.enable` is sticky
    /// once set either way.
    pub enable: bool,
    /// Supported number of memory domains, at most 63.
    pub md_num: u8,
    /// `ENTRY_ADDRH(i)` and `ERR_REQADDRH` are implemented.
    pub addrh_en: bool,
    /// TOR address mode is supported.
    pub tor_en: bool,
    /// Supported number of requester role IDs.
    pub rrid_num: u16,
    /// Supported number of entries.
    pub entry_num: u16,
    /// Number of priority entries at reset.
    pub prio_entry: u16,
    /// `HWCFG2.prio_entry` starts out programmable.
    pub prio_ent_prog: bool,
    /// Entries at or above `prio_entry` are matched without priority.
    pub non_prio_en: bool,
    /// Instruction fetches are checked; when clear they are treated as
    /// reads.
    pub chk_x: bool,
    /// Instruction fetch is never permitted even where an entry would
    /// grant execute. Meaningful only with `chk_x`.
    pub xinr: bool,
    /// Per-entry interrupt suppression (`sire`/`siwe`/`sixe`) implemented.
    pub peis: bool,
    /// Per-entry error suppression (`sere`/`sewe`/`sexe`) implemented.
    pub pees: bool,
    /// Secondary permission settings (`SRCMD_R/W/X` bitmaps) implemented.
    pub sps_en: bool,
    /// Stall-related registers (`MDSTALL`, `MDSTALLH`, `RRIDSCP`).
    pub stall_en: bool,
    /// Multi-faults record extension (`ERR_MFR`, `ERR_INFO.svc`).
    pub mfr_en: bool,
    /// MDCFG table format.
    pub mdcfg_fmt: MdcfgFmt,
    /// SRCMD table format.
    pub srcmd_fmt: SrcmdFmt,
    /// For mdcfg formats 1 and 2: each MD owns `md_entry_num + 1` entries.
    pub md_entry_num: u8,
    /// Deny all instruction fetches (with `chk_x`).
    pub no_x: bool,
    /// Deny all writes.
    pub no_w: bool,
    /// Tag a translated RRID on the initiator port.
    pub rrid_transl_en: bool,
    /// `HWCFG3.rrid_transl` starts out programmable.
    pub rrid_transl_prog: bool,
    /// The RRID tagged to outgoing transactions at reset.
    pub rrid_transl: u16,
    /// Byte offset of the entry table from the instance base.
    pub entry_offset: u32,
    /// `MDLCK`/`MDLCKH` implemented.
    pub imp_mdlck: bool,
    /// The error capture record is implemented.
    pub imp_error_capture: bool,
    /// `ERR_REQID.eid` is implemented; otherwise it is wired to 0xffff.
    pub imp_err_reqid_eid: bool,
    /// `RRIDSCP` is implemented.
    pub imp_rridscp: bool,
    /// Message-signaled interrupts are implemented.
    pub imp_msi: bool,
    /// Force RRID 0 before any lookup (source enforcement builds).
    pub src_enforcement: bool,
    /// Number of low-order word-address bits ignored by TOR matching.
    pub granularity: u8,
    /// Capacity of the stall buffer for parked transactions.
    pub stall_buf_depth: u32,
    /// MSI payload width in bytes, 1 or 4.
    pub msi_data_bytes: u8,
    /// Value returned in `rsp.user` when an error response is suppressed.
    pub user_token: u8,
}

impl Default for IopmpConfig {
    fn default() -> Self {
        Self {
            vendor: 0,
            specver: 1,
            impid: 0,
            enable: true,
            md_num: 63,
            addrh_en: true,
            tor_en: true,
            rrid_num: 64,
            entry_num: 512,
            prio_entry: 16,
            prio_ent_prog: false,
            non_prio_en: true,
            chk_x: true,
            xinr: false,
            peis: true,
            pees: true,
            sps_en: false,
            stall_en: true,
            mfr_en: true,
            mdcfg_fmt: MdcfgFmt::Table,
            srcmd_fmt: SrcmdFmt::Direct,
            md_entry_num: 0,
            no_x: false,
            no_w: false,
            rrid_transl_en: false,
            rrid_transl_prog: false,
            rrid_transl: 0,
            entry_offset: 0x2000,
            imp_mdlck: true,
            imp_error_capture: true,
            imp_err_reqid_eid: true,
            imp_rridscp: true,
            imp_msi: true,
            src_enforcement: false,
            granularity: 0,
            stall_buf_depth: 32,
            msi_data_bytes: 4,
            user_token: 0x55,
        }
    }
}

impl IopmpConfig {
    /// Entries owned by each MD under mdcfg formats 1 and 2.
    pub(crate) fn entries_per_md(&self) -> u16 {
        u16::from(self.md_entry_num) + 1
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.md_num > 63 {
            return Err(ConfigError::TooManyMemoryDomains(self.md_num));
        }
        if self.entry_num == 0 {
            return Err(ConfigError::NoEntries);
        }
        if self.rrid_num == 0 {
            return Err(ConfigError::NoRequesters);
        }
        if self.prio_entry > self.entry_num {
            return Err(ConfigError::TooManyPriorityEntries {
                prio_entry: self.prio_entry,
                entry_num: self.entry_num,
            });
        }
        match self.mdcfg_fmt {
            MdcfgFmt::Table => {
                if self.md_entry_num != 0 {
                    return Err(ConfigError::StrideWithMdcfgTable(self.md_entry_num));
                }
            }
            MdcfgFmt::FixedStride | MdcfgFmt::ProgStride => {
                let needed = u32::from(self.md_num) * u32::from(self.entries_per_md());
                if needed > u32::from(self.entry_num) {
                    return Err(ConfigError::EntryTableTooSmall {
                        md_num: self.md_num,
                        per_md: self.entries_per_md(),
                        entry_num: self.entry_num,
                    });
                }
            }
        }
        if self.srcmd_fmt == SrcmdFmt::Exclusive && self.rrid_num > u16::from(self.md_num) {
            return Err(ConfigError::ExclusiveFormatRridExceedsMd {
                rrid_num: self.rrid_num,
                md_num: self.md_num,
            });
        }
        if self.srcmd_fmt == SrcmdFmt::MdIndexed && self.rrid_num > 32 {
            return Err(ConfigError::MdIndexedFormatTooManyRrids(self.rrid_num));
        }
        if self.granularity > 32 {
            return Err(ConfigError::GranularityTooLarge(self.granularity));
        }
        if self.imp_msi && !matches!(self.msi_data_bytes, 1 | 4) {
            return Err(ConfigError::BadMsiDataBytes(self.msi_data_bytes));
        }
        if self.mfr_en && !self.imp_error_capture {
            return Err(ConfigError::MfrWithoutErrorCapture);
        }
        if self.imp_rridscp && !self.stall_en {
            return Err(ConfigError::RridscpWithoutStall);
        }
        Ok(())
    }
}
