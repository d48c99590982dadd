//! Typed view of the memory-mapped register file.
//!
//! Each register is a small struct with explicit bit positions and a single
//! bit-exact `to_bits`/`from_bits` pair; the packed `u32` only exists at
//! the programming interface. WARL and lock enforcement happens in the
//! offset decoder (`mmio`), not here.

use crate::config::{MdcfgFmt, SrcmdFmt};

// Byte offsets from the instance base.
pub const VERSION_OFFSET: u64 = 0x00;
pub const IMPLEMENTATION_OFFSET: u64 = 0x04;
pub const HWCFG0_OFFSET: u64 = 0x08;
pub const HWCFG1_OFFSET: u64 = 0x0C;
pub const HWCFG2_OFFSET: u64 = 0x10;
pub const HWCFG3_OFFSET: u64 = 0x14;
pub const ENTRYOFFSET_OFFSET: u64 = 0x2C;
pub const MDSTALL_OFFSET: u64 = 0x30;
pub const MDSTALLH_OFFSET: u64 = 0x34;
pub const RRIDSCP_OFFSET: u64 = 0x38;
pub const MDLCK_OFFSET: u64 = 0x40;
pub const MDLCKH_OFFSET: u64 = 0x44;
pub const MDCFGLCK_OFFSET: u64 = 0x48;
pub const ENTRYLCK_OFFSET: u64 = 0x4C;
pub const ERR_CFG_OFFSET: u64 = 0x60;
pub const ERR_INFO_OFFSET: u64 = 0x64;
pub const ERR_REQADDR_OFFSET: u64 = 0x68;
pub const ERR_REQADDRH_OFFSET: u64 = 0x6C;
pub const ERR_REQID_OFFSET: u64 = 0x70;
pub const ERR_MFR_OFFSET: u64 = 0x74;
pub const ERR_MSIADDR_OFFSET: u64 = 0x78;
pub const ERR_MSIADDRH_OFFSET: u64 = 0x7C;
pub const ERR_USER_OFFSET: u64 = 0x80;
pub const ERR_USER_COUNT: u64 = 8;

/// Size of the fixed register window (the tables other than the entry
/// array live inside it).
pub const REG_FILE_SIZE: u64 = 0x2000;

pub const MDCFG_TABLE_OFFSET: u64 = 0x0800;
pub const SRCMD_TABLE_OFFSET: u64 = 0x1000;
/// Each SRCMD group (one RRID for format 0, one MD for format 2) spans
/// eight 32-bit registers.
pub const SRCMD_STRIDE: u64 = 0x20;
/// `{ADDR, ADDRH, CFG, USER_CFG}` per entry.
pub const ENTRY_STRIDE: u64 = 0x10;

/// `VERSION` (RO): `{vendor[23:0], specver[31:24]}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Version {
    pub vendor: u32,
    pub specver: u8,
}

impl Version {
    pub const fn to_bits(self) -> u32 {
        (self.vendor & 0x00ff_ffff) | ((self.specver as u32) << 24)
    }
}

/// `HWCFG0` (RO except the sticky `enable` bit).
#[derive(Debug, Clone, Copy, Default)]
pub struct Hwcfg0 {
    pub enable: bool,
    pub hwcfg2_en: bool,
    pub hwcfg3_en: bool,
    pub md_num: u8,
    pub addrh_en: bool,
    pub tor_en: bool,
}

impl Hwcfg0 {
    pub const fn to_bits(self) -> u32 {
        (self.enable as u32)
            | (self.hwcfg2_en as u32) << 1
            | (self.hwcfg3_en as u32) << 2
            | ((self.md_num as u32) & 0x3f) << 24
            | (self.addrh_en as u32) << 30
            | (self.tor_en as u32) << 31
    }
}

/// `HWCFG1` (RO): `{rrid_num[15:0], entry_num[31:16]}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hwcfg1 {
    pub rrid_num: u16,
    pub entry_num: u16,
}

impl Hwcfg1 {
    pub const fn to_bits(self) -> u32 {
        (self.rrid_num as u32) | (self.entry_num as u32) << 16
    }
}

/// `HWCFG2`: priority-entry count and extension presence bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hwcfg2 {
    pub prio_entry: u16,
    pub prio_ent_prog: bool,
    pub non_prio_en: bool,
    pub chk_x: bool,
    pub peis: bool,
    pub pees: bool,
    pub sps_en: bool,
    pub stall_en: bool,
    pub mfr_en: bool,
}

impl Hwcfg2 {
    pub const fn to_bits(self) -> u32 {
        (self.prio_entry as u32)
            | (self.prio_ent_prog as u32) << 16
            | (self.non_prio_en as u32) << 17
            | (self.chk_x as u32) << 26
            | (self.peis as u32) << 27
            | (self.pees as u32) << 28
            | (self.sps_en as u32) << 29
            | (self.stall_en as u32) << 30
            | (self.mfr_en as u32) << 31
    }
}

/// `HWCFG3`: table formats, global deny bits, RRID translation.
#[derive(Debug, Clone, Copy)]
pub struct Hwcfg3 {
    pub mdcfg_fmt: MdcfgFmt,
    pub srcmd_fmt: SrcmdFmt,
    pub md_entry_num: u8,
    pub no_x: bool,
    pub no_w: bool,
    pub rrid_transl_en: bool,
    pub rrid_transl_prog: bool,
    pub rrid_transl: u16,
}

impl Hwcfg3 {
    pub const fn to_bits(self) -> u32 {
        self.mdcfg_fmt.to_bits()
            | self.srcmd_fmt.to_bits() << 2
            | (self.md_entry_num as u32) << 4
            | (self.no_x as u32) << 12
            | (self.no_w as u32) << 13
            | (self.rrid_transl_en as u32) << 14
            | (self.rrid_transl_prog as u32) << 15
            | (self.rrid_transl as u32) << 16
    }
}

/// Stored `MDSTALL`/`MDSTALLH` selection. Reads substitute `is_busy` for
/// the `exempt` bit; all transitions settle synchronously so it reads 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mdstall {
    pub exempt: bool,
    /// MD selection bitmap, bit m selects MD m (63 usable bits).
    pub md: u64,
}

impl Mdstall {
    pub const fn to_bits_low(self) -> u32 {
        // is_busy (bit 0) reads 0; selection bits read back.
        ((self.md & 0x7fff_ffff) as u32) << 1
    }

    pub const fn to_bits_high(self) -> u32 {
        (self.md >> 31) as u32
    }
}

/// Last `RRIDSCP` operation and its readback status.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rridscp {
    pub rrid: u16,
    /// 1: stalled, 2: not stalled, 3: unimplemented or unselectable RRID.
    pub stat: u8,
}

impl Rridscp {
    pub const fn to_bits(self) -> u32 {
        (self.rrid as u32) | ((self.stat as u32) & 0x3) << 30
    }
}

/// `MDLCK`/`MDLCKH`: sticky per-MD lock bitmap over the SRCMD table.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mdlck {
    pub l: bool,
    /// Bit m locks MD m (63 usable bits).
    pub md: u64,
}

impl Mdlck {
    pub const fn to_bits_low(self) -> u32 {
        (self.l as u32) | ((self.md & 0x7fff_ffff) as u32) << 1
    }

    pub const fn to_bits_high(self) -> u32 {
        (self.md >> 31) as u32
    }

    pub const fn locks(self, md: u8) -> bool {
        self.md >> md & 1 != 0
    }
}

/// `MDCFGLCK` (format 0 only): `MDCFG(i)` is locked for `i < f`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mdcfglck {
    pub l: bool,
    pub f: u8,
}

impl Mdcfglck {
    pub const fn to_bits(self) -> u32 {
        (self.l as u32) | ((self.f as u32) & 0x7f) << 1
    }
}

/// `ENTRYLCK`: entry registers are locked for indices below `f`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Entrylck {
    pub l: bool,
    pub f: u16,
}

impl Entrylck {
    pub const fn to_bits(self) -> u32 {
        (self.l as u32) | (self.f as u32) << 1
    }
}

/// `ERR_CFG`: global error reporting behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrCfg {
    pub l: bool,
    pub ie: bool,
    /// Suppress the error response, answering success plus the user token.
    pub rs: bool,
    pub msi_en: bool,
    pub stall_violation_en: bool,
    pub msidata: u16,
}

impl ErrCfg {
    pub const fn to_bits(self) -> u32 {
        (self.l as u32)
            | (self.ie as u32) << 1
            | (self.rs as u32) << 2
            | (self.msi_en as u32) << 3
            | (self.stall_violation_en as u32) << 4
            | ((self.msidata as u32) & 0x7ff) << 8
    }
}

/// `ERR_INFO`: primary error capture status.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrInfo {
    pub v: bool,
    pub ttype: u8,
    pub msi_werr: bool,
    pub etype: u8,
    pub svc: bool,
}

impl ErrInfo {
    pub const fn to_bits(self) -> u32 {
        (self.v as u32)
            | ((self.ttype as u32) & 0x3) << 1
            | (self.msi_werr as u32) << 3
            | ((self.etype as u32) & 0xf) << 4
            | (self.svc as u32) << 8
    }
}

/// `ERR_REQID`: `{rrid[15:0], eid[31:16]}`, latched on primary capture.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrReqId {
    pub rrid: u16,
    pub eid: u16,
}

impl ErrReqId {
    pub const fn to_bits(self) -> u32 {
        (self.rrid as u32) | (self.eid as u32) << 16
    }
}

/// Packs one `ERR_MFR` read result: `{svw[15:0], svi[27:16], svs[31]}`.
pub(crate) const fn err_mfr_bits(svw: u16, svi: u16, svs: bool) -> u32 {
    (svw as u32) | ((svi as u32) & 0xfff) << 16 | (svs as u32) << 31
}

/// `MDCFG(m)` (format 0): top entry index of MD m.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mdcfg {
    pub t: u16,
}

/// Address mode of an entry (`ENTRY_CFG.a`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum AddressMode {
    #[default]
    Off = 0,
    Tor = 1,
    Na4 = 2,
    Napot = 3,
}

impl AddressMode {
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0x3 {
            0 => AddressMode::Off,
            1 => AddressMode::Tor,
            2 => AddressMode::Na4,
            _ => AddressMode::Napot,
        }
    }
}

/// `ENTRY_CFG(i)`: permissions, address mode, per-entry suppression.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryCfg {
    pub r: bool,
    pub w: bool,
    pub x: bool,
    pub a: AddressMode,
    pub sire: bool,
    pub siwe: bool,
    pub sixe: bool,
    pub sere: bool,
    pub sewe: bool,
    pub sexe: bool,
}

impl EntryCfg {
    pub const fn to_bits(self) -> u32 {
        (self.r as u32)
            | (self.w as u32) << 1
            | (self.x as u32) << 2
            | (self.a as u32) << 3
            | (self.sire as u32) << 5
            | (self.siwe as u32) << 6
            | (self.sixe as u32) << 7
            | (self.sere as u32) << 8
            | (self.sewe as u32) << 9
            | (self.sexe as u32) << 10
    }

    pub const fn from_bits(bits: u32) -> Self {
        EntryCfg {
            r: bits & 1 != 0,
            w: bits >> 1 & 1 != 0,
            x: bits >> 2 & 1 != 0,
            a: AddressMode::from_bits(bits >> 3),
            sire: bits >> 5 & 1 != 0,
            siwe: bits >> 6 & 1 != 0,
            sixe: bits >> 7 & 1 != 0,
            sere: bits >> 8 & 1 != 0,
            sewe: bits >> 9 & 1 != 0,
            sexe: bits >> 10 & 1 != 0,
        }
    }
}

/// One row of the entry table.
#[derive(Debug, Clone, Copy, Default)]
pub struct Entry {
    /// Protected address bits [33:2].
    pub addr: u32,
    /// Protected address bits [65:34]; zero unless `addrh_en`.
    pub addrh: u32,
    pub cfg: EntryCfg,
    pub user_cfg: u32,
}

impl Entry {
    /// The 64-bit word address `{addrh, addr}`.
    pub const fn word_addr(self) -> u64 {
        (self.addrh as u64) << 32 | self.addr as u64
    }
}

/// Per-RRID SRCMD group, format 0. The packed registers skew MD m to raw
/// bit m+1 (bit 0 of `SRCMD_EN` is the lock); the typed bitmaps here index
/// by MD directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct SrcmdDirect {
    pub l: bool,
    /// MD association bitmap.
    pub md: u64,
    /// Secondary read permission per MD (`sps_en` only).
    pub r: u64,
    /// Secondary write permission per MD (`sps_en` only).
    pub w: u64,
    /// Secondary execute permission per MD (`sps_en` only).
    pub x: u64,
}

impl SrcmdDirect {
    pub const fn associated(&self, md: u8) -> bool {
        self.md >> md & 1 != 0
    }
}

/// Per-MD permission word, format 2: bit 2r grants read, bit 2r+1 grants
/// write to RRID r.
#[derive(Debug, Clone, Copy, Default)]
pub struct SrcmdPerm {
    pub perm: u64,
}

/// SRCMD table storage, one variant per `srcmd_fmt`.
#[derive(Debug, Clone)]
pub enum SrcmdTable {
    /// Format 0: one group per RRID.
    Direct(Vec<SrcmdDirect>),
    /// Format 1: no storage, RRID s is bound to MD s.
    Exclusive,
    /// Format 2: one permission word per MD.
    MdIndexed(Vec<SrcmdPerm>),
}

/// Skews a typed MD bitmap into the `{high, low}` raw register pair used
/// by `SRCMD_EN/R/W/X` and back. Low register bit 0 is not part of the
/// bitmap (lock or reserved); MD m sits at raw bit m+1 of the 64-bit pair.
pub(crate) const fn md_bitmap_to_raw(md: u64) -> (u32, u32) {
    let low = ((md & 0x7fff_ffff) as u32) << 1;
    let high = (md >> 31) as u32;
    (low, high)
}

pub(crate) const fn md_bitmap_set_low(md: u64, low: u32) -> u64 {
    md & !0x7fff_ffff | (low >> 1) as u64
}

pub(crate) const fn md_bitmap_set_high(md: u64, high: u32) -> u64 {
    md & 0x7fff_ffff | (high as u64) << 31
}

/// The runtime-mutable register file of one instance.
#[derive(Debug, Clone)]
pub struct RegFile {
    pub version: Version,
    pub implementation: u32,
    pub hwcfg0: Hwcfg0,
    pub hwcfg1: Hwcfg1,
    pub hwcfg2: Hwcfg2,
    pub hwcfg3: Hwcfg3,
    pub entryoffset: u32,
    pub mdstall: Mdstall,
    /// Pending `MDSTALLH` selection, applied at the next `MDSTALL` write.
    pub mdstallh: u32,
    pub rridscp: Rridscp,
    pub mdlck: Mdlck,
    pub mdcfglck: Mdcfglck,
    pub entrylck: Entrylck,
    pub err_cfg: ErrCfg,
    pub err_info: ErrInfo,
    pub err_reqaddr: u32,
    pub err_reqaddrh: u32,
    pub err_reqid: ErrReqId,
    pub err_msiaddr: u32,
    pub err_msiaddrh: u32,
    /// Format 0 MDCFG table, one element per MD; empty otherwise.
    pub mdcfg: Vec<Mdcfg>,
    pub srcmd: SrcmdTable,
}
