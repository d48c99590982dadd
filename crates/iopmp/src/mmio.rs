//! Register programming interface: offset decode, WARL coercion, and lock
//! enforcement for `read_register`/`write_register`.

use tracing::trace;

use crate::config::{MdcfgFmt, SrcmdFmt};
use crate::regs::{
    self, md_bitmap_set_high, md_bitmap_set_low, md_bitmap_to_raw, EntryCfg, SrcmdTable,
};
use crate::Iopmp;

impl Iopmp {
    /// Reads a register. `width` is 4 or 8 bytes; an 8-byte access reads
    /// two adjacent 32-bit registers, little-endian.
    ///
    /// Reads take `&mut self` because `ERR_MFR` is read-sensitive.
    ///
    /// # Panics
    ///
    /// On harness programming errors: a width other than 4/8, a misaligned
    /// offset, or an offset outside the instance's register space.
    pub fn read_register(&mut self, offset: u64, width: u8) -> u64 {
        self.check_access(offset, width);
        let lo = u64::from(self.read32(offset));
        if width == 8 {
            lo | u64::from(self.read32(offset + 4)) << 32
        } else {
            lo
        }
    }

    /// Writes a register, honoring WARL rules and lock bits. `width` is 4
    /// or 8 bytes; an 8-byte access writes two adjacent 32-bit registers,
    /// little-endian.
    ///
    /// # Panics
    ///
    /// Same conditions as [`Iopmp::read_register`].
    pub fn write_register(&mut self, offset: u64, value: u64, width: u8) {
        self.check_access(offset, width);
        self.write32(offset, value as u32);
        if width == 8 {
            self.write32(offset + 4, (value >> 32) as u32);
        }
    }

    fn check_access(&self, offset: u64, width: u8) {
        assert!(
            matches!(width, 4 | 8),
            "register access width must be 4 or 8 bytes, got {width}"
        );
        assert_eq!(
            offset % u64::from(width),
            0,
            "register offset {offset:#x} is not {width}-byte aligned"
        );
        let in_file = offset < regs::REG_FILE_SIZE;
        let entry_base = u64::from(self.regs.entryoffset);
        let entry_span = u64::from(self.regs.hwcfg1.entry_num) * regs::ENTRY_STRIDE;
        let in_entries = offset >= entry_base && offset + u64::from(width) <= entry_base + entry_span;
        assert!(
            in_file || in_entries,
            "offset {offset:#x} is outside the instance's register space"
        );
    }

    fn read32(&mut self, offset: u64) -> u32 {
        let entry_base = u64::from(self.regs.entryoffset);
        if offset >= entry_base
            && offset < entry_base + u64::from(self.regs.hwcfg1.entry_num) * regs::ENTRY_STRIDE
        {
            return self.read_entry_reg(offset - entry_base);
        }
        match offset {
            regs::VERSION_OFFSET => self.regs.version.to_bits(),
            regs::IMPLEMENTATION_OFFSET => self.regs.implementation,
            regs::HWCFG0_OFFSET => self.regs.hwcfg0.to_bits(),
            regs::HWCFG1_OFFSET => self.regs.hwcfg1.to_bits(),
            regs::HWCFG2_OFFSET => self.regs.hwcfg2.to_bits(),
            regs::HWCFG3_OFFSET => self.regs.hwcfg3.to_bits(),
            regs::ENTRYOFFSET_OFFSET => self.regs.entryoffset,
            regs::MDSTALL_OFFSET if self.regs.hwcfg2.stall_en => self.regs.mdstall.to_bits_low(),
            regs::MDSTALLH_OFFSET if self.regs.hwcfg2.stall_en => self.regs.mdstall.to_bits_high(),
            regs::RRIDSCP_OFFSET if self.cfg.imp_rridscp => self.regs.rridscp.to_bits(),
            regs::MDLCK_OFFSET if self.has_mdlck() => self.regs.mdlck.to_bits_low(),
            regs::MDLCKH_OFFSET if self.has_mdlck() => self.regs.mdlck.to_bits_high(),
            regs::MDCFGLCK_OFFSET if self.cfg.mdcfg_fmt == MdcfgFmt::Table => {
                self.regs.mdcfglck.to_bits()
            }
            regs::ENTRYLCK_OFFSET => self.regs.entrylck.to_bits(),
            regs::ERR_CFG_OFFSET => self.regs.err_cfg.to_bits(),
            regs::ERR_INFO_OFFSET => self.regs.err_info.to_bits(),
            regs::ERR_REQADDR_OFFSET => self.regs.err_reqaddr,
            regs::ERR_REQADDRH_OFFSET => self.regs.err_reqaddrh,
            regs::ERR_REQID_OFFSET => self.regs.err_reqid.to_bits(),
            regs::ERR_MFR_OFFSET if self.regs.hwcfg2.mfr_en => self.read_err_mfr(),
            regs::ERR_MSIADDR_OFFSET if self.cfg.imp_msi => self.regs.err_msiaddr,
            regs::ERR_MSIADDRH_OFFSET if self.cfg.imp_msi => self.regs.err_msiaddrh,
            _ => {
                if let Some(index) = self.mdcfg_index(offset) {
                    return u32::from(self.regs.mdcfg[index].t);
                }
                if let Some((group, reg)) = self.srcmd_index(offset) {
                    return self.read_srcmd_reg(group, reg);
                }
                // Reserved and unimplemented offsets read zero.
                0
            }
        }
    }

    fn write32(&mut self, offset: u64, value: u32) {
        let entry_base = u64::from(self.regs.entryoffset);
        if offset >= entry_base
            && offset < entry_base + u64::from(self.regs.hwcfg1.entry_num) * regs::ENTRY_STRIDE
        {
            self.write_entry_reg(offset - entry_base, value);
            return;
        }
        match offset {
            regs::HWCFG0_OFFSET => {
                // enable is the only writable field, and it is sticky.
                if value & 1 != 0 && !self.regs.hwcfg0.enable {
                    self.regs.hwcfg0.enable = true;
                    trace!("checker enabled");
                }
            }
            regs::HWCFG2_OFFSET => {
                if self.regs.hwcfg2.prio_ent_prog {
                    let want = (value & 0xffff) as u16;
                    self.regs.hwcfg2.prio_entry = want.min(self.regs.hwcfg1.entry_num);
                }
                if value >> 16 & 1 != 0 {
                    self.regs.hwcfg2.prio_ent_prog = false;
                }
            }
            regs::HWCFG3_OFFSET => self.write_hwcfg3(value),
            regs::MDSTALL_OFFSET if self.regs.hwcfg2.stall_en => self.write_mdstall(value),
            regs::MDSTALLH_OFFSET if self.regs.hwcfg2.stall_en => self.write_mdstallh(value),
            regs::RRIDSCP_OFFSET if self.regs.hwcfg2.stall_en => self.write_rridscp(value),
            regs::MDLCK_OFFSET if self.has_mdlck() => {
                if !self.regs.mdlck.l {
                    // Lock bits only ever accumulate.
                    self.regs.mdlck.md |= md_bitmap_set_low(0, value & !1);
                    self.regs.mdlck.l = value & 1 != 0;
                }
            }
            regs::MDLCKH_OFFSET if self.has_mdlck() => {
                if !self.regs.mdlck.l {
                    self.regs.mdlck.md |= md_bitmap_set_high(0, value);
                }
            }
            regs::MDCFGLCK_OFFSET if self.cfg.mdcfg_fmt == MdcfgFmt::Table => {
                if !self.regs.mdcfglck.l {
                    let f = ((value >> 1 & 0x7f) as u8).min(self.cfg.md_num);
                    self.regs.mdcfglck.f = self.regs.mdcfglck.f.max(f);
                    self.regs.mdcfglck.l = value & 1 != 0;
                }
            }
            regs::ENTRYLCK_OFFSET => {
                if !self.regs.entrylck.l {
                    let f = ((value >> 1 & 0xffff) as u16).min(self.regs.hwcfg1.entry_num);
                    self.regs.entrylck.f = self.regs.entrylck.f.max(f);
                    self.regs.entrylck.l = value & 1 != 0;
                }
            }
            regs::ERR_CFG_OFFSET => {
                if !self.regs.err_cfg.l {
                    self.regs.err_cfg.ie = value >> 1 & 1 != 0;
                    self.regs.err_cfg.rs = value >> 2 & 1 != 0;
                    if self.cfg.imp_msi {
                        self.regs.err_cfg.msi_en = value >> 3 & 1 != 0;
                    }
                    if self.regs.hwcfg2.stall_en {
                        self.regs.err_cfg.stall_violation_en = value >> 4 & 1 != 0;
                    }
                    self.regs.err_cfg.msidata = (value >> 8 & 0x7ff) as u16;
                    self.regs.err_cfg.l = value & 1 != 0;
                }
            }
            regs::ERR_INFO_OFFSET => {
                // v and msi_werr are write-1-to-clear; everything else is
                // read-only.
                if value & 1 != 0 {
                    self.regs.err_info.v = false;
                }
                if value >> 3 & 1 != 0 {
                    self.regs.err_info.msi_werr = false;
                }
            }
            regs::ERR_MFR_OFFSET if self.regs.hwcfg2.mfr_en => {
                if !self.sv_windows.is_empty() {
                    self.sv_cursor = ((value >> 16 & 0xfff) as u16) % self.sv_windows.len() as u16;
                }
            }
            regs::ERR_MSIADDR_OFFSET if self.cfg.imp_msi => {
                if !self.regs.err_cfg.l {
                    self.regs.err_msiaddr = value;
                }
            }
            regs::ERR_MSIADDRH_OFFSET if self.cfg.imp_msi => {
                if !self.regs.err_cfg.l {
                    self.regs.err_msiaddrh = value;
                }
            }
            _ => {
                if let Some(index) = self.mdcfg_index(offset) {
                    // MDCFG(i) is locked for i below MDCFGLCK.f.
                    if index >= usize::from(self.regs.mdcfglck.f) {
                        self.regs.mdcfg[index].t =
                            ((value & 0xffff) as u16).min(self.regs.hwcfg1.entry_num);
                    }
                    return;
                }
                if let Some((group, reg)) = self.srcmd_index(offset) {
                    self.write_srcmd_reg(group, reg, value);
                }
                // Writes to reserved or read-only offsets are dropped.
            }
        }
    }

    fn has_mdlck(&self) -> bool {
        self.cfg.imp_mdlck && self.cfg.srcmd_fmt != SrcmdFmt::Exclusive
    }

    fn write_hwcfg3(&mut self, value: u32) {
        let h = &mut self.regs.hwcfg3;
        // md_entry_num stays programmable only for format 2 and only until
        // the checker is enabled; writes coerce to the largest stride the
        // entry table can hold.
        if self.cfg.mdcfg_fmt == MdcfgFmt::ProgStride && !self.regs.hwcfg0.enable {
            let want = (value >> 4 & 0xff) as u16;
            let ceiling = if self.cfg.md_num == 0 {
                0xff
            } else {
                (self.regs.hwcfg1.entry_num / u16::from(self.cfg.md_num)).saturating_sub(1)
            };
            let got = want.min(ceiling) as u8;
            if got != want as u8 {
                trace!(want, got, "md_entry_num coerced to fit the entry table");
            }
            h.md_entry_num = got;
        }
        if h.rrid_transl_en && h.rrid_transl_prog {
            h.rrid_transl = (value >> 16) as u16;
        }
        if value >> 15 & 1 != 0 {
            h.rrid_transl_prog = false;
        }
    }

    /// MDCFG table index for `offset`, when it falls inside the table.
    fn mdcfg_index(&self, offset: u64) -> Option<usize> {
        if self.cfg.mdcfg_fmt != MdcfgFmt::Table {
            return None;
        }
        let span = self.regs.mdcfg.len() as u64 * 4;
        if (regs::MDCFG_TABLE_OFFSET..regs::MDCFG_TABLE_OFFSET + span).contains(&offset) {
            Some(((offset - regs::MDCFG_TABLE_OFFSET) / 4) as usize)
        } else {
            None
        }
    }

    /// `(group, register)` coordinates for an offset inside the SRCMD
    /// table; `group` is an RRID for format 0 and an MD for format 2.
    fn srcmd_index(&self, offset: u64) -> Option<(usize, u64)> {
        let groups = match &self.regs.srcmd {
            SrcmdTable::Direct(table) => table.len() as u64,
            SrcmdTable::Exclusive => 0,
            SrcmdTable::MdIndexed(table) => table.len() as u64,
        };
        let span = groups * regs::SRCMD_STRIDE;
        if (regs::SRCMD_TABLE_OFFSET..regs::SRCMD_TABLE_OFFSET + span).contains(&offset) {
            let rel = offset - regs::SRCMD_TABLE_OFFSET;
            Some(((rel / regs::SRCMD_STRIDE) as usize, rel % regs::SRCMD_STRIDE / 4))
        } else {
            None
        }
    }

    fn read_srcmd_reg(&self, group: usize, reg: u64) -> u32 {
        match &self.regs.srcmd {
            SrcmdTable::Direct(table) => {
                let g = &table[group];
                let sps = self.regs.hwcfg2.sps_en;
                match reg {
                    0 => md_bitmap_to_raw(g.md).0 | g.l as u32,
                    1 => md_bitmap_to_raw(g.md).1,
                    2 if sps => md_bitmap_to_raw(g.r).0,
                    3 if sps => md_bitmap_to_raw(g.r).1,
                    4 if sps => md_bitmap_to_raw(g.w).0,
                    5 if sps => md_bitmap_to_raw(g.w).1,
                    6 if sps => md_bitmap_to_raw(g.x).0,
                    7 if sps => md_bitmap_to_raw(g.x).1,
                    _ => 0,
                }
            }
            SrcmdTable::Exclusive => 0,
            SrcmdTable::MdIndexed(table) => match reg {
                0 => table[group].perm as u32,
                1 => (table[group].perm >> 32) as u32,
                _ => 0,
            },
        }
    }

    fn write_srcmd_reg(&mut self, group: usize, reg: u64, value: u32) {
        /// MDs 0..=30 live in the low register of a bitmap pair.
        const LOW_MDS: u64 = 0x7fff_ffff;

        /// Replaces one register's half of an MD bitmap, keeping bits the
        /// MDLCK bitmap has frozen.
        fn merge(old: u64, new: u64, half: u64, locked: u64) -> u64 {
            old & (!half | locked) | new & half & !locked
        }

        // MDLCK freezes the per-MD columns of the whole table.
        let locked = if self.has_mdlck() { self.regs.mdlck.md } else { 0 };
        let sps = self.regs.hwcfg2.sps_en;
        let low = md_bitmap_set_low(0, value);
        let high = md_bitmap_set_high(0, value);
        match &mut self.regs.srcmd {
            SrcmdTable::Direct(table) => {
                let g = &mut table[group];
                if g.l {
                    return;
                }
                match reg {
                    0 => {
                        g.md = merge(g.md, low, LOW_MDS, locked);
                        g.l = value & 1 != 0;
                    }
                    1 => g.md = merge(g.md, high, !LOW_MDS, locked),
                    2 if sps => g.r = merge(g.r, low, LOW_MDS, locked),
                    3 if sps => g.r = merge(g.r, high, !LOW_MDS, locked),
                    4 if sps => g.w = merge(g.w, low, LOW_MDS, locked),
                    5 if sps => g.w = merge(g.w, high, !LOW_MDS, locked),
                    6 if sps => g.x = merge(g.x, low, LOW_MDS, locked),
                    7 if sps => g.x = merge(g.x, high, !LOW_MDS, locked),
                    _ => {}
                }
            }
            SrcmdTable::Exclusive => {}
            SrcmdTable::MdIndexed(table) => {
                if locked >> group & 1 != 0 {
                    return;
                }
                match reg {
                    0 => {
                        table[group].perm =
                            table[group].perm & !0xffff_ffff | u64::from(value);
                    }
                    1 => {
                        table[group].perm =
                            table[group].perm & 0xffff_ffff | u64::from(value) << 32;
                    }
                    _ => {}
                }
            }
        }
    }

    fn read_entry_reg(&self, rel: u64) -> u32 {
        let entry = &self.entries[(rel / regs::ENTRY_STRIDE) as usize];
        match rel % regs::ENTRY_STRIDE / 4 {
            0 => entry.addr,
            1 => entry.addrh,
            2 => entry.cfg.to_bits(),
            _ => entry.user_cfg,
        }
    }

    fn write_entry_reg(&mut self, rel: u64, value: u32) {
        let index = (rel / regs::ENTRY_STRIDE) as usize;
        // ENTRYLCK freezes entries below f.
        if index < usize::from(self.regs.entrylck.f) {
            return;
        }
        let chk_x = self.regs.hwcfg2.chk_x;
        let peis = self.regs.hwcfg2.peis;
        let pees = self.regs.hwcfg2.pees;
        let tor_en = self.regs.hwcfg0.tor_en;
        let entry = &mut self.entries[index];
        match rel % regs::ENTRY_STRIDE / 4 {
            0 => entry.addr = value,
            1 => {
                if self.regs.hwcfg0.addrh_en {
                    entry.addrh = value;
                }
            }
            2 => {
                let mut cfg = EntryCfg::from_bits(value);
                if !tor_en && cfg.a == crate::regs::AddressMode::Tor {
                    trace!(index, "TOR unsupported, entry coerced to OFF");
                    cfg.a = crate::regs::AddressMode::Off;
                }
                if !chk_x {
                    // The x field is unimplemented and reads as r.
                    cfg.x = cfg.r;
                    cfg.sixe = false;
                    cfg.sexe = false;
                }
                if !peis {
                    cfg.sire = false;
                    cfg.siwe = false;
                    cfg.sixe = false;
                }
                if !pees {
                    cfg.sere = false;
                    cfg.sewe = false;
                    cfg.sexe = false;
                }
                entry.cfg = cfg;
            }
            _ => entry.user_cfg = value,
        }
    }
}
