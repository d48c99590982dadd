//! Stall controller: the MDSTALL/MDSTALLH/RRIDSCP programming protocol
//! software uses to quiesce requesters while it reprograms rules.

use tracing::trace;

use crate::config::SrcmdFmt;
use crate::regs::SrcmdTable;
use crate::Iopmp;

impl Iopmp {
    /// `MDSTALL` write: applies the (possibly `MDSTALLH`-extended) MD
    /// selection. A zero write with no pending high selection resumes
    /// every requester and drains the stall buffer.
    pub(crate) fn write_mdstall(&mut self, value: u32) {
        if value == 0 && self.regs.mdstallh == 0 {
            self.regs.mdstall.exempt = false;
            self.regs.mdstall.md = 0;
            self.rrid_stall.fill(false);
            self.stall_cntr = 0;
            trace!("all requesters resumed");
            return;
        }

        self.regs.mdstall.exempt = value & 1 != 0;
        self.regs.mdstall.md =
            u64::from(value >> 1) | u64::from(self.regs.mdstallh) << 31;
        self.rrid_stall_update();
    }

    /// `MDSTALLH` write: stores the upper MD selection, which takes effect
    /// at the next `MDSTALL` write.
    pub(crate) fn write_mdstallh(&mut self, value: u32) {
        self.regs.mdstallh = value;
    }

    /// `RRIDSCP` write: per-requester stall (op 1), resume (op 2), or
    /// query (op 0).
    pub(crate) fn write_rridscp(&mut self, value: u32) {
        if !self.cfg.imp_rridscp {
            return;
        }
        let rrid = (value & 0xffff) as u16;
        let op = value >> 30 & 0x3;
        self.regs.rridscp.rrid = rrid;
        if rrid >= self.regs.hwcfg1.rrid_num {
            self.regs.rridscp.stat = 3;
            return;
        }
        match op {
            1 => self.rrid_stall[usize::from(rrid)] = true,
            2 => self.rrid_stall[usize::from(rrid)] = false,
            _ => {}
        }
        self.regs.rridscp.stat = if self.rrid_stall[usize::from(rrid)] {
            1
        } else {
            2
        };
    }

    /// Recomputes every requester's stall flag from the current MD
    /// selection. `exempt` inverts the association.
    fn rrid_stall_update(&mut self) {
        let sel = self.regs.mdstall.md;
        let exempt = self.regs.mdstall.exempt;
        for rrid in 0..usize::from(self.regs.hwcfg1.rrid_num) {
            let assoc = match (self.cfg.srcmd_fmt, &self.regs.srcmd) {
                (SrcmdFmt::Direct, SrcmdTable::Direct(table)) => table[rrid].md & sel != 0,
                (SrcmdFmt::Exclusive, SrcmdTable::Exclusive) => sel >> rrid & 1 != 0,
                (SrcmdFmt::MdIndexed, SrcmdTable::MdIndexed(table)) => {
                    // No association bitmap in this format: a requester
                    // belongs to an MD when it holds any permission there.
                    table.iter().enumerate().any(|(md, group)| {
                        sel >> md & 1 != 0 && group.perm >> (rrid * 2) & 0x3 != 0
                    })
                }
                _ => unreachable!("srcmd table storage does not match the configured format"),
            };
            self.rrid_stall[rrid] = assoc != exempt;
        }
        trace!(
            stalled = self.rrid_stall.iter().filter(|s| **s).count(),
            exempt,
            "stall selection applied"
        );
    }
}
