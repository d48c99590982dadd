//! Per-transaction validation: the walk across the SRCMD/MDCFG tables and
//! the entry array, and the fault action on denial.

use tracing::debug;

use crate::bus::MemoryBus;
use crate::capture::{ErrorType, Suppress};
use crate::config::{MdcfgFmt, SrcmdFmt};
use crate::regs::SrcmdTable;
use crate::rule::{MatchStatus, RuleInput};
use crate::txn::{AccessResult, AccessStatus, Permission, TransReq, TransRsp};
use crate::Iopmp;

/// How a walk (or a preflight check) concluded. Faults carry the
/// transaction type to report: the fetch-to-read demotion only applies
/// from the demotion point onward, so preflight faults keep the original
/// permission.
enum Outcome {
    Pass,
    Parked,
    Fault {
        etype: ErrorType,
        eid: u16,
        ttype: Permission,
        sup: Suppress,
    },
}

impl Iopmp {
    /// Checks one transaction and produces the response, updating the
    /// error-capture and interrupt state on a fault.
    ///
    /// # Panics
    ///
    /// On caller contract violations: an instruction fetch flagged as AMO,
    /// or a beat size of 64 bits or more.
    pub fn validate_access(&mut self, req: &TransReq, bus: &mut dyn MemoryBus) -> AccessResult {
        assert!(
            !(req.perm == Permission::InstrFetch && req.is_amo),
            "an instruction fetch cannot be an atomic memory operation"
        );
        assert!(req.size < 64, "beat size 2^{} overflows the address space", req.size);

        let mut rsp = TransRsp {
            status: AccessStatus::Error,
            rrid: req.rrid,
            user: 0,
            rrid_stalled: false,
            rrid_transl: req.rrid,
        };

        // The checker disabled means every transaction passes untouched.
        if !self.regs.hwcfg0.enable {
            rsp.status = AccessStatus::Success;
            return AccessResult {
                rsp,
                wired_intrpt: false,
            };
        }

        // Translation is tagged once the checker is enabled, before fault
        // detection, so faulting responses carry it too.
        if self.regs.hwcfg3.rrid_transl_en {
            rsp.rrid_transl = self.regs.hwcfg3.rrid_transl;
        }

        let rrid = if self.cfg.src_enforcement { 0 } else { req.rrid };

        let outcome = match self.preflight(req, rrid) {
            Some(early) => early,
            None => self.walk(req, rrid),
        };

        match outcome {
            Outcome::Pass => {
                rsp.status = AccessStatus::Success;
                AccessResult {
                    rsp,
                    wired_intrpt: false,
                }
            }
            Outcome::Parked => {
                rsp.rrid_stalled = true;
                AccessResult {
                    rsp,
                    wired_intrpt: false,
                }
            }
            Outcome::Fault {
                etype,
                eid,
                ttype,
                sup,
            } => {
                debug!(?etype, eid, rrid, addr = req.addr, "transaction fault");
                let wired_intrpt = if self.cfg.imp_error_capture {
                    self.error_capture(ttype, etype, rrid, eid, req.addr, sup, bus)
                } else {
                    false
                };
                if sup.error {
                    // Suppressed: answer success with the user token on
                    // the initiator port.
                    rsp.status = AccessStatus::Success;
                    rsp.user = self.cfg.user_token;
                }
                AccessResult { rsp, wired_intrpt }
            }
        }
    }

    /// The permission actually checked (and reported in `ttype`):
    /// instruction fetches demote to reads when `chk_x` is off.
    fn effective_perm(&self, perm: Permission) -> Permission {
        if perm == Permission::InstrFetch && !self.regs.hwcfg2.chk_x {
            Permission::Read
        } else {
            perm
        }
    }

    /// Short-circuiting checks ahead of the table walk. `None` means the
    /// transaction proceeds to the walk.
    fn preflight(&mut self, req: &TransReq, rrid: u16) -> Option<Outcome> {
        let global = Suppress {
            error: self.regs.err_cfg.rs,
            intrpt: false,
        };
        let fault = |etype| {
            Some(Outcome::Fault {
                etype,
                eid: 0,
                ttype: req.perm,
                sup: global,
            })
        };

        if rrid >= self.regs.hwcfg1.rrid_num {
            return fault(ErrorType::UnknownRrid);
        }

        if self.rrid_stall[usize::from(rrid)] {
            if self.stall_cntr != self.cfg.stall_buf_depth {
                self.stall_cntr += 1;
                return Some(Outcome::Parked);
            }
            if self.regs.err_cfg.stall_violation_en {
                return fault(ErrorType::StalledTransaction);
            }
            // Buffer full and stall violations not raised: the
            // transaction goes through the normal checks.
        }

        if req.perm == Permission::Write && self.regs.hwcfg3.no_w {
            return fault(ErrorType::NotHitAnyRule);
        }

        if req.perm == Permission::InstrFetch
            && self.regs.hwcfg2.chk_x
            && self.regs.hwcfg3.no_x
        {
            return fault(ErrorType::NotHitAnyRule);
        }

        None
    }

    /// Entry index range `[lwr, upr)` owned by one MD.
    fn md_entry_range(&self, md: u8) -> (u16, u16) {
        match self.cfg.mdcfg_fmt {
            MdcfgFmt::Table => {
                let lwr = if md == 0 {
                    0
                } else {
                    self.regs.mdcfg[usize::from(md) - 1].t
                };
                (lwr, self.regs.mdcfg[usize::from(md)].t)
            }
            MdcfgFmt::FixedStride | MdcfgFmt::ProgStride => {
                let per_md = u16::from(self.regs.hwcfg3.md_entry_num) + 1;
                (u16::from(md) * per_md, (u16::from(md) + 1) * per_md)
            }
        }
    }

    /// Walks the memory domains and their entries in ascending order.
    fn walk(&self, req: &TransReq, rrid: u16) -> Outcome {
        let perm = self.effective_perm(req.perm);
        let trans_start = req.addr;
        let trans_end = req.end();

        let (md_lo, md_hi) = match self.cfg.srcmd_fmt {
            SrcmdFmt::Direct | SrcmdFmt::MdIndexed => (0u16, u16::from(self.regs.hwcfg0.md_num)),
            SrcmdFmt::Exclusive => (rrid, rrid + 1),
        };

        // Accumulated state for the non-priority region: suppression bits
        // OR together, the first illegal access fixes the reported error.
        let mut non_prio_sup = Suppress::default();
        let mut non_prio_etype = ErrorType::NotHitAnyRule;
        let mut non_prio_eid = 0u16;
        let mut first_illegal = true;

        for md in md_lo..md_hi {
            let md = md as u8;
            if let SrcmdTable::Direct(table) = &self.regs.srcmd {
                if !table[usize::from(rrid)].associated(md) {
                    continue;
                }
            }

            let (lwr, upr) = self.md_entry_range(md);
            let upr = upr.min(self.regs.hwcfg1.entry_num);
            for i in lwr..upr {
                let entry = self.entries[usize::from(i)];
                let prev_word_addr = if i == 0 {
                    0
                } else {
                    self.entries[usize::from(i) - 1].word_addr()
                };
                let verdict = self.analyze_rule(&RuleInput {
                    prev_word_addr,
                    word_addr: entry.word_addr(),
                    cfg: entry.cfg,
                    md,
                    rrid,
                    trans_start,
                    trans_end,
                    perm,
                    is_amo: req.is_amo,
                });

                let is_priority =
                    !(self.regs.hwcfg2.non_prio_en && i >= self.regs.hwcfg2.prio_entry);

                match verdict.status {
                    MatchStatus::NotMatch => {}
                    MatchStatus::Match if verdict.grant => return Outcome::Pass,
                    MatchStatus::Match => {
                        let sup = Suppress {
                            error: verdict.see,
                            intrpt: verdict.sie,
                        };
                        if is_priority {
                            return Outcome::Fault {
                                etype: ErrorType::from_denied_perm(perm),
                                eid: i,
                                ttype: perm,
                                sup,
                            };
                        }
                        non_prio_sup.error |= sup.error;
                        non_prio_sup.intrpt |= sup.intrpt;
                        if first_illegal {
                            non_prio_etype = ErrorType::from_denied_perm(perm);
                            non_prio_eid = i;
                            first_illegal = false;
                        }
                    }
                    MatchStatus::Partial => {
                        if is_priority {
                            // A priority entry must cover every byte of
                            // the transaction.
                            return Outcome::Fault {
                                etype: ErrorType::PartialHitOnPriority,
                                eid: i,
                                ttype: perm,
                                sup: Suppress {
                                    error: self.regs.err_cfg.rs,
                                    intrpt: false,
                                },
                            };
                        }
                    }
                }
            }
        }

        // No entry granted the transaction.
        if self.regs.hwcfg2.non_prio_en && !first_illegal {
            // At least one non-priority entry fully matched but denied.
            Outcome::Fault {
                etype: non_prio_etype,
                eid: non_prio_eid,
                ttype: perm,
                sup: non_prio_sup,
            }
        } else {
            Outcome::Fault {
                etype: ErrorType::NotHitAnyRule,
                eid: 0,
                ttype: perm,
                sup: Suppress {
                    error: self.regs.err_cfg.rs,
                    intrpt: false,
                },
            }
        }
    }
}
