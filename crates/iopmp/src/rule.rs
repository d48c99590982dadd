//! Rule analyzer: address-range derivation, address matching, and
//! permission composition for a single entry against one transaction.

use crate::config::SrcmdFmt;
use crate::regs::{AddressMode, EntryCfg, SrcmdTable};
use crate::txn::Permission;
use crate::Iopmp;

/// How an entry's range relates to the transaction's byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    /// The entry covers no byte of the transaction.
    NotMatch,
    /// The entry covers some but not all bytes.
    Partial,
    /// The entry covers every byte.
    Match,
}

/// Analyzer inputs that vary per entry; the transaction-side fields are
/// fixed for the duration of one walk.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RuleInput {
    pub prev_word_addr: u64,
    pub word_addr: u64,
    pub cfg: EntryCfg,
    pub md: u8,
    pub rrid: u16,
    pub trans_start: u64,
    pub trans_end: u64,
    pub perm: Permission,
    pub is_amo: bool,
}

/// Analyzer output. `grant`, `sie`, and `see` are meaningful only for
/// `MatchStatus::Match`; the suppression bits are set only when the
/// permission is denied.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RuleVerdict {
    pub status: MatchStatus,
    pub grant: bool,
    pub sie: bool,
    pub see: bool,
}

impl RuleVerdict {
    const fn not_match() -> Self {
        RuleVerdict {
            status: MatchStatus::NotMatch,
            grant: false,
            sie: false,
            see: false,
        }
    }
}

/// Word-address range of an entry, `None` when the entry is OFF.
///
/// `granularity` is the number of low-order word-address bits TOR ignores.
pub(crate) fn entry_word_range(
    cfg: EntryCfg,
    prev_word_addr: u64,
    word_addr: u64,
    granularity: u8,
) -> Option<(u64, u64)> {
    match cfg.a {
        AddressMode::Off => None,
        AddressMode::Na4 => Some((word_addr, word_addr + 1)),
        AddressMode::Tor => {
            let mut lo = prev_word_addr;
            let mut hi = word_addr;
            if granularity >= 1 {
                let mask = (1u64 << granularity) - 1;
                lo &= !mask;
                hi &= !mask;
            }
            Some((lo, hi))
        }
        AddressMode::Napot => {
            let mask = word_addr ^ (word_addr + 1);
            let lo = word_addr & !mask;
            Some((lo, lo + mask + 1))
        }
    }
}

/// Classifies the transaction byte range against an entry byte range.
pub(crate) fn match_range(trans_start: u64, trans_end: u64, lo: u64, hi: u64) -> MatchStatus {
    if hi <= lo {
        return MatchStatus::NotMatch;
    }
    if trans_end <= lo || trans_start >= hi {
        return MatchStatus::NotMatch;
    }
    if trans_start >= lo && trans_end <= hi {
        return MatchStatus::Match;
    }
    MatchStatus::Partial
}

/// Effective read/write/execute grants of a fully matching entry for one
/// (RRID, MD) pair.
struct Grants {
    read: bool,
    write: bool,
    execute: bool,
}

impl Iopmp {
    fn compose_grants(&self, cfg: EntryCfg, rrid: u16, md: u8, is_amo: bool) -> Grants {
        match (self.cfg.srcmd_fmt, &self.regs.srcmd) {
            (SrcmdFmt::Direct, SrcmdTable::Direct(table)) => {
                let group = &table[rrid as usize];
                if self.regs.hwcfg2.sps_en {
                    let r = cfg.r && group.r >> md & 1 != 0;
                    let w = cfg.w && group.w >> md & 1 != 0;
                    let x = cfg.x && group.x >> md & 1 != 0;
                    Grants {
                        read: r,
                        write: w && (r || !is_amo),
                        execute: x,
                    }
                } else {
                    Grants {
                        read: cfg.r,
                        write: cfg.w && (cfg.r || !is_amo),
                        execute: cfg.x,
                    }
                }
            }
            (SrcmdFmt::Exclusive, SrcmdTable::Exclusive) => Grants {
                read: cfg.r,
                write: cfg.w && (cfg.r || !is_amo),
                execute: cfg.x,
            },
            (SrcmdFmt::MdIndexed, SrcmdTable::MdIndexed(table)) => {
                let pair = table[md as usize].perm >> (u32::from(rrid) * 2);
                let pair_r = pair & 1 != 0;
                let pair_w = pair >> 1 & 1 != 0;
                let r = cfg.r || pair_r;
                Grants {
                    read: r,
                    write: (cfg.w || pair_w) && (r || !is_amo),
                    // Execute piggy-backs on the per-pair read grant.
                    execute: cfg.x || pair_r,
                }
            }
            _ => unreachable!("srcmd table storage does not match the configured format"),
        }
    }

    /// Permission check of a fully matching entry. Returns the grant and,
    /// on denial, the per-entry suppression bits gated by `peis`/`pees`.
    fn check_perms(&self, input: &RuleInput) -> (bool, bool, bool) {
        let cfg = input.cfg;
        let grants = self.compose_grants(cfg, input.rrid, input.md, input.is_amo);
        let suppress = |granted: bool, si: bool, se: bool| {
            if granted {
                (granted, false, false)
            } else {
                (
                    granted,
                    self.regs.hwcfg2.peis && si,
                    self.regs.hwcfg2.pees && se,
                )
            }
        };
        match input.perm {
            Permission::Read => suppress(grants.read, cfg.sire, cfg.sere),
            Permission::Write => suppress(grants.write, cfg.siwe, cfg.sewe),
            Permission::InstrFetch => {
                if self.cfg.xinr {
                    // Instruction fetch is never granted by rule.
                    return (false, false, false);
                }
                suppress(grants.execute, cfg.sixe, cfg.sexe)
            }
        }
    }

    /// Analyzes one entry: range derivation, matching, and (on a full
    /// match) permission composition.
    pub(crate) fn analyze_rule(&self, input: &RuleInput) -> RuleVerdict {
        let Some((lo, hi)) =
            entry_word_range(input.cfg, input.prev_word_addr, input.word_addr, self.cfg.granularity)
        else {
            return RuleVerdict::not_match();
        };

        // Word addresses encode bits [65:2]; scale by 4 into bytes.
        let status = match_range(input.trans_start, input.trans_end, lo * 4, hi * 4);
        if status != MatchStatus::Match {
            return RuleVerdict {
                status,
                grant: false,
                sie: false,
                see: false,
            };
        }

        let (grant, sie, see) = self.check_perms(input);
        RuleVerdict {
            status,
            grant,
            sie,
            see,
        }
    }
}
