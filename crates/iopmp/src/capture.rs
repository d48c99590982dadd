//! Error capture: the primary error-capture record and the multi-faults
//! record (subsequent-violation windows).

use tracing::trace;

use crate::bus::MemoryBus;
use crate::regs::err_mfr_bits;
use crate::txn::Permission;
use crate::Iopmp;

/// Violation type reported in `ERR_INFO.etype`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorType {
    None = 0x00,
    IllegalRead = 0x01,
    IllegalWrite = 0x02,
    IllegalInstrFetch = 0x03,
    PartialHitOnPriority = 0x04,
    NotHitAnyRule = 0x05,
    UnknownRrid = 0x06,
    StalledTransaction = 0x07,
}

impl ErrorType {
    pub(crate) const fn to_bits(self) -> u8 {
        self as u8
    }

    /// The illegal-access error type for a denied permission.
    pub(crate) const fn from_denied_perm(perm: Permission) -> Self {
        match perm {
            Permission::Read => ErrorType::IllegalRead,
            Permission::Write => ErrorType::IllegalWrite,
            Permission::InstrFetch => ErrorType::IllegalInstrFetch,
        }
    }
}

/// Per-fault suppression decision, sourced from the matching entry or from
/// `ERR_CFG.rs` depending on the fault path.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Suppress {
    /// Suppress the error response (answer success plus the user token).
    pub error: bool,
    /// Suppress the interrupt.
    pub intrpt: bool,
}

impl Iopmp {
    /// Latches a faulting transaction into the error-capture record and
    /// drives interrupt delivery. Returns the wired-interrupt signal.
    ///
    /// A primary capture happens only while `ERR_INFO.v` is clear and the
    /// fault is observable (not both suppressed); while `v` is set, the
    /// multi-faults record accumulates the violating RRID instead.
    pub(crate) fn error_capture(
        &mut self,
        ttype: Permission,
        etype: ErrorType,
        rrid: u16,
        eid: u16,
        err_addr: u64,
        sup: Suppress,
        bus: &mut dyn MemoryBus,
    ) -> bool {
        let was_valid = self.regs.err_info.v;
        let observable = !sup.error || !sup.intrpt;
        let mut wired = false;

        if observable && !was_valid {
            self.regs.err_info.v = true;
            self.regs.err_info.ttype = ttype.to_bits() as u8;
            self.regs.err_info.etype = etype.to_bits();
            // The captured address registers hold bits [33:2] and [65:34].
            self.regs.err_reqaddr = (err_addr >> 2) as u32;
            self.regs.err_reqaddrh = (err_addr >> 34) as u32;
            self.regs.err_reqid.rrid = rrid;
            if self.cfg.imp_err_reqid_eid {
                self.regs.err_reqid.eid = eid;
            }
            trace!(?etype, rrid, eid, err_addr, "error capture");
            wired = self.deliver_interrupt(sup, bus);
        }

        if self.regs.hwcfg2.mfr_en && observable && was_valid {
            let window = usize::from(rrid / 16);
            if window < self.sv_windows.len() {
                self.sv_windows[window] |= 1 << (rrid % 16);
                self.regs.err_info.svc = true;
                trace!(rrid, "subsequent violation recorded");
            }
        }

        wired
    }

    /// Read side of `ERR_MFR`: searches the subsequent-violation windows
    /// from the cursor forward, clearing the window it returns.
    pub(crate) fn read_err_mfr(&mut self) -> u32 {
        if self.sv_windows.is_empty() {
            return err_mfr_bits(0, self.sv_cursor, false);
        }
        let n = self.sv_windows.len() as u16;
        for step in 0..n {
            let idx = (self.sv_cursor + step) % n;
            let svw = self.sv_windows[usize::from(idx)];
            if svw != 0 {
                self.sv_windows[usize::from(idx)] = 0;
                self.sv_cursor = idx;
                if self.sv_windows.iter().all(|w| *w == 0) {
                    self.regs.err_info.svc = false;
                }
                return err_mfr_bits(svw, idx, true);
            }
        }
        // Rounded back to the same value with nothing found.
        err_mfr_bits(0, self.sv_cursor, false)
    }
}
