//! Interrupt delivery: arbitration between the wired signal and MSI.

use tracing::trace;

use crate::bus::MemoryBus;
use crate::capture::Suppress;
use crate::Iopmp;

impl Iopmp {
    /// Drives interrupt delivery for a primary error capture. Returns the
    /// wired-interrupt signal; MSI delivery happens through the memory
    /// seam as a side effect.
    pub(crate) fn deliver_interrupt(&mut self, sup: Suppress, bus: &mut dyn MemoryBus) -> bool {
        let enabled = self.regs.err_cfg.ie && !sup.intrpt;

        if !self.cfg.imp_msi {
            return enabled;
        }

        // With MSI implemented, the wired signal only fires while MSI is
        // disabled.
        let wired = enabled && !self.regs.err_cfg.msi_en;

        let msi = enabled && self.regs.err_cfg.msi_en && !self.regs.err_info.msi_werr;
        if msi {
            let msi_addr = if self.regs.hwcfg0.addrh_en {
                (self.regs.err_msiaddrh as u64) << 32 | self.regs.err_msiaddr as u64
            } else {
                // ERR_MSIADDR holds address bits [33:2].
                (self.regs.err_msiaddr as u64) << 2
            };
            let data = u32::from(self.regs.err_cfg.msidata).to_le_bytes();
            let len = usize::from(self.cfg.msi_data_bytes);
            if bus.write_physical(msi_addr, &data[..len]).is_err() {
                // A failed MSI write inhibits further attempts until
                // software clears msi_werr.
                self.regs.err_info.msi_werr = true;
                trace!(msi_addr, "MSI write failed with a bus error");
            } else {
                trace!(msi_addr, msidata = self.regs.err_cfg.msidata, "MSI delivered");
            }
        }

        wired
    }
}
