use thiserror::Error;

/// The downstream write failed; for MSI delivery this latches
/// `ERR_INFO.msi_werr` instead of propagating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("bus error")]
pub struct BusError;

/// Backing memory used for IOPMP-originated writes (MSI delivery).
///
/// The model never reads through this seam and performs at most one write
/// per validated transaction, so implementations can be as small as a
/// recording stub.
pub trait MemoryBus {
    fn write_physical(&mut self, addr: u64, data: &[u8]) -> Result<(), BusError>;
}

/// A bus that accepts and discards every write.
///
/// Harnesses for instances without MSI (or tests that don't care about the
/// interrupt path) can pass this.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenBus;

impl MemoryBus for OpenBus {
    fn write_physical(&mut self, _addr: u64, _data: &[u8]) -> Result<(), BusError> {
        Ok(())
    }
}
