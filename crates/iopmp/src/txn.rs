//! Transaction request/response types exchanged with the harness.

/// Permission requested by a transaction. The discriminants are the
/// transaction-type codes reported in `ERR_INFO.ttype`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Permission {
    Read = 1,
    Write = 2,
    InstrFetch = 3,
}

impl Permission {
    pub(crate) const fn to_bits(self) -> u32 {
        self as u32
    }
}

/// One memory transaction presented for checking.
///
/// The transaction consists of `length + 1` beats of `2^size` bytes each,
/// starting at `addr`.
#[derive(Debug, Clone, Copy)]
pub struct TransReq {
    pub rrid: u16,
    pub addr: u64,
    pub length: u32,
    pub size: u32,
    pub perm: Permission,
    /// Atomic memory operation; requires read permission in addition to
    /// write. Never legal together with `Permission::InstrFetch`.
    pub is_amo: bool,
}

impl TransReq {
    /// First byte past the end of the transaction.
    pub(crate) fn end(&self) -> u64 {
        self.addr + ((u64::from(self.length) + 1) << self.size)
    }
}

/// Initiator-visible outcome of a checked transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessStatus {
    Success,
    Error,
}

/// Response returned to the initiator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransRsp {
    pub status: AccessStatus,
    /// RRID of the request, untranslated.
    pub rrid: u16,
    /// Implementation-defined token substituted for the data when an error
    /// response is suppressed; zero otherwise.
    pub user: u8,
    /// The transaction was parked because its requester is stalled.
    pub rrid_stalled: bool,
    /// RRID tagged on the initiator port. Equals the request RRID unless
    /// the checker is enabled and RRID translation is supported.
    pub rrid_transl: u16,
}

/// Response plus the wired-interrupt signal for this transaction.
///
/// `wired_intrpt` pulses on a primary error capture with interrupts
/// enabled, not suppressed, and MSI not taking over delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessResult {
    pub rsp: TransRsp,
    pub wired_intrpt: bool,
}
