use thiserror::Error;

/// Rejected reset-time configuration.
///
/// These are impossible instance shapes, not runtime faults: a device with
/// one of these configurations cannot exist, so construction refuses it
/// instead of coercing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("md_num {0} exceeds the architectural maximum of 63 memory domains")]
    TooManyMemoryDomains(u8),
    #[error("entry_num must be larger than zero")]
    NoEntries,
    #[error("rrid_num must be larger than zero")]
    NoRequesters,
    #[error("prio_entry {prio_entry} exceeds entry_num {entry_num}")]
    TooManyPriorityEntries { prio_entry: u16, entry_num: u16 },
    #[error("mdcfg format 0 requires md_entry_num = 0, got {0}")]
    StrideWithMdcfgTable(u8),
    #[error("{md_num} domains of {per_md} entries each do not fit in an entry table of {entry_num}")]
    EntryTableTooSmall {
        md_num: u8,
        per_md: u16,
        entry_num: u16,
    },
    #[error("srcmd format 1 binds RRID s to MD s, so rrid_num {rrid_num} must not exceed md_num {md_num}")]
    ExclusiveFormatRridExceedsMd { rrid_num: u16, md_num: u8 },
    #[error("srcmd format 2 holds one read/write pair per RRID in a 64-bit word, so rrid_num {0} must not exceed 32")]
    MdIndexedFormatTooManyRrids(u16),
    #[error("granularity {0} out of range (TOR can ignore at most 32 word-address bits)")]
    GranularityTooLarge(u8),
    #[error("msi_data_bytes must be 1 or 4, got {0}")]
    BadMsiDataBytes(u8),
    #[error("the multi-faults record extension requires the error capture record")]
    MfrWithoutErrorCapture,
    #[error("RRIDSCP is part of the stall extension and requires stall_en")]
    RridscpWithoutStall,
}
