//! Errors reported by the allocator.

use thiserror::Error;

/// AllocError
///
/// The reasons an allocation, or reallocation, may fail.
#[derive(Error, Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum AllocError {
    /// The platform could not commit a block large enough for `size` bytes of payload.
    ///
    /// No state was altered.
    #[error("out of memory: could not commit a block for {size} bytes")]
    OutOfMemory {
        /// Size of the payload requested.
        size: usize,
    },

    /// The platform could not pin the freshly committed block.
    ///
    /// The block was released before returning.
    #[error("could not lock a block of {size} bytes: OS error {code}")]
    LockFailure {
        /// Size of the range which could not be pinned.
        size: usize,
        /// Error code reported by the platform.
        code: i32,
    },

    /// The header of the block failed validation.
    #[error("block validation failed: {0}")]
    ValidationFailure(#[from] Corruption),
}

/// Corruption
///
/// The inconsistency detected in the header of a block.
#[derive(Error, Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Corruption {
    /// The sentinel does not match `MAGIC`.
    #[error("magic mismatch, found {found:#018x}")]
    Magic {
        /// Value found in place of the sentinel.
        found: u64,
    },

    /// The stored checksum does not match the one computed from size and flags.
    #[error("checksum mismatch, stored {stored:#010x}, computed {computed:#010x}")]
    Checksum {
        /// Checksum stored in the header.
        stored: u32,
        /// Checksum computed from the header.
        computed: u32,
    },
}
