//! Block Header.
//!
//! Every block committed by the allocator starts with a `Header`, immediately followed by the payload handed out to
//! the caller:
//!
//! ```text
//! +--------+---------+
//! | Header | Payload |
//! +--------+---------+
//! ^        ^
//! base     base + HEADER_SIZE
//! ```
//!
//! The header is written once, on allocation, and only ever read afterwards.

use core::{mem, ptr::{self, NonNull}};

use crate::{Corruption, Flags};

/// The sentinel stored in the header of every block, in debug builds.
pub const MAGIC: u64 = 0xDEAD_BEEF_CAFE_BABE;

/// The size of the header preceding every payload, in bytes.
pub const HEADER_SIZE: usize = mem::size_of::<Header>();

/// Header of a block.
#[repr(C)]
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct Header {
    size: usize,
    flags: Flags,
    checksum: u32,
    #[cfg(debug_assertions)]
    magic: u64,
}

impl Header {
    /// Creates a valid header for a payload of `size` bytes.
    pub(crate) fn new(size: usize, flags: Flags) -> Self {
        let checksum = checksum(size, flags);

        Self {
            size,
            flags,
            checksum,
            #[cfg(debug_assertions)]
            magic: MAGIC,
        }
    }

    /// Returns the size of the payload.
    pub(crate) fn size(&self) -> usize { self.size }

    /// Returns the flags.
    pub(crate) fn flags(&self) -> Flags { self.flags }

    /// Returns the size of the whole block, header included.
    ///
    /// Saturates, as a corrupted size may otherwise overflow.
    pub(crate) fn block_size(&self) -> usize { HEADER_SIZE.saturating_add(self.size) }

    /// Checks the header for corruption.
    pub(crate) fn validate(&self) -> Result<(), Corruption> {
        #[cfg(debug_assertions)]
        {
            if self.magic != MAGIC {
                return Err(Corruption::Magic { found: self.magic });
            }
        }

        let computed = checksum(self.size, self.flags);

        if self.checksum != computed {
            return Err(Corruption::Checksum { stored: self.checksum, computed });
        }

        Ok(())
    }
}

/// A block, as seen through its header.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct Block(NonNull<Header>);

impl Block {
    /// Writes a fresh header at `base`, and returns the block.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `base` points to at least `HEADER_SIZE` writable bytes.
    /// -   Assumes that `base` is suitably aligned for `Header`.
    pub(crate) unsafe fn initialize(base: NonNull<u8>, size: usize, flags: Flags) -> Self {
        debug_assert!(base.as_ptr() as usize % mem::align_of::<Header>() == 0,
            "Insufficiently aligned base: {:x}", base.as_ptr() as usize);

        let header = base.cast::<Header>();
        ptr::write(header.as_ptr(), Header::new(size, flags));

        Self(header)
    }

    /// Recovers the block from the payload pointer.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `payload` was returned by `Block::payload`.
    pub(crate) unsafe fn from_payload(payload: NonNull<u8>) -> Self {
        let header = payload.as_ptr().sub(HEADER_SIZE) as *mut Header;

        //  Safety:
        //  -   `payload` is HEADER_SIZE bytes past a non-null base.
        Self(NonNull::new_unchecked(header))
    }

    /// Returns the address of the block, which is also the address of its header.
    pub(crate) fn base(&self) -> NonNull<u8> { self.0.cast() }

    /// Returns the address of the payload.
    pub(crate) fn payload(&self) -> NonNull<u8> {
        //  Safety:
        //  -   The payload immediately follows the header, within the same block.
        unsafe { NonNull::new_unchecked(self.0.as_ptr().cast::<u8>().add(HEADER_SIZE)) }
    }

    /// Returns a copy of the header.
    ///
    /// #   Safety
    ///
    /// -   Assumes that the block is live.
    pub(crate) unsafe fn header(&self) -> Header { ptr::read(self.0.as_ptr()) }
}

//  The checksum only covers the lower 32 bits of the size.
fn checksum(size: usize, flags: Flags) -> u32 { (size ^ flags.bits() as usize) as u32 }
