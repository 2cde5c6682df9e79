//! Allocator.
//!
//! The Allocator commits every block directly from the `Platform`, prefixing each payload with a `Header`:
//!
//! -   Allocation: commit, write the header, pin if requested, zero if requested, record in the tracker.
//! -   Deallocation: recover the header, validate it, unpin if pinned, release, record in the tracker.
//! -   Reallocation: validate, allocate anew, copy, deallocate the original.
//!
//! There is no caching whatsoever; the Allocator holds no mutable state of its own, the only shared mutable state is
//! the `Tracker`, which is updated atomically.

use core::{cmp, marker::PhantomData, ptr::{self, NonNull}};

use log::{error, trace, warn};

use crate::internals::header::{Block, HEADER_SIZE};

use super::{AllocError, BlockInfo, Configuration, Flags, FreePolicy, Platform, Statistics, Tracker};

/// Allocator.
///
/// An instance of the Allocator serves memory from its `Platform`, and records its usage in its `Tracker`.
///
/// Memory MUST be deallocated by an Allocator sharing the same `Platform` as the one it was allocated from.
pub struct Allocator<'t, C, P> {
    platform: P,
    tracker: &'t Tracker,
    _configuration: PhantomData<fn() -> C>,
}

impl<'t, C, P> Allocator<'t, C, P> {
    /// Creates an Allocator.
    ///
    /// The Allocator created will commit memory from the `platform`, and record its usage in `tracker`.
    pub const fn new(platform: P, tracker: &'t Tracker) -> Self {
        Self { platform, tracker, _configuration: PhantomData }
    }

    /// Returns the Platform.
    pub fn platform(&self) -> &P { &self.platform }

    /// Returns the Tracker.
    pub fn tracker(&self) -> &'t Tracker { self.tracker }

    /// Returns a snapshot of the Tracker.
    pub fn statistics(&self) -> Statistics { self.tracker.statistics() }

    /// Returns the number of bytes currently live, headers included.
    ///
    /// The `flags` are accepted for compatibility, and ignored.
    pub fn heap_size(&self, _flags: Flags) -> usize { self.tracker.total_allocated() }
}

impl<'t, C, P> Allocator<'t, C, P>
    where
        C: Configuration,
        P: Platform,
{
    /// Allocates a block with a payload of `size` bytes.
    ///
    /// A `size` of 0 is accepted; the returned pointer is then valid for deallocation, but not for access.
    ///
    /// -   If `flags` contains `Flags::LOCK`, the whole block is pinned until deallocated.
    /// -   If `flags` contains `Flags::CLEAR`, the payload is zeroed.
    ///
    /// #   Errors
    ///
    /// -   `AllocError::OutOfMemory` if the platform cannot commit the block.
    /// -   `AllocError::LockFailure` if the platform cannot pin the block; the block is released beforehand.
    pub fn allocate(&self, size: usize, flags: Flags) -> Result<NonNull<u8>, AllocError> {
        let block_size = HEADER_SIZE.checked_add(size).ok_or(AllocError::OutOfMemory { size })?;

        //  Safety:
        //  -   `block_size` is at least HEADER_SIZE, hence non-zero.
        let base = unsafe { self.platform.commit(block_size) }.ok_or(AllocError::OutOfMemory { size })?;

        //  Safety:
        //  -   `base` points to at least `block_size` bytes.
        //  -   `base` is aligned on at least 16 bytes.
        let block = unsafe { Block::initialize(base, size, flags) };

        if flags.contains(Flags::LOCK) {
            //  Safety:
            //  -   `[base, base + block_size)` was just committed.
            if let Err(code) = unsafe { self.platform.pin(base, block_size) } {
                warn!("Could not lock {} bytes at {:x}: {}", block_size, base.as_ptr() as usize, code);

                //  Safety:
                //  -   `base` was committed with `block_size`, and was never handed out.
                unsafe { self.release(base, block_size) };

                return Err(AllocError::LockFailure { size: block_size, code });
            }
        }

        let payload = block.payload();

        if flags.contains(Flags::CLEAR) {
            //  Safety:
            //  -   `payload` is followed by `size` bytes, all within the block.
            unsafe { ptr::write_bytes(payload.as_ptr(), 0, size) };
        }

        self.tracker.record_allocation(block_size);

        trace!("Allocated {} bytes ({:?}) at {:x}", size, flags, payload.as_ptr() as usize);

        Ok(payload)
    }

    /// Deallocates the block whose payload is located at `pointer`.
    ///
    /// A null `pointer` is ignored.
    ///
    /// If the header of the block fails validation, the corruption is reported through `log::error!`, and the block
    /// is then released or leaked depending on `C::FREE_POLICY`.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` is null, or has been returned by a prior call to `allocate` or `reallocate`.
    /// -   Assumes `pointer` has not been deallocated since its allocation.
    /// -   Assumes the memory pointed by `pointer` is no longer in use.
    pub unsafe fn deallocate(&self, pointer: *mut u8) {
        let payload = match NonNull::new(pointer) {
            Some(payload) => payload,
            None => return,
        };

        let block = Block::from_payload(payload);
        let header = block.header();

        if let Err(corruption) = header.validate() {
            error!("Corrupted block freed at {:x}: {}", payload.as_ptr() as usize, corruption);

            if C::FREE_POLICY == FreePolicy::Strict {
                return;
            }
        }

        trace!("Deallocating {} bytes ({:?}) at {:x}", header.size(), header.flags(), payload.as_ptr() as usize);

        self.retire(block, header.flags(), header.block_size());
    }

    /// Reallocates the block whose payload is located at `pointer`, to hold `new_size` bytes.
    ///
    /// The first `min(old size, new_size)` bytes of the payload are preserved; the new block has the same flags as
    /// the original one. A null `pointer` is equivalent to `allocate(new_size, Flags::NORMAL)`.
    ///
    /// #   Errors
    ///
    /// -   `AllocError::ValidationFailure` if the header of the original block fails validation.
    /// -   `AllocError::OutOfMemory` or `AllocError::LockFailure` if the new block cannot be allocated.
    ///
    /// On error, the original block is left untouched, and remains valid.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` is null, or has been returned by a prior call to `allocate` or `reallocate`.
    /// -   Assumes `pointer` has not been deallocated since its allocation.
    /// -   Assumes the memory pointed by `pointer` is not concurrently in use.
    pub unsafe fn reallocate(&self, pointer: *mut u8, new_size: usize) -> Result<NonNull<u8>, AllocError> {
        let old = match NonNull::new(pointer) {
            Some(old) => old,
            None => return self.allocate(new_size, Flags::NORMAL),
        };

        let block = Block::from_payload(old);
        let header = block.header();

        if let Err(corruption) = header.validate() {
            error!("Corrupted block reallocated at {:x}: {}", old.as_ptr() as usize, corruption);
            return Err(corruption.into());
        }

        let new = self.allocate(new_size, header.flags())?;

        //  Safety:
        //  -   Both payloads hold at least the number of bytes copied.
        //  -   The blocks are distinct, as both are live.
        ptr::copy_nonoverlapping(old.as_ptr(), new.as_ptr(), cmp::min(header.size(), new_size));

        self.retire(block, header.flags(), header.block_size());

        Ok(new)
    }

    /// Validates the header of the block whose payload is located at `pointer`.
    ///
    /// Returns the size and flags recorded in the header on success.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` has been returned by a prior call to `allocate` or `reallocate`.
    /// -   Assumes `pointer` has not been deallocated since its allocation.
    pub unsafe fn validate(&self, pointer: NonNull<u8>) -> Result<BlockInfo, AllocError> {
        let header = Block::from_payload(pointer).header();

        header.validate()?;

        Ok(BlockInfo::new(header.size(), header.flags()))
    }

    /// Pins the range `[pointer, pointer + size)`, preventing it from being paged out.
    ///
    /// #   Errors
    ///
    /// -   `AllocError::LockFailure` if the platform cannot pin the range.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `[pointer, pointer + size)` is mapped.
    pub unsafe fn lock_range(&self, pointer: NonNull<u8>, size: usize) -> Result<(), AllocError> {
        self.platform.pin(pointer, size).map_err(|code| {
            warn!("Could not lock {} bytes at {:x}: {}", size, pointer.as_ptr() as usize, code);
            AllocError::LockFailure { size, code }
        })
    }

    /// Unpins the range `[pointer, pointer + size)`.
    ///
    /// Unpinning is best-effort: failures are reported through `log::warn!` only.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `[pointer, pointer + size)` is mapped.
    pub unsafe fn unlock_range(&self, pointer: NonNull<u8>, size: usize) {
        if let Err(code) = self.platform.unpin(pointer, size) {
            warn!("Could not unlock {} bytes at {:x}: {}", size, pointer.as_ptr() as usize, code);
        }
    }

    /// Returns the number of bytes of physical memory currently available, or 0 if unknown.
    ///
    /// The `flags` are accepted for compatibility, and ignored.
    pub fn total_ram_free(&self, _flags: Flags) -> usize { self.platform.available_physical_bytes().unwrap_or(0) }

    /// Returns the number of bytes of physical memory currently available, or 0 if unknown.
    ///
    /// Identical to `total_ram_free`, kept for callers using this name.
    pub fn ram_free(&self, flags: Flags) -> usize { self.total_ram_free(flags) }

    //  Unpins if necessary, releases, and records the deallocation.
    //
    //  #   Safety
    //
    //  -   Assumes that `block` is live, and no longer in use.
    //  -   Assumes that `block_size` is the size `block` was committed with.
    unsafe fn retire(&self, block: Block, flags: Flags, block_size: usize) {
        if flags.contains(Flags::LOCK) {
            self.unlock_range(block.base(), block_size);
        }

        self.release(block.base(), block_size);

        self.tracker.record_deallocation(block_size);
    }

    //  Releases the memory, reporting failures.
    //
    //  #   Safety
    //
    //  -   Assumes that `base` was committed by `self.platform` with `block_size`.
    unsafe fn release(&self, base: NonNull<u8>, block_size: usize) {
        if let Err(code) = self.platform.release(base, block_size) {
            warn!("Could not release {} bytes at {:x}: {}", block_size, base.as_ptr() as usize, code);
        }
    }
}
