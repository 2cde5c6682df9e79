//! Allocator

use core::ptr::NonNull;

use hdralloc_core::{self, AllocError, BlockInfo, Flags, Statistics, Tracker};

use crate::{HdrConfiguration, HdrPlatform};

/// Header-tagged Allocator.
///
/// All instances share the same process-wide tracker; memory allocated through one instance may be deallocated
/// through any other.
#[derive(Default, Clone, Copy)]
pub struct HdrAllocator;

impl HdrAllocator {
    /// Creates an instance.
    pub const fn new() -> Self { Self }

    /// Allocates a block with a payload of `size` bytes.
    ///
    /// See `hdralloc_core::Allocator::allocate`.
    pub fn allocate(&self, size: usize, flags: Flags) -> Result<NonNull<u8>, AllocError> {
        ALLOCATOR.allocate(size, flags)
    }

    /// Deallocates the block whose payload is located at `pointer`; a null `pointer` is ignored.
    ///
    /// If the header is found corrupted, the block is leaked rather than released.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` is null, or has been returned by a prior call to `allocate` or `reallocate`.
    /// -   Assumes `pointer` has not been deallocated since its allocation.
    /// -   Assumes the memory pointed by `pointer` is no longer in use.
    pub unsafe fn deallocate(&self, pointer: *mut u8) { ALLOCATOR.deallocate(pointer) }

    /// Reallocates the block whose payload is located at `pointer`, to hold `new_size` bytes.
    ///
    /// See `hdralloc_core::Allocator::reallocate`.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` is null, or has been returned by a prior call to `allocate` or `reallocate`.
    /// -   Assumes `pointer` has not been deallocated since its allocation.
    /// -   Assumes the memory pointed by `pointer` is not concurrently in use.
    pub unsafe fn reallocate(&self, pointer: *mut u8, new_size: usize) -> Result<NonNull<u8>, AllocError> {
        ALLOCATOR.reallocate(pointer, new_size)
    }

    /// Validates the header of the block whose payload is located at `pointer`.
    ///
    /// #   Safety
    ///
    /// -   Assumes `pointer` has been returned by a prior call to `allocate` or `reallocate`.
    /// -   Assumes `pointer` has not been deallocated since its allocation.
    pub unsafe fn validate(&self, pointer: NonNull<u8>) -> Result<BlockInfo, AllocError> {
        ALLOCATOR.validate(pointer)
    }

    /// Pins the range `[pointer, pointer + size)` in physical memory.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `[pointer, pointer + size)` is mapped.
    pub unsafe fn lock_range(&self, pointer: NonNull<u8>, size: usize) -> Result<(), AllocError> {
        ALLOCATOR.lock_range(pointer, size)
    }

    /// Unpins the range `[pointer, pointer + size)`, on a best-effort basis.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `[pointer, pointer + size)` is mapped.
    pub unsafe fn unlock_range(&self, pointer: NonNull<u8>, size: usize) { ALLOCATOR.unlock_range(pointer, size) }

    /// Returns the number of bytes currently allocated, headers included.
    pub fn heap_size(&self, flags: Flags) -> usize { ALLOCATOR.heap_size(flags) }

    /// Returns the number of bytes of physical memory currently available, or 0 if unknown.
    pub fn total_ram_free(&self, flags: Flags) -> usize { ALLOCATOR.total_ram_free(flags) }

    /// Returns the number of bytes of physical memory currently available, or 0 if unknown.
    pub fn ram_free(&self, flags: Flags) -> usize { ALLOCATOR.ram_free(flags) }

    /// Returns a snapshot of the process-wide usage.
    pub fn statistics(&self) -> Statistics { ALLOCATOR.statistics() }

    /// Returns the process-wide tracker.
    pub fn tracker(&self) -> &'static Tracker { &TRACKER }
}

//
//  Implementation
//

type Allocator = hdralloc_core::Allocator<'static, HdrConfiguration, HdrPlatform>;

//  Process-wide usage.
static TRACKER: Tracker = Tracker::new();

static ALLOCATOR: Allocator = Allocator::new(HdrPlatform::new(), &TRACKER);
