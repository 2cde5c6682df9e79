//! Abstraction over OS services.
//!
//! The allocator only ever talks to the OS through this trait, so that each OS family may provide its own
//! implementation, and tests may provide a fake one.

use core::ptr::NonNull;

/// Abstraction over the platform memory services.
pub trait Platform {
    /// Commits a fresh block of memory of `size` bytes.
    ///
    /// Returns None if the request cannot be satisfied.
    ///
    /// #   Safety
    ///
    /// The caller may assume that if the returned pointer is not None then:
    /// -   The number of usable bytes is _at greater than or equal_ to `size`.
    /// -   The pointer is _at least_ aligned to 16 bytes.
    ///
    /// `commit` assumes that:
    /// -   `size` is non-zero.
    unsafe fn commit(&self, size: usize) -> Option<NonNull<u8>>;

    /// Releases the supplied block of memory.
    ///
    /// Release is best-effort: an error code is returned on failure, yet the caller has no recourse.
    ///
    /// #   Safety
    ///
    /// The caller should no longer reference the memory after calling this function.
    ///
    /// `release` assumes that:
    /// -   `pointer` was committed by this instance of `Platform`, with `size` as argument.
    /// -   `pointer` is the value returned by `Platform`, and not an interior pointer.
    unsafe fn release(&self, pointer: NonNull<u8>, size: usize) -> Result<(), i32>;

    /// Pins the supplied range of memory, preventing it from being paged out.
    ///
    /// Returns the OS error code on failure.
    ///
    /// #   Safety
    ///
    /// `pin` assumes that:
    /// -   `[pointer, pointer + size)` is mapped.
    unsafe fn pin(&self, pointer: NonNull<u8>, size: usize) -> Result<(), i32>;

    /// Unpins the supplied range of memory.
    ///
    /// Unpin is best-effort: an error code is returned on failure, yet the caller has no recourse.
    ///
    /// #   Safety
    ///
    /// `unpin` assumes that:
    /// -   `[pointer, pointer + size)` is mapped.
    unsafe fn unpin(&self, pointer: NonNull<u8>, size: usize) -> Result<(), i32>;

    /// Returns the number of bytes of physical memory currently available, if it can be determined.
    fn available_physical_bytes(&self) -> Option<usize>;
}
