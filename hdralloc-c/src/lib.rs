#![deny(missing_docs)]
#![allow(non_snake_case)]

//! Exposition of HdrAllocator API via a C ABI.
//!
//! The symbols keep the names existing call-sites link against; errors are reported through `log`, and surface as
//! a null pointer or a negative value.

use core::ptr::{self, NonNull};

use log::error;

use hdralloc::{Flags, HdrAllocator};

/// Allocates a block with a payload of `size` bytes.
///
/// `flags` is a combination of `CLEAR` (1), `LOCK` (2) and `REAL` (4); unknown bits are ignored.
///
/// Returns NULL if the block cannot be committed, or cannot be locked.
#[no_mangle]
pub extern "C" fn Alloc(size: usize, flags: u32) -> *mut u8 {
    match ALLOCATOR.allocate(size, Flags::from_bits_truncate(flags)) {
        Ok(pointer) => pointer.as_ptr(),
        Err(e) => {
            error!("Alloc({}, {:#x}) failed: {}", size, flags, e);
            ptr::null_mut()
        }
    }
}

/// Deallocates the block whose payload is located at `pointer`; NULL is ignored.
///
/// #   Safety
///
/// -   Assumes `pointer` is NULL, or has been returned by a prior call to `Alloc` or `Resize_Alloc`.
/// -   Assumes `pointer` has not been deallocated since its allocation.
/// -   Assumes the memory pointed by `pointer` is no longer in use.
#[no_mangle]
pub unsafe extern "C" fn Free(pointer: *mut u8) { ALLOCATOR.deallocate(pointer) }

/// Reallocates the block whose payload is located at `pointer` to hold `new_size` bytes, preserving its content.
///
/// Returns NULL on failure, in which case the original block is left untouched.
///
/// #   Safety
///
/// -   Assumes `pointer` is NULL, or has been returned by a prior call to `Alloc` or `Resize_Alloc`.
/// -   Assumes `pointer` has not been deallocated since its allocation.
/// -   Assumes the memory pointed by `pointer` is not concurrently in use.
#[no_mangle]
pub unsafe extern "C" fn Resize_Alloc(pointer: *mut u8, new_size: usize) -> *mut u8 {
    match ALLOCATOR.reallocate(pointer, new_size) {
        Ok(pointer) => pointer.as_ptr(),
        Err(e) => {
            error!("Resize_Alloc({:x}, {}) failed: {}", pointer as usize, new_size, e);
            ptr::null_mut()
        }
    }
}

/// Returns the number of bytes currently allocated, headers included.
///
/// `flags` is ignored.
#[no_mangle]
pub extern "C" fn Heap_Size(flags: u32) -> usize { ALLOCATOR.heap_size(Flags::from_bits_truncate(flags)) }

/// Returns the number of bytes of physical memory currently available, or 0 if unknown.
///
/// `flags` is ignored.
#[no_mangle]
pub extern "C" fn Total_Ram_Free(flags: u32) -> usize { ALLOCATOR.total_ram_free(Flags::from_bits_truncate(flags)) }

/// Returns the number of bytes of physical memory currently available, or 0 if unknown.
///
/// `flags` is ignored.
#[no_mangle]
pub extern "C" fn Ram_Free(flags: u32) -> usize { ALLOCATOR.ram_free(Flags::from_bits_truncate(flags)) }

/// Pins the range `[pointer, pointer + size)` in physical memory.
///
/// Returns 0 on success, and a negative value otherwise.
///
/// #   Safety
///
/// -   Assumes that `[pointer, pointer + size)` is mapped.
#[no_mangle]
pub unsafe extern "C" fn Lock_Range(pointer: *const u8, size: usize) -> i32 {
    let pointer = match NonNull::new(pointer as *mut u8) {
        Some(pointer) => pointer,
        None => return -1,
    };

    if ALLOCATOR.lock_range(pointer, size).is_ok() { 0 } else { -1 }
}

/// Unpins the range `[pointer, pointer + size)`, on a best-effort basis.
///
/// #   Safety
///
/// -   Assumes that `[pointer, pointer + size)` is mapped.
#[no_mangle]
pub unsafe extern "C" fn Unlock_Range(pointer: *const u8, size: usize) {
    if let Some(pointer) = NonNull::new(pointer as *mut u8) {
        ALLOCATOR.unlock_range(pointer, size);
    }
}

//
//  Implementation
//

static ALLOCATOR: HdrAllocator = HdrAllocator::new();

#[cfg(test)]
mod tests {

use serial_test::serial;

use hdralloc::{BlockInfo, HEADER_SIZE};

use super::*;

#[serial]
#[test]
fn alloc_resize_free() {
    unsafe {
        let pointer = Alloc(16, 1);

        assert!(!pointer.is_null());
        assert!(std::slice::from_raw_parts(pointer, 16).iter().all(|&b| b == 0));

        *pointer = 42;

        let pointer = Resize_Alloc(pointer, 4096);

        assert!(!pointer.is_null());
        assert_eq!(42, *pointer);

        Free(pointer);
        Free(ptr::null_mut());
    }
}

#[serial]
#[test]
fn alloc_unknown_flags() {
    let pointer = Alloc(8, 0xFFFF_FFF8 | 1);

    let block = NonNull::new(pointer).expect("Allocated");

    assert_eq!(Ok(BlockInfo::new(8, Flags::CLEAR)), unsafe { ALLOCATOR.validate(block) });

    unsafe { Free(pointer) };
}

#[serial]
#[test]
fn alloc_failure() {
    assert!(Alloc(usize::MAX / 2, 0).is_null());
}

#[serial]
#[test]
fn lock_null() {
    assert_eq!(-1, unsafe { Lock_Range(ptr::null(), 4096) });

    unsafe { Unlock_Range(ptr::null(), 4096) };
}

#[serial]
#[test]
fn heap_size() {
    let before = Heap_Size(0);

    let pointer = Alloc(100, 0);

    assert!(!pointer.is_null());
    assert_eq!(before + HEADER_SIZE + 100, Heap_Size(0));

    unsafe { Free(pointer) };

    assert_eq!(before, Heap_Size(0));
}

#[serial]
#[test]
fn ram_free() {
    assert!(Total_Ram_Free(0) > 0);
    assert!(Ram_Free(0) > 0);
}

}
