//! Implementation of Linux specific calls.

use core::{mem, ptr::{self, NonNull}};

use std::{fs, io};

use log::debug;

use hdralloc_core::{Configuration, FreePolicy, Platform};

/// Implementation of the Configuration trait, for Linux.
#[derive(Default)]
pub(crate) struct HdrConfiguration;

impl Configuration for HdrConfiguration {
    //  A corrupted size cannot be trusted to `munmap`.
    const FREE_POLICY: FreePolicy = FreePolicy::Strict;
}

/// Implementation of the Platform trait, for Linux.
#[derive(Default)]
pub(crate) struct HdrPlatform;

impl HdrPlatform {
    /// Creates an instance.
    pub(crate) const fn new() -> Self { Self }
}

impl Platform for HdrPlatform {
    unsafe fn commit(&self, size: usize) -> Option<NonNull<u8>> {
        debug_assert!(size > 0);

        mmap_allocate(size)
    }

    unsafe fn release(&self, pointer: NonNull<u8>, size: usize) -> Result<(), i32> {
        check(libc::munmap(pointer.as_ptr() as *mut libc::c_void, size))
    }

    unsafe fn pin(&self, pointer: NonNull<u8>, size: usize) -> Result<(), i32> {
        check(libc::mlock(pointer.as_ptr() as *const libc::c_void, size))
    }

    unsafe fn unpin(&self, pointer: NonNull<u8>, size: usize) -> Result<(), i32> {
        check(libc::munlock(pointer.as_ptr() as *const libc::c_void, size))
    }

    #[cold]
    fn available_physical_bytes(&self) -> Option<usize> {
        sysinfo_available()
            .or_else(sysconf_available)
            .or_else(meminfo_available)
    }
}

//  Wrapper around `mmap`.
//
//  Returns a pointer to `size` bytes of zeroed memory, aligned on a page boundary.
fn mmap_allocate(size: usize) -> Option<NonNull<u8>> {
    let length = size;
    let prot = libc::PROT_READ | libc::PROT_WRITE;
    let flags = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS;

    //  No specific address hint.
    let addr = ptr::null_mut();
    //  When used in conjunction with MAP_ANONYMOUS, fd is mandated to be -1 on some implementations.
    let fd = -1;
    //  When used in conjunction with MAP_ANONYMOUS, offset is mandated to be 0 on some implementations.
    let offset = 0;

    //  Safety:
    //  -   `addr`, `fd`, and `offset` are suitable for MAP_ANONYMOUS.
    let result = unsafe { libc::mmap(addr, length, prot, flags, fd, offset) };

    if result == libc::MAP_FAILED {
        debug!("mmap of {} bytes failed: {}", size, io::Error::last_os_error());
        return None;
    }

    NonNull::new(result as *mut u8)
}

//  Converts a libc return code into a Result, capturing errno on failure.
fn check(result: libc::c_int) -> Result<(), i32> {
    if result == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error().raw_os_error().unwrap_or(-1))
    }
}

//  Free RAM, as reported by `sysinfo`.
fn sysinfo_available() -> Option<usize> {
    //  Safety:
    //  -   `sysinfo` is plain old data.
    let mut info: libc::sysinfo = unsafe { mem::zeroed() };

    //  Safety:
    //  -   `info` is a valid, writable, `sysinfo` struct.
    if unsafe { libc::sysinfo(&mut info as *mut _) } != 0 {
        debug!("sysinfo failed: {}", io::Error::last_os_error());
        return None;
    }

    (info.freeram as usize).checked_mul(info.mem_unit as usize)
}

//  Available physical pages, as reported by `sysconf`.
fn sysconf_available() -> Option<usize> {
    //  Safety:
    //  -   Both names are supported on Linux.
    let (pages, page_size) = unsafe { (libc::sysconf(libc::_SC_AVPHYS_PAGES), libc::sysconf(libc::_SC_PAGESIZE)) };

    if pages < 0 || page_size <= 0 {
        debug!("sysconf failed: {} pages of {} bytes", pages, page_size);
        return None;
    }

    (pages as usize).checked_mul(page_size as usize)
}

//  MemAvailable, as reported by `/proc/meminfo`.
fn meminfo_available() -> Option<usize> {
    match fs::read_to_string("/proc/meminfo") {
        Ok(meminfo) => parse_meminfo_available(&meminfo),
        Err(error) => {
            debug!("Could not read /proc/meminfo: {}", error);
            None
        }
    }
}

//  Parses the `MemAvailable:    123456 kB` line, returning bytes.
fn parse_meminfo_available(meminfo: &str) -> Option<usize> {
    meminfo.lines()
        .find_map(|line| {
            let rest = line.strip_prefix("MemAvailable:")?;
            let kb: usize = rest.trim().trim_end_matches("kB").trim().parse().ok()?;

            kb.checked_mul(1024)
        })
}
