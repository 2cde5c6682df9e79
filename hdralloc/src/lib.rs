#![deny(missing_docs)]

//! A header-tagged memory allocator library.
//!
//! The type `HdrAllocator` commits every block directly from the OS, prefixed with a small header used for integrity
//! checking, and records the aggregate usage of the process in a single tracker.
//!
//! #   Warning
//!
//! Every allocation and deallocation results in a system call; this allocator is meant for a moderate number of
//! medium to large, long-lived, blocks, not as a general purpose replacement of the system allocator.

mod allocator;
mod platform;

pub use allocator::HdrAllocator;

pub use hdralloc_core::{AllocError, BlockInfo, Corruption, Flags, FreePolicy, Statistics, HEADER_SIZE};

use platform::{HdrConfiguration, HdrPlatform};
