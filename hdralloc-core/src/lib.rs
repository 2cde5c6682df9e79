#![cfg_attr(not(test), no_std)]

#![deny(missing_docs)]

//! Building blocks for a header-tagged allocator.
//!
//! hdralloc-core is a set of building blocks to build an allocator which commits every block directly from the OS,
//! prefixing each payload with a small header. It contains:
//! -   A platform trait, used to commit, release, pin and unpin raw blocks of memory, and query available memory.
//! -   A configuration trait, used to select the policy applied when a corrupted block is freed.
//! -   A tracker, recording the live bytes, peak bytes and live blocks of an allocator.
//! -   The allocator itself, tying the above together.

mod api;
mod internals;

pub use api::*;
