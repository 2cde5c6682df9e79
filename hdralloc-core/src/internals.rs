//! The internals of hdralloc-core.
//!
//! The internals deal with the raw layout of blocks.

pub mod header;
