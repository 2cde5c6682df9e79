//! Description of various properties of the allocations.

bitflags::bitflags! {
    /// Flags
    ///
    /// The set of options an allocation is requested with, recorded in the header of the block.
    #[repr(transparent)]
    #[derive(Default, Debug, Clone, Copy, Eq, PartialEq, Hash)]
    pub struct Flags: u32 {
        /// Zero the payload before handing it out.
        const CLEAR = 1 << 0;
        /// Pin the whole block in physical memory for its lifetime.
        const LOCK = 1 << 1;
        /// Legacy real-mode compatibility marker.
        ///
        /// Recorded in the header, otherwise ignored.
        const REAL = 1 << 2;
    }
}

impl Flags {
    /// No special treatment.
    pub const NORMAL: Flags = Flags::empty();
}

/// BlockInfo
///
/// The properties recorded in the header of a valid block.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct BlockInfo {
    size: usize,
    flags: Flags,
}

impl BlockInfo {
    /// Creates an instance.
    pub const fn new(size: usize, flags: Flags) -> Self { Self { size, flags } }

    /// Returns the size of the payload, as requested at allocation time.
    pub const fn size(&self) -> usize { self.size }

    /// Returns the flags the block was allocated with.
    pub const fn flags(&self) -> Flags { self.flags }
}
