//! The configuration of hdralloc-core.
//!
//! The Configuration is a compile-time choice, made once per allocator type.

/// Configuration
///
/// The Configuration instance allows adjusting the behavior of the allocator in the face of corrupted blocks.
pub trait Configuration {
    /// The policy applied when freeing a block whose header fails validation.
    const FREE_POLICY: FreePolicy;
}

/// FreePolicy
///
/// The action taken when freeing a block whose header fails validation.
///
/// In either case, the corruption is reported through `log::error!`, as freeing cannot fail.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum FreePolicy {
    /// Release the block anyway, trusting the recorded size.
    ///
    /// If the size itself is corrupted, the platform is asked to release a range which does not match the block.
    Tolerant,
    /// Leave the block alone.
    ///
    /// The block is leaked, and remains accounted for in the tracker.
    Strict,
}
