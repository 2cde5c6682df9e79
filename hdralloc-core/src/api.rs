//! The API of hdralloc-core.

mod allocator;
mod configuration;
mod description;
mod error;
mod platform;
mod tracker;

pub use allocator::Allocator;
pub use configuration::{Configuration, FreePolicy};
pub use description::{BlockInfo, Flags};
pub use error::{AllocError, Corruption};
pub use platform::Platform;
pub use tracker::{Statistics, Tracker};

pub use crate::internals::header::{HEADER_SIZE, MAGIC};
