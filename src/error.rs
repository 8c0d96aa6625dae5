//! Error types for the pager.

use thiserror::Error;

/// Everything that can go wrong while setting up or using an allocator.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerError {
  /// The fixed buffer cannot hold one page plus its page map entry.
  #[error("buffer of {size} bytes cannot hold a single {page_size}-byte page and its map")]
  BufferTooSmall {
    /// Size of the rejected buffer.
    size: usize,
    /// Page size in effect.
    page_size: usize,
  },

  /// The backing primitives could not provide memory, or a fixed arena has
  /// no free run large enough.
  #[error("out of memory: {requested} bytes could not be provided")]
  OutOfMemory {
    /// Number of bytes that were asked for.
    requested: usize,
  },

  /// A dynamic arena could not be grown to fit the request.
  #[error("allocation of {pages} pages failed: backing store exhausted")]
  AllocationFailed {
    /// Number of pages the request needed.
    pages: usize,
  },

  /// Zero-sized allocation request.
  #[error("allocation size must be at least one byte")]
  InvalidSize,

  /// The address or handle does not designate the start of a live block.
  #[error("{address:#x} is not the start of an allocated block")]
  InvalidPointer {
    /// The offending address.
    address: usize,
  },

  #[error("page index {index} out of range (page number {page_number})")]
  IndexOutOfRange { index: usize, page_number: usize },

  #[error("page {index} does not start a block")]
  InvalidStart { index: usize },

  /// Growth was requested from a store that cannot grow.
  #[error("fixed backing store cannot grow")]
  FixedCapacityExceeded,

  #[error("invalid configuration: {0}")]
  InvalidConfig(&'static str),
}

pub type Result<T> = core::result::Result<T, PagerError>;
