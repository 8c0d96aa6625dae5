//! # pager - A Page-Granular Memory Allocator
//!
//! This crate manages one contiguous byte arena split into fixed-size pages
//! and records the state of every page in a 2-bit-per-page **page map**.
//!
//! ## Overview
//!
//! ```text
//!   Page Allocator Concept:
//!
//!   page map   ┌────┬────┬────┬────┬────┬────┬────┬────┐
//!   (2 bits)   │ A  │ B  │ C  │ X  │ C  │ X  │ X  │ X  │
//!              └────┴────┴────┴────┴────┴────┴────┴────┘
//!                │    │    │         │
//!   arena      ┌─▼────▼────▼────┬────▼────┬───────────────────┐
//!              │  block: 3 pages│    │ 1p │        free       │
//!              └────────────────┴────┴────┴───────────────────┘
//!               page 0         3    4    5                   8
//!
//!   X Unused   A Start   B Continue   C End
//! ```
//!
//! Allocation rounds the request up to whole pages, looks for the first run
//! of free pages that is long enough, and marks it `Start Continue* End`. A
//! single-page block is a lone `End`. Freeing walks forward from the start
//! page to its `End`.
//!
//! ## Crate Structure
//!
//! ```text
//!   pager
//!   ├── ceiling     - ceiling! macro (rounded-up division)
//!   ├── page_map    - PageMap, PageState: encoding, search, marking
//!   ├── primitives  - Primitives capability set, Libc default
//!   ├── store       - BackingStore: FixedStore and DynamicStore
//!   ├── block       - Block handle
//!   ├── config      - Config, PAGE_SIZE, PAGE_MIN
//!   ├── error       - PagerError
//!   └── allocator   - Allocator
//! ```
//!
//! ## Backing Stores
//!
//! ```text
//!   Fixed: one caller buffer, never grows
//!   ┌──────────┬─────────────────────────────┐
//!   │ page map │ arena                       │
//!   └──────────┴─────────────────────────────┘
//!
//!   Dynamic: two allocations from Primitives, doubled on demand
//!   ┌──────────┐   ┌─────────────────────────┐
//!   │ page map │   │ arena                   │
//!   └──────────┘   └─────────────────────────┘
//! ```
//!
//! A fixed allocator fits `floor(size / (page_size + 0.25))` pages in the
//! buffer and gives it back on [`Allocator::shutdown`]. A dynamic allocator
//! starts at [`PAGE_MIN`] pages, doubles its page count when an allocation
//! does not fit, and releases both buffers on shutdown (or drop).
//!
//! ## Quick Start
//!
//! ```rust
//! use pager::Allocator;
//!
//! let mut allocator = Allocator::init_default()?;
//!
//! let block = allocator.allocate(1500)?;
//! assert_eq!(block.pages(), 3);
//!
//! allocator.bytes_mut(block)?.fill(0xAB);
//! assert_eq!(allocator.page_map().to_string(), "ABCXXXXX");
//!
//! allocator.free(block)?;
//! allocator.shutdown();
//! # Ok::<(), pager::PagerError>(())
//! ```
//!
//! With a caller buffer:
//!
//! ```rust
//! use pager::Allocator;
//!
//! let mut buffer = [0u8; 513];
//! let allocator = Allocator::init_fixed(&mut buffer)?;
//! assert_eq!(allocator.page_number(), 1);
//! assert_eq!(allocator.mem_bank_size(), 512);
//!
//! let buffer = allocator.shutdown();
//! assert_eq!(buffer.len(), 513);
//! # Ok::<(), pager::PagerError>(())
//! ```
//!
//! ## Handles and Addresses
//!
//! [`Allocator::allocate`] returns a [`Block`] (start page and page count),
//! not an address. Growth may move a dynamic arena, so addresses from
//! [`Allocator::ptr`] are only good until the next allocation; blocks stay
//! valid until they are freed.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: No synchronization primitives
//! - **Byte alignment in fixed mode**: The arena follows the page map
//!   directly inside the caller buffer
//! - **First fit**: No size classes, no compaction

pub mod ceiling;
mod allocator;
mod block;
mod config;
mod error;
mod page_map;
mod primitives;
mod store;

#[cfg(test)]
mod testing;

pub use allocator::{Allocator, DefaultAllocator, FixedAllocator};
pub use block::Block;
pub use config::{Config, PAGE_MIN, PAGE_SIZE};
pub use error::{PagerError, Result};
pub use page_map::{PageMap, PageState, map_size};
pub use primitives::{Libc, Primitives};
pub use store::{BackingStore, DynamicStore, FixedStore, Mode};
