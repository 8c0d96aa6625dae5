//! Backing stores own the bytes of the page map and of the arena.

mod dynamic;
mod fixed;

use core::{ptr::NonNull, slice};

pub use dynamic::DynamicStore;
pub use fixed::FixedStore;

use crate::{error::Result, page_map::map_size};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  /// Caller buffer, never grows.
  Fixed,
  /// Obtained through [`Primitives`](crate::Primitives), grows on demand.
  Dynamic,
}

/// Raw memory behind an allocator.
///
/// # Safety
///
/// `page_map_ptr` must point to at least `page_map_size()` initialized bytes
/// and `arena_ptr` to at least `mem_bank_size()` initialized bytes. The two
/// regions must not overlap and must stay exclusively owned by the store
/// until `grow` or `release` is called.
pub unsafe trait BackingStore {
  /// What the caller gets back on shutdown.
  type Released;

  fn mode(&self) -> Mode;

  fn page_size(&self) -> usize;

  fn page_number(&self) -> usize;

  fn page_map_ptr(&self) -> NonNull<u8>;

  fn arena_ptr(&self) -> NonNull<u8>;

  /// Grows to at least `target` pages and returns the new page number.
  /// On failure nothing the store held is lost.
  fn grow(
    &mut self,
    target: usize,
  ) -> Result<usize>;

  fn release(self) -> Self::Released
  where
    Self: Sized;

  fn page_map_size(&self) -> usize {
    map_size(self.page_number())
  }

  fn mem_bank_size(&self) -> usize {
    self.page_number() * self.page_size()
  }

  fn page_map(&self) -> &[u8] {
    unsafe { slice::from_raw_parts(self.page_map_ptr().as_ptr(), self.page_map_size()) }
  }

  fn arena(&self) -> &[u8] {
    unsafe { slice::from_raw_parts(self.arena_ptr().as_ptr(), self.mem_bank_size()) }
  }

  /// The page map and the arena, borrowed together.
  fn parts_mut(&mut self) -> (&mut [u8], &mut [u8]) {
    unsafe {
      (
        slice::from_raw_parts_mut(self.page_map_ptr().as_ptr(), self.page_map_size()),
        slice::from_raw_parts_mut(self.arena_ptr().as_ptr(), self.mem_bank_size()),
      )
    }
  }
}
