use core::{marker::PhantomData, ptr::NonNull, slice};

use log::debug;

use super::{BackingStore, Mode};
use crate::{
  error::{PagerError, Result},
  page_map::map_size,
};

/// A caller-owned buffer split into page map and arena.
///
/// ```text
///   ┌───────────┬──────────────────────────────────────┬──────┐
///   │ page map  │ arena: page_number * page_size bytes │ rest │
///   └───────────┴──────────────────────────────────────┴──────┘
///   ▲           ▲
///   buffer      buffer + ceil(page_number / 4)
/// ```
///
/// The arena is not aligned beyond one byte.
pub struct FixedStore<'a> {
  buffer: NonNull<u8>,
  size: usize,
  page_size: usize,
  page_number: usize,
  _buffer: PhantomData<&'a mut [u8]>,
}

impl<'a> FixedStore<'a> {
  pub fn new(
    buffer: &'a mut [u8],
    page_size: usize,
  ) -> Result<Self> {
    let size = buffer.len();
    let page_number = Self::page_number_for(size, page_size);

    if page_number < 1 {
      return Err(PagerError::BufferTooSmall { size, page_size });
    }

    buffer[..map_size(page_number)].fill(0);

    debug!(
      "fixed store: {} bytes at {:?}, {} pages of {} bytes",
      size,
      buffer.as_ptr(),
      page_number,
      page_size
    );

    Ok(Self {
      buffer: NonNull::from(buffer).cast(),
      size,
      page_size,
      page_number,
      _buffer: PhantomData,
    })
  }

  /// How many pages fit in `size` bytes when each one also costs a quarter
  /// byte of page map, i.e. `floor(size / (page_size + 0.25))`.
  pub fn page_number_for(
    size: usize,
    page_size: usize,
  ) -> usize {
    ((size as u128 * 4) / (page_size as u128 * 4 + 1)) as usize
  }

  /// Size of the buffer handed in by the caller.
  pub fn provided_size(&self) -> usize {
    self.size
  }
}

unsafe impl<'a> BackingStore for FixedStore<'a> {
  type Released = &'a mut [u8];

  fn mode(&self) -> Mode {
    Mode::Fixed
  }

  fn page_size(&self) -> usize {
    self.page_size
  }

  fn page_number(&self) -> usize {
    self.page_number
  }

  fn page_map_ptr(&self) -> NonNull<u8> {
    self.buffer
  }

  fn arena_ptr(&self) -> NonNull<u8> {
    unsafe { NonNull::new_unchecked(self.buffer.as_ptr().add(self.page_map_size())) }
  }

  fn grow(
    &mut self,
    _target: usize,
  ) -> Result<usize> {
    Err(PagerError::FixedCapacityExceeded)
  }

  fn release(self) -> Self::Released {
    unsafe { slice::from_raw_parts_mut(self.buffer.as_ptr(), self.size) }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_page_number_for() {
    assert_eq!(FixedStore::page_number_for(512, 512), 0);
    assert_eq!(FixedStore::page_number_for(513, 512), 1);
    assert_eq!(FixedStore::page_number_for(1025, 512), 2);
    assert_eq!(FixedStore::page_number_for(1026, 512), 2);
    // 4 pages cost exactly 4 * 512 + 1 bytes.
    assert_eq!(FixedStore::page_number_for(2049, 512), 4);
    assert_eq!(FixedStore::page_number_for(2048, 512), 3);
  }

  #[test]
  fn test_layout_fits_buffer() {
    for size in [513, 1000, 2049, 4097, 10_000, 65_536] {
      let page_number = FixedStore::page_number_for(size, 512);
      assert!(map_size(page_number) + page_number * 512 <= size, "size {}", size);
    }
  }

  #[test]
  fn test_single_page() {
    let mut buffer = [0xAAu8; 513];
    let store = FixedStore::new(&mut buffer, 512).unwrap();

    assert_eq!(store.mode(), Mode::Fixed);
    assert_eq!(store.page_number(), 1);
    assert_eq!(store.page_map_size(), 1);
    assert_eq!(store.mem_bank_size(), 512);
    assert_eq!(store.page_map(), &[0]);
    assert_eq!(store.arena().len(), 512);
    assert_eq!(
      store.arena_ptr().as_ptr() as usize - store.page_map_ptr().as_ptr() as usize,
      1
    );
  }

  #[test]
  fn test_too_small() {
    let mut buffer = [0u8; 512];
    assert!(matches!(
      FixedStore::new(&mut buffer, 512),
      Err(PagerError::BufferTooSmall { size: 512, page_size: 512 })
    ));

    assert!(matches!(
      FixedStore::new(&mut [], 512),
      Err(PagerError::BufferTooSmall { size: 0, .. })
    ));
  }

  #[test]
  fn test_never_grows() {
    let mut buffer = vec![0u8; 4096];
    let mut store = FixedStore::new(&mut buffer, 512).unwrap();
    let page_number = store.page_number();

    assert_eq!(store.grow(page_number + 1), Err(PagerError::FixedCapacityExceeded));
    assert_eq!(store.page_number(), page_number);
  }

  #[test]
  fn test_release_returns_buffer() {
    let mut buffer = vec![7u8; 2049];
    let address = buffer.as_ptr();

    let store = FixedStore::new(&mut buffer, 512).unwrap();
    assert_eq!(store.provided_size(), 2049);
    let released = store.release();

    assert_eq!(released.as_ptr(), address);
    assert_eq!(released.len(), 2049);
    assert_eq!(released[0], 0);
    assert_eq!(released[1], 7);
  }
}
