use core::{ptr, ptr::NonNull, slice};

use log::debug;

use super::{BackingStore, Mode};
use crate::{
  config::Config,
  error::{PagerError, Result},
  page_map::{PageMap, map_size},
  primitives::Primitives,
};

/// Page map and arena held as two separate allocations obtained through a
/// set of [`Primitives`].
///
/// Capacities are tracked apart from the page number. Growth enlarges the
/// arena first and shrinks it back if the page map cannot follow, so a failed
/// growth keeps no extra memory.
pub struct DynamicStore<P: Primitives> {
  primitives: P,
  page_map: NonNull<u8>,
  page_map_capacity: usize,
  arena: NonNull<u8>,
  arena_capacity: usize,
  page_size: usize,
  page_number: usize,
  released: bool,
}

impl<P: Primitives> DynamicStore<P> {
  pub fn new(
    mut primitives: P,
    config: &Config,
  ) -> Result<Self> {
    config.validate()?;

    let page_number = config.page_min;
    let arena_size = page_number
      .checked_mul(config.page_size)
      .ok_or(PagerError::OutOfMemory { requested: usize::MAX })?;
    let page_map_size = map_size(page_number);

    let arena = primitives
      .allocate(arena_size)
      .ok_or(PagerError::OutOfMemory { requested: arena_size })?;

    let page_map = match primitives.allocate(page_map_size) {
      Some(page_map) => page_map,
      None => {
        unsafe { primitives.release(arena, arena_size) };
        return Err(PagerError::OutOfMemory {
          requested: page_map_size,
        });
      }
    };

    unsafe {
      ptr::write_bytes(arena.as_ptr(), 0, arena_size);
      ptr::write_bytes(page_map.as_ptr(), 0, page_map_size);
    }

    debug!(
      "dynamic store: {} pages of {} bytes, arena at {:?}",
      page_number, config.page_size, arena
    );

    Ok(Self {
      primitives,
      page_map,
      page_map_capacity: page_map_size,
      arena,
      arena_capacity: arena_size,
      page_size: config.page_size,
      page_number,
      released: false,
    })
  }

  pub fn primitives(&self) -> &P {
    &self.primitives
  }

  /// Reallocates `buffer` from `capacity` to `size` bytes and zeroes the new
  /// tail. Leaves both untouched on failure.
  fn enlarge(
    primitives: &mut P,
    buffer: &mut NonNull<u8>,
    capacity: &mut usize,
    size: usize,
  ) -> Result<()> {
    if size <= *capacity {
      return Ok(());
    }

    let enlarged = unsafe { primitives.reallocate(*buffer, *capacity, size) }
      .ok_or(PagerError::OutOfMemory { requested: size })?;

    unsafe { ptr::write_bytes(enlarged.as_ptr().add(*capacity), 0, size - *capacity) };

    *buffer = enlarged;
    *capacity = size;
    Ok(())
  }

  /// Gives an arena enlarged by a failed growth back to the primitives. If
  /// even that fails the larger arena is kept and reused by the next growth.
  fn restore_arena(
    &mut self,
    capacity: usize,
  ) {
    if capacity >= self.arena_capacity {
      return;
    }

    if let Some(arena) = unsafe {
      self
        .primitives
        .reallocate(self.arena, self.arena_capacity, capacity)
    } {
      self.arena = arena;
      self.arena_capacity = capacity;
    }
  }

  fn release_memory(&mut self) {
    if self.released {
      return;
    }

    unsafe {
      self.primitives.release(self.page_map, self.page_map_capacity);
      self.primitives.release(self.arena, self.arena_capacity);
    }
    self.released = true;

    debug!("dynamic store released");
  }
}

unsafe impl<P: Primitives> BackingStore for DynamicStore<P> {
  type Released = ();

  fn mode(&self) -> Mode {
    Mode::Dynamic
  }

  fn page_size(&self) -> usize {
    self.page_size
  }

  fn page_number(&self) -> usize {
    self.page_number
  }

  fn page_map_ptr(&self) -> NonNull<u8> {
    self.page_map
  }

  fn arena_ptr(&self) -> NonNull<u8> {
    self.arena
  }

  /// Doubles the page number until it reaches `target`.
  fn grow(
    &mut self,
    target: usize,
  ) -> Result<usize> {
    let mut page_number = self.page_number;
    while page_number < target {
      page_number = page_number
        .checked_mul(2)
        .ok_or(PagerError::OutOfMemory { requested: usize::MAX })?;
    }

    if page_number == self.page_number {
      return Ok(page_number);
    }

    let arena_size = page_number
      .checked_mul(self.page_size)
      .ok_or(PagerError::OutOfMemory { requested: usize::MAX })?;

    // The arena is the large buffer and the one likely to fail.
    let arena_capacity = self.arena_capacity;
    Self::enlarge(
      &mut self.primitives,
      &mut self.arena,
      &mut self.arena_capacity,
      arena_size,
    )?;
    if let Err(error) = Self::enlarge(
      &mut self.primitives,
      &mut self.page_map,
      &mut self.page_map_capacity,
      map_size(page_number),
    ) {
      self.restore_arena(arena_capacity);
      return Err(error);
    }

    let bits = unsafe { slice::from_raw_parts_mut(self.page_map.as_ptr(), self.page_map_capacity) };
    PageMap::new(bits, self.page_number)?.resize(page_number)?;

    debug!(
      "dynamic store grown from {} to {} pages, arena at {:?}",
      self.page_number, page_number, self.arena
    );

    self.page_number = page_number;
    Ok(page_number)
  }

  fn release(mut self) -> Self::Released {
    self.release_memory();
  }
}

impl<P: Primitives> Drop for DynamicStore<P> {
  fn drop(&mut self) {
    self.release_memory();
  }
}
