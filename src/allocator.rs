use core::{fmt, ptr::NonNull};

use log::{debug, trace};

use crate::{
  block::Block,
  ceiling,
  config::Config,
  error::{PagerError, Result},
  page_map::{PageMap, PageState},
  primitives::{Libc, Primitives},
  store::{BackingStore, DynamicStore, FixedStore, Mode},
};

/// Page allocator over a [`BackingStore`].
///
/// `used_number` always equals the number of non-`Unused` pages in the page
/// map. Operations that fail leave both untouched.
pub struct Allocator<S: BackingStore> {
  store: S,
  used_number: usize,
}

/// Allocator over a caller-supplied buffer.
pub type FixedAllocator<'a> = Allocator<FixedStore<'a>>;

/// Growable allocator over the C library heap.
pub type DefaultAllocator = Allocator<DynamicStore<Libc>>;

impl<'a> Allocator<FixedStore<'a>> {
  pub fn init_fixed(buffer: &'a mut [u8]) -> Result<Self> {
    Self::init_fixed_with(buffer, Config::default())
  }

  /// Lays the page map and the arena out inside `buffer`. The buffer is
  /// handed back by [`Allocator::shutdown`].
  pub fn init_fixed_with(
    buffer: &'a mut [u8],
    config: Config,
  ) -> Result<Self> {
    config.validate_page_size()?;
    Ok(Self::with_store(FixedStore::new(buffer, config.page_size)?))
  }
}

impl Allocator<DynamicStore<Libc>> {
  pub fn init_default() -> Result<Self> {
    Self::init_default_with(Config::default())
  }

  pub fn init_default_with(config: Config) -> Result<Self> {
    Self::init_custom_with(Libc, config)
  }
}

impl<P: Primitives> Allocator<DynamicStore<P>> {
  pub fn init_custom(primitives: P) -> Result<Self> {
    Self::init_custom_with(primitives, Config::default())
  }

  /// Starts with `config.page_min` pages obtained through `primitives`.
  /// Nothing is retained if either buffer cannot be acquired.
  pub fn init_custom_with(
    primitives: P,
    config: Config,
  ) -> Result<Self> {
    Ok(Self::with_store(DynamicStore::new(primitives, &config)?))
  }

  pub fn primitives(&self) -> &P {
    self.store.primitives()
  }
}

impl<S: BackingStore> Allocator<S> {
  fn with_store(store: S) -> Self {
    let mut allocator = Self {
      store,
      used_number: 0,
    };
    allocator.page_map_mut().clear();

    debug!(
      "{:?} allocator ready: {} pages, page map {} bytes, arena {} bytes",
      allocator.mode(),
      allocator.page_number(),
      allocator.page_map_size(),
      allocator.mem_bank_size()
    );

    allocator
  }

  pub fn mode(&self) -> Mode {
    self.store.mode()
  }

  pub fn page_size(&self) -> usize {
    self.store.page_size()
  }

  pub fn page_number(&self) -> usize {
    self.store.page_number()
  }

  /// Pages currently part of an allocated block.
  pub fn used_number(&self) -> usize {
    self.used_number
  }

  pub fn free_number(&self) -> usize {
    self.page_number() - self.used_number
  }

  pub fn page_map_size(&self) -> usize {
    self.store.page_map_size()
  }

  pub fn mem_bank_size(&self) -> usize {
    self.store.mem_bank_size()
  }

  pub fn page_map(&self) -> PageMap<&[u8]> {
    PageMap::from_parts(self.store.page_map(), self.page_number())
  }

  fn page_map_mut(&mut self) -> PageMap<&mut [u8]> {
    let page_number = self.page_number();
    let (bits, _) = self.store.parts_mut();
    PageMap::from_parts(bits, page_number)
  }

  /// Reserves `ceil(size / page_size)` contiguous pages, lowest address
  /// first. A dynamic arena grows once if no run is free.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<Block> {
    let pages = ceiling!(size, self.page_size());
    if pages < 1 {
      return Err(PagerError::InvalidSize);
    }

    let found = self.page_map().find_free_run(pages);
    let start = match found {
      Some(start) => start,
      None => self.grow_for(size, pages)?,
    };

    self.page_map_mut().mark_run(start, pages)?;
    self.used_number += pages;

    trace!("allocated {} pages at page {}", pages, start);

    Ok(Block::new(start, pages))
  }

  /// The single growth step of an allocation that did not fit.
  fn grow_for(
    &mut self,
    size: usize,
    pages: usize,
  ) -> Result<usize> {
    if self.mode() == Mode::Fixed {
      return Err(PagerError::OutOfMemory { requested: size });
    }

    let failed = PagerError::AllocationFailed { pages };
    let target = self.page_number().checked_add(pages).ok_or(failed)?;

    self.store.grow(target).map_err(|_| failed)?;
    self.page_map().find_free_run(pages).ok_or(failed)
  }

  /// Releases `block`. Returns the number of pages freed.
  pub fn free(
    &mut self,
    block: Block,
  ) -> Result<usize> {
    self.check(block)?;

    let pages = self.page_map_mut().clear_run(block.start())?;
    self.used_number -= pages;

    trace!("freed {} pages at page {}", pages, block.start());

    Ok(pages)
  }

  /// Releases the block starting at `ptr`.
  pub fn free_ptr(
    &mut self,
    ptr: *const u8,
  ) -> Result<usize> {
    let block = self.block_at(ptr)?;
    self.free(block)
  }

  /// The live block whose first byte is `ptr`.
  pub fn block_at(
    &self,
    ptr: *const u8,
  ) -> Result<Block> {
    let address = ptr as usize;
    let invalid = PagerError::InvalidPointer { address };

    let offset = address
      .checked_sub(self.store.arena_ptr().as_ptr() as usize)
      .ok_or(invalid)?;
    if offset >= self.mem_bank_size() || offset % self.page_size() != 0 {
      return Err(invalid);
    }

    let start = offset / self.page_size();
    let pages = self.page_map().run_len(start).map_err(|_| invalid)?;

    Ok(Block::new(start, pages))
  }

  /// Resizes `block` to `ceil(size / page_size)` pages, in place when the
  /// pages after it are free, by moving it otherwise. Contents are kept up
  /// to the smaller of both sizes. On failure `block` is left as it was.
  pub fn reallocate(
    &mut self,
    block: Block,
    size: usize,
  ) -> Result<Block> {
    self.check(block)?;

    let pages = ceiling!(size, self.page_size());
    if pages < 1 {
      return Err(PagerError::InvalidSize);
    }

    let start = block.start();

    if pages <= block.pages() {
      let mut map = self.page_map_mut();
      for index in (start + pages)..block.end() {
        map.set(index, PageState::Unused)?;
      }
      map.mark_run(start, pages)?;
      self.used_number -= block.pages() - pages;
      return Ok(Block::new(start, pages));
    }

    let extra = pages - block.pages();
    let map = self.page_map();
    let fits = start
      .checked_add(pages)
      .is_some_and(|end| end <= self.page_number())
      && (block.end()..start + pages).all(|index| map.get(index) == Ok(PageState::Unused));

    if fits {
      self.page_map_mut().mark_run(start, pages)?;
      self.used_number += extra;
      trace!("extended block at page {} to {} pages", start, pages);
      return Ok(Block::new(start, pages));
    }

    let moved = self.allocate(size)?;
    let page_size = self.page_size();
    let (_, arena) = self.store.parts_mut();
    arena.copy_within(
      (start * page_size)..(block.end() * page_size),
      moved.start() * page_size,
    );
    self.free(block)?;

    trace!("moved block from page {} to page {}", start, moved.start());

    Ok(moved)
  }

  /// Current address of `block`. Recompute it after anything that may grow
  /// the arena.
  pub fn ptr(
    &self,
    block: Block,
  ) -> Result<NonNull<u8>> {
    self.check(block)?;
    let offset = block.start() * self.page_size();
    Ok(unsafe { NonNull::new_unchecked(self.store.arena_ptr().as_ptr().add(offset)) })
  }

  pub fn bytes(
    &self,
    block: Block,
  ) -> Result<&[u8]> {
    self.check(block)?;
    let page_size = self.page_size();
    Ok(&self.store.arena()[(block.start() * page_size)..(block.end() * page_size)])
  }

  pub fn bytes_mut(
    &mut self,
    block: Block,
  ) -> Result<&mut [u8]> {
    self.check(block)?;
    let page_size = self.page_size();
    let (_, arena) = self.store.parts_mut();
    Ok(&mut arena[(block.start() * page_size)..(block.end() * page_size)])
  }

  /// Tears the allocator down. A fixed allocator hands the caller's buffer
  /// back; a dynamic one releases its memory and returns nothing.
  pub fn shutdown(self) -> S::Released {
    debug!(
      "{:?} allocator shut down with {} of {} pages in use",
      self.mode(),
      self.used_number,
      self.page_number()
    );
    self.store.release()
  }

  /// Whether `block` still names a live block of the same length.
  fn check(
    &self,
    block: Block,
  ) -> Result<()> {
    match self.page_map().run_len(block.start()) {
      Ok(pages) if pages == block.pages() => Ok(()),
      _ => Err(PagerError::InvalidPointer {
        address: self.address_of(block.start()),
      }),
    }
  }

  fn address_of(
    &self,
    page: usize,
  ) -> usize {
    (self.store.arena_ptr().as_ptr() as usize).wrapping_add(page.wrapping_mul(self.page_size()))
  }
}

impl<S: BackingStore> fmt::Debug for Allocator<S> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("Allocator")
      .field("mode", &self.mode())
      .field("page_size", &self.page_size())
      .field("page_number", &self.page_number())
      .field("used_number", &self.used_number)
      .field("page_map", &self.page_map())
      .finish()
  }
}
