use core::ptr::NonNull;

use libc::c_void;

/// The raw memory functions a dynamic arena is built on.
///
/// # Safety
///
/// Implementors must return pointers to at least the requested number of
/// writable bytes, exclusively owned by the caller until released, and
/// `reallocate` must keep the first `min(old_size, new_size)` bytes. When
/// `reallocate` returns `None`, the original allocation must be untouched.
pub unsafe trait Primitives {
  fn allocate(
    &mut self,
    size: usize,
  ) -> Option<NonNull<u8>>;

  /// # Safety
  ///
  /// `ptr` must come from this value's `allocate`/`reallocate` with
  /// `old_size` bytes and must not have been released.
  unsafe fn reallocate(
    &mut self,
    ptr: NonNull<u8>,
    old_size: usize,
    new_size: usize,
  ) -> Option<NonNull<u8>>;

  /// # Safety
  ///
  /// Same provenance requirements as [`Primitives::reallocate`]. The pointer
  /// is dead afterwards.
  unsafe fn release(
    &mut self,
    ptr: NonNull<u8>,
    size: usize,
  );
}

/// The C library heap: `malloc`, `realloc` and `free`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Libc;

unsafe impl Primitives for Libc {
  fn allocate(
    &mut self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    NonNull::new(unsafe { libc::malloc(size) }.cast())
  }

  unsafe fn reallocate(
    &mut self,
    ptr: NonNull<u8>,
    _old_size: usize,
    new_size: usize,
  ) -> Option<NonNull<u8>> {
    NonNull::new(unsafe { libc::realloc(ptr.as_ptr().cast::<c_void>(), new_size) }.cast())
  }

  unsafe fn release(
    &mut self,
    ptr: NonNull<u8>,
    _size: usize,
  ) {
    unsafe { libc::free(ptr.as_ptr().cast::<c_void>()) }
  }
}
