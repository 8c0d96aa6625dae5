//! Primitives for tests that need to watch or break the backing store.

use core::ptr::NonNull;
use std::{cell::RefCell, rc::Rc};

use crate::primitives::{Libc, Primitives};

/// What a [`Tracking`] set of primitives saw.
#[derive(Debug, Default)]
pub(crate) struct Ledger {
  pub allocations: usize,
  pub reallocations: usize,
  pub releases: usize,
  pub live: usize,
  /// Fail the allocation with this zero-based ordinal.
  pub fail_allocation: Option<usize>,
  /// Fail the reallocation with this zero-based ordinal.
  pub fail_reallocation: Option<usize>,
}

/// Libc primitives that keep a shared ledger and can be told to fail.
#[derive(Clone, Default)]
pub(crate) struct Tracking(pub Rc<RefCell<Ledger>>);

unsafe impl Primitives for Tracking {
  fn allocate(
    &mut self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    let mut ledger = self.0.borrow_mut();
    let ordinal = ledger.allocations;
    ledger.allocations += 1;

    if ledger.fail_allocation == Some(ordinal) {
      return None;
    }

    let allocated = Libc.allocate(size);
    if allocated.is_some() {
      ledger.live += 1;
    }
    allocated
  }

  unsafe fn reallocate(
    &mut self,
    ptr: NonNull<u8>,
    old_size: usize,
    new_size: usize,
  ) -> Option<NonNull<u8>> {
    let mut ledger = self.0.borrow_mut();
    let ordinal = ledger.reallocations;
    ledger.reallocations += 1;

    if ledger.fail_reallocation == Some(ordinal) {
      return None;
    }

    unsafe { Libc.reallocate(ptr, old_size, new_size) }
  }

  unsafe fn release(
    &mut self,
    ptr: NonNull<u8>,
    size: usize,
  ) {
    let mut ledger = self.0.borrow_mut();
    ledger.releases += 1;
    ledger.live -= 1;

    unsafe { Libc.release(ptr, size) }
  }
}
