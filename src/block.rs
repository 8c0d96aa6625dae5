/// Handle to one allocated run of pages.
///
/// A block names pages, not bytes: it stays meaningful when a dynamic arena
/// moves during growth. Resolve it through the allocator
/// ([`Allocator::ptr`](crate::Allocator::ptr),
/// [`Allocator::bytes`](crate::Allocator::bytes)) each time an address is
/// needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block {
  start: usize,
  pages: usize,
}

impl Block {
  pub(crate) fn new(
    start: usize,
    pages: usize,
  ) -> Self {
    Self { start, pages }
  }

  /// Index of the first page.
  pub fn start(&self) -> usize {
    self.start
  }

  /// Number of pages in the run.
  pub fn pages(&self) -> usize {
    self.pages
  }

  /// One past the last page.
  pub fn end(&self) -> usize {
    self.start + self.pages
  }
}
