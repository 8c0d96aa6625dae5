use crate::error::{PagerError, Result};

/// Default number of bytes per page.
pub const PAGE_SIZE: usize = 512;

/// Default number of pages a dynamic arena starts with.
pub const PAGE_MIN: usize = 8;

/// Construction-time parameters of an allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
  /// Bytes per page. Shared by the page map math and the arena sizing.
  pub page_size: usize,
  /// Initial page count of a dynamic arena. Ignored by fixed arenas.
  pub page_min: usize,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      page_size: PAGE_SIZE,
      page_min: PAGE_MIN,
    }
  }
}

impl Config {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_page_size(
    mut self,
    page_size: usize,
  ) -> Self {
    self.page_size = page_size;
    self
  }

  pub fn with_page_min(
    mut self,
    page_min: usize,
  ) -> Self {
    self.page_min = page_min;
    self
  }

  /// Checks everything a dynamic arena needs.
  pub fn validate(&self) -> Result<()> {
    self.validate_page_size()?;
    if self.page_min == 0 {
      return Err(PagerError::InvalidConfig("minimum page count must be non-zero"));
    }
    Ok(())
  }

  /// Checks only what a fixed arena uses.
  pub fn validate_page_size(&self) -> Result<()> {
    if self.page_size == 0 {
      return Err(PagerError::InvalidConfig("page size must be non-zero"));
    }
    Ok(())
  }
}
