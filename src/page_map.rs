//! The 2-bit-per-page state map.
//!
//! ```text
//!   byte 0                      byte 1
//!   ┌──────┬──────┬──────┬──────┐┌──────┬──────┬──────┬──────┐
//!   │ p0   │ p1   │ p2   │ p3   ││ p4   │ p5   │ p6   │ p7   │
//!   │ 7..6 │ 5..4 │ 3..2 │ 1..0 ││ 7..6 │ 5..4 │ 3..2 │ 1..0 │
//!   └──────┴──────┴──────┴──────┘└──────┴──────┴──────┴──────┘
//!
//!   00 Unused   01 Start   10 Continue   11 End
//! ```
//!
//! A block of several pages reads `Start Continue* End`. A block of a single
//! page is a lone `End`, which is told apart from the tail of a longer block
//! by looking at the page before it.

use core::fmt;

use crate::{
  ceiling,
  error::{PagerError, Result},
};

pub const PAGES_PER_BYTE: usize = 4;

const LETTERS: [char; 4] = ['X', 'A', 'B', 'C'];

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
  Unused = 0,
  Start = 1,
  Continue = 2,
  End = 3,
}

impl PageState {
  fn from_bits(bits: u8) -> Self {
    match bits & 0b11 {
      0 => PageState::Unused,
      1 => PageState::Start,
      2 => PageState::Continue,
      _ => PageState::End,
    }
  }

  pub fn is_used(self) -> bool {
    self != PageState::Unused
  }
}

/// Number of bytes needed to map `page_number` pages.
pub fn map_size(page_number: usize) -> usize {
  ceiling!(page_number, PAGES_PER_BYTE)
}

/// Byte index and bit shift of a page's field. The first page of a byte
/// lives in its most significant bits.
#[inline(always)]
fn locate(index: usize) -> (usize, usize) {
  (
    index / PAGES_PER_BYTE,
    (PAGES_PER_BYTE - 1 - index % PAGES_PER_BYTE) * 2,
  )
}

/// A view of `page_number` packed page states over some byte storage.
pub struct PageMap<B> {
  bits: B,
  page_number: usize,
}

impl<B: AsRef<[u8]>> PageMap<B> {
  /// Wraps `bits` as the map of `page_number` pages. The storage may be
  /// longer than needed; the extra bytes are left alone.
  pub fn new(
    bits: B,
    page_number: usize,
  ) -> Result<Self> {
    let capacity = bits.as_ref().len() * PAGES_PER_BYTE;
    if page_number > capacity {
      return Err(PagerError::IndexOutOfRange {
        index: page_number - 1,
        page_number: capacity,
      });
    }

    Ok(Self { bits, page_number })
  }

  /// Storage already known to hold `page_number` pages.
  pub(crate) fn from_parts(
    bits: B,
    page_number: usize,
  ) -> Self {
    debug_assert!(bits.as_ref().len() >= map_size(page_number));
    Self { bits, page_number }
  }

  pub fn len(&self) -> usize {
    self.page_number
  }

  pub fn is_empty(&self) -> bool {
    self.page_number == 0
  }

  /// Bytes actually used by the map, `ceil(page_number / 4)`.
  pub fn map_size(&self) -> usize {
    map_size(self.page_number)
  }

  pub fn as_bytes(&self) -> &[u8] {
    &self.bits.as_ref()[..self.map_size()]
  }

  pub fn get(
    &self,
    index: usize,
  ) -> Result<PageState> {
    self.check(index)?;
    Ok(PageState::from_bits(self.raw_unchecked(index)))
  }

  /// The raw 2-bit value stored for `index`.
  pub fn raw(
    &self,
    index: usize,
  ) -> Result<u8> {
    self.check(index)?;
    Ok(self.raw_unchecked(index))
  }

  pub fn iter(&self) -> impl Iterator<Item = PageState> + '_ {
    (0..self.page_number).map(|index| PageState::from_bits(self.raw_unchecked(index)))
  }

  /// Number of pages in any state other than `Unused`.
  pub fn used(&self) -> usize {
    self.iter().filter(|state| state.is_used()).count()
  }

  /// First-fit search for `n` consecutive unused pages, lowest index first.
  pub fn find_free_run(
    &self,
    n: usize,
  ) -> Option<usize> {
    if n == 0 || n > self.page_number {
      return None;
    }

    let bytes = self.bits.as_ref();
    let mut run = 0;
    let mut index = 0;

    while index < self.page_number {
      // Four free pages at once when a whole byte is clear.
      if index % PAGES_PER_BYTE == 0
        && index + PAGES_PER_BYTE <= self.page_number
        && bytes[index / PAGES_PER_BYTE] == 0
      {
        run += PAGES_PER_BYTE;
        index += PAGES_PER_BYTE;
      } else {
        if self.raw_unchecked(index) == PageState::Unused as u8 {
          run += 1;
        } else {
          run = 0;
        }
        index += 1;
      }

      if run >= n {
        return Some(index - run);
      }
    }

    None
  }

  /// Whether `index` is the first page of an allocated block.
  pub fn is_block_start(
    &self,
    index: usize,
  ) -> Result<bool> {
    Ok(match self.get(index)? {
      PageState::Start => true,
      PageState::End => {
        index == 0
          || !matches!(
            PageState::from_bits(self.raw_unchecked(index - 1)),
            PageState::Start | PageState::Continue
          )
      }
      _ => false,
    })
  }

  /// Number of pages in the block starting at `start`.
  pub fn run_len(
    &self,
    start: usize,
  ) -> Result<usize> {
    if !self.is_block_start(start)? {
      return Err(PagerError::InvalidStart { index: start });
    }

    if self.get(start)? == PageState::End {
      return Ok(1);
    }

    for index in (start + 1)..self.page_number {
      match PageState::from_bits(self.raw_unchecked(index)) {
        PageState::Continue => continue,
        PageState::End => return Ok(index - start + 1),
        _ => break,
      }
    }

    // A start that never reaches its end.
    Err(PagerError::InvalidStart { index: start })
  }

  fn check(
    &self,
    index: usize,
  ) -> Result<()> {
    if index >= self.page_number {
      return Err(PagerError::IndexOutOfRange {
        index,
        page_number: self.page_number,
      });
    }
    Ok(())
  }

  #[inline(always)]
  fn raw_unchecked(
    &self,
    index: usize,
  ) -> u8 {
    let (byte, shift) = locate(index);
    (self.bits.as_ref()[byte] >> shift) & 0b11
  }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> PageMap<B> {
  pub fn set(
    &mut self,
    index: usize,
    state: PageState,
  ) -> Result<()> {
    self.check(index)?;
    self.set_unchecked(index, state);
    Ok(())
  }

  /// Marks every page `Unused`, padding bits included.
  pub fn clear(&mut self) {
    let size = self.map_size();
    self.bits.as_mut()[..size].fill(0);
  }

  /// Marks `n` pages from `start` as one block.
  pub fn mark_run(
    &mut self,
    start: usize,
    n: usize,
  ) -> Result<()> {
    if n == 0 || start >= self.page_number || n > self.page_number - start {
      return Err(PagerError::IndexOutOfRange {
        index: start.saturating_add(n.max(1) - 1),
        page_number: self.page_number,
      });
    }

    let last = start + n - 1;
    if n > 1 {
      self.set_unchecked(start, PageState::Start);
      for index in (start + 1)..last {
        self.set_unchecked(index, PageState::Continue);
      }
    }
    self.set_unchecked(last, PageState::End);

    Ok(())
  }

  /// Frees the block starting at `start` and returns its page count. The
  /// whole run is checked before anything is written.
  pub fn clear_run(
    &mut self,
    start: usize,
  ) -> Result<usize> {
    let n = self.run_len(start)?;
    for index in start..(start + n) {
      self.set_unchecked(index, PageState::Unused);
    }
    Ok(n)
  }

  /// Extends the map to `page_number` pages. Existing states are kept and
  /// the new pages start out `Unused`.
  pub fn resize(
    &mut self,
    page_number: usize,
  ) -> Result<()> {
    if page_number < self.page_number {
      return Err(PagerError::IndexOutOfRange {
        index: page_number,
        page_number: self.page_number,
      });
    }

    let capacity = self.bits.as_ref().len() * PAGES_PER_BYTE;
    if page_number > capacity {
      return Err(PagerError::IndexOutOfRange {
        index: page_number - 1,
        page_number: capacity,
      });
    }

    let old = self.page_number;
    self.page_number = page_number;
    for index in old..page_number {
      self.set_unchecked(index, PageState::Unused);
    }

    Ok(())
  }

  #[inline(always)]
  fn set_unchecked(
    &mut self,
    index: usize,
    state: PageState,
  ) {
    let (byte, shift) = locate(index);
    let slot = &mut self.bits.as_mut()[byte];
    *slot = (*slot & !(0b11 << shift)) | ((state as u8) << shift);
  }
}

/// One letter per page: `X` unused, `A` start, `B` continue, `C` end. The
/// alternate form prints four pages per line behind the hex value of their
/// byte.
impl<B: AsRef<[u8]>> fmt::Display for PageMap<B> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    let bytes = self.bits.as_ref();

    for index in 0..self.page_number {
      let letter = LETTERS[self.raw_unchecked(index) as usize];

      if !f.alternate() {
        write!(f, "{}", letter)?;
        continue;
      }

      if index % PAGES_PER_BYTE == 0 {
        if index > 0 {
          writeln!(f)?;
        }
        write!(f, "{:02x}: ", bytes[index / PAGES_PER_BYTE])?;
      }
      write!(f, "{} ", letter)?;
    }

    Ok(())
  }
}

impl<B: AsRef<[u8]>> fmt::Debug for PageMap<B> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "PageMap[{}] {}", self.page_number, self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn page_map(page_number: usize) -> PageMap<Vec<u8>> {
    PageMap::new(vec![0; map_size(page_number)], page_number).unwrap()
  }

  #[test]
  fn test_map_size() {
    assert_eq!(map_size(1), 1);
    assert_eq!(map_size(4), 1);
    assert_eq!(map_size(5), 2);
    assert_eq!(map_size(8), 2);
    assert_eq!(map_size(9), 3);
  }

  #[test]
  fn test_new_rejects_short_storage() {
    assert!(matches!(
      PageMap::new(vec![0u8; 1], 5),
      Err(PagerError::IndexOutOfRange { index: 4, page_number: 4 })
    ));
    assert!(PageMap::new(vec![0u8; 2], 5).is_ok());
  }

  #[test]
  fn test_fresh_map_is_unused() {
    let map = page_map(8);
    assert!(map.iter().all(|state| state == PageState::Unused));
    assert_eq!(map.used(), 0);
    assert_eq!(map.to_string(), "XXXXXXXX");
  }

  #[test]
  fn test_get_set() {
    let mut map = page_map(6);

    map.set(0, PageState::Start).unwrap();
    map.set(1, PageState::Continue).unwrap();
    map.set(5, PageState::End).unwrap();

    assert_eq!(map.get(0).unwrap(), PageState::Start);
    assert_eq!(map.get(1).unwrap(), PageState::Continue);
    assert_eq!(map.get(2).unwrap(), PageState::Unused);
    assert_eq!(map.get(5).unwrap(), PageState::End);

    // First page in the high bits.
    assert_eq!(map.as_bytes(), &[0b0110_0000, 0b0011_0000]);

    map.set(1, PageState::Unused).unwrap();
    assert_eq!(map.get(0).unwrap(), PageState::Start);
    assert_eq!(map.get(1).unwrap(), PageState::Unused);
  }

  #[test]
  fn test_out_of_range() {
    let mut map = page_map(5);

    assert_eq!(
      map.get(5),
      Err(PagerError::IndexOutOfRange { index: 5, page_number: 5 })
    );
    assert!(map.set(7, PageState::End).is_err());
    assert!(map.raw(5).is_err());
  }

  #[test]
  fn test_mark_run() {
    let mut map = page_map(8);

    map.mark_run(1, 4).unwrap();
    assert_eq!(map.to_string(), "XABBCXXX");

    map.mark_run(6, 1).unwrap();
    assert_eq!(map.to_string(), "XABBCXCX");

    map.mark_run(5, 1).unwrap();
    assert_eq!(map.to_string(), "XABBCCCX");

    assert_eq!(map.used(), 6);
  }

  #[test]
  fn test_mark_run_rejects_overflow() {
    let mut map = page_map(8);

    assert!(map.mark_run(6, 3).is_err());
    assert!(map.mark_run(0, 0).is_err());
    assert!(map.mark_run(8, 1).is_err());
    assert_eq!(map.used(), 0);
  }

  #[test]
  fn test_find_free_run_first_fit() {
    let mut map = page_map(16);

    assert_eq!(map.find_free_run(1), Some(0));
    assert_eq!(map.find_free_run(16), Some(0));
    assert_eq!(map.find_free_run(17), None);
    assert_eq!(map.find_free_run(0), None);

    map.mark_run(0, 2).unwrap();
    map.mark_run(4, 1).unwrap();
    // Free: 2..4, 5..16

    assert_eq!(map.find_free_run(1), Some(2));
    assert_eq!(map.find_free_run(2), Some(2));
    assert_eq!(map.find_free_run(3), Some(5));
    assert_eq!(map.find_free_run(11), Some(5));
    assert_eq!(map.find_free_run(12), None);
  }

  #[test]
  fn test_find_free_run_partial_last_byte() {
    let mut map = page_map(6);
    map.mark_run(0, 3).unwrap();

    assert_eq!(map.find_free_run(3), Some(3));
    assert_eq!(map.find_free_run(4), None);
  }

  #[test]
  fn test_find_free_run_across_clear_bytes() {
    let mut map = page_map(12);
    map.mark_run(0, 3).unwrap();

    // Page 3 then the clear byte holding 4..8.
    assert_eq!(map.find_free_run(5), Some(3));
    assert_eq!(map.find_free_run(9), Some(3));
  }

  #[test]
  fn test_block_start() {
    let mut map = page_map(8);
    map.mark_run(0, 3).unwrap();
    map.mark_run(3, 1).unwrap();
    map.mark_run(5, 2).unwrap();

    let starts: Vec<bool> = (0..8).map(|index| map.is_block_start(index).unwrap()).collect();
    assert_eq!(starts, [true, false, false, true, false, true, false, false]);
  }

  #[test]
  fn test_single_page_block_at_zero() {
    let mut map = page_map(4);
    map.mark_run(0, 1).unwrap();

    assert!(map.is_block_start(0).unwrap());
    assert_eq!(map.run_len(0).unwrap(), 1);
  }

  #[test]
  fn test_clear_run() {
    let mut map = page_map(8);
    map.mark_run(0, 3).unwrap();
    map.mark_run(3, 1).unwrap();
    map.mark_run(4, 4).unwrap();

    assert_eq!(map.clear_run(3).unwrap(), 1);
    assert_eq!(map.to_string(), "ABCXABBC");

    assert_eq!(map.clear_run(4).unwrap(), 4);
    assert_eq!(map.to_string(), "ABCXXXXX");

    assert_eq!(map.clear_run(0).unwrap(), 3);
    assert_eq!(map.used(), 0);
  }

  #[test]
  fn test_clear_run_invalid_start() {
    let mut map = page_map(8);
    map.mark_run(0, 3).unwrap();

    assert_eq!(map.clear_run(1), Err(PagerError::InvalidStart { index: 1 }));
    assert_eq!(map.clear_run(2), Err(PagerError::InvalidStart { index: 2 }));
    assert_eq!(map.clear_run(5), Err(PagerError::InvalidStart { index: 5 }));
    assert_eq!(map.to_string(), "ABCXXXXX");
  }

  #[test]
  fn test_clear_run_unterminated() {
    let mut map = page_map(4);
    map.set(1, PageState::Start).unwrap();
    map.set(2, PageState::Continue).unwrap();

    assert_eq!(map.clear_run(1), Err(PagerError::InvalidStart { index: 1 }));
    assert_eq!(map.to_string(), "XABX");
  }

  #[test]
  fn test_resize_keeps_states() {
    let mut map = PageMap::new(vec![0xFFu8; 4], 5).unwrap();
    map.clear();
    map.mark_run(1, 3).unwrap();

    // Garbage past the old map must not leak into new pages.
    map.bits[2] = 0xFF;
    map.bits[3] = 0xFF;

    map.resize(16).unwrap();
    assert_eq!(map.len(), 16);
    assert_eq!(map.to_string(), "XABCXXXXXXXXXXXX");
    assert_eq!(map.map_size(), 4);
  }

  #[test]
  fn test_resize_rejects() {
    let mut map = page_map(8);

    assert!(map.resize(4).is_err());
    assert!(map.resize(9).is_err());
    assert_eq!(map.len(), 8);
  }

  #[test]
  fn test_render_alternate() {
    let mut map = page_map(6);
    map.mark_run(0, 2).unwrap();
    map.mark_run(4, 1).unwrap();

    assert_eq!(format!("{:#}", map), "70: A C X X \nc0: C X ");
    assert_eq!(format!("{:?}", map), "PageMap[6] ACXXCX");
  }
}
