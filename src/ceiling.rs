/// Integer division of `$value` by `$unit`, rounded up. Both must be unsigned.
///
/// Used for both page counts (`bytes -> pages`) and page map sizes
/// (`pages -> bytes`, four pages per byte).
///
/// # Examples
///
/// ```rust
/// use pager::ceiling;
///
/// assert_eq!(ceiling!(513usize, 512), 2);
/// assert_eq!(ceiling!(8usize, 4), 2);
/// assert_eq!(ceiling!(0usize, 4), 0);
/// ```
#[macro_export]
macro_rules! ceiling {
  ($value:expr, $unit:expr) => {
    ($value).div_ceil($unit)
  };
}

#[cfg(test)]
mod tests {
  #[test]
  fn test_ceiling() {
    let unit: usize = 4;

    let mut ceilings = Vec::new();

    for i in 0..10 {
      let values = (unit * i + 1)..=(unit * (i + 1));

      let expected = i + 1;

      ceilings.push((values, expected));
    }

    for (values, expected) in ceilings {
      for value in values {
        assert_eq!(expected, ceiling!(value, unit));
      }
    }

    assert_eq!(0, ceiling!(0usize, unit));
  }
}
