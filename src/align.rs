/// The strictest alignment any payload handed out by this crate satisfies.
///
/// Matches the platform's maximum scalar alignment (`max_align_t`) on the
/// 64 bit targets we care about.
pub const MAX_ALIGN: usize = 16;

/// Rounds a byte count up to the next multiple of [`MAX_ALIGN`].
///
/// # Examples
///
/// ```rust
/// use brkalloc::align;
///
/// assert_eq!(align!(0), 0);
/// assert_eq!(align!(1), 16);
/// assert_eq!(align!(16), 16);
/// assert_eq!(align!(100), 112);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + $crate::align::MAX_ALIGN - 1) & !($crate::align::MAX_ALIGN - 1)
  };
}

/// Bytes needed to move `addr` forward onto a [`MAX_ALIGN`] boundary.
pub fn padding_for(addr: usize) -> usize {
  align!(addr) - addr
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_align() {
    let mut alignments = Vec::new();

    for i in 0..10 {
      let sizes = (MAX_ALIGN * i + 1)..=(MAX_ALIGN * (i + 1));

      let expected_alignment = MAX_ALIGN * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align!(size));
      }
    }
  }

  #[test]
  fn test_padding_for() {
    assert_eq!(padding_for(0x1000), 0);
    assert_eq!(padding_for(0x1001), 15);
    assert_eq!(padding_for(0x100f), 1);
    assert_eq!(padding_for(0x1008), 8);
  }
}
