use std::fmt;

/// Why a request produced no allocation.
///
/// The C-style entry points fold every variant into a null pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
  /// A zero-byte request, or a resize of a null pointer. Not a failure.
  ZeroSize,
  /// The break could not be moved far enough.
  Exhausted,
  /// `count * element_size` does not fit in a `usize`.
  Overflow,
  /// The layout asks for more than `MAX_ALIGN` alignment.
  Unaligned,
}

impl fmt::Display for AllocError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      AllocError::ZeroSize => write!(f, "zero-sized request"),
      AllocError::Exhausted => write!(f, "the heap cannot grow any further"),
      AllocError::Overflow => write!(f, "allocation size overflows usize"),
      AllocError::Unaligned => write!(f, "requested alignment exceeds the heap's maximum"),
    }
  }
}

impl std::error::Error for AllocError {}

/// An inconsistency found while walking the heap directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptionError {
  /// Exactly one of `head` and `tail` is null.
  HeadTailMismatch,
  /// The list loops back on itself.
  Cycle { at: usize },
  /// The walk ended somewhere other than `tail`.
  DanglingTail { last: usize, tail: usize },
  /// A header starts before the previous block ends.
  Overlap { previous_end: usize, header: usize },
  /// Bytes between two consecutive blocks belong to no block.
  Gap { previous_end: usize, header: usize },
  /// The tail block does not end at or below the break.
  BeyondBreak { end: usize, top: usize },
  /// The tail block ends below a break only the heap moves.
  BelowBreak { end: usize, top: usize },
}

impl fmt::Display for CorruptionError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      CorruptionError::HeadTailMismatch => write!(f, "head and tail disagree about emptiness"),
      CorruptionError::Cycle { at } => write!(f, "cycle detected at header {at:#x}"),
      CorruptionError::DanglingTail { last, tail } => {
        write!(f, "list ends at {last:#x} but tail is {tail:#x}")
      }
      CorruptionError::Overlap { previous_end, header } => {
        write!(f, "header {header:#x} overlaps block ending at {previous_end:#x}")
      }
      CorruptionError::Gap { previous_end, header } => {
        write!(f, "unowned bytes between {previous_end:#x} and header {header:#x}")
      }
      CorruptionError::BeyondBreak { end, top } => {
        write!(f, "block ends at {end:#x}, past the break at {top:#x}")
      }
      CorruptionError::BelowBreak { end, top } => {
        write!(f, "last block ends at {end:#x}, short of the break at {top:#x}")
      }
    }
  }
}

impl std::error::Error for CorruptionError {}
