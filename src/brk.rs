use std::alloc::{GlobalAlloc, Layout, System};

use libc::{c_void, intptr_t, sbrk};

use crate::{align::MAX_ALIGN, error::AllocError};

/// A contiguous memory region whose upper boundary (the break) can be moved.
///
/// ```text
///   base                         top (break)
///   ▼                            ▼
///   ┌────────────────────────────┬─────────────────────┐
///   │      handed out so far     │    not yet mapped   │
///   └────────────────────────────┴─────────────────────┘
///                                 ───► adjust(+n)
///                          ◄─── adjust(-n)
/// ```
pub trait Break {
  /// Moves the break by `delta` bytes and returns the break as it was
  /// before the call, or `None` if the region cannot be adjusted.
  ///
  /// `adjust(0)` only queries the current break.
  ///
  /// # Safety
  ///
  /// Shrinking hands memory back: nothing may still point into the
  /// released range.
  unsafe fn adjust(
    &mut self,
    delta: isize,
  ) -> Option<*mut u8>;

  /// Whether the heap is the only thing moving this break, so its blocks
  /// must tile the region up to the break without gaps.
  fn is_exclusive(&self) -> bool {
    false
  }
}

/// The process program break, moved with `sbrk(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sbrk;

impl Sbrk {
  pub const fn new() -> Self {
    Self
  }
}

impl Break for Sbrk {
  unsafe fn adjust(
    &mut self,
    delta: isize,
  ) -> Option<*mut u8> {
    let address = unsafe { sbrk(delta as intptr_t) };

    if address == usize::MAX as *mut c_void {
      return None;
    }

    Some(address as *mut u8)
  }
}

/// A fixed-size region reserved once from the system allocator and handed
/// out through its own private break.
///
/// Every `Arena` is independent, which makes it the backing of choice for
/// heaps that must not share the process break.
#[derive(Debug)]
pub struct Arena {
  base: *mut u8,
  capacity: usize,
  top: usize,
}

// The arena exclusively owns its buffer.
unsafe impl Send for Arena {}

impl Arena {
  /// Reserves `capacity` bytes from the system allocator.
  ///
  /// # Panics
  ///
  /// Panics if the system allocator cannot provide the buffer. Use
  /// [`Arena::try_new`] to handle that case.
  pub fn new(capacity: usize) -> Self {
    match Self::try_new(capacity) {
      Ok(arena) => arena,
      Err(e) => panic!("cannot reserve an arena of {capacity} bytes: {e}"),
    }
  }

  pub fn try_new(capacity: usize) -> Result<Self, AllocError> {
    let layout = Self::layout(capacity).ok_or(AllocError::Overflow)?;
    let base = unsafe { System.alloc(layout) };

    if base.is_null() {
      return Err(AllocError::Exhausted);
    }

    Ok(Self { base, capacity, top: 0 })
  }

  fn layout(capacity: usize) -> Option<Layout> {
    Layout::from_size_align(capacity.max(MAX_ALIGN), MAX_ALIGN).ok()
  }

  pub fn base(&self) -> *mut u8 {
    self.base
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Current break of the arena.
  pub fn top(&self) -> *mut u8 {
    self.base.wrapping_add(self.top)
  }
}

impl Break for Arena {
  unsafe fn adjust(
    &mut self,
    delta: isize,
  ) -> Option<*mut u8> {
    let previous = self.top();

    let top = if delta >= 0 {
      self.top.checked_add(delta as usize).filter(|&top| top <= self.capacity)?
    } else {
      self.top.checked_sub(delta.unsigned_abs())?
    };

    self.top = top;
    Some(previous)
  }

  fn is_exclusive(&self) -> bool {
    true
  }
}

impl Drop for Arena {
  fn drop(&mut self) {
    if let Some(layout) = Self::layout(self.capacity) {
      unsafe { System.dealloc(self.base, layout) };
    }
  }
}
