use std::alloc::{GlobalAlloc, Layout, System};

use crate::{
  align::MAX_ALIGN,
  brk::{Break, Sbrk},
  error::AllocError,
  heap::Heap,
};

/// A heap over the process program break.
///
/// ```rust,ignore
/// use brkalloc::SbrkHeap;
///
/// #[global_allocator]
/// static HEAP: SbrkHeap = SbrkHeap::sbrk();
/// ```
pub type SbrkHeap = Heap<Sbrk>;

impl Heap<Sbrk> {
  pub const fn sbrk() -> Self {
    Self::new(Sbrk::new())
  }
}

fn check_align(layout: &Layout) -> Result<(), AllocError> {
  if layout.align() > MAX_ALIGN {
    return Err(AllocError::Unaligned);
  }
  Ok(())
}

/// Layouts stricter than [`MAX_ALIGN`] bypass the break and go to
/// [`System`]. `dealloc` and `realloc` see the same layout, so they can
/// route such pointers back without any bookkeeping.
unsafe impl<B: Break> GlobalAlloc for Heap<B> {
  unsafe fn alloc(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if let Err(e) = check_align(&layout) {
      atrace!("{}: {} bytes aligned to {} go to the system", e, layout.size(), layout.align());
      return unsafe { System.alloc(layout) };
    }

    self.allocate(layout.size())
  }

  unsafe fn alloc_zeroed(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if check_align(&layout).is_err() {
      return unsafe { System.alloc_zeroed(layout) };
    }

    self.zero_allocate(1, layout.size())
  }

  unsafe fn dealloc(
    &self,
    address: *mut u8,
    layout: Layout,
  ) {
    if check_align(&layout).is_err() {
      return unsafe { System.dealloc(address, layout) };
    }

    unsafe { self.deallocate(address) }
  }

  unsafe fn realloc(
    &self,
    address: *mut u8,
    layout: Layout,
    new_size: usize,
  ) -> *mut u8 {
    if check_align(&layout).is_err() {
      return unsafe { System.realloc(address, layout, new_size) };
    }

    unsafe { self.resize(address, new_size) }
  }
}

/// `malloc`, `free`, `calloc` and `realloc` with C linkage, all served from
/// one process-wide [`SbrkHeap`].
///
/// `realloc(NULL, n)` and `realloc(p, 0)` both return `NULL` and leave `p`
/// allocated.
#[cfg(feature = "c-abi")]
pub mod c_abi {
  use libc::{c_void, size_t};

  use super::SbrkHeap;

  static HEAP: SbrkHeap = SbrkHeap::sbrk();

  #[unsafe(no_mangle)]
  pub extern "C" fn malloc(size: size_t) -> *mut c_void {
    HEAP.allocate(size) as *mut c_void
  }

  /// # Safety
  ///
  /// `block` must be null or a live pointer returned by this heap.
  #[unsafe(no_mangle)]
  pub unsafe extern "C" fn free(block: *mut c_void) {
    unsafe { HEAP.deallocate(block as *mut u8) }
  }

  #[unsafe(no_mangle)]
  pub extern "C" fn calloc(
    count: size_t,
    size: size_t,
  ) -> *mut c_void {
    HEAP.zero_allocate(count, size) as *mut c_void
  }

  /// # Safety
  ///
  /// `block` must be null or a live pointer returned by this heap.
  #[unsafe(no_mangle)]
  pub unsafe extern "C" fn realloc(
    block: *mut c_void,
    size: size_t,
  ) -> *mut c_void {
    unsafe { HEAP.resize(block as *mut u8, size) as *mut c_void }
  }
}
