use std::{mem, ptr};

use crate::{align, align::MAX_ALIGN};

/// Metadata written immediately in front of every payload.
///
/// ```text
///   ┌──────┬──────────────────┬──────────────────────────┐
///   │ lead │      Header      │  payload: align!(size)   │
///   └──────┴──────────────────┴──────────────────────────┘
///   ▲      ▲                  ▲                          ▲
///   old    header             pointer returned           end of block
///   break                     to the caller
/// ```
#[repr(C, align(16))]
pub struct Header {
  /// Usable payload bytes as requested by the caller.
  pub size: usize,
  pub next: *mut Header,
  /// Padding inserted before this header to land it on a `MAX_ALIGN` boundary.
  pub lead: usize,
  pub is_free: bool,
}

pub const HEADER_SIZE: usize = mem::size_of::<Header>();

const _: () = assert!(HEADER_SIZE % MAX_ALIGN == 0);

impl Header {
  pub fn new(
    size: usize,
    lead: usize,
  ) -> Self {
    Self {
      size,
      next: ptr::null_mut(),
      lead,
      is_free: false,
    }
  }

  /// Bytes the payload occupies in the heap region.
  pub fn span(&self) -> usize {
    align!(self.size)
  }

  /// Bytes to hand back to the break when this block is released.
  pub fn footprint(&self) -> usize {
    self.lead + HEADER_SIZE + self.span()
  }

  /// Pointer to the payload that follows `header`.
  ///
  /// # Safety
  ///
  /// `header` must point at a header written by the allocator.
  pub unsafe fn payload(header: *mut Header) -> *mut u8 {
    unsafe { (header as *mut u8).add(HEADER_SIZE) }
  }

  /// One past the last byte of the payload that follows `header`.
  ///
  /// # Safety
  ///
  /// `header` must point at a live header written by the allocator.
  pub unsafe fn end(header: *mut Header) -> *mut u8 {
    unsafe { Header::payload(header).add((*header).span()) }
  }

  /// Steps back from a payload pointer to its header.
  ///
  /// This is the only place a header is recovered from a caller supplied
  /// pointer. The pointer is not validated beyond its alignment: passing
  /// anything this allocator did not hand out is undefined behaviour.
  ///
  /// # Safety
  ///
  /// `payload` must be a non-null pointer previously returned by the
  /// allocator and not yet released.
  pub unsafe fn from_payload(payload: *mut u8) -> *mut Header {
    debug_assert!(!payload.is_null());
    debug_assert_eq!(align::padding_for(payload as usize), 0);
    unsafe { payload.sub(HEADER_SIZE) as *mut Header }
  }
}
