use std::ptr::{self, NonNull};

use spin::Mutex;

use crate::{
  align,
  align::MAX_ALIGN,
  block::{HEADER_SIZE, Header},
  brk::{Arena, Break},
  error::{AllocError, CorruptionError},
};

/// The block list and the break it was carved from.
///
/// ```text
///   head                                           tail
///   ▼                                              ▼
///   ┌───┬──────┐   ┌───┬──────────┐   ┌───┬────┐   ┌───┬────────┐
///   │ H │ used │──►│ H │   free   │──►│ H │used│──►│ H │  used  │ ◄ break
///   └───┴──────┘   └───┴──────────┘   └───┴────┘   └───┴────────┘
/// ```
///
/// List order is allocation order, which is also address order since blocks
/// are only ever created at the break.
struct Directory<B> {
  head: *mut Header,
  tail: *mut Header,
  brk: B,
}

// Every header the directory points at lives in memory owned by `brk`.
unsafe impl<B: Send> Send for Directory<B> {}

impl<B: Break> Directory<B> {
  /// First-fit scan in allocation order.
  unsafe fn find_free_block(
    &self,
    size: usize,
  ) -> *mut Header {
    unsafe {
      let mut current = self.head;

      while !current.is_null() {
        if (*current).is_free && (*current).size >= size {
          return current;
        }
        current = (*current).next;
      }

      ptr::null_mut()
    }
  }

  /// Moves the break up far enough for a header and `size` payload bytes.
  unsafe fn grow(
    &mut self,
    size: usize,
  ) -> Result<*mut Header, AllocError> {
    let top = unsafe { self.brk.adjust(0) }.ok_or(AllocError::Exhausted)?;
    let lead = align::padding_for(top as usize);

    let total = size
      .checked_add(MAX_ALIGN - 1)
      .map(|size| size & !(MAX_ALIGN - 1))
      .and_then(|span| span.checked_add(HEADER_SIZE + lead))
      .ok_or(AllocError::Exhausted)?;
    let delta = isize::try_from(total).map_err(|_| AllocError::Exhausted)?;

    let Some(base) = (unsafe { self.brk.adjust(delta) }) else {
      adebug!("break refused to grow by {} bytes", total);
      return Err(AllocError::Exhausted);
    };

    if align::padding_for(base as usize) != lead {
      // Someone else moved the break between the query and the growth.
      awarn!("break moved underneath the heap: expected {:?}, got {:?}", top, base);
      unsafe { self.give_back(base, total) };
      return Err(AllocError::Exhausted);
    }

    let header = base.wrapping_add(lead) as *mut Header;
    unsafe { header.write(Header::new(size, lead)) };
    atrace!("grew break by {} bytes for block {:?}", total, header);

    Ok(header)
  }

  /// Returns `total` bytes starting at `base` if they are still on top.
  unsafe fn give_back(
    &mut self,
    base: *mut u8,
    total: usize,
  ) {
    unsafe {
      if self.brk.adjust(0) == Some(base.wrapping_add(total)) {
        self.shrink(total);
      }
    }
  }

  /// Lowers the break by `total` bytes. Returns whether the break moved.
  unsafe fn shrink(
    &mut self,
    total: usize,
  ) -> bool {
    let released = isize::try_from(total)
      .ok()
      .and_then(|delta| unsafe { self.brk.adjust(-delta) });

    if released.is_none() {
      awarn!("break refused to shrink by {} bytes", total);
      return false;
    }
    true
  }

  fn append(
    &mut self,
    header: *mut Header,
  ) {
    if self.head.is_null() {
      self.head = header;
    } else {
      unsafe { (*self.tail).next = header };
    }
    self.tail = header;
  }

  /// Returns the tail block's bytes to the break and unlinks it.
  ///
  /// If the break refuses to shrink the block stays in the list, marked
  /// free, so its bytes remain reachable.
  unsafe fn release_tail(
    &mut self,
    header: *mut Header,
  ) {
    debug_assert_eq!(header, self.tail);

    unsafe {
      atrace!("releasing tail block {:?} ({} bytes)", header, (*header).size);

      if !self.shrink((*header).footprint()) {
        (*header).is_free = true;
        return;
      }

      if self.head == self.tail {
        self.head = ptr::null_mut();
        self.tail = ptr::null_mut();
      } else {
        let mut current = self.head;
        while !(*current).next.is_null() && (*current).next != header {
          current = (*current).next;
        }
        (*current).next = ptr::null_mut();
        self.tail = current;
      }
    }
  }
}

/// A snapshot of one block, as seen by [`Heap::blocks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  /// Address of the payload.
  pub address: usize,
  pub size: usize,
  pub is_free: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
  pub blocks: usize,
  pub free_blocks: usize,
  /// Payload bytes of blocks in use.
  pub used_bytes: usize,
  /// Payload bytes of blocks waiting to be reused.
  pub free_bytes: usize,
}

/// A first-fit heap growing a single region through a [`Break`].
///
/// Every operation takes the one lock guarding the block list and the break,
/// so a `Heap` can be shared between threads or installed as the
/// `#[global_allocator]`.
///
/// Blocks are never split or merged. A freed block is only given back to the
/// break when it ends exactly at the break; anything below that stays in the
/// list, marked free, until a request it can satisfy comes along.
pub struct Heap<B: Break> {
  directory: Mutex<Directory<B>>,
}

impl<B: Break> Heap<B> {
  pub const fn new(brk: B) -> Self {
    Self {
      directory: Mutex::new(Directory {
        head: ptr::null_mut(),
        tail: ptr::null_mut(),
        brk,
      }),
    }
  }

  /// Hands out at least `size` bytes aligned to [`MAX_ALIGN`], or null.
  pub fn allocate(
    &self,
    size: usize,
  ) -> *mut u8 {
    self.try_allocate(size).map_or(ptr::null_mut(), NonNull::as_ptr)
  }

  pub fn try_allocate(
    &self,
    size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    if size == 0 {
      return Err(AllocError::ZeroSize);
    }

    let mut directory = self.directory.lock();

    unsafe {
      let mut header = directory.find_free_block(size);

      if header.is_null() {
        header = directory.grow(size)?;
        directory.append(header);
      } else {
        (*header).is_free = false;
        atrace!("reusing block {:?} ({} bytes) for {} bytes", header, (*header).size, size);
      }

      Ok(NonNull::new_unchecked(Header::payload(header)))
    }
  }

  /// Gives a block back to the heap. Null is ignored.
  ///
  /// # Safety
  ///
  /// `address` must be null or a live pointer handed out by this heap.
  pub unsafe fn deallocate(
    &self,
    address: *mut u8,
  ) {
    if address.is_null() {
      return;
    }

    let mut directory = self.directory.lock();

    unsafe {
      let header = Header::from_payload(address);
      let top = directory.brk.adjust(0);

      if top == Some(Header::end(header)) {
        directory.release_tail(header);
      } else {
        (*header).is_free = true;
      }
    }
  }

  /// Allocates `count * element_size` zeroed bytes, or null.
  pub fn zero_allocate(
    &self,
    count: usize,
    element_size: usize,
  ) -> *mut u8 {
    self
      .try_zero_allocate(count, element_size)
      .map_or(ptr::null_mut(), NonNull::as_ptr)
  }

  pub fn try_zero_allocate(
    &self,
    count: usize,
    element_size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    if count == 0 || element_size == 0 {
      return Err(AllocError::ZeroSize);
    }

    let size = count.checked_mul(element_size).ok_or(AllocError::Overflow)?;
    let address = self.try_allocate(size)?;

    let _directory = self.directory.lock();
    unsafe { ptr::write_bytes(address.as_ptr(), 0, size) };

    Ok(address)
  }

  /// Makes room for `size` bytes at `address`, moving the contents if the
  /// block is too small. Returns null without touching `address` on failure.
  ///
  /// Blocks never shrink: asking for fewer bytes than the block already
  /// holds returns `address` unchanged. A null `address` or a zero `size`
  /// yields null and frees nothing.
  ///
  /// # Safety
  ///
  /// `address` must be null or a live pointer handed out by this heap.
  pub unsafe fn resize(
    &self,
    address: *mut u8,
    size: usize,
  ) -> *mut u8 {
    unsafe { self.try_resize(address, size) }.map_or(ptr::null_mut(), NonNull::as_ptr)
  }

  /// # Safety
  ///
  /// See [`Heap::resize`].
  pub unsafe fn try_resize(
    &self,
    address: *mut u8,
    size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    let Some(old) = NonNull::new(address) else {
      return Err(AllocError::ZeroSize);
    };
    if size == 0 {
      return Err(AllocError::ZeroSize);
    }

    let old_size = unsafe { self.usable_size(address) };
    if old_size >= size {
      return Ok(old);
    }

    let new = self.try_allocate(size)?;

    unsafe {
      ptr::copy_nonoverlapping(address, new.as_ptr(), old_size);
      self.deallocate(address);
    }

    Ok(new)
  }

  /// The size recorded for the block at `address`, 0 for null.
  ///
  /// # Safety
  ///
  /// `address` must be null or a live pointer handed out by this heap.
  pub unsafe fn usable_size(
    &self,
    address: *mut u8,
  ) -> usize {
    if address.is_null() {
      return 0;
    }

    let _directory = self.directory.lock();
    unsafe { (*Header::from_payload(address)).size }
  }

  /// The current break of the backing region.
  pub fn top(&self) -> Option<*mut u8> {
    unsafe { self.directory.lock().brk.adjust(0) }
  }

  /// Every block in list order.
  ///
  /// Allocates the returned vector, so it must not be called on a heap
  /// that is also the global allocator.
  pub fn blocks(&self) -> Vec<BlockInfo> {
    let mut blocks = Vec::with_capacity(self.stats().blocks);

    let directory = self.directory.lock();
    let mut current = directory.head;

    while !current.is_null() {
      unsafe {
        blocks.push(BlockInfo {
          address: Header::payload(current) as usize,
          size: (*current).size,
          is_free: (*current).is_free,
        });
        current = (*current).next;
      }
    }

    blocks
  }

  pub fn stats(&self) -> HeapStats {
    let directory = self.directory.lock();
    let mut stats = HeapStats::default();
    let mut current = directory.head;

    while !current.is_null() {
      unsafe {
        stats.blocks += 1;
        if (*current).is_free {
          stats.free_blocks += 1;
          stats.free_bytes += (*current).size;
        } else {
          stats.used_bytes += (*current).size;
        }
        current = (*current).next;
      }
    }

    stats
  }

  /// Walks the block list and verifies its shape: no cycle, the walk ends
  /// at `tail`, headers appear in address order without overlapping, and
  /// nothing extends past the break. Returns the number of blocks.
  ///
  /// When the break is exclusive to the heap the blocks must also tile the
  /// region: each header (after its `lead`) starts where the previous block
  /// ends, and the tail ends exactly at the break.
  pub fn check(&self) -> Result<usize, CorruptionError> {
    let mut directory = self.directory.lock();
    let exclusive = directory.brk.is_exclusive();

    if directory.head.is_null() != directory.tail.is_null() {
      return Err(CorruptionError::HeadTailMismatch);
    }

    let mut count = 0;
    let mut slow = directory.head;
    let mut current = directory.head;
    let mut last: *mut Header = ptr::null_mut();
    let mut previous_end = 0;

    while !current.is_null() {
      let header = current as usize;
      if header < previous_end {
        return Err(CorruptionError::Overlap { previous_end, header });
      }

      unsafe {
        if exclusive && count > 0 && header.wrapping_sub((*current).lead) != previous_end {
          return Err(CorruptionError::Gap { previous_end, header });
        }

        previous_end = Header::end(current) as usize;
        last = current;
        current = (*current).next;

        count += 1;
        if count % 2 == 0 {
          slow = (*slow).next;
        }
      }

      if !current.is_null() && current == slow {
        return Err(CorruptionError::Cycle { at: current as usize });
      }
    }

    if last != directory.tail {
      return Err(CorruptionError::DanglingTail {
        last: last as usize,
        tail: directory.tail as usize,
      });
    }

    if let Some(top) = unsafe { directory.brk.adjust(0) } {
      let top = top as usize;
      if previous_end > top {
        return Err(CorruptionError::BeyondBreak { end: previous_end, top });
      }
      if exclusive && count > 0 && previous_end < top {
        return Err(CorruptionError::BelowBreak { end: previous_end, top });
      }
    }

    Ok(count)
  }
}

impl Heap<Arena> {
  /// A heap over its own arena of `capacity` bytes.
  pub fn with_capacity(capacity: usize) -> Self {
    Self::new(Arena::new(capacity))
  }
}
