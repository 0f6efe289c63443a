//! # brkalloc - A First-Fit Heap on the Program Break
//!
//! This crate provides a small **free-list allocator** that grows one
//! contiguous region with `sbrk(2)` and can stand in for the process heap,
//! either as Rust's `#[global_allocator]` or, with the `c-abi` feature, as
//! `malloc`/`free`/`calloc`/`realloc`.
//!
//! ## Overview
//!
//! ```text
//!   Heap Region:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                                                                      │
//!   │   ┌────┬──────┬────┬──────┬────┬──────┬────┬──────┐                  │
//!   │   │ H  │  A1  │ H  │ free │ H  │  A3  │ H  │  A4  │   unmapped       │
//!   │   └────┴──────┴────┴──────┴────┴──────┴────┴──────┘                  │
//!   │   ▲                                               ▲                  │
//!   │   │                                               │                  │
//!   │  head ──► next ──► next ──► tail              Program                │
//!   │                                                Break                 │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **Allocate** scans the list from `head` and takes the first free block
//!   that is large enough. Blocks are never split. If nothing fits, the
//!   break is moved up and a new block is appended at `tail`.
//! - **Deallocate** gives the block back to the OS when it ends exactly at
//!   the break. Any other block is only marked free.
//! - **Zero-allocate** checks `count * size` for overflow and zeroes the
//!   result.
//! - **Resize** only ever grows: a block that is already big enough is
//!   returned as is, otherwise the contents move to a new block.
//!
//! Adjacent free blocks are not merged, so fragmentation is expected.
//!
//! ## Crate Structure
//!
//! ```text
//!   brkalloc
//!   ├── align      - MAX_ALIGN and the align! macro
//!   ├── block      - Block header layout (internal)
//!   ├── brk        - Break trait, Sbrk and Arena backings
//!   ├── error      - AllocError, CorruptionError
//!   ├── global     - GlobalAlloc impl, SbrkHeap, C entry points
//!   └── heap       - Heap: the four operations and the lock
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use brkalloc::Heap;
//!
//! let heap = Heap::with_capacity(4096);
//!
//! let ptr = heap.allocate(8) as *mut u64;
//! assert!(!ptr.is_null());
//!
//! unsafe {
//!     *ptr = 42;
//!     assert_eq!(*ptr, 42);
//!     heap.deallocate(ptr as *mut u8);
//! }
//! ```
//!
//! As the process allocator:
//!
//! ```rust,ignore
//! use brkalloc::SbrkHeap;
//!
//! #[global_allocator]
//! static HEAP: SbrkHeap = SbrkHeap::sbrk();
//! ```
//!
//! ## Block Layout
//!
//! ```text
//!   Single Allocation:
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Block Header       │         User Data              │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ size: N         │  │  ┌──────────────────────────┐  │
//!   │  │ next: null/ptr  │  │  │                          │  │
//!   │  │ lead: padding   │  │  │  N bytes usable, padded  │  │
//!   │  │ is_free: false  │  │  │  up to a multiple of 16  │  │
//!   │  └─────────────────┘  │  └──────────────────────────┘  │
//!   │      32 bytes         │                                │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── Pointer returned to user (16-byte aligned)
//! ```
//!
//! ## Thread Safety
//!
//! One spin lock guards the block list and the break. Every operation holds
//! it for its whole critical section, including the zero fill of
//! `zero_allocate`.
//!
//! ## Logging
//!
//! Diagnostics go through the `log` facade but are off until
//! [`enable_logging`] is called. Never enable them while the heap is the
//! global allocator of a process whose logger allocates.
//!
//! ## Safety
//!
//! Pointers passed to `deallocate` and `resize` are trusted. Freeing a
//! pointer twice or one this heap did not hand out is undefined behaviour.

use std::sync::atomic::{AtomicBool, Ordering};

#[macro_use]
mod alog;

pub mod align;
mod block;
pub mod brk;
mod error;
mod global;
mod heap;

pub use brk::{Arena, Break, Sbrk};
pub use error::{AllocError, CorruptionError};
#[cfg(feature = "c-abi")]
pub use global::c_abi;
pub use global::SbrkHeap;
pub use heap::{BlockInfo, Heap, HeapStats};

static ALLOC_LOG: AtomicBool = AtomicBool::new(false);

/// Enables logging for the allocator.
pub fn enable_logging() {
  ALLOC_LOG.store(true, Ordering::Relaxed);
}

/// Disables logging for the allocator.
pub fn disable_logging() {
  ALLOC_LOG.store(false, Ordering::Relaxed);
}

pub(crate) fn should_log() -> bool {
  ALLOC_LOG.load(Ordering::Relaxed)
}
