use std::{sync::Arc, thread};

use brkalloc::Heap;

const THREADS: usize = 8;
const ROUNDS: usize = 2_000;
const MAX_LIVE: usize = 64;

/// Deterministic per-thread size generator.
struct XorShift(u64);

impl XorShift {
  fn next(&mut self) -> u64 {
    self.0 ^= self.0 << 13;
    self.0 ^= self.0 >> 7;
    self.0 ^= self.0 << 17;
    self.0
  }
}

struct Live {
  address: *mut u8,
  size: usize,
  tag: u8,
}

unsafe fn fill(live: &Live) {
  unsafe { std::ptr::write_bytes(live.address, live.tag, live.size) };
}

unsafe fn verify(live: &Live) {
  for i in 0..live.size {
    assert_eq!(unsafe { live.address.add(i).read() }, live.tag, "block {:?} was overwritten", live.address);
  }
}

#[test]
fn interleaved_threads_keep_the_list_consistent() {
  let heap = Arc::new(Heap::with_capacity(64 << 20));

  let workers: Vec<_> = (0..THREADS)
    .map(|id| {
      let heap = Arc::clone(&heap);
      thread::spawn(move || {
        let mut rng = XorShift(0x9E37_79B9_7F4A_7C15 ^ (id as u64 + 1));
        let mut live: Vec<Live> = Vec::new();

        for round in 0..ROUNDS {
          let roll = rng.next();

          if live.len() >= MAX_LIVE || (!live.is_empty() && roll % 3 == 0) {
            let victim = live.swap_remove((roll as usize / 3) % live.len());
            unsafe {
              verify(&victim);
              heap.deallocate(victim.address);
            }
            continue;
          }

          let size = (rng.next() % 512) as usize + 1;
          let address = heap.allocate(size);
          assert!(!address.is_null());

          let block = Live { address, size, tag: (id * 31 + round) as u8 };
          unsafe { fill(&block) };
          live.push(block);
        }

        for block in live {
          unsafe {
            verify(&block);
            heap.deallocate(block.address);
          }
        }
      })
    })
    .collect();

  for worker in workers {
    worker.join().unwrap();
  }

  let blocks = heap.check().unwrap();
  let stats = heap.stats();

  assert_eq!(stats.blocks, blocks);
  assert_eq!(stats.used_bytes, 0);
  assert_eq!(stats.free_blocks, blocks);
}

#[test]
fn concurrent_resize_and_zero_allocate() {
  let heap = Arc::new(Heap::with_capacity(16 << 20));

  let workers: Vec<_> = (0..4)
    .map(|id| {
      let heap = Arc::clone(&heap);
      thread::spawn(move || {
        for round in 0..500 {
          let zeroed = heap.zero_allocate(4, 8);
          assert!(!zeroed.is_null());

          unsafe {
            assert!((0..32).all(|i| zeroed.add(i).read() == 0));
            std::ptr::write_bytes(zeroed, id as u8 + 1, 32);

            let grown = heap.resize(zeroed, 64 + round % 64);
            assert!(!grown.is_null());
            assert!((0..32).all(|i| grown.add(i).read() == id as u8 + 1));

            heap.deallocate(grown);
          }
        }
      })
    })
    .collect();

  for worker in workers {
    worker.join().unwrap();
  }

  assert!(heap.check().is_ok());
  assert_eq!(heap.stats().used_bytes, 0);
}
