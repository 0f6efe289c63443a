use std::{io::Read, ptr};

use brkalloc::{Break, Sbrk, SbrkHeap};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`,
/// `gdb`, or just to watch the program break move between steps.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break = {:?}",
    label,
    std::process::id(),
    unsafe { Sbrk::new().adjust(0) },
  );
}

fn print_alloc(
  heap: &SbrkHeap,
  size: usize,
  address: *mut u8,
) {
  println!(
    "Allocated {} bytes, address = {:?}, heap = {:?}",
    size,
    address,
    heap.stats()
  );
}

fn main() {
  // Not the global allocator: stdout buffering still goes through libc's
  // malloc, which may move the break too.
  let heap = SbrkHeap::sbrk();

  print_program_break("start");
  block_until_enter_pressed();

  // 1) A u32.
  let first_block = heap.allocate(4);
  println!("\n[1] Allocate u32");
  print_alloc(&heap, 4, first_block);

  unsafe {
    let first_ptr = first_block as *mut u32;
    first_ptr.write(0xDEADBEEF);
    println!("[1] Value written to first_block = 0x{:X}", first_ptr.read());
  }
  block_until_enter_pressed();

  // 2) An odd-sized 12 byte block, still 16-byte aligned.
  let second_block = heap.allocate(12);
  println!("\n[2] Allocate [u8; 12]");
  print_alloc(&heap, 12, second_block);

  unsafe { ptr::write_bytes(second_block, 0xAB, 12) };
  println!("[2] Address = {:?}, addr % 16 = {}", second_block, second_block as usize % 16);
  block_until_enter_pressed();

  // 3) Free the first block. The second one sits after it, so it is only
  //    marked free and kept for reuse.
  unsafe { heap.deallocate(first_block) };
  println!("\n[3] Deallocated first_block at {:?}", first_block);
  print_program_break("after interior free");
  block_until_enter_pressed();

  // 4) A 2 byte request fits in the freed block.
  let third_block = heap.allocate(2);
  println!("\n[4] Allocate [u8; 2] (check reuse of freed block)");
  print_alloc(&heap, 2, third_block);
  println!(
    "[4] third_block == first_block? {}",
    if third_block == first_block {
      "Yes, it reused the freed block"
    } else {
      "No, it allocated somewhere else"
    }
  );
  block_until_enter_pressed();

  // 5) A zeroed array, then grow it.
  let array = heap.zero_allocate(16, 2);
  println!("\n[5] zero_allocate 16 x u16");
  print_alloc(&heap, 32, array);

  let grown = unsafe { heap.resize(array, 64 * 1024) };
  println!("[5] Resized to 64 KiB: {:?} -> {:?}", array, grown);
  print_program_break("after large resize");
  block_until_enter_pressed();

  // 6) The 64 KiB block is the last one; freeing it lowers the break
  //    unless something else grew it in the meantime.
  unsafe { heap.deallocate(grown) };
  println!("\n[6] Deallocated the large block");
  print_program_break("after tail free");

  match heap.check() {
    Ok(blocks) => println!("[6] Heap is consistent, {} blocks in the list", blocks),
    Err(e) => println!("[6] Heap is corrupted: {}", e),
  }

  println!("\n[7] End of example. Process will exit and the OS will reclaim all memory.");
}
