use std::io::Read;

use brkalloc::{FreeListAllocator, HEADER_SIZE};
use libc::sbrk;

/// Waits until the user presses ENTER.
/// Handy for inspecting the process with `pmap` or `gdb` between steps.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break using `sbrk(0)`.
unsafe fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { sbrk(0) },
  );
}

fn print_free_list(allocator: &FreeListAllocator) {
  let stats = allocator.stats();
  println!(
    "    free list: {} block(s), {} free bytes, {} heap bytes",
    stats.free_blocks, stats.free_bytes, stats.heap_bytes
  );
  for block in allocator.free_blocks() {
    println!("      {:?}: {} bytes", block.payload(), block.size);
  }
}

fn main() {
  env_logger::init();

  let mut allocator = FreeListAllocator::new();

  unsafe {
    print_program_break("start");
    println!("Every block costs {} header bytes.", HEADER_SIZE);
    block_until_enter_pressed();

    // 1) Two fresh blocks: both grow the heap.
    let a = allocator.allocate(100);
    let b = allocator.allocate(50);
    println!("\n[1] allocate(100) = {:?}, allocate(50) = {:?}", a, b);
    print_program_break("after two allocations");
    block_until_enter_pressed();

    // 2) Freeing `a` puts it on the free list.
    allocator.release(a);
    println!("\n[2] release(a)");
    print_free_list(&allocator);
    block_until_enter_pressed();

    // 3) A smaller request splits `a` instead of growing the heap.
    let c = allocator.allocate(40);
    println!(
      "\n[3] allocate(40) = {:?} ({})",
      c,
      if c == a { "reused a" } else { "new memory" }
    );
    print_free_list(&allocator);
    block_until_enter_pressed();

    // 4) Freeing everything coalesces back into one span.
    allocator.release(c);
    allocator.release(b);
    println!("\n[4] release(c), release(b)");
    print_free_list(&allocator);
    block_until_enter_pressed();

    // 5) Resizing moves the data and keeps the prefix.
    let text = allocator.zero_allocate(16, 1);
    text.copy_from_nonoverlapping(b"free list!".as_ptr(), 10);
    let text = allocator.resize(text, 4096);
    let preserved = std::slice::from_raw_parts(text, 10);
    println!("\n[5] resize to 4 KiB kept {:?}", std::str::from_utf8(preserved));
    print_program_break("after resize");
    block_until_enter_pressed();

    // 6) Done. The heap is never shrunk; the OS takes it back at exit.
    allocator.release(text);
    print_free_list(&allocator);
    println!("\n[6] End of walkthrough.");
  }
}
