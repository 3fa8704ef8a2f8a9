//! Allocator scenarios on an isolated arena heap, where block addresses are
//! deterministic.

use std::ptr;

use brkalloc::{ArenaHeap, FreeListAllocator, HEADER_SIZE, align};
use test_log::test;

fn allocator(capacity: usize) -> FreeListAllocator<ArenaHeap> {
  FreeListAllocator::with_heap(ArenaHeap::with_capacity(capacity).unwrap())
}

fn assert_no_adjacent_free_blocks(allocator: &FreeListAllocator<ArenaHeap>) {
  let blocks: Vec<_> = allocator.free_blocks().collect();

  for a in &blocks {
    for b in &blocks {
      assert_ne!(a.end(), b.header, "free blocks {:?} and {:?} touch", a, b);
    }
  }
}

#[test]
fn test_capacity_is_writable_without_touching_neighbours() {
  let mut allocator = allocator(4096);

  unsafe {
    let sizes = [0usize, 1, 7, 8, 31, 100, 257];
    let blocks: Vec<*mut u8> = sizes.iter().map(|&size| allocator.allocate(size)).collect();

    for (i, (&address, &size)) in blocks.iter().zip(&sizes).enumerate() {
      assert!(!address.is_null());
      address.write_bytes(i as u8 + 1, size);
    }

    for (i, (&address, &size)) in blocks.iter().zip(&sizes).enumerate() {
      for offset in 0..size {
        assert_eq!(*address.add(offset), i as u8 + 1);
      }
      assert_eq!(allocator.usable_size(address), align!(size));
    }

    for address in blocks {
      allocator.release(address);
    }

    assert_eq!(allocator.stats().free_blocks, 1);
  }
}

#[test]
fn test_zero_size_allocations_are_unique_and_freeable() {
  let mut allocator = allocator(1024);

  unsafe {
    let first = allocator.allocate(0);
    let second = allocator.allocate(0);

    assert!(!first.is_null());
    assert_ne!(first, second);
    assert_eq!(allocator.usable_size(first), 0);

    allocator.release(first);
    allocator.release(second);

    let free: Vec<_> = allocator.free_blocks().collect();
    assert_eq!(free.len(), 1);
    assert_eq!(free[0].size, HEADER_SIZE);
  }
}

#[test]
fn test_zero_allocate_clears_recycled_memory() {
  let mut allocator = allocator(1024);

  unsafe {
    let dirty = allocator.allocate(64);
    dirty.write_bytes(0xAB, 64);
    allocator.release(dirty);

    let zeroed = allocator.zero_allocate(8, 8);
    assert_eq!(zeroed, dirty);

    for offset in 0..64 {
      assert_eq!(*zeroed.add(offset), 0);
    }
  }
}

#[test]
fn test_reuse_for_smaller_request() {
  let mut allocator = allocator(1024);

  unsafe {
    let first = allocator.allocate(64);
    allocator.release(first);

    let second = allocator.allocate(48);
    assert_eq!(second, first);
    assert_eq!(allocator.heap().used(), HEADER_SIZE + 64);
  }
}

#[test]
fn test_split_and_reuse_scenario() {
  let mut allocator = allocator(1024);

  unsafe {
    let a = allocator.allocate(100);
    let b = allocator.allocate(50);
    assert_eq!(b, a.add(align!(100usize) + HEADER_SIZE));

    allocator.release(a);

    let c = allocator.allocate(40);
    assert_eq!(c, a);

    let remainder = align!(100usize) - 40 - HEADER_SIZE;
    let free: Vec<_> = allocator.free_blocks().collect();
    assert_eq!(free.len(), 1);
    assert_eq!(free[0].size, remainder);
    assert_eq!(free[0].header, a.add(40) as *const u8);

    let d = allocator.allocate(remainder);
    assert_eq!(d, a.add(40 + HEADER_SIZE));
    assert_eq!(allocator.free_blocks().count(), 0);
    assert_eq!(allocator.usable_size(c), 40);
  }
}

#[test]
fn test_coalesce_two_neighbours_in_either_order() {
  for reversed in [false, true] {
    let mut allocator = allocator(1024);

    unsafe {
      let first = allocator.allocate(32);
      let second = allocator.allocate(48);
      let _guard = allocator.allocate(8);

      if reversed {
        allocator.release(second);
        allocator.release(first);
      } else {
        allocator.release(first);
        allocator.release(second);
      }

      let free: Vec<_> = allocator.free_blocks().collect();
      assert_eq!(free.len(), 1);
      assert_eq!(free[0].payload(), first as *const u8);
      assert_eq!(free[0].size, 32 + 48 + HEADER_SIZE);
    }
  }
}

#[test]
fn test_coalesce_sandwiched_block() {
  let mut allocator = allocator(1024);

  unsafe {
    let left = allocator.allocate(16);
    let middle = allocator.allocate(24);
    let right = allocator.allocate(32);
    let _guard = allocator.allocate(8);

    allocator.release(left);
    allocator.release(right);
    assert_eq!(allocator.free_blocks().count(), 2);

    allocator.release(middle);

    let free: Vec<_> = allocator.free_blocks().collect();
    assert_eq!(free.len(), 1);
    assert_eq!(free[0].payload(), left as *const u8);
    assert_eq!(free[0].size, 16 + 24 + 32 + 2 * HEADER_SIZE);

    // The merged span serves a request none of the pieces could.
    let big = allocator.allocate(16 + 24 + 32);
    assert_eq!(big, left);
  }
}

#[test]
fn test_freed_block_goes_to_list_head() {
  let mut allocator = allocator(1024);

  unsafe {
    let a = allocator.allocate(16);
    let _guard_a = allocator.allocate(8);
    let b = allocator.allocate(16);
    let _guard_b = allocator.allocate(8);

    allocator.release(a);
    allocator.release(b);

    let order: Vec<_> = allocator.free_blocks().map(|block| block.payload()).collect();
    assert_eq!(order, vec![b as *const u8, a as *const u8]);

    // First fit follows list order, not address order.
    assert_eq!(allocator.allocate(16), b);
  }
}

#[test]
fn test_consuming_middle_of_free_list_keeps_tail_reachable() {
  let mut allocator = allocator(4096);

  unsafe {
    let large = allocator.allocate(64);
    let _guard_a = allocator.allocate(8);
    let medium = allocator.allocate(32);
    let _guard_b = allocator.allocate(8);
    let small = allocator.allocate(16);
    let _guard_c = allocator.allocate(8);

    allocator.release(large);
    allocator.release(medium);
    allocator.release(small);
    assert_eq!(allocator.free_blocks().count(), 3);

    // List is small, medium, large; this takes the middle node.
    assert_eq!(allocator.allocate(32), medium);
    assert_eq!(allocator.free_blocks().count(), 2);

    let heap_before = allocator.heap().used();
    assert_eq!(allocator.allocate(64), large);
    assert_eq!(allocator.allocate(16), small);
    assert_eq!(allocator.heap().used(), heap_before);
    assert_eq!(allocator.free_blocks().count(), 0);
  }
}

#[test]
fn test_resize_grow_preserves_prefix() {
  let mut allocator = allocator(1024);

  unsafe {
    let old = allocator.allocate(16);
    for i in 0..16 {
      *old.add(i) = i as u8;
    }

    let new = allocator.resize(old, 64);
    assert!(!new.is_null());
    assert_ne!(new, old);
    assert_eq!(allocator.usable_size(new), 64);

    for i in 0..16 {
      assert_eq!(*new.add(i), i as u8);
    }

    // The old block went back to the free list.
    assert!(allocator.free_blocks().any(|block| block.payload() == old as *const u8));
  }
}

#[test]
fn test_resize_shrink_preserves_prefix() {
  let mut allocator = allocator(1024);

  unsafe {
    let old = allocator.allocate(64);
    for i in 0..64 {
      *old.add(i) = 0xF0 | (i as u8 & 0x0F);
    }

    let new = allocator.resize(old, 24);
    assert!(!new.is_null());

    for i in 0..24 {
      assert_eq!(*new.add(i), 0xF0 | (i as u8 & 0x0F));
    }
  }
}

#[test]
fn test_resize_into_recycled_neighbour_keeps_content() {
  let mut allocator = allocator(1024);

  unsafe {
    let spare = allocator.allocate(128);
    let data = allocator.allocate(32);
    let _guard = allocator.allocate(8);
    allocator.release(spare);

    data.write_bytes(0x42, 32);

    // The spare block sits right before `data`; the move must not clobber it.
    let moved = allocator.resize(data, 48);
    assert_eq!(moved, spare);
    for i in 0..32 {
      assert_eq!(*moved.add(i), 0x42);
    }
    assert_no_adjacent_free_blocks(&allocator);
  }
}

#[test]
fn test_resize_null_allocates() {
  let mut allocator = allocator(1024);

  unsafe {
    let address = allocator.resize(ptr::null_mut(), 40);
    assert!(!address.is_null());
    assert_eq!(allocator.usable_size(address), 40);
    assert_eq!(allocator.heap().used(), HEADER_SIZE + 40);
  }
}

#[test]
fn test_resize_to_zero_releases() {
  let mut allocator = allocator(1024);

  unsafe {
    let address = allocator.allocate(40);

    assert!(allocator.resize(address, 0).is_null());

    let free: Vec<_> = allocator.free_blocks().collect();
    assert_eq!(free.len(), 1);
    assert_eq!(free[0].payload(), address as *const u8);
  }
}

#[test]
fn test_out_of_memory_returns_null_and_keeps_state() {
  let mut allocator = allocator(256);

  unsafe {
    let kept = allocator.allocate(64);
    kept.write_bytes(0x11, 64);
    let before = allocator.stats();

    assert!(allocator.allocate(1024).is_null());
    assert!(allocator.zero_allocate(64, 16).is_null());
    assert!(allocator.resize(kept, 1024).is_null());

    assert_eq!(allocator.stats(), before);
    assert_eq!(allocator.usable_size(kept), 64);
    for i in 0..64 {
      assert_eq!(*kept.add(i), 0x11);
    }

    // Smaller requests still fit in what is left.
    assert!(!allocator.allocate(32).is_null());
  }
}

#[test]
fn test_free_blocks_never_touch_after_mixed_workload() {
  let mut allocator = allocator(256 * 1024);
  let mut live: Vec<(*mut u8, usize, u8)> = Vec::new();
  let mut seed: u32 = 0x2545_F491;

  let mut next = move || {
    seed ^= seed << 13;
    seed ^= seed >> 17;
    seed ^= seed << 5;
    seed as usize
  };

  unsafe {
    for round in 0..2000 {
      let roll = next();

      if live.is_empty() || (live.len() < 128 && roll % 2 == 0) {
        let size = next() % 200;
        let address = allocator.allocate(size);
        assert!(!address.is_null(), "round {} ran out of arena", round);

        let tag = (round % 251) as u8;
        address.write_bytes(tag, size);
        live.push((address, size, tag));
      } else {
        let (address, size, tag) = live.swap_remove(roll % live.len());
        for offset in 0..size {
          assert_eq!(*address.add(offset), tag);
        }
        allocator.release(address);
      }

      assert_no_adjacent_free_blocks(&allocator);
    }

    for (address, size, tag) in live.drain(..) {
      for offset in 0..size {
        assert_eq!(*address.add(offset), tag);
      }
      allocator.release(address);
    }

    // Everything merged back into one span covering the whole heap.
    let stats = allocator.stats();
    assert_eq!(stats.free_blocks, 1);
    assert_eq!(stats.free_bytes + HEADER_SIZE, stats.heap_bytes);
  }
}
