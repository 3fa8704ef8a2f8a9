use std::{marker::PhantomData, ptr::{self, NonNull}};
use log::{debug, trace, warn};

use crate::{
  align,
  block::{Block, HEADER_SIZE},
  error::{AllocError, Result},
  heap::{HeapGrower, SbrkHeap},
};

/// Largest request that can still be rounded and prefixed with a header
/// without overflowing.
const MAX_REQUEST: usize = isize::MAX as usize - HEADER_SIZE - std::mem::size_of::<usize>();

/// First-fit allocator over a singly-linked free list of embedded headers.
///
/// ```text
///   head
///    │
///    ▼
///   ┌────┬───────┐   ┌────┬──────────────┐   ┌────┬────┐
///   │ H  │ free  │   │ H  │    used      │   │ H  │free│
///   └────┴───────┘   └────┴──────────────┘   └────┴────┘
///      │                                        ▲
///      └─────────────── next ───────────────────┘
/// ```
///
/// Only free blocks are linked. Used blocks are reachable only through the
/// pointer handed to the caller.
pub struct FreeListAllocator<G: HeapGrower = SbrkHeap> {
  heap: G,
  head: *mut Block,
  heap_bytes: usize,
}

/// A block currently sitting on the free list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeBlock {
  pub header: *const u8,
  pub size: usize,
}

impl FreeBlock {
  pub fn payload(&self) -> *const u8 {
    self.header.wrapping_add(HEADER_SIZE)
  }

  pub fn end(&self) -> *const u8 {
    self.payload().wrapping_add(self.size)
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
  /// Bytes obtained from the grower, headers included.
  pub heap_bytes: usize,
  pub free_blocks: usize,
  /// Payload bytes available on the free list, headers excluded.
  pub free_bytes: usize,
}

/// Walks the free list from its head.
pub struct FreeBlocks<'a> {
  current: *mut Block,
  _allocator: PhantomData<&'a ()>,
}

impl Iterator for FreeBlocks<'_> {
  type Item = FreeBlock;

  fn next(&mut self) -> Option<FreeBlock> {
    if self.current.is_null() {
      return None;
    }

    unsafe {
      let block = self.current;
      self.current = (*block).next;

      Some(FreeBlock {
        header: Block::start(block),
        size: (*block).size,
      })
    }
  }
}

impl FreeListAllocator<SbrkHeap> {
  pub const fn new() -> Self {
    Self::with_heap(SbrkHeap)
  }
}

impl Default for FreeListAllocator<SbrkHeap> {
  fn default() -> Self {
    Self::new()
  }
}

impl<G: HeapGrower> FreeListAllocator<G> {
  pub const fn with_heap(heap: G) -> Self {
    Self {
      heap,
      head: ptr::null_mut(),
      heap_bytes: 0,
    }
  }

  pub fn heap(&self) -> &G {
    &self.heap
  }

  pub fn free_blocks(&self) -> FreeBlocks<'_> {
    FreeBlocks {
      current: self.head,
      _allocator: PhantomData,
    }
  }

  pub fn stats(&self) -> HeapStats {
    self.free_blocks().fold(
      HeapStats {
        heap_bytes: self.heap_bytes,
        ..HeapStats::default()
      },
      |mut stats, block| {
        stats.free_blocks += 1;
        stats.free_bytes += block.size;
        stats
      },
    )
  }

  /// Allocates at least `size` bytes, returning null when the heap cannot
  /// grow.
  ///
  /// Sizes are rounded up to a machine word. A zero-byte request yields a
  /// unique pointer to an empty block, which must still be released.
  ///
  /// # Safety
  ///
  /// The allocator must not be used concurrently, and the heap must not have
  /// been corrupted by writes outside handed-out payloads.
  pub unsafe fn allocate(
    &mut self,
    size: usize,
  ) -> *mut u8 {
    match unsafe { self.try_allocate(size) } {
      Ok(payload) => payload.as_ptr(),
      Err(err) => {
        warn!("allocate({}) failed: {}", size, err);
        ptr::null_mut()
      }
    }
  }

  /// Allocates `count * size` bytes and zeroes them.
  ///
  /// # Safety
  ///
  /// Same contract as [`FreeListAllocator::allocate`].
  pub unsafe fn zero_allocate(
    &mut self,
    count: usize,
    size: usize,
  ) -> *mut u8 {
    let Some(total) = count.checked_mul(size) else {
      warn!("zero_allocate({}, {}) failed: size overflows", count, size);
      return ptr::null_mut();
    };

    unsafe {
      let payload = self.allocate(total);
      if !payload.is_null() {
        payload.write_bytes(0, total);
      }
      payload
    }
  }

  /// Returns a block to the free list, merging it with any physically
  /// adjacent free block on either side.
  ///
  /// ```text
  ///   before:  [H│ free A ][H│ released ][H│ free B ]
  ///   after:   [H│ free A ─────────────────────────]
  /// ```
  ///
  /// Null is ignored, and so is a block that is already free.
  ///
  /// # Safety
  ///
  /// `address` must be null or a pointer obtained from this allocator.
  pub unsafe fn release(
    &mut self,
    address: *mut u8,
  ) {
    if address.is_null() {
      return;
    }

    unsafe {
      let mut block = Block::from_payload(address);

      if !(*block).used {
        warn!("release({:?}) ignored: block is already free", address);
        return;
      }

      trace!("release {:?} ({} bytes)", address, (*block).size);

      (*block).used = false;

      if let Some(previous) = self.unlink_matching(Block::end, Block::start(block)) {
        debug!("coalesce {:?} backward into {:?}", block, previous);
        (*previous).size += HEADER_SIZE + (*block).size;
        (*block).size = 0;
        block = previous;
      }

      if let Some(following) = self.unlink_matching(Block::start, Block::end(block)) {
        debug!("coalesce {:?} forward into {:?}", following, block);
        (*block).size += HEADER_SIZE + (*following).size;
        (*following).size = 0;
      }

      (*block).next = self.head;
      self.head = block;
    }
  }

  /// Moves the allocation at `address` into a block of `size` bytes,
  /// preserving `min(old, new)` bytes of content.
  ///
  /// The new block is obtained before the old one is released, so the copy
  /// source is never recycled mid-move and the original survives a failed
  /// resize untouched.
  ///
  /// # Safety
  ///
  /// `address` must be null or a live pointer obtained from this allocator.
  pub unsafe fn resize(
    &mut self,
    address: *mut u8,
    size: usize,
  ) -> *mut u8 {
    unsafe {
      if address.is_null() {
        return self.allocate(size);
      }

      if size == 0 {
        self.release(address);
        return ptr::null_mut();
      }

      let old_size = self.usable_size(address);

      let moved = self.allocate(size);
      if moved.is_null() {
        return ptr::null_mut();
      }

      ptr::copy_nonoverlapping(address, moved, old_size.min(size));
      self.release(address);

      moved
    }
  }

  /// Payload capacity of the block at `address`, which may exceed what was
  /// requested.
  ///
  /// # Safety
  ///
  /// `address` must be null or a live pointer obtained from this allocator.
  pub unsafe fn usable_size(
    &self,
    address: *mut u8,
  ) -> usize {
    if address.is_null() {
      return 0;
    }

    unsafe { (*Block::from_payload(address)).size }
  }

  unsafe fn try_allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>> {
    if size > MAX_REQUEST {
      return Err(AllocError::OutOfMemory { requested: size });
    }

    let size = align!(size);

    unsafe {
      let block = match self.take_free_block(size) {
        Some(block) => block,
        None => self.grow_block(size)?,
      };

      Ok(NonNull::new_unchecked(Block::payload(block)))
    }
  }

  /// First-fit scan, splitting the block when the leftover can hold a header
  /// of its own.
  ///
  /// ```text
  ///   before:  [H│ free ─────────────────────── F ]
  ///   after:   [H│ used ─ size ][H│ free ─ F - size - H ]
  /// ```
  unsafe fn take_free_block(
    &mut self,
    size: usize,
  ) -> Option<*mut Block> {
    unsafe {
      let mut previous: *mut Block = ptr::null_mut();
      let mut current = self.head;

      while !current.is_null() {
        debug_assert!(!(*current).used, "used block {:?} on the free list", current);

        if (*current).size > size + HEADER_SIZE {
          let remainder = Block::write(
            Block::payload(current).add(size),
            (*current).size - size - HEADER_SIZE,
            false,
          );
          (*remainder).next = (*current).next;
          self.relink(previous, remainder);

          debug!(
            "split {:?}: {} bytes used, {} bytes left at {:?}",
            current,
            size,
            (*remainder).size,
            remainder
          );

          (*current).size = size;
          (*current).used = true;
          (*current).next = ptr::null_mut();

          return Some(current);
        }

        if (*current).size >= size {
          self.relink(previous, (*current).next);

          debug!("reuse {:?} ({} bytes) for {} bytes", current, (*current).size, size);

          (*current).used = true;
          (*current).next = ptr::null_mut();

          return Some(current);
        }

        previous = current;
        current = (*current).next;
      }

      None
    }
  }

  unsafe fn grow_block(
    &mut self,
    size: usize,
  ) -> Result<*mut Block> {
    let total = HEADER_SIZE + size;
    let address = self.heap.grow(total)?;

    self.heap_bytes += total;
    debug!("grew heap by {} bytes for a {} byte block at {:?}", total, size, address);

    Ok(unsafe { Block::write(address.as_ptr(), size, true) })
  }

  /// Unlinks and returns the first free block whose `key` address equals
  /// `target`.
  unsafe fn unlink_matching(
    &mut self,
    key: unsafe fn(*mut Block) -> *mut u8,
    target: *mut u8,
  ) -> Option<*mut Block> {
    unsafe {
      let mut previous: *mut Block = ptr::null_mut();
      let mut current = self.head;

      while !current.is_null() {
        if key(current) == target {
          self.relink(previous, (*current).next);
          (*current).next = ptr::null_mut();
          return Some(current);
        }

        previous = current;
        current = (*current).next;
      }

      None
    }
  }

  /// Points the link that used to reach a list node at `next` instead.
  unsafe fn relink(
    &mut self,
    previous: *mut Block,
    next: *mut Block,
  ) {
    if previous.is_null() {
      self.head = next;
    } else {
      unsafe { (*previous).next = next };
    }
  }
}
