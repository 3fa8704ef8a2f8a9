use std::{alloc::{self, Layout}, mem, ptr::NonNull};
use libc::{c_void, intptr_t, sbrk};
use log::debug;

use crate::{align_to, block::Block, error::{AllocError, Result}};

/// Source of raw memory for the free-list allocator.
///
/// # Safety
///
/// On success `grow` must hand out `size` fresh bytes that are aligned for a
/// block header, writable, never handed out again, and valid for as long as
/// the grower itself lives.
pub unsafe trait HeapGrower {
  fn grow(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>>;
}

/// Grows the process heap by moving the program break with `sbrk(2)`.
///
/// ```text
///   before:  ... ──────────────┤ program break
///   after:   ... ──────────────┼──[pad]──── size ────┤ program break
///                              ▲        ▲
///                          old mark   returned address
/// ```
///
/// The padding is only ever non-zero when someone else left the break on an
/// odd address.
#[derive(Debug, Default, Clone, Copy)]
pub struct SbrkHeap;

unsafe impl HeapGrower for SbrkHeap {
  fn grow(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>> {
    let out_of_memory = AllocError::OutOfMemory { requested: size };

    unsafe {
      let mark = sbrk(0);
      if mark == usize::MAX as *mut c_void {
        return Err(out_of_memory);
      }

      let padding = align_to!(mark as usize, mem::align_of::<Block>()) - mark as usize;
      let total = size
        .checked_add(padding)
        .filter(|total| *total <= isize::MAX as usize)
        .ok_or(out_of_memory)?;

      let address = sbrk(total as intptr_t);
      if address == usize::MAX as *mut c_void {
        return Err(out_of_memory);
      }

      debug!("sbrk grew heap by {} bytes at {:?}", total, address);

      NonNull::new((address as *mut u8).add(padding)).ok_or(out_of_memory)
    }
  }
}

/// Fixed-capacity heap reserved up front and handed out bump style.
///
/// Growth past the capacity fails with [`AllocError::OutOfMemory`], which
/// makes it the provider of choice for bounded buffers and for tests that
/// need deterministic addresses.
#[derive(Debug)]
pub struct ArenaHeap {
  base: NonNull<u8>,
  layout: Layout,
  mark: usize,
}

impl ArenaHeap {
  pub fn with_capacity(capacity: usize) -> Result<Self> {
    let out_of_memory = AllocError::OutOfMemory { requested: capacity };

    let layout = Layout::from_size_align(capacity.max(1), mem::align_of::<Block>())
      .map_err(|_| out_of_memory)?;

    let base = NonNull::new(unsafe { alloc::alloc(layout) }).ok_or(out_of_memory)?;

    Ok(Self {
      base,
      layout,
      mark: 0,
    })
  }

  pub fn base(&self) -> *const u8 {
    self.base.as_ptr()
  }

  pub fn capacity(&self) -> usize {
    self.layout.size()
  }

  /// Bytes handed out so far; the arena's high-water mark.
  pub fn used(&self) -> usize {
    self.mark
  }

  pub fn remaining(&self) -> usize {
    self.capacity() - self.mark
  }
}

unsafe impl HeapGrower for ArenaHeap {
  fn grow(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>> {
    if size > self.remaining() {
      return Err(AllocError::OutOfMemory { requested: size });
    }

    let address = unsafe { self.base.add(self.mark) };
    self.mark += size;

    Ok(address)
  }
}

impl Drop for ArenaHeap {
  fn drop(&mut self) {
    unsafe { alloc::dealloc(self.base.as_ptr(), self.layout) };
  }
}
