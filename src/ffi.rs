//! C-ABI exports of a process-wide allocator over the program break.
//!
//! Gated behind `features = ["ffi"]`. The symbols carry a `brkalloc_` prefix
//! so linking the crate never shadows the platform `malloc`. Like the rest of
//! the crate, they must not be called from more than one thread.

use std::cell::UnsafeCell;
use libc::{c_void, size_t};

use crate::{free_list::FreeListAllocator, heap::SbrkHeap};

struct ProcessHeap(UnsafeCell<FreeListAllocator<SbrkHeap>>);

// Single-threaded by contract; callers provide the exclusion.
unsafe impl Sync for ProcessHeap {}

static HEAP: ProcessHeap = ProcessHeap(UnsafeCell::new(FreeListAllocator::new()));

unsafe fn heap() -> &'static mut FreeListAllocator<SbrkHeap> {
  unsafe { &mut *HEAP.0.get() }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn brkalloc_malloc(size: size_t) -> *mut c_void {
  unsafe { heap().allocate(size) as *mut c_void }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn brkalloc_calloc(
  count: size_t,
  size: size_t,
) -> *mut c_void {
  unsafe { heap().zero_allocate(count, size) as *mut c_void }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn brkalloc_realloc(
  address: *mut c_void,
  size: size_t,
) -> *mut c_void {
  unsafe { heap().resize(address as *mut u8, size) as *mut c_void }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn brkalloc_free(address: *mut c_void) {
  unsafe { heap().release(address as *mut u8) }
}
