//! # brkalloc - A First-Fit Free-List Memory Allocator
//!
//! This crate provides a `malloc`-style allocator with the four classic
//! primitives (allocate, zero-allocate, resize and release) built on one
//! contiguous heap that only ever grows, by default through `sbrk(2)`.
//!
//! ## Overview
//!
//! Every block carries a small header right in front of the bytes handed to
//! the caller. Free blocks are threaded into a singly-linked list through
//! those headers and recycled first-fit before the heap is grown again:
//!
//! ```text
//!   Free-List Allocator Concept:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                         HEAP MEMORY                                  │
//!   │                                                                      │
//!   │   ┌──────┬──────┬───────────┬──────┬──────┬──────────┐               │
//!   │   │  A1  │ free │    A3     │ free │  A5  │   free   │               │
//!   │   └──────┴──────┴───────────┴──────┴──────┴──────────┘               │
//!   │              ▲                 ▲               ▲     ▲               │
//!   │              └──── free list ──┴───────────────┘     │               │
//!   │                                                   Program            │
//!   │                                                    Break             │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Allocation scans the free list first and only grows the heap on a miss.
//!   Memory is recycled internally and never returned to the OS.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   brkalloc
//!   ├── align      - Alignment macros (align!, align_to!)
//!   ├── block      - Block header layout
//!   ├── error      - AllocError
//!   ├── heap       - HeapGrower trait, SbrkHeap and ArenaHeap
//!   ├── free_list  - FreeListAllocator: allocate, zero_allocate, resize, release
//!   └── ffi        - C exports (feature "ffi")
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use brkalloc::FreeListAllocator;
//!
//! fn main() {
//!     let mut allocator = FreeListAllocator::new();
//!
//!     unsafe {
//!         // Allocate memory for a u64
//!         let ptr = allocator.allocate(8) as *mut u64;
//!
//!         // Use the memory
//!         *ptr = 42;
//!         println!("Value: {}", *ptr);
//!
//!         // Give it back; the next fitting request reuses it
//!         allocator.release(ptr as *mut u8);
//!     }
//! }
//! ```
//!
//! ## How It Works
//!
//! Each block is a header followed by its payload:
//!
//! ```text
//!   Single Block:
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Block Header       │         User Data              │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ size: N         │  │  ┌──────────────────────────┐  │
//!   │  │ used: true      │  │  │                          │  │
//!   │  │ next: free list │  │  │     N bytes usable       │  │
//!   │  └─────────────────┘  │  │                          │  │
//!   │      24 bytes         │  └──────────────────────────┘  │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── Pointer returned to user
//! ```
//!
//! A free block much larger than a request is split, and the leftover stays on
//! the free list in the old block's position:
//!
//! ```text
//!   ┌───┬───────────────────────────────┐       ┌───┬────────┬───┬────────────┐
//!   │ H │          free (F)             │  ──▶  │ H │ used S │ H │ free F-S-H │
//!   └───┴───────────────────────────────┘       └───┴────────┴───┴────────────┘
//! ```
//!
//! Releasing a block merges it with free blocks touching it on either side,
//! so two free blocks are never left next to each other:
//!
//! ```text
//!   ┌───┬──────┬───┬──────────┬───┬──────┐       ┌───┬──────────────────────────┐
//!   │ H │ free │ H │ released │ H │ free │  ──▶  │ H │          free            │
//!   └───┴──────┴───┴──────────┴───┴──────┘       └───┴──────────────────────────┘
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded only**: No synchronization primitives
//! - **Word alignment only**: Payloads are aligned to `usize`, nothing more
//! - **No shrinking**: Memory is never handed back to the OS
//! - **Linear search**: No size classes, allocation walks the free list
//!
//! ## Safety
//!
//! This crate is inherently unsafe as it deals with raw memory management.
//! All allocation and deallocation operations require `unsafe` blocks.

pub mod align;
mod block;
mod error;
#[cfg(feature = "ffi")]
pub mod ffi;
mod free_list;
mod heap;

pub use block::HEADER_SIZE;
pub use error::{AllocError, Result};
pub use free_list::{FreeBlock, FreeBlocks, FreeListAllocator, HeapStats};
pub use heap::{ArenaHeap, HeapGrower, SbrkHeap};
