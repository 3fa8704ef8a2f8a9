use std::{mem, ptr};

/// Bytes taken by a header in front of every payload.
pub const HEADER_SIZE: usize = mem::size_of::<Block>();

/// Metadata record written immediately before each payload.
///
/// `size` is the payload capacity and never counts the header. `next` is only
/// meaningful while the block sits on the free list.
#[repr(C)]
pub struct Block {
  pub size: usize,
  pub used: bool,
  pub next: *mut Block,
}

impl Block {
  pub fn new(
    size: usize,
    used: bool,
    next: *mut Block,
  ) -> Self {
    Self { size, used, next }
  }

  /// Writes a fresh, unlinked header at `address`.
  ///
  /// # Safety
  ///
  /// `address` must be word aligned and valid for `HEADER_SIZE` bytes of writes.
  pub unsafe fn write(
    address: *mut u8,
    size: usize,
    used: bool,
  ) -> *mut Block {
    let block = address as *mut Block;
    unsafe { block.write(Block::new(size, used, ptr::null_mut())) };
    block
  }

  /// Header of the block whose payload starts at `payload`.
  ///
  /// # Safety
  ///
  /// `payload` must have been produced by [`Block::payload`].
  pub unsafe fn from_payload(payload: *mut u8) -> *mut Block {
    unsafe { payload.sub(HEADER_SIZE) as *mut Block }
  }

  /// First byte of the header itself.
  pub fn start(block: *mut Block) -> *mut u8 {
    block as *mut u8
  }

  /// # Safety
  ///
  /// `block` must point to a live header.
  pub unsafe fn payload(block: *mut Block) -> *mut u8 {
    unsafe { (block as *mut u8).add(HEADER_SIZE) }
  }

  /// One past the last payload byte, which is where a physically following
  /// block would put its header.
  ///
  /// # Safety
  ///
  /// `block` must point to a live header.
  pub unsafe fn end(block: *mut Block) -> *mut u8 {
    unsafe { Block::payload(block).add((*block).size) }
  }
}
