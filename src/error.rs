use thiserror::Error;

/// The single way an allocator operation can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
  /// The heap could not be extended, or the request could never fit in the
  /// address space.
  #[error("out of memory: cannot provide {requested} more bytes")]
  OutOfMemory { requested: usize },
}

pub type Result<T> = std::result::Result<T, AllocError>;
