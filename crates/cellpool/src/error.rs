//! Construction- and allocation-time error types.
//!
//! A small hand-written `enum` covers every way a pool can fail to
//! construct or a forced collection can fail; constructors return
//! `Result<Pool<Id>, PoolError>` rather than a sentinel value.

use std::fmt;

/// Reasons a pool failed to construct, or a forced collection failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// `cell_sz` is smaller than the configured cell-ID width.
    CellTooSmall {
        /// The rejected cell size, in bytes.
        cell_sz: usize,
        /// The minimum required cell size (the ID width), in bytes.
        min: usize,
    },
    /// `cell_sz` is not a multiple of pointer alignment.
    Misaligned {
        /// The rejected cell size, in bytes.
        cell_sz: usize,
    },
    /// The supplied buffer (fixed pool) or computed region (growable pool)
    /// cannot hold the header, at least two cells, and their markbits.
    BufferTooSmall {
        /// Bytes available for cells and markbits.
        available: usize,
        /// Bytes required for two cells and their markbits.
        required: usize,
    },
    /// `new_growable` was called with `start_count == 0`.
    ZeroCount,
    /// The memory callback returned a null/absent pointer for an allocation
    /// or realloc request.
    AllocationFailed,
    /// The user's mark callback returned an error during `alloc` or
    /// `force_gc`.
    MarkCallbackFailed,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::CellTooSmall { cell_sz, min } => {
                write!(f, "cell_sz {cell_sz} is smaller than the id width {min}")
            }
            Self::Misaligned { cell_sz } => {
                write!(
                    f,
                    "cell_sz {cell_sz} is not a multiple of pointer alignment"
                )
            }
            Self::BufferTooSmall {
                available,
                required,
            } => write!(
                f,
                "buffer too small for gc pool: have {available} bytes, need at least {required}"
            ),
            Self::ZeroCount => write!(f, "start_count must be at least 1"),
            Self::AllocationFailed => write!(f, "the memory callback failed to allocate"),
            Self::MarkCallbackFailed => write!(f, "the mark callback reported failure"),
        }
    }
}

impl std::error::Error for PoolError {}
