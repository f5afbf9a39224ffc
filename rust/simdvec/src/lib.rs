//! Contiguous element storage for hand-vectorized numeric kernels.
//!
//! [`SimdVec<T, S>`] owns a run of `T` elements laid out on `S`-wide block
//! boundaries, where `S` is the unit of a SIMD load or store (for example
//! `[f32; 8]` or `__m256`). Its [`BlockIter`] can report, for any element, the
//! block that contains it and the block boundary that follows it, which lets a
//! kernel process an unaligned head element by element, the aligned middle one
//! block at a time, and the unaligned tail element by element again.
//! [`BlockSplit`] performs that decomposition safely on any slice.

pub mod geometry;
pub mod iter;
pub mod split;
pub mod vector;

pub use geometry::BlockGeometry;
pub use iter::BlockIter;
pub use split::{BlockSplit, BlockSplitMut};
pub use vector::SimdVec;

pub use simdvec_common::{
    Result,
    error::{Error, ErrorKind},
};
