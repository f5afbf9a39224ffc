//! Owning, block-aligned element buffer.

use std::{
    alloc::{Layout, alloc_zeroed, dealloc, handle_alloc_error},
    fmt,
    marker::PhantomData,
    ops::{Bound, Range, RangeBounds},
    ptr::NonNull,
};

use simdvec_common::{
    Result,
    error::{Error, ErrorKind},
    verify_arg,
};

use crate::{
    geometry::{BlockGeometry, is_ptr_aligned},
    iter::BlockIter,
    split::{BlockSplit, BlockSplitMut},
};

/// A fixed-size run of `T` elements stored for block-wise (SIMD) processing with
/// `S`-wide blocks.
///
/// The storage starts on an `size_of::<S>()` boundary and is padded with spare
/// elements past the logical end, so a block-wide load or store that touches any
/// of the logical elements never leaves the allocation. The storage is
/// zero-initialized on construction.
///
/// `SimdVec` is move-only: it exclusively owns its allocation and deliberately
/// does not implement `Clone`. [`SimdVec::take`] and [`SimdVec::move_from`]
/// transfer the allocation explicitly and leave the source empty.
///
/// # Examples
///
/// ```
/// use simdvec::SimdVec;
///
/// let mut v = SimdVec::<f32, [f32; 4]>::new(10);
/// v.iter_mut().enumerate().for_each(|(i, x)| *x = i as f32);
///
/// let split = v.blocks();
/// assert!(split.head.is_empty());
/// assert_eq!(split.body, &[[0.0, 1.0, 2.0, 3.0], [4.0, 5.0, 6.0, 7.0]]);
/// assert_eq!(split.tail, &[8.0, 9.0]);
/// ```
pub struct SimdVec<T, S> {
    /// Start of the owned allocation, also the location of element 0.
    /// `None` in the empty (moved-from) state.
    storage: Option<NonNull<T>>,
    /// Layout the storage was allocated with.
    layout: Layout,
    /// Number of logical elements.
    len: usize,
    _block: PhantomData<*const S>,
}

impl<T, S> SimdVec<T, S>
where
    T: bytemuck::Pod,
    S: bytemuck::Pod,
{
    /// Allocates a zeroed buffer holding `count` elements.
    ///
    /// # Panics
    ///
    /// Panics if the padded size overflows `isize`. Aborts through
    /// [`handle_alloc_error`] if the allocator fails.
    pub fn new(count: usize) -> SimdVec<T, S> {
        match Self::try_new(count) {
            Ok(vec) => vec,
            Err(e) => match e.into_kind() {
                ErrorKind::OutOfMemory { size, alignment } => handle_alloc_error(
                    Layout::from_size_align(size, alignment).expect("layout"),
                ),
                kind => panic!("{}", Error::from(kind)),
            },
        }
    }

    /// Allocates a zeroed buffer holding `count` elements.
    ///
    /// The allocation holds `count + count % k + k` elements, where `k` is the
    /// number of lanes per block, and is aligned to `size_of::<S>()`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::CapacityOverflow`] if the padded size does not fit a
    /// valid layout, and [`ErrorKind::OutOfMemory`] if the allocator fails. Nothing
    /// is allocated in either case.
    pub fn try_new(count: usize) -> Result<SimdVec<T, S>> {
        let layout = Self::storage_layout(count)?;
        // Layout size is never zero: the padding always covers one full block.
        let ptr = unsafe { alloc_zeroed(layout) };
        let Some(storage) = NonNull::new(ptr.cast::<T>()) else {
            log::debug!(
                "failed to allocate {} bytes aligned to {} for {count} elements",
                layout.size(),
                layout.align()
            );
            return Err(Error::out_of_memory(layout.size(), layout.align()));
        };
        debug_assert!(is_ptr_aligned(storage.as_ptr(), layout.align()));
        log::trace!(
            "allocated {count} elements ({} bytes, align {}) at {storage:p}",
            layout.size(),
            layout.align()
        );
        Ok(SimdVec {
            storage: Some(storage),
            layout,
            len: count,
            _block: PhantomData,
        })
    }

    /// Allocates a buffer holding a copy of `data`.
    pub fn from_slice(data: &[T]) -> Result<SimdVec<T, S>> {
        let mut vec = Self::try_new(data.len())?;
        vec.as_mut_slice().copy_from_slice(data);
        Ok(vec)
    }

    /// Returns a slice over the logical elements.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        match self.storage {
            Some(storage) => unsafe { std::slice::from_raw_parts(storage.as_ptr(), self.len) },
            None => &[],
        }
    }

    /// Returns a mutable slice over the logical elements.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        match self.storage {
            Some(storage) => unsafe {
                std::slice::from_raw_parts_mut(storage.as_ptr(), self.len)
            },
            None => &mut [],
        }
    }

    /// Splits the elements into an unaligned head, whole blocks, and an unaligned
    /// tail. The head of a non-empty buffer is always empty, since the storage
    /// starts on a block boundary.
    #[inline]
    pub fn blocks(&self) -> BlockSplit<'_, T, S> {
        BlockSplit::of(self.as_slice())
    }

    /// Mutable counterpart of [`SimdVec::blocks`].
    #[inline]
    pub fn blocks_mut(&mut self) -> BlockSplitMut<'_, T, S> {
        BlockSplitMut::of(self.as_mut_slice())
    }

    /// Splits the elements within `range` into head, blocks, and tail.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`] if the range is decreasing or extends
    /// past the end of the buffer.
    pub fn blocks_in(&self, range: impl RangeBounds<usize>) -> Result<BlockSplit<'_, T, S>> {
        let range = self.resolve_range(range)?;
        Ok(BlockSplit::of(&self.as_slice()[range]))
    }

    fn resolve_range(&self, range: impl RangeBounds<usize>) -> Result<Range<usize>> {
        let start = match range.start_bound() {
            Bound::Included(&n) => n,
            Bound::Excluded(&n) => n.checked_add(1).ok_or_else(|| {
                Error::invalid_arg("range", "start bound overflows")
            })?,
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&n) => n
                .checked_add(1)
                .ok_or_else(|| Error::invalid_arg("range", "end bound overflows"))?,
            Bound::Excluded(&n) => n,
            Bound::Unbounded => self.len,
        };
        verify_arg!(range, start <= end);
        verify_arg!(range, end <= self.len);
        Ok(start..end)
    }

    fn storage_layout(count: usize) -> Result<Layout> {
        let element_size = BlockGeometry::<T, S>::ELEMENT_SIZE;
        let overflow = || Error::capacity_overflow(count, element_size);
        let capacity = BlockGeometry::<T, S>::padded_capacity(count).ok_or_else(overflow)?;
        let size = capacity.checked_mul(element_size).ok_or_else(overflow)?;
        Layout::from_size_align(size, BlockGeometry::<T, S>::BLOCK_ALIGNMENT)
            .map_err(|_| overflow())
    }
}

impl<T, S> SimdVec<T, S> {
    /// Creates an empty buffer that owns no storage.
    pub const fn empty() -> SimdVec<T, S> {
        SimdVec {
            storage: None,
            layout: EMPTY_LAYOUT,
            len: 0,
            _block: PhantomData,
        }
    }

    /// Moves the storage out into a new buffer, leaving `self` empty.
    #[inline]
    pub fn take(&mut self) -> SimdVec<T, S> {
        std::mem::replace(self, Self::empty())
    }

    /// Releases the storage currently owned by `self`, then takes over the storage
    /// of `source`, leaving `source` empty.
    ///
    /// If both buffers hold the same storage handle the call does nothing.
    pub fn move_from(&mut self, source: &mut SimdVec<T, S>) {
        if self.storage.is_some() && self.storage == source.storage {
            return;
        }
        *self = source.take();
    }

    /// Number of logical elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if the buffer owns an allocation.
    #[inline]
    pub fn has_storage(&self) -> bool {
        self.storage.is_some()
    }

    /// Number of elements the allocation can hold, including the padding past the
    /// logical end.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.layout.size() / std::mem::size_of::<T>().max(1)
    }

    /// Total allocated size in bytes.
    #[inline]
    pub fn heap_size(&self) -> usize {
        self.layout.size()
    }

    /// Alignment of the storage in bytes, equal to `size_of::<S>()`.
    #[inline]
    pub fn alignment(&self) -> usize {
        BlockGeometry::<T, S>::BLOCK_ALIGNMENT
    }

    /// Returns a raw pointer to element 0, or null for an empty buffer.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.data()
    }

    /// Returns a raw mutable pointer to element 0, or null for an empty buffer.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.data()
    }

    /// Iterator positioned at element 0.
    ///
    /// The iterator borrows the buffer shared, so it is meant for reading and
    /// for locating blocks. Writing through it ([`BlockIter::write`],
    /// [`BlockIter::get_mut`]) must not overlap a live slice obtained from
    /// [`SimdVec::as_slice`] or `Deref`; use [`SimdVec::begin_mut`] to write.
    #[inline]
    pub fn begin(&self) -> BlockIter<'_, T, S> {
        BlockIter::from_ptr(self.data())
    }

    /// Iterator positioned one past the last logical element.
    #[inline]
    pub fn end(&self) -> BlockIter<'_, T, S> {
        BlockIter::from_ptr(self.data().wrapping_add(self.len))
    }

    /// Iterator positioned at element 0 that holds the buffer exclusively for its
    /// lifetime, so writes through it cannot alias any slice borrow.
    #[inline]
    pub fn begin_mut(&mut self) -> BlockIter<'_, T, S> {
        BlockIter::from_ptr(self.data())
    }

    /// Exclusive counterpart of [`SimdVec::end`].
    #[inline]
    pub fn end_mut(&mut self) -> BlockIter<'_, T, S> {
        BlockIter::from_ptr(self.data().wrapping_add(self.len))
    }

    #[inline]
    fn data(&self) -> *mut T {
        self.storage
            .map_or(std::ptr::null_mut(), |storage| storage.as_ptr())
    }

    fn release(&mut self) {
        if let Some(storage) = self.storage.take() {
            log::trace!(
                "releasing {} elements ({} bytes) at {storage:p}",
                self.len,
                self.layout.size()
            );
            unsafe { dealloc(storage.as_ptr().cast(), self.layout) };
            self.layout = EMPTY_LAYOUT;
            self.len = 0;
        }
    }
}

const EMPTY_LAYOUT: Layout = Layout::new::<()>();

impl<T, S> Drop for SimdVec<T, S> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T, S> Default for SimdVec<T, S> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T, S> std::ops::Deref for SimdVec<T, S>
where
    T: bytemuck::Pod,
    S: bytemuck::Pod,
{
    type Target = [T];

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<T, S> std::ops::DerefMut for SimdVec<T, S>
where
    T: bytemuck::Pod,
    S: bytemuck::Pod,
{
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl<T, S> AsRef<[T]> for SimdVec<T, S>
where
    T: bytemuck::Pod,
    S: bytemuck::Pod,
{
    #[inline]
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, S> AsMut<[T]> for SimdVec<T, S>
where
    T: bytemuck::Pod,
    S: bytemuck::Pod,
{
    #[inline]
    fn as_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, S> fmt::Debug for SimdVec<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimdVec")
            .field("ptr", &self.data())
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .field("alignment", &self.alignment())
            .finish()
    }
}

// SAFETY: SimdVec exclusively owns its allocation, so moving it to another thread
// moves the elements with it.
unsafe impl<T: Send, S> Send for SimdVec<T, S> {}
