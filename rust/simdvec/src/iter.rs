//! Random-access element iterator that can locate the SIMD blocks around its position.
//!
//! A [`BlockIter`] wraps a raw element pointer. Besides the usual random-access
//! operations (offsetting, distance, ordering, unchecked dereference) it reports,
//! for the current position, the block of type `S` that contains it (rounding
//! down) and the block boundary that follows it (rounding up).
//!
//! Block boundaries are absolute addresses that are multiples of `size_of::<S>()`.
//! [`SimdVec`](crate::SimdVec) allocates its storage on such a boundary, so for
//! its iterators the block offsets coincide with element indices modulo the
//! number of lanes.

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
    ops::{Add, AddAssign, Sub, SubAssign},
};

use crate::geometry::{BlockGeometry, align_down, is_aligned};

/// Random-access iterator over elements of type `T`, aware of the `S`-wide blocks
/// that tile the address space.
///
/// The iterator does not own anything and performs no bounds checking. All
/// position arithmetic is wrapping and therefore safe on its own; dereferencing
/// is `unsafe` and requires the position to point at a live element of the
/// buffer the iterator was derived from.
///
/// Iterators from different buffers may be compared and subtracted, but the
/// result carries no meaning.
pub struct BlockIter<'a, T, S> {
    position: *mut T,
    _marker: PhantomData<(&'a T, *const S)>,
}

impl<'a, T, S> BlockIter<'a, T, S> {
    /// Number of elements per block.
    pub const LANES: usize = BlockGeometry::<T, S>::LANES;

    /// Creates an iterator positioned at `position`.
    ///
    /// The caller picks the lifetime; it should not outlive the allocation
    /// `position` points into.
    #[inline]
    pub fn from_ptr(position: *mut T) -> BlockIter<'a, T, S> {
        let () = BlockGeometry::<T, S>::ASSERT_VALID;
        BlockIter {
            position,
            _marker: PhantomData,
        }
    }

    /// Creates an iterator that points nowhere.
    #[inline]
    pub fn null() -> BlockIter<'a, T, S> {
        Self::from_ptr(std::ptr::null_mut())
    }

    /// Returns the wrapped element pointer (member access).
    #[inline]
    pub fn as_ptr(&self) -> *mut T {
        self.position
    }

    /// Returns the address of the current position.
    #[inline]
    pub fn addr(&self) -> usize {
        self.position.addr()
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.position.is_null()
    }

    /// Returns a reference to the element at the current position.
    ///
    /// # Safety
    ///
    /// The position must point at an initialized element inside a live buffer, and
    /// no mutable reference to that element may exist for the returned lifetime.
    #[inline]
    pub unsafe fn get(&self) -> &'a T {
        unsafe { &*self.position }
    }

    /// Returns a mutable reference to the element at the current position.
    ///
    /// # Safety
    ///
    /// Same as [`BlockIter::get`], and additionally no other reference to that
    /// element may exist for the returned lifetime.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_mut(&self) -> &'a mut T {
        unsafe { &mut *self.position }
    }

    /// Returns a reference to the element `n` positions away (indexed access).
    ///
    /// # Safety
    ///
    /// `self + n` must satisfy the requirements of [`BlockIter::get`].
    #[inline]
    pub unsafe fn at(&self, n: isize) -> &'a T {
        unsafe { &*self.position.offset(n) }
    }

    /// Returns a mutable reference to the element `n` positions away.
    ///
    /// # Safety
    ///
    /// `self + n` must satisfy the requirements of [`BlockIter::get_mut`].
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn at_mut(&self, n: isize) -> &'a mut T {
        unsafe { &mut *self.position.offset(n) }
    }

    /// Reads the element at the current position.
    ///
    /// # Safety
    ///
    /// The position must point at an initialized element inside a live buffer.
    #[inline]
    pub unsafe fn read(&self) -> T
    where
        T: Copy,
    {
        unsafe { self.position.read() }
    }

    /// Overwrites the element at the current position.
    ///
    /// # Safety
    ///
    /// The position must point at an element inside a live buffer, and no
    /// reference to that element may be alive.
    #[inline]
    pub unsafe fn write(&self, value: T)
    where
        T: Copy,
    {
        unsafe { self.position.write(value) }
    }

    /// Advances by one element (pre-increment).
    #[inline]
    pub fn inc(&mut self) -> &mut Self {
        self.position = self.position.wrapping_add(1);
        self
    }

    /// Steps back by one element (pre-decrement).
    #[inline]
    pub fn dec(&mut self) -> &mut Self {
        self.position = self.position.wrapping_sub(1);
        self
    }

    /// Advances by one element, returning the previous position (post-increment).
    #[inline]
    pub fn post_inc(&mut self) -> Self {
        let prev = *self;
        self.inc();
        prev
    }

    /// Steps back by one element, returning the previous position (post-decrement).
    #[inline]
    pub fn post_dec(&mut self) -> Self {
        let prev = *self;
        self.dec();
        prev
    }

    /// Returns an iterator moved by `n` elements.
    #[inline]
    pub fn offset(self, n: isize) -> Self {
        Self::from_ptr(self.position.wrapping_offset(n))
    }

    /// Signed number of elements from `origin` to `self`.
    #[inline]
    pub fn distance_from(self, origin: Self) -> isize {
        let bytes = (self.addr() as isize).wrapping_sub(origin.addr() as isize);
        bytes / BlockGeometry::<T, S>::ELEMENT_SIZE as isize
    }

    /// Number of elements by which the position lies past the start of its block.
    ///
    /// Always within `[0, LANES - 1]`; zero means the position is block-aligned.
    /// Exact when the address is a multiple of the element size, which holds for
    /// every position inside a [`SimdVec`](crate::SimdVec).
    #[inline]
    pub fn lower_offset(&self) -> isize {
        let addr = self.addr();
        let rem = addr - align_down(addr, BlockGeometry::<T, S>::BLOCK_ALIGNMENT);
        (rem / BlockGeometry::<T, S>::ELEMENT_SIZE) as isize
    }

    /// Pointer to the block that contains the current position.
    ///
    /// Advancing the result, viewed as a `*mut T`, by [`BlockIter::lower_offset`]
    /// elements gives back the current position.
    #[inline]
    pub fn lower_block(&self) -> *mut S {
        self.lower_block_iter().position.cast()
    }

    /// Signed element offset from the position to the next block boundary at or
    /// after it.
    ///
    /// Zero if the position is already aligned, otherwise negative with a magnitude
    /// within `[1, LANES - 1]`. The boundary lies `-upper_offset()` elements ahead.
    #[inline]
    pub fn upper_offset(&self) -> isize {
        let lower = self.lower_offset();
        if lower == 0 {
            0
        } else {
            lower - Self::LANES as isize
        }
    }

    /// Pointer to the block boundary at or after the current position.
    ///
    /// For an unaligned position this is exactly one block past
    /// [`BlockIter::lower_block`]; for an aligned one the two coincide.
    #[inline]
    pub fn upper_block(&self) -> *mut S {
        self.upper_block_iter().position.cast()
    }

    #[inline]
    pub fn is_block_aligned(&self) -> bool {
        is_aligned(self.addr(), BlockGeometry::<T, S>::BLOCK_ALIGNMENT)
    }

    /// Element iterator positioned at [`BlockIter::lower_block`].
    #[inline]
    pub fn lower_block_iter(self) -> Self {
        self.offset(-self.lower_offset())
    }

    /// Element iterator positioned at [`BlockIter::upper_block`].
    #[inline]
    pub fn upper_block_iter(self) -> Self {
        self.offset(-self.upper_offset())
    }
}

impl<T, S> Clone for BlockIter<'_, T, S> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, S> Copy for BlockIter<'_, T, S> {}

impl<T, S> Default for BlockIter<'_, T, S> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T, S> PartialEq for BlockIter<'_, T, S> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
    }
}

impl<T, S> Eq for BlockIter<'_, T, S> {}

impl<T, S> PartialOrd for BlockIter<'_, T, S> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T, S> Ord for BlockIter<'_, T, S> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.position.cmp(&other.position)
    }
}

impl<T, S> Hash for BlockIter<'_, T, S> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.position.hash(state);
    }
}

impl<T, S> fmt::Debug for BlockIter<'_, T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockIter")
            .field("position", &self.position)
            .field("lower_offset", &self.lower_offset())
            .finish()
    }
}

impl<T, S> AddAssign<isize> for BlockIter<'_, T, S> {
    #[inline]
    fn add_assign(&mut self, n: isize) {
        self.position = self.position.wrapping_offset(n);
    }
}

impl<T, S> SubAssign<isize> for BlockIter<'_, T, S> {
    #[inline]
    fn sub_assign(&mut self, n: isize) {
        self.position = self.position.wrapping_offset(n.wrapping_neg());
    }
}

impl<'a, T, S> Add<isize> for BlockIter<'a, T, S> {
    type Output = BlockIter<'a, T, S>;

    #[inline]
    fn add(mut self, n: isize) -> Self::Output {
        self += n;
        self
    }
}

impl<'a, T, S> Add<BlockIter<'a, T, S>> for isize {
    type Output = BlockIter<'a, T, S>;

    #[inline]
    fn add(self, mut it: BlockIter<'a, T, S>) -> Self::Output {
        it += self;
        it
    }
}

impl<'a, T, S> Sub<isize> for BlockIter<'a, T, S> {
    type Output = BlockIter<'a, T, S>;

    #[inline]
    fn sub(mut self, n: isize) -> Self::Output {
        self -= n;
        self
    }
}

impl<'a, T, S> Sub<BlockIter<'a, T, S>> for BlockIter<'a, T, S> {
    type Output = isize;

    #[inline]
    fn sub(self, origin: BlockIter<'a, T, S>) -> isize {
        self.distance_from(origin)
    }
}
