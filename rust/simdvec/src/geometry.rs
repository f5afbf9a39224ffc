//! Block geometry of an element/block type pairing and address alignment helpers.

use std::marker::PhantomData;

/// Compile-time description of how elements of type `T` tile a block of type `S`.
///
/// A block is the unit of a wide (SIMD) load or store. The pairing is valid only if
/// `T` is not zero-sized, `size_of::<S>()` is a power of two, and `size_of::<S>()`
/// is a whole multiple of `size_of::<T>()`. An address that is a multiple of the
/// element size is then a whole number of elements away from the block boundary
/// below it. Element alignment may be smaller than the element size (`f64` on
/// 32-bit x86), so only storage laid out from a block boundary is guaranteed to
/// have that property. Referencing [`BlockGeometry::ASSERT_VALID`] turns an
/// invalid pairing into a compile error at monomorphization.
///
/// # Examples
///
/// ```
/// use simdvec::geometry::BlockGeometry;
///
/// assert_eq!(BlockGeometry::<f32, [f32; 4]>::LANES, 4);
/// assert_eq!(BlockGeometry::<u8, [u64; 4]>::LANES, 32);
/// assert_eq!(BlockGeometry::<f64, [f64; 8]>::BLOCK_ALIGNMENT, 64);
/// ```
pub struct BlockGeometry<T, S>(PhantomData<(T, S)>);

impl<T, S> BlockGeometry<T, S> {
    /// Size of a single element in bytes.
    pub const ELEMENT_SIZE: usize = std::mem::size_of::<T>();

    /// Size of a single block in bytes.
    pub const BLOCK_SIZE: usize = std::mem::size_of::<S>();

    /// Number of elements per block (`k`).
    pub const LANES: usize = {
        let () = Self::ASSERT_VALID;
        Self::BLOCK_SIZE / Self::ELEMENT_SIZE
    };

    /// Address alignment of block boundaries. Block boundaries are the absolute
    /// addresses that are multiples of the block size.
    pub const BLOCK_ALIGNMENT: usize = {
        let () = Self::ASSERT_VALID;
        Self::BLOCK_SIZE
    };

    /// Evaluates to `()` for a valid pairing, fails const evaluation otherwise.
    pub const ASSERT_VALID: () = {
        assert!(
            Self::ELEMENT_SIZE != 0,
            "element type must not be zero-sized"
        );
        assert!(
            Self::BLOCK_SIZE.is_power_of_two(),
            "block size must be a power of two"
        );
        assert!(
            Self::BLOCK_SIZE % Self::ELEMENT_SIZE == 0,
            "block size must be a multiple of the element size"
        );
    };

    /// Number of elements to allocate for `count` logical elements: the logical run,
    /// plus `count % k` and one full spare block, so that a block-wide access touching
    /// any of the last elements stays inside the allocation.
    ///
    /// Returns `None` on arithmetic overflow.
    #[inline]
    pub const fn padded_capacity(count: usize) -> Option<usize> {
        let lanes = Self::LANES;
        match count.checked_add(count % lanes) {
            Some(n) => n.checked_add(lanes),
            None => None,
        }
    }
}

/// Aligns a number down to the previous multiple of the specified alignment.
///
/// # Examples
///
/// ```
/// use simdvec::geometry::align_down;
///
/// assert_eq!(align_down(0, 16), 0);
/// assert_eq!(align_down(15, 16), 0);
/// assert_eq!(align_down(16, 16), 16);
/// assert_eq!(align_down(31, 16), 16);
/// ```
///
/// # Panics
///
/// This function will panic in debug builds if `alignment` is 0 or not a power of 2.
#[inline]
pub fn align_down(n: usize, alignment: usize) -> usize {
    debug_assert_ne!(alignment, 0);
    debug_assert!(alignment.is_power_of_two());
    n & !(alignment - 1)
}

/// Checks if a number is aligned to the specified alignment boundary.
#[inline]
pub fn is_aligned(n: usize, alignment: usize) -> bool {
    debug_assert_ne!(alignment, 0);
    debug_assert!(alignment.is_power_of_two());
    (n & (alignment - 1)) == 0
}

/// Checks if a pointer's address is aligned to the specified alignment boundary.
#[inline]
pub fn is_ptr_aligned<T>(ptr: *const T, alignment: usize) -> bool {
    is_aligned(ptr.addr(), alignment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C, align(32))]
    #[derive(Clone, Copy)]
    struct F64x4([f64; 4]);

    #[test]
    fn test_lanes() {
        assert_eq!(BlockGeometry::<f32, [f32; 4]>::LANES, 4);
        assert_eq!(BlockGeometry::<f64, F64x4>::LANES, 4);
        assert_eq!(BlockGeometry::<u16, u64>::LANES, 4);
        assert_eq!(BlockGeometry::<u32, u32>::LANES, 1);
        assert_eq!(BlockGeometry::<u8, [u8; 64]>::LANES, 64);
    }

    #[test]
    fn test_block_alignment() {
        assert_eq!(BlockGeometry::<f32, [f32; 4]>::BLOCK_ALIGNMENT, 16);
        assert_eq!(BlockGeometry::<f64, F64x4>::BLOCK_ALIGNMENT, 32);
    }

    #[test]
    fn test_padded_capacity() {
        type G = BlockGeometry<f32, [f32; 4]>;
        assert_eq!(G::padded_capacity(0), Some(4));
        assert_eq!(G::padded_capacity(1), Some(6));
        assert_eq!(G::padded_capacity(4), Some(8));
        assert_eq!(G::padded_capacity(10), Some(16));
        assert_eq!(G::padded_capacity(usize::MAX), None);

        // Whatever the count, at least one full block follows the last element.
        for count in 0..100 {
            let cap = G::padded_capacity(count).unwrap();
            assert!(cap >= count + 4);
        }
    }

    #[test]
    fn test_align_helpers() {
        for n in 0..256usize {
            let down = align_down(n, 32);
            assert!(is_aligned(down, 32));
            assert!(down <= n && n - down < 32);
            assert_eq!(is_aligned(n, 32), down == n);
        }
    }

    #[test]
    fn test_is_ptr_aligned() {
        let block = F64x4([0.0; 4]);
        let p = &block as *const F64x4 as *const f64;
        assert!(is_ptr_aligned(p, 32));
        assert!(!is_ptr_aligned(p.wrapping_add(1), 32));
        assert!(is_ptr_aligned(p.wrapping_add(4), 32));
    }
}
