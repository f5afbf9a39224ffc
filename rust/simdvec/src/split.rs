//! Decomposition of an element run into an unaligned head, whole aligned blocks,
//! and an unaligned tail.

use crate::{geometry::BlockGeometry, iter::BlockIter};

/// Read-only view of a run of `T` elements split at `S` block boundaries.
///
/// `head` holds the elements before the first block boundary, `body` the whole
/// blocks in between, and `tail` the elements after the last block boundary.
/// `head` and `tail` are each shorter than one block, and `body` starts on a
/// block-aligned address.
///
/// A run whose start address is not a multiple of the element size (possible when
/// `T` is aligned more loosely than its size) never lines up with a block
/// boundary; it is returned whole as `head` with an empty `body` and `tail`.
#[derive(Debug, Clone, Copy)]
pub struct BlockSplit<'a, T, S> {
    pub head: &'a [T],
    pub body: &'a [S],
    pub tail: &'a [T],
}

impl<'a, T, S> BlockSplit<'a, T, S>
where
    T: bytemuck::Pod,
    S: bytemuck::Pod,
{
    /// Splits `data` at the block boundaries of its addresses.
    pub fn of(data: &'a [T]) -> BlockSplit<'a, T, S> {
        let lens = SplitLens::compute::<T, S>(data.as_ptr(), data.len());
        let (head, rest) = data.split_at(lens.head);
        let (body, tail) = rest.split_at(lens.body_elements());
        // An empty body may sit on an unaligned address, which `cast_slice` rejects.
        let body = if body.is_empty() {
            &[]
        } else {
            bytemuck::cast_slice(body)
        };
        BlockSplit { head, body, tail }
    }

    /// Total number of elements covered by the split.
    pub fn len(&self) -> usize {
        self.head.len() + self.body.len() * BlockGeometry::<T, S>::LANES + self.tail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mutable view of a run of `T` elements split at `S` block boundaries.
///
/// See [`BlockSplit`] for the layout of the three parts.
#[derive(Debug)]
pub struct BlockSplitMut<'a, T, S> {
    pub head: &'a mut [T],
    pub body: &'a mut [S],
    pub tail: &'a mut [T],
}

impl<'a, T, S> BlockSplitMut<'a, T, S>
where
    T: bytemuck::Pod,
    S: bytemuck::Pod,
{
    /// Splits `data` at the block boundaries of its addresses.
    pub fn of(data: &'a mut [T]) -> BlockSplitMut<'a, T, S> {
        let lens = SplitLens::compute::<T, S>(data.as_ptr(), data.len());
        let (head, rest) = data.split_at_mut(lens.head);
        let (body, tail) = rest.split_at_mut(lens.body_elements());
        let body = if body.is_empty() {
            &mut []
        } else {
            bytemuck::cast_slice_mut(body)
        };
        BlockSplitMut { head, body, tail }
    }

    /// Total number of elements covered by the split.
    pub fn len(&self) -> usize {
        self.head.len() + self.body.len() * BlockGeometry::<T, S>::LANES + self.tail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Element counts of the three parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SplitLens {
    head: usize,
    blocks: usize,
    lanes: usize,
}

impl SplitLens {
    fn compute<T, S>(start: *const T, len: usize) -> SplitLens {
        let lanes = BlockGeometry::<T, S>::LANES;
        let whole_head = SplitLens {
            head: len,
            blocks: 0,
            lanes,
        };
        if start.addr() % BlockGeometry::<T, S>::ELEMENT_SIZE != 0 {
            return whole_head;
        }

        let begin = BlockIter::<T, S>::from_ptr(start.cast_mut());
        let end = begin + len as isize;

        // The first boundary at or after `begin` may lie beyond `end`.
        let head = ((-begin.upper_offset()) as usize).min(len);
        if head == len {
            return whole_head;
        }

        let body_start = begin + head as isize;
        let body_end = end.lower_block_iter();
        debug_assert!(body_start.is_block_aligned());
        debug_assert!(body_start <= body_end);
        SplitLens {
            head,
            blocks: (body_end - body_start) as usize / lanes,
            lanes,
        }
    }

    fn body_elements(&self) -> usize {
        self.blocks * self.lanes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C, align(64))]
    struct Arena([u32; 64]);

    fn arena() -> Arena {
        let mut arena = Arena([0; 64]);
        for (i, v) in arena.0.iter_mut().enumerate() {
            *v = i as u32;
        }
        arena
    }

    #[test]
    fn test_split_lens_examples() {
        let arena = arena();
        let base = arena.0.as_ptr();
        let lens = |start: usize, len: usize| {
            let l = SplitLens::compute::<u32, [u32; 4]>(base.wrapping_add(start), len);
            (l.head, l.blocks, len - l.head - l.body_elements())
        };
        assert_eq!(lens(0, 0), (0, 0, 0));
        assert_eq!(lens(0, 10), (0, 2, 2));
        assert_eq!(lens(1, 10), (3, 1, 3));
        assert_eq!(lens(1, 2), (2, 0, 0));
        assert_eq!(lens(3, 1), (1, 0, 0));
        assert_eq!(lens(3, 5), (1, 1, 0));
        assert_eq!(lens(4, 4), (0, 1, 0));
        assert_eq!(lens(5, 3), (3, 0, 0));
    }

    #[test]
    fn test_split_every_subrange() {
        let arena = arena();
        for start in 0..64 {
            for end in start..=64 {
                let data = &arena.0[start..end];
                let split = BlockSplit::<u32, [u32; 4]>::of(data);
                assert_eq!(split.len(), data.len());
                assert!(split.head.len() < 4);
                assert!(split.tail.len() < 4);
                if !split.body.is_empty() {
                    assert_eq!(split.body.as_ptr().addr() % 16, 0);
                }

                let flat: Vec<u32> = split
                    .head
                    .iter()
                    .copied()
                    .chain(split.body.iter().flatten().copied())
                    .chain(split.tail.iter().copied())
                    .collect();
                assert_eq!(flat, data);
            }
        }
    }

    #[test]
    fn test_split_mut() {
        let mut arena = arena();
        let split = BlockSplitMut::<u32, [u32; 4]>::of(&mut arena.0[2..15]);
        assert_eq!(split.head.len(), 2);
        assert_eq!(split.body.len(), 2);
        assert_eq!(split.tail.len(), 3);
        split.head.fill(0);
        for block in split.body.iter_mut() {
            block.iter_mut().for_each(|x| *x *= 10);
        }
        split.tail.fill(1);
        assert_eq!(&arena.0[..4], &[0, 1, 0, 0]);
        assert_eq!(&arena.0[4..12], &[40, 50, 60, 70, 80, 90, 100, 110]);
        assert_eq!(&arena.0[12..16], &[1, 1, 1, 15]);
    }

    #[test]
    fn test_split_loosely_aligned_elements() {
        type Pair = [u16; 2];
        type Quad = [Pair; 4];

        #[repr(C, align(64))]
        struct Halves([u16; 64]);

        let mut halves = Halves([0; 64]);
        for (i, v) in halves.0.iter_mut().enumerate() {
            *v = i as u16;
        }

        // Starting on a pair boundary: ordinary head/body/tail.
        let pairs: &[Pair] = bytemuck::cast_slice(&halves.0[2..28]);
        let split = BlockSplit::<Pair, Quad>::of(pairs);
        assert_eq!(split.head, &[[2, 3], [4, 5], [6, 7]]);
        assert_eq!(split.body.len(), 2);
        assert_eq!(split.body[0][0], [8, 9]);
        assert_eq!(split.tail, &[[24, 25], [26, 27]]);
        assert_eq!(split.body.as_ptr().addr() % 16, 0);

        // Starting half-way into a pair: no element can sit on a block boundary.
        let pairs: &[Pair] = bytemuck::cast_slice(&halves.0[1..29]);
        let split = BlockSplit::<Pair, Quad>::of(pairs);
        assert_eq!(split.head.len(), 14);
        assert_eq!(split.head[0], [1, 2]);
        assert!(split.body.is_empty());
        assert!(split.tail.is_empty());
        assert_eq!(split.len(), pairs.len());
    }

    #[test]
    fn test_split_empty() {
        let split = BlockSplit::<f32, [f32; 8]>::of(&[]);
        assert!(split.is_empty());
        assert!(split.head.is_empty() && split.body.is_empty() && split.tail.is_empty());
    }
}
