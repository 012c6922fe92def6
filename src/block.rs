// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

use zeroize::Zeroize;

/// AES block size
pub const BLOCK_SIZE: usize = accel::BLOCK_SIZE;

/// Largest hash block size
pub const MAX_HASH_BLOCK_SIZE: usize = 128;

/// Holds input that does not fill a whole block yet
///
/// `N` is the storage size, the effective block size can be smaller so
/// the same buffer serves hashes with 64 and 128 byte blocks.
#[derive(Clone, Debug)]
pub struct BlockBuffer<const N: usize> {
    buf: [u8; N],
    block_size: usize,
    len: usize,
}

impl<const N: usize> Drop for BlockBuffer<N> {
    fn drop(&mut self) {
        self.buf.zeroize();
    }
}

impl<const N: usize> BlockBuffer<N> {
    pub fn new(block_size: usize) -> BlockBuffer<N> {
        BlockBuffer {
            buf: [0u8; N],
            block_size: std::cmp::min(block_size, N),
            len: 0,
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.block_size
    }

    /// Copies as much of `data` as fits in the block, returns the number
    /// of bytes consumed
    pub fn fill_from(&mut self, data: &[u8]) -> usize {
        let take = std::cmp::min(self.block_size - self.len, data.len());
        self.buf[self.len..self.len + take].copy_from_slice(&data[..take]);
        self.len += take;
        take
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// The whole block storage, including the unused tail
    pub fn block_mut(&mut self) -> &mut [u8] {
        &mut self.buf[..self.block_size]
    }

    pub fn clear(&mut self) {
        self.buf.zeroize();
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_and_clear() {
        let mut b = BlockBuffer::<MAX_HASH_BLOCK_SIZE>::new(64);
        assert!(b.is_empty());
        assert_eq!(b.fill_from(&[1u8; 40]), 40);
        assert_eq!(b.fill_from(&[2u8; 40]), 24);
        assert!(b.is_full());
        assert_eq!(b.as_slice()[39..41], [1, 2]);
        b.clear();
        assert_eq!(b.len(), 0);
        assert_eq!(b.fill_from(&[]), 0);
    }
}
