// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

use crate::block::BLOCK_SIZE;
use crate::error::{Result, Status};

/* 0xff when a < b, 0 otherwise, without branches */
fn ct_lt(a: usize, b: usize) -> u8 {
    0u8.wrapping_sub((a < b) as u8)
}

/// Pads `block`, whose first `used` bytes are data, to a full block
pub fn pkcs7_pad(block: &mut [u8], used: usize) -> Result<()> {
    if block.len() != BLOCK_SIZE || used >= BLOCK_SIZE {
        return Err(Status::InvalidArgument)?;
    }
    let pad = (BLOCK_SIZE - used) as u8;
    block[used..].fill(pad);
    Ok(())
}

/// Returns the number of padding bytes at the end of the final decrypted
/// block. Every byte of the block is examined regardless of where a
/// mismatch is found.
pub fn pkcs7_unpad(block: &[u8]) -> Result<usize> {
    if block.len() != BLOCK_SIZE {
        return Err(Status::InvalidArgument)?;
    }
    let pad = block[BLOCK_SIZE - 1] as usize;
    /* pad count must be in 1..=BLOCK_SIZE */
    let mut bad = !ct_lt(0, pad) | !ct_lt(pad, BLOCK_SIZE + 1);
    for (i, b) in block.iter().enumerate() {
        /* byte i belongs to the padding when BLOCK_SIZE - i <= pad */
        let in_pad = !ct_lt(pad, BLOCK_SIZE - i);
        bad |= in_pad & (*b ^ pad as u8);
    }
    if bad != 0 {
        return Err(Status::InvalidPadding)?;
    }
    Ok(pad)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_unpad() {
        for used in 0..BLOCK_SIZE {
            let mut block = [0xa5u8; BLOCK_SIZE];
            pkcs7_pad(&mut block, used).unwrap();
            assert_eq!(pkcs7_unpad(&block).unwrap(), BLOCK_SIZE - used);
        }
    }

    #[test]
    fn test_malformed() {
        let mut block = [0u8; BLOCK_SIZE];
        /* pad count 0 */
        assert_eq!(
            pkcs7_unpad(&block).unwrap_err().rv(),
            Status::InvalidPadding
        );
        /* pad count above the block size */
        block[BLOCK_SIZE - 1] = 17;
        assert_eq!(
            pkcs7_unpad(&block).unwrap_err().rv(),
            Status::InvalidPadding
        );
        /* inconsistent pad bytes */
        block[BLOCK_SIZE - 3..].copy_from_slice(&[3, 2, 3]);
        assert_eq!(
            pkcs7_unpad(&block).unwrap_err().rv(),
            Status::InvalidPadding
        );
        block[BLOCK_SIZE - 3..].copy_from_slice(&[3, 3, 3]);
        assert_eq!(pkcs7_unpad(&block).unwrap(), 3);
        /* a full block of padding */
        assert_eq!(pkcs7_unpad(&[16u8; BLOCK_SIZE]).unwrap(), 16);
    }
}
