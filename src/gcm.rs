// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! GCM with arbitrary nonce sizes
//!
//! The accelerator GCM engine only takes 96 bit IVs. For any other nonce
//! size the pre-counter block is derived here and the mode is assembled
//! from the accelerator ECB and CTR engines, with GHASH computed in
//! software.

use crate::block::BLOCK_SIZE;
use crate::error::{Result, Status};

use accel::aead::GCM_IV_SIZE;
use accel::blkcipher::{BlkCipher, Mode};
use accel::Direction;
use constant_time_eq::constant_time_eq;
use ghash::universal_hash::{KeyInit, UniversalHash};
use ghash::GHash;
use zeroize::Zeroize;

fn bits(len: usize) -> Result<u64> {
    match u64::try_from(len)?.checked_mul(8) {
        Some(b) => Ok(b),
        None => Err(Status::InvalidArgument)?,
    }
}

fn lengths_block(a_bits: u64, b_bits: u64) -> ghash::Block {
    let mut block = ghash::Block::default();
    block[..8].copy_from_slice(&a_bits.to_be_bytes());
    block[8..].copy_from_slice(&b_bits.to_be_bytes());
    block
}

/* Encrypts a single block on a fresh ECB context */
fn ecb_block(key: &[u8], block: &[u8; BLOCK_SIZE]) -> Result<[u8; BLOCK_SIZE]> {
    let mut ecb = {
        let sel = accel::select()?;
        BlkCipher::create(&sel, Mode::Ecb, Direction::Encrypt, key, &[])?
    };
    let mut out = [0u8; BLOCK_SIZE];
    ecb.crypt(block, &mut out)?;
    ecb.run()?;
    ecb.wait()?;
    Ok(out)
}

/* Returns GHASH keyed with H = E(K, 0^128), J0 and E(K, J0) */
fn derive(
    key: &[u8],
    nonce: &[u8],
) -> Result<(GHash, [u8; BLOCK_SIZE], [u8; BLOCK_SIZE])> {
    let mut h = ecb_block(key, &[0u8; BLOCK_SIZE])?;
    let ghash = GHash::new(ghash::Key::from_slice(&h));
    h.zeroize();

    let mut j0 = [0u8; BLOCK_SIZE];
    if nonce.len() == GCM_IV_SIZE {
        j0[..nonce.len()].copy_from_slice(nonce);
        j0[BLOCK_SIZE - 1] = 1;
    } else {
        let mut g = ghash.clone();
        g.update_padded(nonce);
        g.update(&[lengths_block(0, bits(nonce.len())?)]);
        j0 = g.finalize().into();
    }

    let ek_j0 = ecb_block(key, &j0)?;
    Ok((ghash, j0, ek_j0))
}

fn low32(block: &[u8; BLOCK_SIZE]) -> u32 {
    u32::from_be_bytes([block[12], block[13], block[14], block[15]])
}

/* GCM only increments the low 32 bits of the counter, while the CTR
 * engine carries into the whole block, so the payload is split where
 * the low word wraps and each part gets its own CTR context */
fn gctr(
    key: &[u8],
    j0: &[u8; BLOCK_SIZE],
    input: &[u8],
    output: &mut [u8],
) -> Result<()> {
    let mut counter = *j0;
    let mut c = low32(&counter).wrapping_add(1);
    counter[12..].copy_from_slice(&c.to_be_bytes());

    let mut done = 0;
    while done < input.len() {
        let blocks_to_wrap = (1u64 << 32) - c as u64;
        let chunk = match usize::try_from(blocks_to_wrap * BLOCK_SIZE as u64)
        {
            Ok(max) => std::cmp::min(max, input.len() - done),
            Err(_) => input.len() - done,
        };
        let mut ctr = {
            let sel = accel::select()?;
            BlkCipher::create(
                &sel,
                Mode::Ctr,
                Direction::Encrypt,
                key,
                &counter,
            )?
        };
        ctr.crypt(
            &input[done..done + chunk],
            &mut output[done..done + chunk],
        )?;
        ctr.run()?;
        ctr.wait()?;
        done += chunk;
        c = 0;
        counter[12..].copy_from_slice(&c.to_be_bytes());
    }
    counter.zeroize();
    Ok(())
}

fn compute_tag(
    mut ghash: GHash,
    ek_j0: &[u8; BLOCK_SIZE],
    ad: &[u8],
    ciphertext: &[u8],
) -> Result<[u8; BLOCK_SIZE]> {
    ghash.update_padded(ad);
    ghash.update_padded(ciphertext);
    ghash.update(&[lengths_block(bits(ad.len())?, bits(ciphertext.len())?)]);
    let mut tag: [u8; BLOCK_SIZE] = ghash.finalize().into();
    tag.iter_mut().zip(ek_j0.iter()).for_each(|(t, e)| *t ^= *e);
    Ok(tag)
}

/// Encrypts `plaintext` into `ciphertext` and writes `tag.len()` bytes
/// of the tag
pub(crate) fn encrypt(
    key: &[u8],
    nonce: &[u8],
    ad: &[u8],
    plaintext: &[u8],
    ciphertext: &mut [u8],
    tag: &mut [u8],
) -> Result<()> {
    if nonce.len() == 0 || ciphertext.len() < plaintext.len() {
        return Err(Status::InvalidArgument)?;
    }
    let (ghash, mut j0, mut ek_j0) = derive(key, nonce)?;
    gctr(key, &j0, plaintext, ciphertext)?;
    let mut full =
        compute_tag(ghash, &ek_j0, ad, &ciphertext[..plaintext.len()])?;
    let tag_len = std::cmp::min(tag.len(), BLOCK_SIZE);
    tag[..tag_len].copy_from_slice(&full[..tag_len]);
    full.zeroize();
    j0.zeroize();
    ek_j0.zeroize();
    Ok(())
}

/// Checks `tag` and only then decrypts `ciphertext` into `plaintext`
pub(crate) fn decrypt(
    key: &[u8],
    nonce: &[u8],
    ad: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
    plaintext: &mut [u8],
) -> Result<()> {
    if nonce.len() == 0 || plaintext.len() < ciphertext.len() {
        return Err(Status::InvalidArgument)?;
    }
    if tag.len() == 0 || tag.len() > BLOCK_SIZE {
        return Err(Status::InvalidSignature)?;
    }
    let (ghash, mut j0, mut ek_j0) = derive(key, nonce)?;
    let mut full = compute_tag(ghash, &ek_j0, ad, ciphertext)?;
    let valid = constant_time_eq(&full[..tag.len()], tag);
    full.zeroize();
    ek_j0.zeroize();
    let ret = if valid {
        gctr(key, &j0, ciphertext, plaintext)
    } else {
        Err(Status::InvalidSignature)?
    };
    j0.zeroize();
    ret
}
