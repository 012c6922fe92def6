// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! Cipher engine
//!
//! ECB and CBC are "lagging" modes: output is produced only for whole
//! blocks and, when decrypting with PKCS#7 padding, the last block is
//! always held back until finish so the padding can be removed.
//! CTR, CFB and OFB are streaming modes, the accelerator keeps the
//! keystream position so every byte is processed as soon as it arrives.

use std::ops::Range;

use crate::algorithm::CipherAlg;
use crate::block::{BlockBuffer, BLOCK_SIZE};
use crate::error::{Result, Status};
use crate::hwctx::HwContext;
use crate::key::KeyAttributes;
use crate::misc::process_within;
use crate::padding::{pkcs7_pad, pkcs7_unpad};

use accel::blkcipher::{BlkCipher, Mode};
use accel::{Direction, Quirks};
use zeroize::Zeroize;

/// A multipart cipher operation
#[derive(Debug)]
pub struct CipherOperation {
    alg: Option<CipherAlg>,
    dir: Direction,
    mode: Mode,
    key: Vec<u8>,
    iv: [u8; BLOCK_SIZE],
    /* ECB contexts are recreated for every batch of blocks */
    ecb_no_save: bool,
    buffer: BlockBuffer<BLOCK_SIZE>,
    processed: u64,
    hw: HwContext<BlkCipher>,
}

impl Drop for CipherOperation {
    fn drop(&mut self) {
        self.key.zeroize();
        self.iv.zeroize();
    }
}

impl CipherOperation {
    /// Returns an inactive operation
    pub fn new() -> CipherOperation {
        CipherOperation {
            alg: None,
            dir: Direction::Encrypt,
            mode: Mode::Ecb,
            key: Vec::new(),
            iv: [0u8; BLOCK_SIZE],
            ecb_no_save: false,
            buffer: BlockBuffer::new(BLOCK_SIZE),
            processed: 0,
            hw: HwContext::NoHardwareContext,
        }
    }

    pub fn is_active(&self) -> bool {
        self.alg.is_some()
    }

    fn setup(
        &mut self,
        attrs: &KeyAttributes,
        key_buffer: &[u8],
        alg: CipherAlg,
        dir: Direction,
    ) -> Result<()> {
        if self.is_active() {
            return Err(Status::BadState)?;
        }
        let key = attrs.aes_key(key_buffer, Status::NotSupported)?;
        self.mode = alg.engine_mode()?;
        self.ecb_no_save =
            accel::quirks()?.contains(Quirks::ECB_NO_CONTEXT_SAVE);
        self.key = key.to_vec();
        self.dir = dir;
        self.alg = Some(alg);
        Ok(())
    }

    pub fn encrypt_setup(
        &mut self,
        attrs: &KeyAttributes,
        key_buffer: &[u8],
        alg: CipherAlg,
    ) -> Result<()> {
        self.setup(attrs, key_buffer, alg, Direction::Encrypt)
    }

    pub fn decrypt_setup(
        &mut self,
        attrs: &KeyAttributes,
        key_buffer: &[u8],
        alg: CipherAlg,
    ) -> Result<()> {
        self.setup(attrs, key_buffer, alg, Direction::Decrypt)
    }

    fn active_alg(&self) -> Result<CipherAlg> {
        match self.alg {
            Some(alg) => Ok(alg),
            None => Err(Status::BadState)?,
        }
    }

    /// Binds the IV, must be called exactly once before the first update
    /// for every mode except ECB, which takes an empty IV
    pub fn set_iv(&mut self, iv: &[u8]) -> Result<()> {
        let alg = self.active_alg()?;
        if !self.hw.is_none() {
            return Err(Status::BadState)?;
        }
        if iv.len() != alg.iv_size() {
            return Err(Status::InvalidArgument)?;
        }
        if self.mode == Mode::Ecb {
            return Ok(());
        }
        self.iv.copy_from_slice(iv);
        let (mode, dir) = (self.mode, self.dir);
        let key = &self.key;
        self.hw
            .acquire(|sel| BlkCipher::create(sel, mode, dir, key, iv))?;
        Ok(())
    }

    fn pkcs7_decrypt(&self) -> bool {
        self.alg == Some(CipherAlg::CbcPkcs7)
            && self.dir == Direction::Decrypt
    }

    /* runs the queued blocks and leaves the context saved, or drops it
     * when the accelerator can not save ECB contexts */
    fn complete_batch(&mut self) -> Result<()> {
        let ctx = self.hw.live()?;
        if self.mode == Mode::Ecb && self.ecb_no_save {
            ctx.run()?;
            ctx.wait()?;
            self.hw.clear();
        } else {
            ctx.save_state()?;
            ctx.wait()?;
            self.hw.suspend();
        }
        Ok(())
    }

    fn update_lagging(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize> {
        let total = self.buffer.len() + input.len();
        let emit_blocks = if self.pkcs7_decrypt() && total % BLOCK_SIZE == 0
        {
            total / BLOCK_SIZE - 1
        } else {
            total / BLOCK_SIZE
        };
        let emit = emit_blocks * BLOCK_SIZE;
        if output.len() < emit {
            return Err(Status::BufferTooSmall)?;
        }

        let mut data = input;
        if emit > 0 {
            let (mode, dir) = (self.mode, self.dir);
            let key = &self.key;
            let ctx = self
                .hw
                .acquire(|sel| BlkCipher::create(sel, mode, dir, key, &[]))?;
            let mut out_pos = 0;
            if !self.buffer.is_empty() {
                let used = self.buffer.fill_from(data);
                data = &data[used..];
                ctx.crypt(self.buffer.as_slice(), &mut output[..BLOCK_SIZE])?;
                out_pos = BLOCK_SIZE;
            }
            let direct = emit - out_pos;
            ctx.crypt(&data[..direct], &mut output[out_pos..emit])?;
            data = &data[direct..];
            self.complete_batch()?;
            self.buffer.clear();
        }
        self.buffer.fill_from(data);
        self.processed += input.len() as u64;
        Ok(emit)
    }

    fn update_streaming(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize> {
        let len = input.len();
        if output.len() < len {
            return Err(Status::BufferTooSmall)?;
        }
        let ctx = self.hw.acquire(|_| {
            Err(accel::Error::new(accel::ErrorKind::BadState))
        })?;
        ctx.crypt(input, &mut output[..len])?;
        ctx.save_state()?;
        ctx.wait()?;
        self.hw.suspend();
        self.processed += len as u64;
        Ok(len)
    }

    /// Processes `input` and returns the number of bytes written in
    /// `output`, which can be less than the input length in lagging modes
    pub fn update(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        let alg = self.active_alg()?;
        if input.len() == 0 {
            return Ok(0);
        }
        if self.mode != Mode::Ecb && self.hw.is_none() {
            /* IV not set */
            return Err(Status::BadState)?;
        }
        if alg.is_lagging() {
            self.update_lagging(input, output)
        } else {
            self.update_streaming(input, output)
        }
    }

    /// Same as [`CipherOperation::update`] with input and output carved
    /// out of the same buffer: input is `buf[input]` and output starts at
    /// `buf[out_offset]`. Overlapping regions are staged through a copy.
    pub fn update_within(
        &mut self,
        buf: &mut [u8],
        input: Range<usize>,
        out_offset: usize,
    ) -> Result<usize> {
        process_within(buf, input, out_offset, |i, o| self.update(i, o))
    }

    fn finalize(&mut self, output: &mut [u8]) -> Result<usize> {
        let alg = self.active_alg()?;
        if self.mode != Mode::Ecb && self.hw.is_none() {
            return Err(Status::BadState)?;
        }
        match alg {
            CipherAlg::EcbNoPadding | CipherAlg::CbcNoPadding => {
                if self.processed % BLOCK_SIZE as u64 != 0 {
                    return Err(Status::InvalidArgument)?;
                }
                Ok(0)
            }
            CipherAlg::CbcPkcs7 => match self.dir {
                Direction::Encrypt => self.finish_pkcs7_encrypt(output),
                Direction::Decrypt => self.finish_pkcs7_decrypt(output),
            },
            _ => Ok(0),
        }
    }

    fn finish_pkcs7_encrypt(&mut self, output: &mut [u8]) -> Result<usize> {
        if output.len() < BLOCK_SIZE {
            return Err(Status::BufferTooSmall)?;
        }
        let used = self.buffer.len();
        pkcs7_pad(self.buffer.block_mut(), used)?;
        let ctx = self.hw.acquire(|_| {
            Err(accel::Error::new(accel::ErrorKind::BadState))
        })?;
        ctx.crypt(self.buffer.block_mut(), &mut output[..BLOCK_SIZE])?;
        ctx.run()?;
        ctx.wait()?;
        Ok(BLOCK_SIZE)
    }

    fn finish_pkcs7_decrypt(&mut self, output: &mut [u8]) -> Result<usize> {
        if self.processed % BLOCK_SIZE as u64 != 0
            || self.processed < BLOCK_SIZE as u64
        {
            return Err(Status::InvalidArgument)?;
        }
        let mut block = [0u8; BLOCK_SIZE];
        let ctx = self.hw.acquire(|_| {
            Err(accel::Error::new(accel::ErrorKind::BadState))
        })?;
        ctx.crypt(self.buffer.as_slice(), &mut block)?;
        ctx.run()?;
        ctx.wait()?;

        let ret = match pkcs7_unpad(&block) {
            Ok(pad) => {
                let len = BLOCK_SIZE - pad;
                if output.len() < len {
                    Err(Status::BufferTooSmall)?
                } else {
                    output[..len].copy_from_slice(&block[..len]);
                    Ok(len)
                }
            }
            Err(e) => Err(e),
        };
        block.zeroize();
        ret
    }

    /// Flushes the last block and returns the number of bytes written.
    /// The operation is inactive afterwards, whether it succeeds or not.
    pub fn finish(&mut self, output: &mut [u8]) -> Result<usize> {
        let ret = self.finalize(output);
        self.abort();
        ret
    }

    pub fn abort(&mut self) {
        *self = CipherOperation::new();
    }
}

fn oneshot_setup(
    op: &mut CipherOperation,
    attrs: &KeyAttributes,
    key_buffer: &[u8],
    alg: CipherAlg,
    dir: Direction,
    iv: &[u8],
) -> Result<()> {
    op.setup(attrs, key_buffer, alg, dir)?;
    op.set_iv(iv)
}

/// Encrypts `input` with the caller supplied `iv`, the IV is not written
/// to `output`. Returns the ciphertext length.
pub fn cipher_encrypt(
    attrs: &KeyAttributes,
    key_buffer: &[u8],
    alg: CipherAlg,
    iv: &[u8],
    input: &[u8],
    output: &mut [u8],
) -> Result<usize> {
    let _ = attrs.aes_key(key_buffer, Status::NotSupported)?;
    let _ = alg.engine_mode()?;
    let len = input.len();
    let required = match alg {
        CipherAlg::EcbNoPadding | CipherAlg::CbcNoPadding => {
            if len % BLOCK_SIZE != 0 {
                return Err(Status::InvalidArgument)?;
            }
            len
        }
        CipherAlg::CbcPkcs7 => (len & !(BLOCK_SIZE - 1)) + BLOCK_SIZE,
        _ => len,
    };
    if iv.len() != alg.iv_size() {
        return Err(Status::InvalidArgument)?;
    }
    if output.len() < required {
        return Err(Status::BufferTooSmall)?;
    }
    if required == 0 {
        return Ok(0);
    }

    let mut op = CipherOperation::new();
    oneshot_setup(&mut op, attrs, key_buffer, alg, Direction::Encrypt, iv)?;
    let done = op.update(input, output)?;
    let last = op.finish(&mut output[done..])?;
    Ok(done + last)
}

/// Decrypts `input`, which for every mode except ECB starts with the IV.
/// Returns the plaintext length.
pub fn cipher_decrypt(
    attrs: &KeyAttributes,
    key_buffer: &[u8],
    alg: CipherAlg,
    input: &[u8],
    output: &mut [u8],
) -> Result<usize> {
    let _ = attrs.aes_key(key_buffer, Status::NotSupported)?;
    let _ = alg.engine_mode()?;
    if input.len() == 0 {
        return Ok(0);
    }
    let iv_size = alg.iv_size();
    if input.len() < iv_size {
        return Err(Status::InvalidArgument)?;
    }
    let (iv, data) = input.split_at(iv_size);
    let len = data.len();
    /* nothing but the IV, there is no padding block to check */
    if len == 0 {
        return Ok(0);
    }
    match alg {
        CipherAlg::EcbNoPadding | CipherAlg::CbcNoPadding => {
            if len % BLOCK_SIZE != 0 {
                return Err(Status::InvalidArgument)?;
            }
        }
        CipherAlg::CbcPkcs7 => {
            if len < BLOCK_SIZE || len % BLOCK_SIZE != 0 {
                return Err(Status::InvalidArgument)?;
            }
        }
        _ => (),
    }
    let required = match alg {
        CipherAlg::CbcPkcs7 => len - BLOCK_SIZE,
        _ => len,
    };
    if output.len() < required {
        return Err(Status::BufferTooSmall)?;
    }

    let mut op = CipherOperation::new();
    oneshot_setup(&mut op, attrs, key_buffer, alg, Direction::Decrypt, iv)?;
    let done = op.update(data, output)?;
    let last = op.finish(&mut output[done..])?;
    Ok(done + last)
}
