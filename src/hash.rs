// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

//! Hash engine
//!
//! Input is accumulated until whole blocks are available, the accelerator
//! context is created only once there is at least one full block to feed
//! (or at finish time) and it is saved after every call.

use crate::algorithm::HashAlg;
use crate::block::{BlockBuffer, MAX_HASH_BLOCK_SIZE};
use crate::error::{Result, Status};
use crate::hwctx::HwContext;

use accel::hash::Hash;

/// A multipart hash operation
#[derive(Clone, Debug)]
pub struct HashOperation {
    alg: Option<HashAlg>,
    engine: Option<accel::hash::HashAlg>,
    hash_size: usize,
    buffer: BlockBuffer<MAX_HASH_BLOCK_SIZE>,
    hw: HwContext<Hash>,
}

impl HashOperation {
    /// Returns an inactive operation
    pub fn new() -> HashOperation {
        HashOperation {
            alg: None,
            engine: None,
            hash_size: 0,
            buffer: BlockBuffer::new(MAX_HASH_BLOCK_SIZE),
            hw: HwContext::NoHardwareContext,
        }
    }

    pub fn is_active(&self) -> bool {
        self.alg.is_some()
    }

    pub fn algorithm(&self) -> Option<HashAlg> {
        self.alg
    }

    pub fn setup(&mut self, alg: HashAlg) -> Result<()> {
        if self.is_active() {
            return Err(Status::BadState)?;
        }
        let engine = alg.engine()?;
        self.alg = Some(alg);
        self.engine = Some(engine);
        self.hash_size = alg.hash_size();
        self.buffer = BlockBuffer::new(alg.block_size());
        self.hw = HwContext::NoHardwareContext;
        Ok(())
    }

    fn active_engine(&self) -> Result<accel::hash::HashAlg> {
        match self.engine {
            Some(e) => Ok(e),
            None => Err(Status::BadState)?,
        }
    }

    pub fn update(&mut self, input: &[u8]) -> Result<()> {
        let engine = self.active_engine()?;
        if input.len() == 0 {
            return Ok(());
        }

        let mut data = input;
        if !self.buffer.is_empty() {
            let used = self.buffer.fill_from(data);
            data = &data[used..];
            if !self.buffer.is_full() {
                return Ok(());
            }
        }
        let direct = data.len() - data.len() % self.buffer.block_size();

        if self.buffer.is_full() || direct > 0 {
            let ctx = self.hw.acquire(|sel| Hash::create(sel, engine))?;
            if self.buffer.is_full() {
                ctx.feed(self.buffer.as_slice())?;
            }
            ctx.feed(&data[..direct])?;
            ctx.save_state()?;
            ctx.wait()?;
            self.hw.suspend();
            self.buffer.clear();
        }
        self.buffer.fill_from(&data[direct..]);
        Ok(())
    }

    fn finalize(&mut self, hash: &mut [u8]) -> Result<usize> {
        let engine = self.active_engine()?;
        if hash.len() < self.hash_size {
            return Err(Status::BufferTooSmall)?;
        }
        let ctx = self.hw.acquire(|sel| Hash::create(sel, engine))?;
        ctx.feed(self.buffer.as_slice())?;
        ctx.digest(&mut hash[..self.hash_size])?;
        ctx.wait()?;
        Ok(self.hash_size)
    }

    /// Writes the digest in `hash` and returns its length. The operation
    /// is inactive afterwards, whether it succeeds or not.
    pub fn finish(&mut self, hash: &mut [u8]) -> Result<usize> {
        let ret = self.finalize(hash);
        self.abort();
        ret
    }

    pub fn abort(&mut self) {
        *self = HashOperation::new();
    }

    /// Copies this operation in `target`, which must be inactive
    pub fn clone_to(&self, target: &mut HashOperation) -> Result<()> {
        if !self.is_active() || target.is_active() {
            return Err(Status::BadState)?;
        }
        *target = self.clone();
        Ok(())
    }
}

/// Computes the digest of `input` in one call
pub fn hash_compute(
    alg: HashAlg,
    input: &[u8],
    hash: &mut [u8],
) -> Result<usize> {
    let mut op = HashOperation::new();
    op.setup(alg)?;
    op.update(input)?;
    op.finish(hash)
}
