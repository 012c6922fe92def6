// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! AES block cipher engine
//!
//! ECB and CBC process whole blocks only. CTR, CFB and OFB are stream
//! modes: the engine keeps the position in the current keystream block
//! across jobs, so any input length is accepted.

use std::fmt;

use aes::cipher::StreamCipher;

use crate::aeskey::{AesKey, Chaining};
use crate::job::Job;
use crate::{
    Direction, Error, ErrorKind, Quirks, Result, Selection, BLOCK_SIZE,
};

/// Chaining modes supported by the block cipher engine
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    Ecb,
    Cbc,
    Ctr,
    Cfb,
    Ofb,
}

impl Mode {
    /// Whether the mode produces output for partial blocks
    pub fn is_stream(&self) -> bool {
        match self {
            Mode::Ctr | Mode::Cfb | Mode::Ofb => true,
            Mode::Ecb | Mode::Cbc => false,
        }
    }
}

/* Running state of the chaining mode */
enum Engine {
    Ecb(AesKey),
    Blocks(Box<dyn Chaining>),
    Stream(Box<dyn StreamCipher>),
}

/// A block cipher context
pub struct BlkCipher {
    mode: Mode,
    dir: Direction,
    engine: Engine,
    quirks: Quirks,
    job: Job,
}

impl fmt::Debug for BlkCipher {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BlkCipher")
            .field("mode", &self.mode)
            .field("dir", &self.dir)
            .field("job", &self.job)
            .finish_non_exhaustive()
    }
}

impl BlkCipher {
    /// Creates a context for `mode`. ECB takes an empty `iv`, every other
    /// mode requires a full block.
    pub fn create(
        sel: &Selection,
        mode: Mode,
        dir: Direction,
        key: &[u8],
        iv: &[u8],
    ) -> Result<BlkCipher> {
        let mut ivbuf = [0u8; BLOCK_SIZE];
        match mode {
            Mode::Ecb => {
                if iv.len() != 0 {
                    return Err(Error::with_msg(
                        ErrorKind::InvalidArgument,
                        "ECB takes no IV",
                    ));
                }
            }
            _ => {
                if iv.len() != BLOCK_SIZE {
                    return Err(Error::with_msg(
                        ErrorKind::InvalidArgument,
                        "IV must be one block",
                    ));
                }
                ivbuf.copy_from_slice(iv);
            }
        }
        let key = AesKey::new(key)?;
        let engine = match mode {
            Mode::Ecb => Engine::Ecb(key),
            Mode::Cbc => Engine::Blocks(key.cbc(dir, &ivbuf)),
            Mode::Cfb => Engine::Blocks(key.cfb(dir, &ivbuf)),
            Mode::Ctr => Engine::Stream(key.ctr128(&ivbuf)),
            Mode::Ofb => Engine::Stream(key.ofb(&ivbuf)),
        };
        Ok(BlkCipher {
            mode: mode,
            dir: dir,
            engine: engine,
            quirks: sel.quirks(),
            job: Job::new(),
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Queues `input` for processing into `output`
    pub fn crypt(&mut self, input: &[u8], output: &mut [u8]) -> Result<()> {
        self.job.check_ready()?;
        if output.len() < input.len() {
            return Err(Error::with_msg(
                ErrorKind::InvalidArgument,
                "output shorter than input",
            ));
        }
        if !self.mode.is_stream() && input.len() % BLOCK_SIZE != 0 {
            return Err(Error::with_msg(
                ErrorKind::InvalidArgument,
                "input is not a multiple of the block size",
            ));
        }
        let data = &mut output[..input.len()];
        data.copy_from_slice(input);
        match &mut self.engine {
            Engine::Ecb(key) => {
                for block in data.chunks_exact_mut(BLOCK_SIZE) {
                    let block: &mut [u8; BLOCK_SIZE] = match block.try_into() {
                        Ok(b) => b,
                        Err(_) => return Err(Error::new(ErrorKind::Fault)),
                    };
                    match self.dir {
                        Direction::Encrypt => key.encrypt_block(block),
                        Direction::Decrypt => key.decrypt_block(block),
                    }
                }
            }
            Engine::Blocks(chain) => chain.process(data),
            Engine::Stream(stream) => stream.apply_keystream(data),
        }
        Ok(())
    }

    /// Starts the queued work as the final job of this context
    pub fn run(&mut self) -> Result<()> {
        self.job.start(false)
    }

    /// Starts the queued work and saves the context state afterwards
    pub fn save_state(&mut self) -> Result<()> {
        if self.mode == Mode::Ecb
            && self.quirks.contains(Quirks::ECB_NO_CONTEXT_SAVE)
        {
            return Err(Error::with_msg(
                ErrorKind::NotSupported,
                "ECB context can not be saved",
            ));
        }
        self.job.start(true)
    }

    /// Reloads a saved context, the accelerator must be selected
    pub fn resume_state(&mut self, sel: &Selection) -> Result<()> {
        self.job.resume(sel)
    }

    /// Waits for the started job to complete
    pub fn wait(&mut self) -> Result<()> {
        self.job.wait()
    }

    pub fn is_saved(&self) -> bool {
        self.job.is_saved()
    }
}
