// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! MAC engine
//!
//! The accelerator HMAC is single-shot, so multipart HMAC is built on the
//! hash engine with the usual inner and outer pads. CMAC streams through
//! the accelerator, always keeping the last block back because only the
//! final generate call knows which subkey it needs.

use crate::algorithm::{HashAlg, MacAlg};
use crate::block::{BlockBuffer, BLOCK_SIZE};
use crate::error::{Result, Status};
use crate::hash::{hash_compute, HashOperation};
use crate::hwctx::HwContext;
use crate::key::{KeyAttributes, KeyType};

use accel::mac::Mac;
use constant_time_eq::constant_time_eq;
use zeroize::Zeroize;

/// Largest MAC the engine can produce
pub const MAX_MAC_SIZE: usize = 64;

const IPAD: u8 = 0x36;
const OPAD: u8 = 0x5c;

#[derive(Debug)]
struct HmacState {
    hash: HashAlg,
    /* key block XORed with the outer pad */
    opad: Vec<u8>,
    inner: HashOperation,
}

impl Drop for HmacState {
    fn drop(&mut self) {
        self.opad.zeroize();
    }
}

impl HmacState {
    fn new(hash: HashAlg, key: &[u8]) -> Result<HmacState> {
        let bs = hash.block_size();
        let mut pad = vec![0u8; bs];
        if key.len() > bs {
            hash_compute(hash, key, &mut pad)?;
        } else {
            pad[..key.len()].copy_from_slice(key);
        }
        pad.iter_mut().for_each(|b| *b ^= IPAD);
        let mut inner = HashOperation::new();
        let ret = inner.setup(hash).and_then(|_| inner.update(&pad));
        pad.iter_mut().for_each(|b| *b ^= IPAD ^ OPAD);
        let state = HmacState {
            hash: hash,
            opad: pad,
            inner: inner,
        };
        ret?;
        Ok(state)
    }

    fn update(&mut self, input: &[u8]) -> Result<()> {
        self.inner.update(input)
    }

    fn finish(&mut self, mac: &mut [u8]) -> Result<usize> {
        let mut digest = [0u8; MAX_MAC_SIZE];
        let size = self.inner.finish(&mut digest)?;
        let mut outer = HashOperation::new();
        let ret = outer
            .setup(self.hash)
            .and_then(|_| outer.update(&self.opad))
            .and_then(|_| outer.update(&digest[..size]))
            .and_then(|_| outer.finish(mac));
        digest.zeroize();
        ret
    }
}

#[derive(Debug)]
struct CmacState {
    key: Vec<u8>,
    /* the last block seen, never fed before generate */
    buffer: BlockBuffer<BLOCK_SIZE>,
    hw: HwContext<Mac>,
}

impl Drop for CmacState {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl CmacState {
    fn new(key: &[u8]) -> CmacState {
        CmacState {
            key: key.to_vec(),
            buffer: BlockBuffer::new(BLOCK_SIZE),
            hw: HwContext::NoHardwareContext,
        }
    }

    fn update(&mut self, input: &[u8]) -> Result<()> {
        let available = self.buffer.len() + input.len();
        if available <= BLOCK_SIZE {
            self.buffer.fill_from(input);
            return Ok(());
        }
        let feed = (available - 1) & !(BLOCK_SIZE - 1);

        let key = &self.key;
        let ctx = self.hw.acquire(|sel| Mac::create_aescmac(sel, key))?;
        let mut data = input;
        let mut fed = 0;
        if !self.buffer.is_empty() {
            let used = self.buffer.fill_from(data);
            data = &data[used..];
            ctx.feed(self.buffer.as_slice())?;
            fed = BLOCK_SIZE;
        }
        let direct = feed - fed;
        ctx.feed(&data[..direct])?;
        ctx.save_state()?;
        ctx.wait()?;
        self.hw.suspend();
        self.buffer.clear();
        self.buffer.fill_from(&data[direct..]);
        Ok(())
    }

    fn finish(&mut self, mac: &mut [u8]) -> Result<usize> {
        let key = &self.key;
        let ctx = self.hw.acquire(|sel| Mac::create_aescmac(sel, key))?;
        ctx.feed(self.buffer.as_slice())?;
        ctx.generate(mac)?;
        ctx.wait()?;
        Ok(accel::mac::CMAC_SIZE)
    }
}

#[derive(Debug)]
enum MacState {
    Hmac(HmacState),
    Cmac(CmacState),
}

/* CMAC is only offered for AES keys */
fn cmac_key<'a>(
    attrs: &KeyAttributes,
    key_buffer: &'a [u8],
) -> Result<&'a [u8]> {
    if attrs.key_type != KeyType::Aes {
        return Err(Status::NotSupported)?;
    }
    attrs.aes_key(key_buffer, Status::InvalidArgument)
}

/* HMAC keys are strictly typed */
fn hmac_key<'a>(
    attrs: &KeyAttributes,
    key_buffer: &'a [u8],
) -> Result<&'a [u8]> {
    if attrs.key_type != KeyType::Hmac {
        return Err(Status::InvalidArgument)?;
    }
    let size = attrs.bits / 8;
    if key_buffer.len() < size {
        return Err(Status::InvalidArgument)?;
    }
    Ok(&key_buffer[..size])
}

/// A multipart MAC operation
#[derive(Debug)]
pub struct MacOperation {
    mac_length: usize,
    state: Option<MacState>,
}

impl MacOperation {
    /// Returns an inactive operation
    pub fn new() -> MacOperation {
        MacOperation {
            mac_length: 0,
            state: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    pub fn sign_setup(
        &mut self,
        attrs: &KeyAttributes,
        key_buffer: &[u8],
        alg: MacAlg,
    ) -> Result<()> {
        if self.is_active() {
            return Err(Status::BadState)?;
        }
        if key_buffer.len() < attrs.bits / 8 {
            return Err(Status::InvalidArgument)?;
        }
        let state = match alg {
            MacAlg::Hmac { hash, .. } => {
                let key = hmac_key(attrs, key_buffer)?;
                let _ = hash.engine()?;
                MacState::Hmac(HmacState::new(hash, key)?)
            }
            MacAlg::Cmac { .. } => {
                MacState::Cmac(CmacState::new(cmac_key(attrs, key_buffer)?))
            }
        };
        self.mac_length = alg.mac_length()?;
        self.state = Some(state);
        Ok(())
    }

    /// Verification computes the MAC exactly like signing
    pub fn verify_setup(
        &mut self,
        attrs: &KeyAttributes,
        key_buffer: &[u8],
        alg: MacAlg,
    ) -> Result<()> {
        self.sign_setup(attrs, key_buffer, alg)
    }

    pub fn update(&mut self, input: &[u8]) -> Result<()> {
        let state = match &mut self.state {
            Some(s) => s,
            None => return Err(Status::BadState)?,
        };
        if input.len() == 0 {
            return Ok(());
        }
        match state {
            MacState::Hmac(h) => h.update(input),
            MacState::Cmac(c) => c.update(input),
        }
    }

    fn finalize(&mut self, mac: &mut [u8]) -> Result<usize> {
        let state = match &mut self.state {
            Some(s) => s,
            None => return Err(Status::BadState)?,
        };
        let len = self.mac_length;
        if mac.len() < len {
            return Err(Status::BufferTooSmall)?;
        }
        let mut full = [0u8; MAX_MAC_SIZE];
        let ret = match state {
            MacState::Hmac(h) => h.finish(&mut full),
            MacState::Cmac(c) => c.finish(&mut full),
        };
        if ret.is_ok() {
            mac[..len].copy_from_slice(&full[..len]);
        }
        full.zeroize();
        ret?;
        Ok(len)
    }

    /// Writes the (possibly truncated) MAC and returns its length. The
    /// operation is inactive afterwards, whether it succeeds or not.
    pub fn sign_finish(&mut self, mac: &mut [u8]) -> Result<usize> {
        let ret = self.finalize(mac);
        self.abort();
        ret
    }

    /// Compares `mac` with the computed MAC in constant time
    pub fn verify_finish(&mut self, mac: &[u8]) -> Result<()> {
        let mut computed = [0u8; MAX_MAC_SIZE];
        let len = self.sign_finish(&mut computed)?;
        let valid =
            mac.len() == len && constant_time_eq(&computed[..len], mac);
        computed.zeroize();
        if !valid {
            return Err(Status::InvalidSignature)?;
        }
        Ok(())
    }

    pub fn abort(&mut self) {
        *self = MacOperation::new();
    }
}

/// Computes the MAC of `input` with a single accelerator job
pub fn mac_compute(
    attrs: &KeyAttributes,
    key_buffer: &[u8],
    alg: MacAlg,
    input: &[u8],
    mac: &mut [u8],
) -> Result<usize> {
    let mut reduced = [0u8; MAX_MAC_SIZE];
    let mut ctx = match alg {
        MacAlg::Hmac { hash, .. } => {
            let key = hmac_key(attrs, key_buffer)?;
            let engine = hash.engine()?;
            let len = alg.mac_length()?;
            if mac.len() < len {
                return Err(Status::BufferTooSmall)?;
            }
            let key = if key.len() > hash.block_size() {
                let size = hash_compute(hash, key, &mut reduced)?;
                &reduced[..size]
            } else {
                key
            };
            let sel = accel::select()?;
            Mac::create_hmac(&sel, engine, key)?
        }
        MacAlg::Cmac { .. } => {
            let key = cmac_key(attrs, key_buffer)?;
            let len = alg.mac_length()?;
            if mac.len() < len {
                return Err(Status::BufferTooSmall)?;
            }
            let sel = accel::select()?;
            Mac::create_aescmac(&sel, key)?
        }
    };
    reduced.zeroize();

    let len = alg.mac_length()?;
    let mut full = [0u8; MAX_MAC_SIZE];
    let ret = ctx
        .feed(input)
        .and_then(|_| ctx.generate(&mut full))
        .and_then(|_| ctx.wait());
    if ret.is_ok() {
        mac[..len].copy_from_slice(&full[..len]);
    }
    full.zeroize();
    ret?;
    Ok(len)
}
