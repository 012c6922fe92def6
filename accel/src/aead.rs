// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! AEAD engine
//!
//! Supports AES-GCM with 96 bit IVs and AES-CCM (including the CCM*
//! variant without a tag). CCM needs the additional data and payload
//! lengths at creation time because they are part of the first
//! authenticated block.

use std::fmt;
use std::mem;

use aes::cipher::StreamCipher;
use ghash::universal_hash::{KeyInit, UniversalHash};
use ghash::GHash;
use zeroize::Zeroize;

use crate::aeskey::{xor_block, AesKey};
use crate::job::Job;
use crate::{
    Direction, Error, ErrorKind, Quirks, Result, Selection, BLOCK_SIZE,
};

/// The only IV size the GCM engine accepts
pub const GCM_IV_SIZE: usize = 12;

/// Maximum tag size
pub const MAX_TAG_SIZE: usize = BLOCK_SIZE;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AeadMode {
    Ccm,
    Gcm,
}

/* Authentication state, consumed when the tag is computed */
enum Auth {
    Ghash(GHash),
    CbcMac([u8; BLOCK_SIZE]),
    Finalized,
}

/// An AEAD context
pub struct Aead {
    mode: AeadMode,
    dir: Direction,
    key: AesKey,
    /* encryption of the pre-counter block, masks the tag */
    tag_mask: [u8; BLOCK_SIZE],
    stream: Box<dyn StreamCipher>,
    auth: Auth,
    pending: [u8; BLOCK_SIZE],
    pending_len: usize,
    aad_closed: bool,
    tag_len: usize,
    /* lengths declared at creation, CCM only */
    ad_len: u64,
    pt_len: u64,
    ad_done: u64,
    pt_done: u64,
    /* payload was crypted since the context was created or resumed */
    data_in_job: bool,
    quirks: Quirks,
    job: Job,
}

impl fmt::Debug for Aead {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Aead")
            .field("mode", &self.mode)
            .field("dir", &self.dir)
            .field("tag_len", &self.tag_len)
            .field("ad_done", &self.ad_done)
            .field("pt_done", &self.pt_done)
            .field("job", &self.job)
            .finish_non_exhaustive()
    }
}

impl Drop for Aead {
    fn drop(&mut self) {
        self.tag_mask.zeroize();
        self.pending.zeroize();
        if let Auth::CbcMac(mac) = &mut self.auth {
            mac.zeroize();
        }
    }
}

impl Aead {
    fn new(
        sel: &Selection,
        mode: AeadMode,
        dir: Direction,
        key: AesKey,
        pre_counter: &[u8; BLOCK_SIZE],
        auth: Auth,
    ) -> Aead {
        let mut tag_mask = *pre_counter;
        key.encrypt_block(&mut tag_mask);
        /* the payload keystream starts one block after the pre-counter */
        let mut first = *pre_counter;
        first[BLOCK_SIZE - 1] = first[BLOCK_SIZE - 1].wrapping_add(1);
        let stream = match mode {
            AeadMode::Gcm => key.ctr32(&first),
            AeadMode::Ccm => key.ctr128(&first),
        };
        first.zeroize();
        Aead {
            mode: mode,
            dir: dir,
            key: key,
            tag_mask: tag_mask,
            stream: stream,
            auth: auth,
            pending: [0u8; BLOCK_SIZE],
            pending_len: 0,
            aad_closed: false,
            tag_len: MAX_TAG_SIZE,
            ad_len: 0,
            pt_len: 0,
            ad_done: 0,
            pt_done: 0,
            data_in_job: false,
            quirks: sel.quirks(),
            job: Job::new(),
        }
    }

    /// Creates an AES-GCM context, the tag is 16 bytes long unless
    /// [`Aead::truncate_tag`] is called
    pub fn create_gcm(
        sel: &Selection,
        dir: Direction,
        key: &[u8],
        iv: &[u8],
    ) -> Result<Aead> {
        if iv.len() != GCM_IV_SIZE {
            return Err(Error::with_msg(
                ErrorKind::NotSupported,
                "GCM engine requires a 96 bit IV",
            ));
        }
        let key = AesKey::new(key)?;
        let mut h = [0u8; BLOCK_SIZE];
        key.encrypt_block(&mut h);
        let auth = Auth::Ghash(GHash::new(ghash::Key::from_slice(&h)));
        h.zeroize();
        let mut j0 = [0u8; BLOCK_SIZE];
        j0[..GCM_IV_SIZE].copy_from_slice(iv);
        j0[BLOCK_SIZE - 1] = 1;
        Ok(Aead::new(sel, AeadMode::Gcm, dir, key, &j0, auth))
    }

    /// Creates an AES-CCM context. A `tag_len` of zero selects CCM*
    /// without authentication tag.
    pub fn create_ccm(
        sel: &Selection,
        dir: Direction,
        key: &[u8],
        nonce: &[u8],
        tag_len: usize,
        ad_len: u64,
        pt_len: u64,
    ) -> Result<Aead> {
        if nonce.len() < 7 || nonce.len() > 13 {
            return Err(Error::with_msg(
                ErrorKind::InvalidArgument,
                "CCM nonce must be 7 to 13 bytes",
            ));
        }
        if tag_len != 0
            && (tag_len < 4 || tag_len > MAX_TAG_SIZE || tag_len % 2 != 0)
        {
            return Err(Error::with_msg(
                ErrorKind::InvalidArgument,
                "invalid CCM tag length",
            ));
        }
        let q = 15 - nonce.len();
        if q < 8 && pt_len >> (8 * q) != 0 {
            return Err(Error::with_msg(
                ErrorKind::InvalidArgument,
                "payload too long for the nonce size",
            ));
        }

        let key = AesKey::new(key)?;
        let mut ctr0 = [0u8; BLOCK_SIZE];
        ctr0[0] = (q - 1) as u8;
        ctr0[1..1 + nonce.len()].copy_from_slice(nonce);
        let mut ctx = Aead::new(
            sel,
            AeadMode::Ccm,
            dir,
            key,
            &ctr0,
            Auth::CbcMac([0u8; BLOCK_SIZE]),
        );
        ctx.tag_len = tag_len;
        ctx.ad_len = ad_len;
        ctx.pt_len = pt_len;

        let mut b0 = [0u8; BLOCK_SIZE];
        if ad_len > 0 {
            b0[0] |= 0x40;
        }
        if tag_len > 0 {
            b0[0] |= (((tag_len - 2) / 2) as u8) << 3;
        }
        b0[0] |= (q - 1) as u8;
        b0[1..1 + nonce.len()].copy_from_slice(nonce);
        b0[BLOCK_SIZE - q..].copy_from_slice(&pt_len.to_be_bytes()[8 - q..]);
        ctx.absorb_block(&b0);

        if ad_len > 0 {
            if ad_len < 0xff00 {
                ctx.absorb(&(ad_len as u16).to_be_bytes());
            } else if ad_len <= u32::MAX as u64 {
                ctx.absorb(&[0xff, 0xfe]);
                ctx.absorb(&(ad_len as u32).to_be_bytes());
            } else {
                ctx.absorb(&[0xff, 0xff]);
                ctx.absorb(&ad_len.to_be_bytes());
            }
        }
        Ok(ctx)
    }

    pub fn mode(&self) -> AeadMode {
        self.mode
    }

    fn absorb_block(&mut self, block: &[u8; BLOCK_SIZE]) {
        match &mut self.auth {
            Auth::Ghash(g) => {
                g.update(&[ghash::Block::clone_from_slice(block)])
            }
            Auth::CbcMac(mac) => {
                xor_block(mac, block);
                self.key.encrypt_block(mac);
            }
            Auth::Finalized => (),
        }
    }

    fn absorb(&mut self, mut data: &[u8]) {
        while data.len() > 0 {
            let take = std::cmp::min(BLOCK_SIZE - self.pending_len, data.len());
            self.pending[self.pending_len..self.pending_len + take]
                .copy_from_slice(&data[..take]);
            self.pending_len += take;
            data = &data[take..];
            if self.pending_len == BLOCK_SIZE {
                let block = self.pending;
                self.absorb_block(&block);
                self.pending_len = 0;
            }
        }
    }

    /* zero pads and absorbs any partial block */
    fn flush(&mut self) {
        if self.pending_len > 0 {
            self.pending[self.pending_len..].fill(0);
            let block = self.pending;
            self.absorb_block(&block);
            self.pending_len = 0;
        }
    }

    fn ctr_xor(&mut self, input: &[u8], output: &mut [u8]) {
        let data = &mut output[..input.len()];
        data.copy_from_slice(input);
        self.stream.apply_keystream(data);
    }

    /// Queues additional data, must precede any payload
    pub fn feed_aad(&mut self, aad: &[u8]) -> Result<()> {
        self.job.check_ready()?;
        if self.aad_closed {
            return Err(Error::with_msg(
                ErrorKind::BadState,
                "additional data after payload",
            ));
        }
        if self.mode == AeadMode::Ccm
            && self.ad_done + aad.len() as u64 > self.ad_len
        {
            return Err(Error::with_msg(
                ErrorKind::InvalidArgument,
                "more additional data than declared",
            ));
        }
        self.absorb(aad);
        self.ad_done += aad.len() as u64;
        if self.mode == AeadMode::Ccm && self.ad_done == self.ad_len {
            self.flush();
        }
        Ok(())
    }

    /// Queues payload for encryption or decryption into `output`
    pub fn crypt(&mut self, input: &[u8], output: &mut [u8]) -> Result<()> {
        self.job.check_ready()?;
        if output.len() < input.len() {
            return Err(Error::with_msg(
                ErrorKind::InvalidArgument,
                "output shorter than input",
            ));
        }
        if self.mode == AeadMode::Ccm {
            if self.ad_done != self.ad_len {
                return Err(Error::with_msg(
                    ErrorKind::BadState,
                    "additional data incomplete",
                ));
            }
            if self.pt_done + input.len() as u64 > self.pt_len {
                return Err(Error::with_msg(
                    ErrorKind::InvalidArgument,
                    "more payload than declared",
                ));
            }
        }
        if !self.aad_closed {
            self.flush();
            self.aad_closed = true;
        }
        let len = input.len();
        let authenticate_input = match (self.mode, self.dir) {
            (AeadMode::Gcm, Direction::Decrypt) => true,
            (AeadMode::Ccm, Direction::Encrypt) => true,
            _ => false,
        };
        if authenticate_input {
            self.absorb(input);
            self.ctr_xor(input, output);
        } else {
            self.ctr_xor(input, output);
            self.absorb(&output[..len]);
        }
        self.pt_done += len as u64;
        if len > 0 {
            self.data_in_job = true;
        }
        Ok(())
    }

    /// Shortens the GCM tag, must be called before the tag is produced
    pub fn truncate_tag(&mut self, tag_len: usize) -> Result<()> {
        self.job.check_ready()?;
        if self.mode != AeadMode::Gcm {
            return Err(Error::with_msg(
                ErrorKind::NotSupported,
                "CCM tag length is fixed at creation",
            ));
        }
        if tag_len < 4 || tag_len > MAX_TAG_SIZE {
            return Err(Error::with_msg(
                ErrorKind::InvalidArgument,
                "invalid GCM tag length",
            ));
        }
        self.tag_len = tag_len;
        Ok(())
    }

    fn compute_tag(&mut self) -> Result<[u8; BLOCK_SIZE]> {
        match self.mode {
            AeadMode::Ccm => {
                if self.ad_done != self.ad_len || self.pt_done != self.pt_len {
                    return Err(Error::with_msg(
                        ErrorKind::InvalidArgument,
                        "declared lengths not honored",
                    ));
                }
                if self.quirks.contains(Quirks::CCM_FINISH_NEEDS_DATA)
                    && self.pt_len > 0
                    && !self.data_in_job
                {
                    return Err(Error::with_msg(
                        ErrorKind::Fault,
                        "CCM tag job without payload",
                    ));
                }
                self.flush();
            }
            AeadMode::Gcm => {
                self.flush();
                let mut lens = [0u8; BLOCK_SIZE];
                lens[..8].copy_from_slice(&(self.ad_done * 8).to_be_bytes());
                lens[8..].copy_from_slice(&(self.pt_done * 8).to_be_bytes());
                self.absorb_block(&lens);
            }
        }
        let auth = mem::replace(&mut self.auth, Auth::Finalized);
        let mut tag: [u8; BLOCK_SIZE] = match auth {
            Auth::Ghash(g) => g.finalize().into(),
            Auth::CbcMac(mac) => mac,
            Auth::Finalized => {
                return Err(Error::with_msg(
                    ErrorKind::BadState,
                    "tag already computed",
                ))
            }
        };
        xor_block(&mut tag, &self.tag_mask);
        Ok(tag)
    }

    /// Starts the final encryption job, writing the tag in `tag`
    pub fn produce_tag(&mut self, tag: &mut [u8]) -> Result<()> {
        self.job.check_ready()?;
        if self.dir != Direction::Encrypt {
            return Err(Error::with_msg(
                ErrorKind::BadState,
                "tag production on a decryption context",
            ));
        }
        if tag.len() < self.tag_len {
            return Err(Error::with_msg(
                ErrorKind::InvalidArgument,
                "tag buffer too small",
            ));
        }
        let mut computed = self.compute_tag()?;
        tag[..self.tag_len].copy_from_slice(&computed[..self.tag_len]);
        computed.zeroize();
        self.job.start(false)
    }

    /// Starts the final decryption job, a tag mismatch is reported as
    /// [`ErrorKind::InvalidTag`] by [`Aead::wait`]
    pub fn verify_tag(&mut self, tag: &[u8]) -> Result<()> {
        self.job.check_ready()?;
        if self.dir != Direction::Decrypt {
            return Err(Error::with_msg(
                ErrorKind::BadState,
                "tag verification on an encryption context",
            ));
        }
        if tag.len() != self.tag_len {
            return Err(Error::with_msg(
                ErrorKind::InvalidArgument,
                "tag length mismatch",
            ));
        }
        let mut computed = self.compute_tag()?;
        let diff = computed[..self.tag_len]
            .iter()
            .zip(tag.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b));
        computed.zeroize();
        if diff != 0 {
            self.job.defer_error(ErrorKind::InvalidTag);
        }
        self.job.start(false)
    }

    /// Starts the queued work and saves the context state afterwards
    pub fn save_state(&mut self) -> Result<()> {
        self.job.check_ready()?;
        if self.pt_done == 0 && self.ad_done < BLOCK_SIZE as u64 {
            return Err(Error::with_msg(
                ErrorKind::InvalidArgument,
                "less than one block to save",
            ));
        }
        if self.mode == AeadMode::Ccm
            && self.quirks.contains(Quirks::AEAD_AD_FINAL_NO_SAVE)
            && self.pt_len == 0
            && self.ad_done == self.ad_len
        {
            return Err(Error::with_msg(
                ErrorKind::Fault,
                "save after the final additional data",
            ));
        }
        self.job.start(true)
    }

    /// Reloads a saved context, the accelerator must be selected
    pub fn resume_state(&mut self, sel: &Selection) -> Result<()> {
        self.job.resume(sel)?;
        self.data_in_job = false;
        Ok(())
    }

    pub fn wait(&mut self) -> Result<()> {
        self.job.wait()
    }

    pub fn is_saved(&self) -> bool {
        self.job.is_saved()
    }
}
