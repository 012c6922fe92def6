// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! AEAD engine
//!
//! Payload is forwarded to the accelerator in whole blocks, the partial
//! tail is buffered until more data arrives or the operation finishes.
//! The accelerator context is created lazily, on the first call that
//! actually has data for it, because CCM needs the nonce and both
//! lengths before anything can be fed.

use std::ops::Range;

use crate::algorithm::AeadAlg;
use crate::block::{BlockBuffer, BLOCK_SIZE};
use crate::error::{Result, Status};
use crate::hwctx::HwContext;
use crate::key::{KeyAttributes, KeyType};
use crate::misc::process_within;

use accel::aead::{Aead, GCM_IV_SIZE, MAX_TAG_SIZE};
use accel::{Direction, Quirks, Selection};
use zeroize::Zeroize;

/// Longest GCM payload, 2^32 - 2 blocks
pub const GCM_MAX_PAYLOAD: u64 = (1 << 36) - 32;

/* GCM additional data is limited to 2^64 bits */
const GCM_MAX_AD_BITS: u32 = 61;

const CCM_MIN_NONCE: usize = 7;
const CCM_MAX_NONCE: usize = 13;

fn check_tag_length(alg: AeadAlg) -> Result<()> {
    let valid = match alg {
        AeadAlg::Ccm { tag_length } => {
            tag_length >= 4 && tag_length <= MAX_TAG_SIZE && tag_length % 2 == 0
        }
        AeadAlg::Gcm { tag_length } => {
            tag_length >= 4 && tag_length <= MAX_TAG_SIZE
        }
        AeadAlg::CcmStarNoTag => true,
        AeadAlg::ChaCha20Poly1305 => return Err(Status::NotSupported)?,
    };
    if valid {
        Ok(())
    } else {
        Err(Status::InvalidArgument)?
    }
}

fn check_ccm_nonce(len: usize) -> Result<()> {
    if len < CCM_MIN_NONCE || len > CCM_MAX_NONCE {
        return Err(Status::InvalidArgument)?;
    }
    Ok(())
}

/* the payload length must fit in the 15 - nonce length bytes of the
 * CCM length field */
fn ccm_payload_fits(nonce_len: usize, pt_len: u64) -> bool {
    let q = 15 - nonce_len;
    q >= 8 || pt_len >> (8 * q) == 0
}

#[cfg(feature = "software-gcm")]
fn software_gcm() -> bool {
    crate::config::options().software_gcm
}

#[cfg(not(feature = "software-gcm"))]
fn software_gcm() -> bool {
    false
}

fn create_context(
    sel: &Selection,
    alg: AeadAlg,
    dir: Direction,
    key: &[u8],
    nonce: &[u8],
    lengths: (u64, u64),
) -> accel::Result<Aead> {
    match alg {
        AeadAlg::Gcm { .. } => Aead::create_gcm(sel, dir, key, nonce),
        _ => Aead::create_ccm(
            sel,
            dir,
            key,
            nonce,
            alg.tag_length(),
            lengths.0,
            lengths.1,
        ),
    }
}

/// A multipart AEAD operation
#[derive(Debug)]
pub struct AeadOperation {
    alg: Option<AeadAlg>,
    dir: Direction,
    key: Vec<u8>,
    nonce: Vec<u8>,
    /* additional data and payload lengths, when declared */
    lengths: Option<(u64, u64)>,
    ad_processed: u64,
    processed: u64,
    buffer: BlockBuffer<BLOCK_SIZE>,
    quirks: Quirks,
    hw: HwContext<Aead>,
}

impl Drop for AeadOperation {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl AeadOperation {
    /// Returns an inactive operation
    pub fn new() -> AeadOperation {
        AeadOperation {
            alg: None,
            dir: Direction::Encrypt,
            key: Vec::new(),
            nonce: Vec::new(),
            lengths: None,
            ad_processed: 0,
            processed: 0,
            buffer: BlockBuffer::new(BLOCK_SIZE),
            quirks: Quirks::empty(),
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
        alg: AeadAlg,
        dir: Direction,
    ) -> Result<()> {
        if self.is_active() {
            return Err(Status::BadState)?;
        }
        if key_buffer.len() < attrs.bits / 8 {
            return Err(Status::InvalidArgument)?;
        }
        if attrs.key_type != KeyType::Aes {
            return Err(Status::NotSupported)?;
        }
        match alg {
            AeadAlg::Ccm { tag_length } | AeadAlg::Gcm { tag_length } => {
                if tag_length > MAX_TAG_SIZE {
                    return Err(Status::InvalidArgument)?;
                }
            }
            AeadAlg::CcmStarNoTag => (),
            AeadAlg::ChaCha20Poly1305 => return Err(Status::NotSupported)?,
        }
        let key = attrs.aes_key(key_buffer, Status::InvalidArgument)?;
        self.quirks = accel::quirks()?;
        self.key = key.to_vec();
        self.dir = dir;
        self.alg = Some(alg);
        Ok(())
    }

    pub fn encrypt_setup(
        &mut self,
        attrs: &KeyAttributes,
        key_buffer: &[u8],
        alg: AeadAlg,
    ) -> Result<()> {
        self.setup(attrs, key_buffer, alg, Direction::Encrypt)
    }

    pub fn decrypt_setup(
        &mut self,
        attrs: &KeyAttributes,
        key_buffer: &[u8],
        alg: AeadAlg,
    ) -> Result<()> {
        self.setup(attrs, key_buffer, alg, Direction::Decrypt)
    }

    fn active_alg(&self) -> Result<AeadAlg> {
        match self.alg {
            Some(alg) => Ok(alg),
            None => Err(Status::BadState)?,
        }
    }

    /// Declares the total additional data and payload lengths, mandatory
    /// for CCM and accepted for GCM
    pub fn set_lengths(
        &mut self,
        ad_length: u64,
        pt_length: u64,
    ) -> Result<()> {
        let alg = self.active_alg()?;
        if self.ad_processed > 0 || self.processed > 0 {
            return Err(Status::BadState)?;
        }
        check_tag_length(alg)?;
        if alg.is_gcm()
            && (ad_length >> GCM_MAX_AD_BITS != 0
                || pt_length > GCM_MAX_PAYLOAD)
        {
            return Err(Status::InvalidArgument)?;
        }
        self.lengths = Some((ad_length, pt_length));
        Ok(())
    }

    pub fn set_nonce(&mut self, nonce: &[u8]) -> Result<()> {
        let alg = self.active_alg()?;
        if !self.hw.is_none() || !self.nonce.is_empty() {
            return Err(Status::BadState)?;
        }
        match alg {
            AeadAlg::Gcm { .. } => {
                /* the multipart path has no software fallback */
                if nonce.len() != GCM_IV_SIZE {
                    return Err(Status::NotSupported)?;
                }
            }
            AeadAlg::Ccm { .. } | AeadAlg::CcmStarNoTag => {
                check_ccm_nonce(nonce.len())?
            }
            AeadAlg::ChaCha20Poly1305 => return Err(Status::NotSupported)?,
        }
        self.nonce = nonce.to_vec();
        Ok(())
    }

    /* makes sure a live accelerator context exists, creating it or
     * resuming it as needed */
    fn ensure_context(&mut self) -> Result<()> {
        let alg = self.active_alg()?;
        if self.hw.is_none() {
            if self.nonce.is_empty() {
                return Err(Status::BadState)?;
            }
            if alg.is_ccm() {
                match self.lengths {
                    Some((_, pt)) => {
                        if !ccm_payload_fits(self.nonce.len(), pt) {
                            return Err(Status::InvalidArgument)?;
                        }
                    }
                    None => return Err(Status::BadState)?,
                }
            }
        }
        let dir = self.dir;
        let lengths = self.lengths.unwrap_or((0, 0));
        let (key, nonce) = (&self.key, &self.nonce);
        self.hw.acquire(|sel| {
            create_context(sel, alg, dir, key, nonce, lengths)
        })?;
        Ok(())
    }

    pub fn update_ad(&mut self, input: &[u8]) -> Result<()> {
        let alg = self.active_alg()?;
        if self.processed > 0 || self.nonce.is_empty() {
            return Err(Status::BadState)?;
        }
        if input.len() == 0 {
            return Ok(());
        }
        let total = self.ad_processed + input.len() as u64;
        if let Some((ad_len, _)) = self.lengths {
            if total > ad_len {
                return Err(Status::InvalidArgument)?;
            }
        }
        if alg.is_gcm() && total >> GCM_MAX_AD_BITS != 0 {
            return Err(Status::InvalidArgument)?;
        }

        self.ensure_context()?;
        let ctx = self.hw.live()?;
        ctx.feed_aad(input)?;
        self.ad_processed = total;

        /* With no payload, the context can not be saved once the last
         * additional data went in. Less than a block is simply kept in
         * the live context. */
        let last_ad = match self.lengths {
            Some((ad_len, 0)) => total == ad_len,
            _ => false,
        };
        if (last_ad && self.quirks.contains(Quirks::AEAD_AD_FINAL_NO_SAVE))
            || total < BLOCK_SIZE as u64
        {
            return Ok(());
        }
        ctx.save_state()?;
        ctx.wait()?;
        self.hw.suspend();
        Ok(())
    }

    /// Encrypts or decrypts `input`, returns the number of bytes written
    /// in `output`. Only whole blocks are output, the rest is buffered.
    pub fn update(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        let len = input.len();
        if output.len() < len {
            return Err(Status::BufferTooSmall)?;
        }
        let alg = self.active_alg()?;
        if self.nonce.is_empty() {
            return Err(Status::BadState)?;
        }
        let total = self.processed + len as u64;
        let completes = match self.lengths {
            Some((ad_len, pt_len)) => {
                if self.ad_processed != ad_len || total > pt_len {
                    return Err(Status::InvalidArgument)?;
                }
                total == pt_len
            }
            None => {
                if alg.is_ccm() {
                    return Err(Status::BadState)?;
                }
                false
            }
        };
        if alg.is_gcm() && total > GCM_MAX_PAYLOAD {
            return Err(Status::InvalidArgument)?;
        }
        if len == 0 {
            return Ok(0);
        }

        /* The tag job of a CCM context fails if it carries no payload,
         * so the last block is always kept for finish */
        let available = self.buffer.len() + len;
        let hold = match available % BLOCK_SIZE {
            0 if alg.is_ccm()
                && completes
                && self.quirks.contains(Quirks::CCM_FINISH_NEEDS_DATA) =>
            {
                BLOCK_SIZE
            }
            n => n,
        };
        let emit = available - hold;
        if output.len() < emit {
            return Err(Status::BufferTooSmall)?;
        }

        let mut data = input;
        if emit > 0 {
            self.ensure_context()?;
            let ctx = self.hw.live()?;
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
            ctx.save_state()?;
            ctx.wait()?;
            self.hw.suspend();
            self.buffer.clear();
        }
        self.buffer.fill_from(data);
        self.processed = total;
        Ok(emit)
    }

    /// Same as [`AeadOperation::update`] with input and output carved
    /// out of the same buffer
    pub fn update_within(
        &mut self,
        buf: &mut [u8],
        input: Range<usize>,
        out_offset: usize,
    ) -> Result<usize> {
        process_within(buf, input, out_offset, |i, o| self.update(i, o))
    }

    /* all declared data must have been provided */
    fn check_complete(&self) -> Result<()> {
        if let Some((ad_len, pt_len)) = self.lengths {
            if self.ad_processed != ad_len || self.processed != pt_len {
                return Err(Status::InvalidArgument)?;
            }
        }
        Ok(())
    }

    fn ensure_final_context(&mut self, alg: AeadAlg) -> Result<()> {
        if alg.is_ccm() && self.lengths.is_none() {
            /* nothing could be fed without lengths */
            self.lengths = Some((0, 0));
        }
        self.ensure_context()
    }

    fn finalize(
        &mut self,
        ciphertext: &mut [u8],
        tag: &mut [u8],
    ) -> Result<(usize, usize)> {
        let alg = self.active_alg()?;
        let tag_length = alg.tag_length();
        if tag.len() < tag_length {
            return Err(Status::BufferTooSmall)?;
        }
        if self.dir != Direction::Encrypt {
            return Err(Status::InvalidArgument)?;
        }
        let pending = self.buffer.len();
        if ciphertext.len() < pending {
            return Err(Status::BufferTooSmall)?;
        }
        self.check_complete()?;
        check_tag_length(alg)?;
        self.ensure_final_context(alg)?;

        let ctx = self.hw.live()?;
        if pending > 0 {
            ctx.crypt(self.buffer.as_slice(), &mut ciphertext[..pending])?;
        }
        if alg.is_gcm() && tag_length < MAX_TAG_SIZE {
            ctx.truncate_tag(tag_length)?;
        }
        ctx.produce_tag(&mut tag[..tag_length])?;
        ctx.wait()?;
        Ok((pending, tag_length))
    }

    /// Encrypts the buffered tail in `ciphertext` and writes the tag.
    /// Returns the ciphertext and tag lengths. The operation is inactive
    /// afterwards, whether it succeeds or not.
    pub fn finish(
        &mut self,
        ciphertext: &mut [u8],
        tag: &mut [u8],
    ) -> Result<(usize, usize)> {
        let ret = self.finalize(ciphertext, tag);
        self.abort();
        ret
    }

    fn check_tag(&mut self, plaintext: &mut [u8], tag: &[u8]) -> Result<usize> {
        let alg = self.active_alg()?;
        if self.dir != Direction::Decrypt {
            return Err(Status::InvalidArgument)?;
        }
        if tag.len() != alg.tag_length() {
            return Err(Status::InvalidSignature)?;
        }
        let pending = self.buffer.len();
        if plaintext.len() < pending {
            return Err(Status::BufferTooSmall)?;
        }
        self.check_complete()?;
        check_tag_length(alg)?;
        self.ensure_final_context(alg)?;

        let ctx = self.hw.live()?;
        if pending > 0 {
            ctx.crypt(self.buffer.as_slice(), &mut plaintext[..pending])?;
        }
        if alg.is_gcm() && tag.len() < MAX_TAG_SIZE {
            ctx.truncate_tag(tag.len())?;
        }
        ctx.verify_tag(tag)?;
        ctx.wait()?;
        Ok(pending)
    }

    /// Decrypts the buffered tail in `plaintext` and checks the tag,
    /// returns the plaintext length. On failure nothing is left in
    /// `plaintext`. The operation is inactive afterwards.
    pub fn verify(
        &mut self,
        plaintext: &mut [u8],
        tag: &[u8],
    ) -> Result<usize> {
        let pending = std::cmp::min(self.buffer.len(), plaintext.len());
        let ret = self.check_tag(plaintext, tag);
        if ret.is_err() {
            plaintext[..pending].zeroize();
        }
        self.abort();
        ret
    }

    pub fn abort(&mut self) {
        *self = AeadOperation::new();
    }
}

/* Validates a single-shot request, returns the key material */
fn check_aead_parameters<'a>(
    attrs: &KeyAttributes,
    key_buffer: &'a [u8],
    alg: AeadAlg,
    nonce_len: usize,
    ad_len: usize,
) -> Result<&'a [u8]> {
    if attrs.key_type != KeyType::Aes {
        return Err(Status::NotSupported)?;
    }
    match alg {
        AeadAlg::CcmStarNoTag | AeadAlg::Ccm { .. } => {
            check_tag_length(alg)?;
            check_ccm_nonce(nonce_len)?;
        }
        AeadAlg::Gcm { .. } => {
            if u64::try_from(ad_len)? >> GCM_MAX_AD_BITS != 0 {
                return Err(Status::InvalidArgument)?;
            }
            check_tag_length(alg)?;
            if nonce_len == 0 {
                return Err(Status::InvalidArgument)?;
            }
            if nonce_len != GCM_IV_SIZE && !software_gcm() {
                return Err(Status::NotSupported)?;
            }
        }
        AeadAlg::ChaCha20Poly1305 => return Err(Status::NotSupported)?,
    }
    attrs.aes_key(key_buffer, Status::InvalidArgument)
}

fn check_payload_length(
    alg: AeadAlg,
    nonce_len: usize,
    len: usize,
) -> Result<()> {
    let len = u64::try_from(len)?;
    let valid = if alg.is_ccm() {
        ccm_payload_fits(nonce_len, len)
    } else {
        len <= GCM_MAX_PAYLOAD
    };
    if valid {
        Ok(())
    } else {
        Err(Status::InvalidArgument)?
    }
}

#[cfg(feature = "software-gcm")]
fn software_encrypt(
    key: &[u8],
    nonce: &[u8],
    ad: &[u8],
    plaintext: &[u8],
    ciphertext: &mut [u8],
    tag: &mut [u8],
) -> Result<()> {
    crate::gcm::encrypt(key, nonce, ad, plaintext, ciphertext, tag)
}

#[cfg(not(feature = "software-gcm"))]
fn software_encrypt(
    _key: &[u8],
    _nonce: &[u8],
    _ad: &[u8],
    _plaintext: &[u8],
    _ciphertext: &mut [u8],
    _tag: &mut [u8],
) -> Result<()> {
    Err(Status::NotSupported)?
}

#[cfg(feature = "software-gcm")]
fn software_decrypt(
    key: &[u8],
    nonce: &[u8],
    ad: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
    plaintext: &mut [u8],
) -> Result<()> {
    crate::gcm::decrypt(key, nonce, ad, ciphertext, tag, plaintext)
}

#[cfg(not(feature = "software-gcm"))]
fn software_decrypt(
    _key: &[u8],
    _nonce: &[u8],
    _ad: &[u8],
    _ciphertext: &[u8],
    _tag: &[u8],
    _plaintext: &mut [u8],
) -> Result<()> {
    Err(Status::NotSupported)?
}

/// Encrypts `plaintext` in `ciphertext` and writes the tag separately.
/// Returns the ciphertext and tag lengths.
pub fn aead_encrypt_tag(
    attrs: &KeyAttributes,
    key_buffer: &[u8],
    alg: AeadAlg,
    nonce: &[u8],
    ad: &[u8],
    plaintext: &[u8],
    ciphertext: &mut [u8],
    tag: &mut [u8],
) -> Result<(usize, usize)> {
    let key =
        check_aead_parameters(attrs, key_buffer, alg, nonce.len(), ad.len())?;
    let tag_length = alg.tag_length();
    if ciphertext.len() < plaintext.len() || tag.len() < tag_length {
        return Err(Status::BufferTooSmall)?;
    }
    check_payload_length(alg, nonce.len(), plaintext.len())?;

    if alg.is_gcm() && nonce.len() != GCM_IV_SIZE {
        software_encrypt(
            key,
            nonce,
            ad,
            plaintext,
            &mut ciphertext[..plaintext.len()],
            &mut tag[..tag_length],
        )?;
        return Ok((plaintext.len(), tag_length));
    }

    let mut op = AeadOperation::new();
    op.encrypt_setup(attrs, key_buffer, alg)?;
    op.set_lengths(ad.len() as u64, plaintext.len() as u64)?;
    op.set_nonce(nonce)?;
    op.update_ad(ad)?;
    let done = op.update(plaintext, ciphertext)?;
    let (last, tag_len) = op.finish(&mut ciphertext[done..], tag)?;
    Ok((done + last, tag_len))
}

/// Encrypts `plaintext` and appends the tag, returns the output length
pub fn aead_encrypt(
    attrs: &KeyAttributes,
    key_buffer: &[u8],
    alg: AeadAlg,
    nonce: &[u8],
    ad: &[u8],
    plaintext: &[u8],
    output: &mut [u8],
) -> Result<usize> {
    let tag_length = alg.tag_length();
    if output.len() < plaintext.len() + tag_length {
        return Err(Status::BufferTooSmall)?;
    }
    let (ciphertext, tag) = output.split_at_mut(plaintext.len());
    let (len, tag_len) = aead_encrypt_tag(
        attrs,
        key_buffer,
        alg,
        nonce,
        ad,
        plaintext,
        ciphertext,
        &mut tag[..tag_length],
    )?;
    Ok(len + tag_len)
}

fn decrypt_with_tag(
    attrs: &KeyAttributes,
    key_buffer: &[u8],
    alg: AeadAlg,
    nonce: &[u8],
    ad: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
    plaintext: &mut [u8],
) -> Result<usize> {
    let key =
        check_aead_parameters(attrs, key_buffer, alg, nonce.len(), ad.len())?;
    if tag.len() != alg.tag_length() {
        return Err(Status::InvalidSignature)?;
    }
    if plaintext.len() < ciphertext.len() {
        return Err(Status::BufferTooSmall)?;
    }
    check_payload_length(alg, nonce.len(), ciphertext.len())?;

    if alg.is_gcm() && nonce.len() != GCM_IV_SIZE {
        software_decrypt(key, nonce, ad, ciphertext, tag, plaintext)?;
        return Ok(ciphertext.len());
    }

    let mut op = AeadOperation::new();
    op.decrypt_setup(attrs, key_buffer, alg)?;
    op.set_lengths(ad.len() as u64, ciphertext.len() as u64)?;
    op.set_nonce(nonce)?;
    op.update_ad(ad)?;
    let done = op.update(ciphertext, plaintext)?;
    let last = op.verify(&mut plaintext[done..], tag)?;
    Ok(done + last)
}

/// Checks `tag` and decrypts `ciphertext` in `plaintext`, returns the
/// plaintext length. Nothing is released in `plaintext` on failure.
pub fn aead_decrypt_tag(
    attrs: &KeyAttributes,
    key_buffer: &[u8],
    alg: AeadAlg,
    nonce: &[u8],
    ad: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
    plaintext: &mut [u8],
) -> Result<usize> {
    let ret = decrypt_with_tag(
        attrs, key_buffer, alg, nonce, ad, ciphertext, tag, plaintext,
    );
    if ret.is_err() {
        let wipe = std::cmp::min(ciphertext.len(), plaintext.len());
        plaintext[..wipe].zeroize();
    }
    ret
}

/// Decrypts `input`, the ciphertext followed by the tag, returns the
/// plaintext length
pub fn aead_decrypt(
    attrs: &KeyAttributes,
    key_buffer: &[u8],
    alg: AeadAlg,
    nonce: &[u8],
    ad: &[u8],
    input: &[u8],
    output: &mut [u8],
) -> Result<usize> {
    let tag_length = alg.tag_length();
    if input.len() < tag_length {
        return Err(Status::InvalidArgument)?;
    }
    let (ciphertext, tag) = input.split_at(input.len() - tag_length);
    aead_decrypt_tag(
        attrs, key_buffer, alg, nonce, ad, ciphertext, tag, output,
    )
}
