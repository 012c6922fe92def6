// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! MAC engine
//!
//! AES-CMAC contexts can be saved between jobs as long as only whole
//! blocks were fed, the final block is always processed by
//! [`Mac::generate`]. HMAC contexts are single-shot: all data must be
//! fed in the job that generates the MAC.

use std::fmt;

use aes::{Aes128, Aes192, Aes256};
use cmac::Cmac;
use hmac::{Hmac, Mac as _};
use zeroize::Zeroize;

use crate::hash::HashAlg;
use crate::job::Job;
use crate::{Error, ErrorKind, Result, Selection, BLOCK_SIZE};

/// CMAC output size
pub const CMAC_SIZE: usize = BLOCK_SIZE;

enum CmacKey {
    Aes128(Cmac<Aes128>),
    Aes192(Cmac<Aes192>),
    Aes256(Cmac<Aes256>),
}

macro_rules! with_cmac {
    ($key:expr, $m:ident => $body:expr) => {
        match $key {
            CmacKey::Aes128($m) => $body,
            CmacKey::Aes192($m) => $body,
            CmacKey::Aes256($m) => $body,
        }
    };
}

fn key_error<E>(_: E) -> Error {
    Error::with_msg(ErrorKind::InvalidArgument, "invalid MAC key")
}

impl CmacKey {
    fn new(key: &[u8]) -> Result<CmacKey> {
        Ok(match key.len() {
            16 => CmacKey::Aes128(
                Cmac::<Aes128>::new_from_slice(key).map_err(key_error)?,
            ),
            24 => CmacKey::Aes192(
                Cmac::<Aes192>::new_from_slice(key).map_err(key_error)?,
            ),
            32 => CmacKey::Aes256(
                Cmac::<Aes256>::new_from_slice(key).map_err(key_error)?,
            ),
            _ => {
                return Err(Error::with_msg(
                    ErrorKind::InvalidArgument,
                    "unsupported AES key size",
                ))
            }
        })
    }

    fn update(&mut self, data: &[u8]) {
        with_cmac!(self, m => m.update(data))
    }

    fn finalize(self, out: &mut [u8]) {
        let tag = with_cmac!(self, m => m.finalize().into_bytes());
        out[..CMAC_SIZE].copy_from_slice(&tag);
    }
}

struct CmacState {
    /* taken by the final job */
    cmac: Option<CmacKey>,
    /* whether any block was already folded in the state */
    started: bool,
}

impl CmacState {
    fn absorb(&mut self, data: &[u8]) -> Result<()> {
        match &mut self.cmac {
            Some(cmac) => cmac.update(data),
            None => return Err(Error::new(ErrorKind::BadState)),
        }
        if data.len() > 0 {
            self.started = true;
        }
        Ok(())
    }

    fn generate(&mut self, pending: &[u8], out: &mut [u8]) -> Result<()> {
        if pending.len() == 0 && self.started {
            return Err(Error::with_msg(
                ErrorKind::BadState,
                "no final block left to process",
            ));
        }
        match self.cmac.take() {
            Some(mut cmac) => {
                cmac.update(pending);
                cmac.finalize(out);
                Ok(())
            }
            None => Err(Error::new(ErrorKind::BadState)),
        }
    }
}

enum MacKind {
    Cmac(CmacState),
    Hmac(HashAlg, Vec<u8>),
}

/// A MAC context
pub struct Mac {
    kind: MacKind,
    /* data fed in the current job */
    pending: Vec<u8>,
    job: Job,
}

impl fmt::Debug for Mac {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match &self.kind {
            MacKind::Cmac(_) => "AES-CMAC".to_string(),
            MacKind::Hmac(alg, _) => format!("HMAC-{:?}", alg),
        };
        f.debug_struct("Mac")
            .field("kind", &kind)
            .field("pending", &self.pending.len())
            .field("job", &self.job)
            .finish()
    }
}

impl Drop for Mac {
    fn drop(&mut self) {
        self.pending.zeroize();
        if let MacKind::Hmac(_, key) = &mut self.kind {
            key.zeroize();
        }
    }
}

impl Mac {
    /// Creates an AES-CMAC context
    pub fn create_aescmac(_sel: &Selection, key: &[u8]) -> Result<Mac> {
        Ok(Mac {
            kind: MacKind::Cmac(CmacState {
                cmac: Some(CmacKey::new(key)?),
                started: false,
            }),
            pending: Vec::new(),
            job: Job::new(),
        })
    }

    /// Creates a single-shot HMAC context, keys longer than the hash
    /// block size must be hashed by the caller
    pub fn create_hmac(
        _sel: &Selection,
        alg: HashAlg,
        key: &[u8],
    ) -> Result<Mac> {
        if key.len() > alg.block_size() {
            return Err(Error::with_msg(
                ErrorKind::InvalidArgument,
                "HMAC key longer than the hash block",
            ));
        }
        Ok(Mac {
            kind: MacKind::Hmac(alg, key.to_vec()),
            pending: Vec::new(),
            job: Job::new(),
        })
    }

    /// Size of the MAC produced by [`Mac::generate`]
    pub fn output_size(&self) -> usize {
        match &self.kind {
            MacKind::Cmac(_) => CMAC_SIZE,
            MacKind::Hmac(alg, _) => alg.digest_size(),
        }
    }

    pub fn feed(&mut self, data: &[u8]) -> Result<()> {
        self.job.check_ready()?;
        self.pending.extend_from_slice(data);
        Ok(())
    }

    /// Starts processing the fed data and saves the intermediate state
    pub fn save_state(&mut self) -> Result<()> {
        self.job.check_ready()?;
        match &mut self.kind {
            MacKind::Cmac(cmac) => {
                if self.pending.len() % BLOCK_SIZE != 0 {
                    return Err(Error::with_msg(
                        ErrorKind::InvalidArgument,
                        "partial block can not be saved",
                    ));
                }
                cmac.absorb(&self.pending)?;
            }
            MacKind::Hmac(_, _) => {
                return Err(Error::with_msg(
                    ErrorKind::NotSupported,
                    "HMAC contexts can not be saved",
                ))
            }
        }
        self.pending.zeroize();
        self.pending.clear();
        self.job.start(true)
    }

    /// Starts the final job, writing the MAC in `out`
    pub fn generate(&mut self, out: &mut [u8]) -> Result<()> {
        self.job.check_ready()?;
        if out.len() < self.output_size() {
            return Err(Error::with_msg(
                ErrorKind::InvalidArgument,
                "MAC buffer too small",
            ));
        }
        let mut pending = std::mem::take(&mut self.pending);
        let ret = match &mut self.kind {
            MacKind::Cmac(cmac) => cmac.generate(&pending, out),
            MacKind::Hmac(alg, key) => hmac(*alg, key, &pending, out),
        };
        pending.zeroize();
        ret?;
        self.job.start(false)
    }

    pub fn resume_state(&mut self, sel: &Selection) -> Result<()> {
        self.job.resume(sel)
    }

    pub fn wait(&mut self) -> Result<()> {
        self.job.wait()
    }
}

macro_rules! hmac_with {
    ($hash:ty, $key:expr, $data:expr, $out:expr) => {{
        let mut mac =
            Hmac::<$hash>::new_from_slice($key).map_err(key_error)?;
        mac.update($data);
        let tag = mac.finalize().into_bytes();
        $out[..tag.len()].copy_from_slice(&tag);
    }};
}

fn hmac(alg: HashAlg, key: &[u8], data: &[u8], out: &mut [u8]) -> Result<()> {
    match alg {
        HashAlg::Sha1 => hmac_with!(sha1::Sha1, key, data, out),
        HashAlg::Sha224 => hmac_with!(sha2::Sha224, key, data, out),
        HashAlg::Sha256 => hmac_with!(sha2::Sha256, key, data, out),
        HashAlg::Sha384 => hmac_with!(sha2::Sha384, key, data, out),
        HashAlg::Sha512 => hmac_with!(sha2::Sha512, key, data, out),
    }
    Ok(())
}
