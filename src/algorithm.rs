// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! Algorithm identifiers
//!
//! These mirror the subset of the crypto core algorithm space that is
//! routed to this driver. Identifiers for algorithms the accelerator can
//! not compute exist so that requests for them can be rejected with
//! [`Status::NotSupported`].

use crate::error::{Result, Status};

use accel::blkcipher::Mode;

/// Hash algorithms
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum HashAlg {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Sha3_256,
}

#[derive(Debug)]
pub struct HashInfo {
    pub alg: HashAlg,
    pub engine: Option<accel::hash::HashAlg>,
    pub hash_size: usize,
    pub block_size: usize,
}

pub static HASH_ALG_SET: [HashInfo; 6] = [
    HashInfo {
        alg: HashAlg::Sha1,
        engine: Some(accel::hash::HashAlg::Sha1),
        hash_size: 20,
        block_size: 64,
    },
    HashInfo {
        alg: HashAlg::Sha224,
        engine: Some(accel::hash::HashAlg::Sha224),
        hash_size: 28,
        block_size: 64,
    },
    HashInfo {
        alg: HashAlg::Sha256,
        engine: Some(accel::hash::HashAlg::Sha256),
        hash_size: 32,
        block_size: 64,
    },
    HashInfo {
        alg: HashAlg::Sha384,
        engine: Some(accel::hash::HashAlg::Sha384),
        hash_size: 48,
        block_size: 128,
    },
    HashInfo {
        alg: HashAlg::Sha512,
        engine: Some(accel::hash::HashAlg::Sha512),
        hash_size: 64,
        block_size: 128,
    },
    HashInfo {
        alg: HashAlg::Sha3_256,
        engine: None,
        hash_size: 32,
        block_size: 136,
    },
];

impl HashAlg {
    fn info(&self) -> &'static HashInfo {
        let idx = match self {
            HashAlg::Sha1 => 0,
            HashAlg::Sha224 => 1,
            HashAlg::Sha256 => 2,
            HashAlg::Sha384 => 3,
            HashAlg::Sha512 => 4,
            HashAlg::Sha3_256 => 5,
        };
        &HASH_ALG_SET[idx]
    }

    pub fn hash_size(&self) -> usize {
        self.info().hash_size
    }

    pub fn block_size(&self) -> usize {
        self.info().block_size
    }

    /// The accelerator identifier, fails with NOT_SUPPORTED for hashes
    /// the accelerator can not compute
    pub fn engine(&self) -> Result<accel::hash::HashAlg> {
        match self.info().engine {
            Some(e) => Ok(e),
            None => Err(Status::NotSupported)?,
        }
    }
}

/// Unauthenticated cipher algorithms
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CipherAlg {
    EcbNoPadding,
    CbcNoPadding,
    CbcPkcs7,
    Ctr,
    Cfb,
    Ofb,
    Xts,
    StreamCipher,
}

impl CipherAlg {
    pub fn engine_mode(&self) -> Result<Mode> {
        Ok(match self {
            CipherAlg::EcbNoPadding => Mode::Ecb,
            CipherAlg::CbcNoPadding | CipherAlg::CbcPkcs7 => Mode::Cbc,
            CipherAlg::Ctr => Mode::Ctr,
            CipherAlg::Cfb => Mode::Cfb,
            CipherAlg::Ofb => Mode::Ofb,
            CipherAlg::Xts | CipherAlg::StreamCipher => {
                return Err(Status::NotSupported)?
            }
        })
    }

    /// Lagging modes hold back output until a whole block is available
    pub fn is_lagging(&self) -> bool {
        match self {
            CipherAlg::EcbNoPadding
            | CipherAlg::CbcNoPadding
            | CipherAlg::CbcPkcs7 => true,
            _ => false,
        }
    }

    pub fn iv_size(&self) -> usize {
        match self {
            CipherAlg::EcbNoPadding => 0,
            _ => crate::block::BLOCK_SIZE,
        }
    }
}

/// Authenticated encryption algorithms, with their tag length
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AeadAlg {
    Ccm { tag_length: usize },
    /// CCM* without authentication, the tag is always empty
    CcmStarNoTag,
    Gcm { tag_length: usize },
    ChaCha20Poly1305,
}

impl AeadAlg {
    pub const fn ccm() -> AeadAlg {
        AeadAlg::Ccm { tag_length: 16 }
    }

    pub const fn gcm() -> AeadAlg {
        AeadAlg::Gcm { tag_length: 16 }
    }

    /// The same algorithm with a shortened tag
    pub fn with_tag_length(&self, tag_length: usize) -> AeadAlg {
        match self {
            AeadAlg::Ccm { .. } => AeadAlg::Ccm {
                tag_length: tag_length,
            },
            AeadAlg::Gcm { .. } => AeadAlg::Gcm {
                tag_length: tag_length,
            },
            other => *other,
        }
    }

    pub fn tag_length(&self) -> usize {
        match self {
            AeadAlg::Ccm { tag_length } | AeadAlg::Gcm { tag_length } => {
                *tag_length
            }
            AeadAlg::CcmStarNoTag => 0,
            AeadAlg::ChaCha20Poly1305 => 16,
        }
    }

    pub fn is_ccm(&self) -> bool {
        match self {
            AeadAlg::Ccm { .. } | AeadAlg::CcmStarNoTag => true,
            _ => false,
        }
    }

    pub fn is_gcm(&self) -> bool {
        match self {
            AeadAlg::Gcm { .. } => true,
            _ => false,
        }
    }
}

/// MAC algorithms, a length of 0 selects the full MAC size
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MacAlg {
    Hmac { hash: HashAlg, length: usize },
    Cmac { length: usize },
}

impl MacAlg {
    pub const fn hmac(hash: HashAlg) -> MacAlg {
        MacAlg::Hmac {
            hash: hash,
            length: 0,
        }
    }

    pub const fn cmac() -> MacAlg {
        MacAlg::Cmac { length: 0 }
    }

    /// The same algorithm truncated to `length` bytes
    pub fn truncated(&self, length: usize) -> MacAlg {
        match self {
            MacAlg::Hmac { hash, .. } => MacAlg::Hmac {
                hash: *hash,
                length: length,
            },
            MacAlg::Cmac { .. } => MacAlg::Cmac { length: length },
        }
    }

    /// Size of the untruncated MAC
    pub fn full_length(&self) -> usize {
        match self {
            MacAlg::Hmac { hash, .. } => hash.hash_size(),
            MacAlg::Cmac { .. } => crate::block::BLOCK_SIZE,
        }
    }

    /// Size of the MAC this algorithm produces, fails with
    /// INVALID_ARGUMENT if the truncation exceeds the full size
    pub fn mac_length(&self) -> Result<usize> {
        let length = match self {
            MacAlg::Hmac { length, .. } | MacAlg::Cmac { length } => *length,
        };
        let full = self.full_length();
        if length == 0 {
            Ok(full)
        } else if length > full {
            Err(Status::InvalidArgument)?
        } else {
            Ok(length)
        }
    }
}
