// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! Hash engine
//!
//! The engine only consumes whole blocks until the final digest job, so a
//! context can be saved only when the data fed since the last resume is
//! block aligned.

use sha2::digest::consts::{U128, U64};
use sha2::digest::generic_array::GenericArray;
use zeroize::Zeroize;

use crate::job::Job;
use crate::{Error, ErrorKind, Result, Selection};

/// Hash algorithms implemented by the engine
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HashAlg {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlg {
    pub fn digest_size(&self) -> usize {
        match self {
            HashAlg::Sha1 => 20,
            HashAlg::Sha224 => 28,
            HashAlg::Sha256 => 32,
            HashAlg::Sha384 => 48,
            HashAlg::Sha512 => 64,
        }
    }

    pub fn block_size(&self) -> usize {
        match self {
            HashAlg::Sha1 | HashAlg::Sha224 | HashAlg::Sha256 => 64,
            HashAlg::Sha384 | HashAlg::Sha512 => 128,
        }
    }
}

const SHA1_IV: [u32; 5] =
    [0x67452301, 0xefcdab89, 0x98badcfe, 0x10325476, 0xc3d2e1f0];

const SHA224_IV: [u32; 8] = [
    0xc1059ed8, 0x367cd507, 0x3070dd17, 0xf70e5939, 0xffc00b31, 0x68581511,
    0x64f98fa7, 0xbefa4fa4,
];

const SHA256_IV: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a, 0x510e527f, 0x9b05688c,
    0x1f83d9ab, 0x5be0cd19,
];

const SHA384_IV: [u64; 8] = [
    0xcbbb9d5dc1059ed8,
    0x629a292a367cd507,
    0x9159015a3070dd17,
    0x152fecd8f70e5939,
    0x67332667ffc00b31,
    0x8eb44a8768581511,
    0xdb0c2e0d64f98fa7,
    0x47b5481dbefa4fa4,
];

const SHA512_IV: [u64; 8] = [
    0x6a09e667f3bcc908,
    0xbb67ae8584caa73b,
    0x3c6ef372fe94f82b,
    0xa54ff53a5f1d36f1,
    0x510e527fade682d1,
    0x9b05688c2b3e6c1f,
    0x1f83d9abfb41bd6b,
    0x5be0cd19137e2179,
];

#[derive(Clone, Debug)]
enum Chain {
    Sha1([u32; 5]),
    Sha256([u32; 8]),
    Sha512([u64; 8]),
}

impl Chain {
    fn new(alg: HashAlg) -> Chain {
        match alg {
            HashAlg::Sha1 => Chain::Sha1(SHA1_IV),
            HashAlg::Sha224 => Chain::Sha256(SHA224_IV),
            HashAlg::Sha256 => Chain::Sha256(SHA256_IV),
            HashAlg::Sha384 => Chain::Sha512(SHA384_IV),
            HashAlg::Sha512 => Chain::Sha512(SHA512_IV),
        }
    }

    /* data must be a multiple of the block size */
    fn compress(&mut self, data: &[u8]) {
        match self {
            Chain::Sha1(state) => {
                for block in data.chunks_exact(64) {
                    let b: GenericArray<u8, U64> =
                        GenericArray::clone_from_slice(block);
                    sha1::compress(state, &[b]);
                }
            }
            Chain::Sha256(state) => {
                for block in data.chunks_exact(64) {
                    let b: GenericArray<u8, U64> =
                        GenericArray::clone_from_slice(block);
                    sha2::compress256(state, &[b]);
                }
            }
            Chain::Sha512(state) => {
                for block in data.chunks_exact(128) {
                    let b: GenericArray<u8, U128> =
                        GenericArray::clone_from_slice(block);
                    sha2::compress512(state, &[b]);
                }
            }
        }
    }

    fn output(&self, out: &mut [u8]) {
        let bytes: Vec<u8> = match self {
            Chain::Sha1(state) => {
                state.iter().flat_map(|w| w.to_be_bytes()).collect()
            }
            Chain::Sha256(state) => {
                state.iter().flat_map(|w| w.to_be_bytes()).collect()
            }
            Chain::Sha512(state) => {
                state.iter().flat_map(|w| w.to_be_bytes()).collect()
            }
        };
        out.copy_from_slice(&bytes[..out.len()]);
    }
}

impl Drop for Chain {
    fn drop(&mut self) {
        match self {
            Chain::Sha1(state) => state.zeroize(),
            Chain::Sha256(state) => state.zeroize(),
            Chain::Sha512(state) => state.zeroize(),
        }
    }
}

/// A hash context
#[derive(Clone, Debug)]
pub struct Hash {
    alg: HashAlg,
    chain: Chain,
    /* bytes already compressed into the chain */
    length: u128,
    /* data fed in the current job */
    pending: Vec<u8>,
    job: Job,
}

impl Drop for Hash {
    fn drop(&mut self) {
        self.pending.zeroize();
    }
}

impl Hash {
    fn new(alg: HashAlg) -> Hash {
        Hash {
            alg: alg,
            chain: Chain::new(alg),
            length: 0,
            pending: Vec::new(),
            job: Job::new(),
        }
    }

    pub fn create(_sel: &Selection, alg: HashAlg) -> Result<Hash> {
        Ok(Hash::new(alg))
    }

    pub fn alg(&self) -> HashAlg {
        self.alg
    }

    pub fn feed(&mut self, data: &[u8]) -> Result<()> {
        self.job.check_ready()?;
        self.pending.extend_from_slice(data);
        Ok(())
    }

    /// Starts hashing the fed data and saves the intermediate state
    pub fn save_state(&mut self) -> Result<()> {
        self.job.check_ready()?;
        if self.pending.len() % self.alg.block_size() != 0 {
            return Err(Error::with_msg(
                ErrorKind::InvalidArgument,
                "partial block can not be saved",
            ));
        }
        self.chain.compress(&self.pending);
        self.length += self.pending.len() as u128;
        self.pending.zeroize();
        self.pending.clear();
        self.job.start(true)
    }

    /// Starts the final job, writing the digest in `out`
    pub fn digest(&mut self, out: &mut [u8]) -> Result<()> {
        self.job.check_ready()?;
        let size = self.alg.digest_size();
        if out.len() < size {
            return Err(Error::with_msg(
                ErrorKind::InvalidArgument,
                "digest buffer too small",
            ));
        }
        let bs = self.alg.block_size();
        let bits = (self.length + self.pending.len() as u128) * 8;
        let lenbytes = if bs == 64 { 8 } else { 16 };

        let mut last = std::mem::take(&mut self.pending);
        last.push(0x80);
        while last.len() % bs != bs - lenbytes {
            last.push(0);
        }
        last.extend_from_slice(&bits.to_be_bytes()[16 - lenbytes..]);
        self.chain.compress(&last);
        last.zeroize();

        self.chain.output(&mut out[..size]);
        self.job.start(false)
    }

    pub fn resume_state(&mut self, sel: &Selection) -> Result<()> {
        self.job.resume(sel)
    }

    pub fn wait(&mut self) -> Result<()> {
        self.job.wait()
    }
}
