// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

use std::fmt;

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{
    BlockCipher, BlockDecrypt, BlockDecryptMut, BlockEncrypt, BlockEncryptMut,
    InnerIvInit, KeyInit, StreamCipher,
};
use aes::{Aes128, Aes192, Aes256};

use crate::{Direction, Error, ErrorKind, Result, BLOCK_SIZE};

/* Expanded AES key loaded in the engine */
#[derive(Clone)]
pub(crate) enum AesKey {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

/* Evaluates `$body` with `$k` bound to the expanded key and `$aes`
 * naming its cipher type */
macro_rules! with_aes {
    ($key:expr, $k:ident: $aes:ident => $body:expr) => {
        match $key {
            AesKey::Aes128($k) => {
                type $aes = Aes128;
                $body
            }
            AesKey::Aes192($k) => {
                type $aes = Aes192;
                $body
            }
            AesKey::Aes256($k) => {
                type $aes = Aes256;
                $body
            }
        }
    };
    ($key:expr, $k:ident => $body:expr) => {
        match $key {
            AesKey::Aes128($k) => $body,
            AesKey::Aes192($k) => $body,
            AesKey::Aes256($k) => $body,
        }
    };
}

impl fmt::Debug for AesKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let bits = match self {
            AesKey::Aes128(_) => 128,
            AesKey::Aes192(_) => 192,
            AesKey::Aes256(_) => 256,
        };
        write!(f, "AesKey({} bits)", bits)
    }
}

fn key_error<E>(_: E) -> Error {
    Error::with_msg(ErrorKind::InvalidArgument, "invalid AES key")
}

/// A chaining mode fed in place. CBC takes whole blocks only, CFB keeps
/// its position inside the feedback block between calls.
pub(crate) trait Chaining {
    fn process(&mut self, data: &mut [u8]);
}

impl<C: BlockEncryptMut + BlockCipher> Chaining for cbc::Encryptor<C> {
    fn process(&mut self, data: &mut [u8]) {
        for block in data.chunks_exact_mut(BLOCK_SIZE) {
            self.encrypt_block_mut(GenericArray::from_mut_slice(block));
        }
    }
}

impl<C: BlockDecryptMut + BlockCipher> Chaining for cbc::Decryptor<C> {
    fn process(&mut self, data: &mut [u8]) {
        for block in data.chunks_exact_mut(BLOCK_SIZE) {
            self.decrypt_block_mut(GenericArray::from_mut_slice(block));
        }
    }
}

impl<C: BlockEncryptMut + BlockCipher> Chaining
    for cfb_mode::BufEncryptor<C>
{
    fn process(&mut self, data: &mut [u8]) {
        self.encrypt(data);
    }
}

impl<C: BlockEncryptMut + BlockCipher> Chaining
    for cfb_mode::BufDecryptor<C>
{
    fn process(&mut self, data: &mut [u8]) {
        self.decrypt(data);
    }
}

impl AesKey {
    pub fn new(key: &[u8]) -> Result<AesKey> {
        Ok(match key.len() {
            16 => {
                AesKey::Aes128(Aes128::new_from_slice(key).map_err(key_error)?)
            }
            24 => {
                AesKey::Aes192(Aes192::new_from_slice(key).map_err(key_error)?)
            }
            32 => {
                AesKey::Aes256(Aes256::new_from_slice(key).map_err(key_error)?)
            }
            _ => {
                return Err(Error::with_msg(
                    ErrorKind::InvalidArgument,
                    "unsupported AES key size",
                ))
            }
        })
    }

    pub fn encrypt_block(&self, block: &mut [u8; BLOCK_SIZE]) {
        let b = GenericArray::from_mut_slice(&mut block[..]);
        with_aes!(self, k => k.encrypt_block(b))
    }

    pub fn decrypt_block(&self, block: &mut [u8; BLOCK_SIZE]) {
        let b = GenericArray::from_mut_slice(&mut block[..]);
        with_aes!(self, k => k.decrypt_block(b))
    }

    /// CBC in the given direction
    pub fn cbc(
        &self,
        dir: Direction,
        iv: &[u8; BLOCK_SIZE],
    ) -> Box<dyn Chaining> {
        let iv = &iv[..];
        match dir {
            Direction::Encrypt => with_aes!(self, k: Aes => Box::new(
                cbc::Encryptor::<Aes>::inner_iv_init(
                    k.clone(),
                    GenericArray::from_slice(iv),
                )
            )),
            Direction::Decrypt => with_aes!(self, k: Aes => Box::new(
                cbc::Decryptor::<Aes>::inner_iv_init(
                    k.clone(),
                    GenericArray::from_slice(iv),
                )
            )),
        }
    }

    /// Full block CFB in the given direction
    pub fn cfb(
        &self,
        dir: Direction,
        iv: &[u8; BLOCK_SIZE],
    ) -> Box<dyn Chaining> {
        let iv = &iv[..];
        match dir {
            Direction::Encrypt => with_aes!(self, k: Aes => Box::new(
                cfb_mode::BufEncryptor::<Aes>::inner_iv_init(
                    k.clone(),
                    GenericArray::from_slice(iv),
                )
            )),
            Direction::Decrypt => with_aes!(self, k: Aes => Box::new(
                cfb_mode::BufDecryptor::<Aes>::inner_iv_init(
                    k.clone(),
                    GenericArray::from_slice(iv),
                )
            )),
        }
    }

    /// CTR keystream carrying into the whole counter block
    pub fn ctr128(
        &self,
        counter: &[u8; BLOCK_SIZE],
    ) -> Box<dyn StreamCipher> {
        let counter = &counter[..];
        with_aes!(self, k: Aes => Box::new(ctr::Ctr128BE::<Aes>::from_core(
            ctr::CtrCore::inner_iv_init(
                k.clone(),
                GenericArray::from_slice(counter),
            ),
        )))
    }

    /// CTR keystream incrementing only the low 32 bits of the counter
    pub fn ctr32(
        &self,
        counter: &[u8; BLOCK_SIZE],
    ) -> Box<dyn StreamCipher> {
        let counter = &counter[..];
        with_aes!(self, k: Aes => Box::new(ctr::Ctr32BE::<Aes>::from_core(
            ctr::CtrCore::inner_iv_init(
                k.clone(),
                GenericArray::from_slice(counter),
            ),
        )))
    }

    /// OFB keystream
    pub fn ofb(&self, iv: &[u8; BLOCK_SIZE]) -> Box<dyn StreamCipher> {
        let iv = &iv[..];
        with_aes!(self, k: Aes => Box::new(ofb::Ofb::<Aes>::from_core(
            ofb::OfbCore::inner_iv_init(
                k.clone(),
                GenericArray::from_slice(iv),
            ),
        )))
    }
}

pub(crate) fn xor_block(dst: &mut [u8; BLOCK_SIZE], src: &[u8]) {
    dst.iter_mut().zip(src.iter()).for_each(|(d, s)| *d ^= *s);
}
