// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

use crate::error::{Result, Status};

/// Key types the crypto core can hand to the driver
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum KeyType {
    Aes,
    Hmac,
    Des,
    ChaCha20,
    RawData,
}

/// Where the key material lives
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum KeyLocation {
    /// Plaintext key material in host memory
    LocalStorage,
    /// Keys bound to the accelerator, presented already unwrapped
    HostCryptoOpaque,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct KeyAttributes {
    pub key_type: KeyType,
    pub bits: usize,
    pub location: KeyLocation,
}

impl KeyAttributes {
    pub fn new(key_type: KeyType, bits: usize) -> KeyAttributes {
        KeyAttributes {
            key_type: key_type,
            bits: bits,
            location: KeyLocation::LocalStorage,
        }
    }

    pub fn with_location(mut self, location: KeyLocation) -> KeyAttributes {
        self.location = location;
        self
    }

    /* returns the portion of key_buffer holding the key */
    pub(crate) fn aes_key<'a>(
        &self,
        key_buffer: &'a [u8],
        status: Status,
    ) -> Result<&'a [u8]> {
        if self.key_type != KeyType::Aes {
            return Err(status)?;
        }
        let size = match self.bits {
            128 | 192 | 256 => self.bits / 8,
            _ => return Err(status)?,
        };
        if key_buffer.len() < size {
            return Err(status)?;
        }
        Ok(&key_buffer[..size])
    }
}
