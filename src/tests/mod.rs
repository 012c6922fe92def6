// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

use super::*;

use crate::key::{KeyAttributes, KeyLocation, KeyType};

use hex;

#[cfg(feature = "software-gcm")]
mod gcm;
#[cfg(feature = "mac")]
mod mac;
#[cfg(any(feature = "aead", feature = "cipher", feature = "mac"))]
mod opaque;

macro_rules! ret_or_panic {
    ($ret:expr) => {
        match $ret {
            Ok(r) => r,
            Err(e) => panic!("{e}"),
        }
    };
}
pub(crate) use ret_or_panic;

/// Deterministic test message, long enough to span several hash blocks
pub fn test_message(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub fn aes_attrs(key: &[u8]) -> KeyAttributes {
    KeyAttributes::new(KeyType::Aes, key.len() * 8)
}

pub fn hmac_attrs(key: &[u8]) -> KeyAttributes {
    KeyAttributes::new(KeyType::Hmac, key.len() * 8)
}

pub fn opaque_attrs(attrs: KeyAttributes) -> KeyAttributes {
    attrs.with_location(KeyLocation::HostCryptoOpaque)
}

pub fn unhex(s: &str) -> Vec<u8> {
    hex::decode(s).expect("failed to decode hex")
}

/// Splits `data` in chunks of the given sizes, the last chunk takes
/// whatever is left
pub fn split_pattern<'a>(data: &'a [u8], sizes: &[usize]) -> Vec<&'a [u8]> {
    let mut parts = Vec::new();
    let mut rest = data;
    for size in sizes {
        let n = std::cmp::min(*size, rest.len());
        let (head, tail) = rest.split_at(n);
        parts.push(head);
        rest = tail;
    }
    parts.push(rest);
    parts
}

pub fn assert_status<T: std::fmt::Debug>(ret: Result<T>, status: Status) {
    match ret {
        Ok(v) => panic!("expected {:?}, got Ok({:?})", status, v),
        Err(e) => assert_eq!(e.rv(), status, "unexpected error: {}", e),
    }
}
