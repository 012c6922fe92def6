// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! Entry points for keys stored in the accelerator location
//!
//! Key material arrives already unwrapped, these only check the key
//! location and forward to the transparent implementations.

use crate::error::{Result, Status};
use crate::key::{KeyAttributes, KeyLocation};

#[cfg(feature = "aead")]
use crate::aead;
#[cfg(feature = "aead")]
use crate::algorithm::AeadAlg;
#[cfg(feature = "cipher")]
use crate::algorithm::CipherAlg;
#[cfg(feature = "mac")]
use crate::algorithm::MacAlg;
#[cfg(feature = "cipher")]
use crate::cipher::{self, CipherOperation};
#[cfg(feature = "mac")]
use crate::mac::{self, MacOperation};

fn check_location(attrs: &KeyAttributes) -> Result<()> {
    if attrs.location != KeyLocation::HostCryptoOpaque {
        return Err(Status::InvalidArgument)?;
    }
    Ok(())
}

#[cfg(feature = "cipher")]
pub fn cipher_encrypt(
    attrs: &KeyAttributes,
    key_buffer: &[u8],
    alg: CipherAlg,
    iv: &[u8],
    input: &[u8],
    output: &mut [u8],
) -> Result<usize> {
    check_location(attrs)?;
    cipher::cipher_encrypt(attrs, key_buffer, alg, iv, input, output)
}

#[cfg(feature = "cipher")]
pub fn cipher_decrypt(
    attrs: &KeyAttributes,
    key_buffer: &[u8],
    alg: CipherAlg,
    input: &[u8],
    output: &mut [u8],
) -> Result<usize> {
    check_location(attrs)?;
    cipher::cipher_decrypt(attrs, key_buffer, alg, input, output)
}

#[cfg(feature = "cipher")]
pub fn cipher_encrypt_setup(
    op: &mut CipherOperation,
    attrs: &KeyAttributes,
    key_buffer: &[u8],
    alg: CipherAlg,
) -> Result<()> {
    check_location(attrs)?;
    op.encrypt_setup(attrs, key_buffer, alg)
}

#[cfg(feature = "cipher")]
pub fn cipher_decrypt_setup(
    op: &mut CipherOperation,
    attrs: &KeyAttributes,
    key_buffer: &[u8],
    alg: CipherAlg,
) -> Result<()> {
    check_location(attrs)?;
    op.decrypt_setup(attrs, key_buffer, alg)
}

#[cfg(feature = "aead")]
pub fn aead_encrypt(
    attrs: &KeyAttributes,
    key_buffer: &[u8],
    alg: AeadAlg,
    nonce: &[u8],
    ad: &[u8],
    plaintext: &[u8],
    output: &mut [u8],
) -> Result<usize> {
    check_location(attrs)?;
    aead::aead_encrypt(attrs, key_buffer, alg, nonce, ad, plaintext, output)
}

#[cfg(feature = "aead")]
pub fn aead_decrypt(
    attrs: &KeyAttributes,
    key_buffer: &[u8],
    alg: AeadAlg,
    nonce: &[u8],
    ad: &[u8],
    input: &[u8],
    output: &mut [u8],
) -> Result<usize> {
    check_location(attrs)?;
    aead::aead_decrypt(attrs, key_buffer, alg, nonce, ad, input, output)
}

#[cfg(feature = "mac")]
pub fn mac_compute(
    attrs: &KeyAttributes,
    key_buffer: &[u8],
    alg: MacAlg,
    input: &[u8],
    mac: &mut [u8],
) -> Result<usize> {
    check_location(attrs)?;
    mac::mac_compute(attrs, key_buffer, alg, input, mac)
}

#[cfg(feature = "mac")]
pub fn mac_sign_setup(
    op: &mut MacOperation,
    attrs: &KeyAttributes,
    key_buffer: &[u8],
    alg: MacAlg,
) -> Result<()> {
    check_location(attrs)?;
    op.sign_setup(attrs, key_buffer, alg)
}

#[cfg(feature = "mac")]
pub fn mac_verify_setup(
    op: &mut MacOperation,
    attrs: &KeyAttributes,
    key_buffer: &[u8],
    alg: MacAlg,
) -> Result<()> {
    check_location(attrs)?;
    op.verify_setup(attrs, key_buffer, alg)
}
