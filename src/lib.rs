// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

//! This is hostcrypto
//!
//! A PSA Crypto transparent driver for a symmetric crypto accelerator.
//! It offers hash, cipher, AEAD and MAC operations with the multipart
//! setup, update and finish lifecycle the crypto core expects, driving
//! an accelerator that has to be explicitly told to save and resume its
//! context around every call.

#[cfg(feature = "log")]
macro_rules! trace_err {
    ($($arg:tt)*) => {
        log::error!($($arg)*)
    };
}

#[cfg(not(feature = "log"))]
macro_rules! trace_err {
    ($($arg:tt)*) => {{
        let _ = format_args!($($arg)*);
    }};
}

#[cfg(feature = "log")]
mod log;

pub mod algorithm;
pub mod block;
pub mod config;
pub mod error;
mod hwctx;
pub mod key;
pub mod misc;
pub mod padding;

/* Include algorithms based on selected features */
#[cfg(feature = "aead")]
pub mod aead;
#[cfg(feature = "cipher")]
pub mod cipher;
#[cfg(feature = "software-gcm")]
mod gcm;
#[cfg(feature = "hash")]
pub mod hash;
#[cfg(feature = "mac")]
pub mod mac;
#[cfg(any(feature = "aead", feature = "cipher", feature = "mac"))]
pub mod opaque;

pub use config::init;
pub use error::{Error, Result, Status};

#[cfg(test)]
mod tests;
