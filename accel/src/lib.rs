// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! Symmetric crypto accelerator interface
//!
//! The accelerator executes one primitive at a time and keeps no state
//! between calls on its own: every context must be explicitly saved after
//! a partial operation and resumed before it can be fed again.
//! Context creation and resumption require holding the accelerator
//! [`Selection`], which is acquired through [`select()`].
//!
//! The implementation provided here is a software model of the peripheral
//! built on block level primitives, it enforces the same call discipline
//! as the hardware does.

use std::error;
use std::fmt;

use bitflags::bitflags;

#[cfg(feature = "log")]
macro_rules! trace_hw {
    ($($arg:tt)*) => {
        log::debug!($($arg)*)
    };
}

#[cfg(not(feature = "log"))]
macro_rules! trace_hw {
    ($($arg:tt)*) => {{
        let _ = format_args!($($arg)*);
    }};
}

pub mod aead;
mod aeskey;
pub mod blkcipher;
pub mod hash;
mod job;
mod lock;
pub mod mac;

pub use lock::{quirks, select, set_quirks, Selection};

/// Size of the AES block processed by the accelerator
pub const BLOCK_SIZE: usize = 16;

/// Kinds of failures reported by the accelerator
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Tag verification failed
    InvalidTag,
    /// A parameter or an input length was rejected
    InvalidArgument,
    /// The requested primitive or mode is not available
    NotSupported,
    /// The context is not in a state that allows the call
    BadState,
    /// The accelerator could not be selected
    Unavailable,
    /// The accelerator faulted while executing the operation
    Fault,
}

/// Error type returned by all accelerator calls
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    errmsg: Option<&'static str>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Error {
        Error {
            kind: kind,
            errmsg: None,
        }
    }

    pub fn with_msg(kind: ErrorKind, errmsg: &'static str) -> Error {
        trace_hw!("{:?}: {}", kind, errmsg);
        Error {
            kind: kind,
            errmsg: Some(errmsg),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.errmsg {
            Some(msg) => write!(f, "{:?}: {}", self.kind, msg),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// Direction of a cipher or AEAD context
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

bitflags! {
    /// Behaviours of a specific accelerator revision that drivers must
    /// work around.
    #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
    pub struct Quirks: u32 {
        /// ECB contexts can not be saved and resumed
        const ECB_NO_CONTEXT_SAVE = 0x0001;
        /// Saving a CCM context once all the declared additional data has
        /// been fed and no payload is declared faults the engine
        const AEAD_AD_FINAL_NO_SAVE = 0x0002;
        /// Producing or verifying a CCM tag faults unless the final job
        /// also carries payload data
        const CCM_FINISH_NEEDS_DATA = 0x0004;
    }
}

impl Default for Quirks {
    fn default() -> Quirks {
        Quirks::all()
    }
}

#[cfg(test)]
mod tests;
