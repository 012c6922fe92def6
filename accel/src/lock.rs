// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;

use crate::{Error, ErrorKind, Quirks, Result};

#[derive(Debug)]
struct Device {
    quirks: Quirks,
}

static CRYPTOMASTER: Lazy<Mutex<Device>> = Lazy::new(|| {
    Mutex::new(Device {
        quirks: Quirks::default(),
    })
});

/// Exclusive access to the accelerator
///
/// Holding a `Selection` is required to create or resume any context.
/// The accelerator is released when the value is dropped, so callers
/// should keep it only for the duration of the create/resume call.
#[derive(Debug)]
pub struct Selection {
    device: MutexGuard<'static, Device>,
}

impl Selection {
    /// Returns the quirks of the selected accelerator
    pub fn quirks(&self) -> Quirks {
        self.device.quirks
    }
}

/// Acquires the accelerator, blocking until it is available
pub fn select() -> Result<Selection> {
    match CRYPTOMASTER.lock() {
        Ok(device) => Ok(Selection { device: device }),
        Err(_) => Err(Error::with_msg(
            ErrorKind::Unavailable,
            "accelerator lock poisoned",
        )),
    }
}

/// Returns the quirks of the accelerator
pub fn quirks() -> Result<Quirks> {
    Ok(select()?.quirks())
}

/// Reprograms the set of quirks the accelerator exhibits
pub fn set_quirks(quirks: Quirks) -> Result<()> {
    let mut sel = select()?;
    sel.device.quirks = quirks;
    Ok(())
}
