// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! Accelerator contexts held by an operation between calls

use std::mem;

use crate::error::{Result, Status};

use accel::Selection;

/// Accelerator contexts that can be reloaded after being saved
pub(crate) trait Resumable {
    fn resume(&mut self, sel: &Selection) -> accel::Result<()>;
}

impl Resumable for accel::blkcipher::BlkCipher {
    fn resume(&mut self, sel: &Selection) -> accel::Result<()> {
        self.resume_state(sel)
    }
}

impl Resumable for accel::aead::Aead {
    fn resume(&mut self, sel: &Selection) -> accel::Result<()> {
        self.resume_state(sel)
    }
}

impl Resumable for accel::hash::Hash {
    fn resume(&mut self, sel: &Selection) -> accel::Result<()> {
        self.resume_state(sel)
    }
}

impl Resumable for accel::mac::Mac {
    fn resume(&mut self, sel: &Selection) -> accel::Result<()> {
        self.resume_state(sel)
    }
}

#[derive(Clone, Debug)]
pub(crate) enum HwContext<T> {
    /// Nothing was created on the accelerator yet
    NoHardwareContext,
    /// Live context, usable without resuming. Contexts are left in this
    /// state between calls only when no further resume can happen.
    Unsaved(T),
    /// Saved by the accelerator, must be resumed before use
    Suspended(T),
}

impl<T: Resumable> HwContext<T> {
    pub fn is_none(&self) -> bool {
        match self {
            HwContext::NoHardwareContext => true,
            _ => false,
        }
    }

    /// Returns a live context: a suspended one is resumed, and when there
    /// is none `create` is called. The accelerator is selected only for
    /// the duration of the create or resume call.
    pub fn acquire<F>(&mut self, create: F) -> Result<&mut T>
    where
        F: FnOnce(&Selection) -> accel::Result<T>,
    {
        let state = mem::replace(self, HwContext::NoHardwareContext);
        *self = match state {
            HwContext::Unsaved(ctx) => HwContext::Unsaved(ctx),
            HwContext::NoHardwareContext => {
                let sel = accel::select()?;
                HwContext::Unsaved(create(&sel)?)
            }
            HwContext::Suspended(mut ctx) => {
                let sel = accel::select()?;
                match ctx.resume(&sel) {
                    Ok(()) => HwContext::Unsaved(ctx),
                    Err(e) => {
                        *self = HwContext::Suspended(ctx);
                        return Err(e)?;
                    }
                }
            }
        };
        self.live()
    }

    /// Returns the live context, BAD_STATE if it must be resumed first
    pub fn live(&mut self) -> Result<&mut T> {
        match self {
            HwContext::Unsaved(ctx) => Ok(ctx),
            _ => Err(Status::BadState)?,
        }
    }

    /// Records that the live context was saved
    pub fn suspend(&mut self) {
        let state = mem::replace(self, HwContext::NoHardwareContext);
        *self = match state {
            HwContext::Unsaved(ctx) => HwContext::Suspended(ctx),
            other => other,
        };
    }

    pub fn clear(&mut self) {
        *self = HwContext::NoHardwareContext;
    }
}
