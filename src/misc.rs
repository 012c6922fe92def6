// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

/* misc utilities that do not really belong in any module */

use std::ops::Range;

use crate::error::{Result, Status};

use zeroize::Zeroize;

/// Relative position of an input range and an output region carved out
/// of the same buffer
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Overlap {
    /// The regions share no byte
    Disjoint,
    /// Output starts exactly where input starts
    InPlace,
    /// Partial overlap, the input must be moved before processing
    RequiresCopy,
}

/// Classifies `input` against `len` output bytes written at `out_offset`
pub fn classify(
    input: &Range<usize>,
    out_offset: usize,
    len: usize,
) -> Overlap {
    if len == 0 || out_offset + len <= input.start || out_offset >= input.end
    {
        Overlap::Disjoint
    } else if out_offset == input.start {
        Overlap::InPlace
    } else {
        Overlap::RequiresCopy
    }
}

/// Runs `f` on input `buf[input]` and output starting at
/// `buf[out_offset]`. Overlapping regions are staged through a copy of
/// the input, and a partially overlapping input is first moved to the
/// output position so the operation can run in place.
pub fn process_within<F>(
    buf: &mut [u8],
    input: Range<usize>,
    out_offset: usize,
    f: F,
) -> Result<usize>
where
    F: FnOnce(&[u8], &mut [u8]) -> Result<usize>,
{
    if input.start > input.end
        || input.end > buf.len()
        || out_offset > buf.len()
    {
        return Err(Status::InvalidArgument)?;
    }
    let len = input.len();
    let out_len = buf.len() - out_offset;
    let input = match classify(&input, out_offset, out_len) {
        Overlap::Disjoint => {
            if out_offset >= input.end {
                let (head, out) = buf.split_at_mut(out_offset);
                return f(&head[input], out);
            } else {
                let (out, tail) = buf.split_at_mut(input.start);
                return f(&tail[..len], &mut out[out_offset..]);
            }
        }
        Overlap::InPlace => input,
        Overlap::RequiresCopy => {
            if out_offset + len > buf.len() {
                return Err(Status::BufferTooSmall)?;
            }
            buf.copy_within(input, out_offset);
            out_offset..out_offset + len
        }
    };
    let mut scratch = buf[input].to_vec();
    let ret = f(&scratch, &mut buf[out_offset..]);
    scratch.zeroize();
    ret
}
