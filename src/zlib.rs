//! Bounded zlib inflate and deflate.
//!
//! Pack payloads are individual zlib streams embedded in a larger buffer.
//! The inflate helpers report how many compressed bytes they consumed; that
//! count is the authoritative signal for advancing a pack cursor, since the
//! caller's input slice is only a conservative upper bound.
//!
//! Inflation reuses a per-thread `Decompress` and scratch buffer to avoid
//! per-call allocations. The scratch state is not re-entrant; helpers here
//! must not be invoked recursively on the same thread.

use std::cell::RefCell;
use std::fmt;
use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};

/// Scratch chunk size for inflate output.
const INFLATE_CHUNK: usize = 64 * 1024;

thread_local! {
    static SCRATCH: RefCell<(Decompress, Box<[u8; INFLATE_CHUNK]>)> =
        RefCell::new((Decompress::new(true), Box::new([0u8; INFLATE_CHUNK])));
}

/// Zlib codec error taxonomy.
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ZlibError {
    /// Output would exceed the caller's cap.
    LimitExceeded,
    /// The compressed stream ended before producing the expected output.
    TruncatedInput,
    /// The decoder made no progress with input remaining.
    Stalled,
    /// The underlying codec reported a stream error.
    Backend,
}

impl fmt::Display for ZlibError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LimitExceeded => write!(f, "inflate limit exceeded"),
            Self::TruncatedInput => write!(f, "truncated zlib stream"),
            Self::Stalled => write!(f, "zlib decoder stalled"),
            Self::Backend => write!(f, "zlib backend error"),
        }
    }
}

impl std::error::Error for ZlibError {}

/// Inflates a zlib stream with a hard output cap.
///
/// Returns the number of input bytes consumed. The output buffer is cleared
/// before writing; on error it may hold a partial prefix that callers should
/// discard. The stream need not end exactly at the end of `input`.
pub fn inflate_limited(
    input: &[u8],
    out: &mut Vec<u8>,
    max_out: usize,
) -> Result<usize, ZlibError> {
    out.clear();

    SCRATCH.with(|scratch| {
        let mut scratch = scratch.borrow_mut();
        let (decoder, chunk) = &mut *scratch;
        decoder.reset(true);

        let mut consumed_total = 0usize;
        loop {
            let in_before = decoder.total_in() as usize;
            let out_before = decoder.total_out() as usize;

            let status = decoder
                .decompress(&input[consumed_total..], &mut chunk[..], FlushDecompress::None)
                .map_err(|_| ZlibError::Backend)?;

            let consumed = decoder.total_in() as usize - in_before;
            let produced = decoder.total_out() as usize - out_before;
            consumed_total += consumed;

            if produced != 0 {
                if out.len() + produced > max_out {
                    return Err(ZlibError::LimitExceeded);
                }
                out.extend_from_slice(&chunk[..produced]);
            }

            match status {
                Status::StreamEnd => return Ok(consumed_total),
                Status::Ok if consumed == 0 && produced == 0 => {
                    return if consumed_total >= input.len() {
                        Err(ZlibError::TruncatedInput)
                    } else {
                        Err(ZlibError::Stalled)
                    };
                }
                Status::Ok => {}
                Status::BufError => {
                    if consumed_total >= input.len() {
                        return Err(ZlibError::TruncatedInput);
                    }
                }
            }
        }
    })
}

/// Inflates a zlib stream expecting exactly `expected` output bytes.
///
/// Returns the number of input bytes consumed. A stream that ends early or
/// long is rejected.
pub fn inflate_exact(
    input: &[u8],
    out: &mut Vec<u8>,
    expected: usize,
) -> Result<usize, ZlibError> {
    let consumed = inflate_limited(input, out, expected)?;
    if out.len() != expected {
        return Err(ZlibError::TruncatedInput);
    }
    Ok(consumed)
}

/// Deflates `input` into one self-contained zlib stream.
pub fn deflate(input: &[u8]) -> Result<Vec<u8>, ZlibError> {
    let sink = Vec::with_capacity(input.len() / 2 + 64);
    let mut encoder = ZlibEncoder::new(sink, Compression::default());
    encoder.write_all(input).map_err(|_| ZlibError::Backend)?;
    encoder.finish().map_err(|_| ZlibError::Backend)
}
