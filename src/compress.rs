//! Raw DEFLATE compression of one entry
//!
//! Each entry gets its own codec session. The NPY header and the array data are
//! fed as two consecutive inputs of one logical stream, so neither has to be
//! copied into a joint buffer first. The session is dropped with the
//! [`StreamingCompressor`], whichever way the entry ends.

use crate::error::{NpzError, Result};
use flate2::{Compress, Compression, FlushCompress, Status};

/// Highest DEFLATE level accepted by the codec
pub const MAX_COMPRESSION_LEVEL: u32 = 9;

/// Minimum extra output space reserved when the codec runs out of room
const OUTPUT_GROWTH: usize = 64 * 1024;

/// Initial output capacity for `len` input bytes (zlib's `compressBound`).
///
/// Not a hard limit for every backend; the compressor grows its buffer when needed.
pub fn deflate_bound(len: usize) -> usize {
    len + (len >> 12) + (len >> 14) + (len >> 25) + 13
}

/// One raw DEFLATE session writing into a pre-sized, growable output buffer
pub struct StreamingCompressor {
    codec: Compress,
    output: Vec<u8>,
    fed: u64,
    finished: bool,
}

impl StreamingCompressor {
    /// Start a session for `total_len` uncompressed bytes
    pub fn new(compression_level: u32, total_len: usize) -> Result<Self> {
        if compression_level > MAX_COMPRESSION_LEVEL {
            return Err(NpzError::CodecInit(format!(
                "compression level {} is out of range 0-{}",
                compression_level, MAX_COMPRESSION_LEVEL
            )));
        }

        Ok(Self {
            // No zlib header: ZIP entries hold a bare deflate stream
            codec: Compress::new(Compression::new(compression_level), false),
            output: Vec::with_capacity(deflate_bound(total_len)),
            fed: 0,
            finished: false,
        })
    }

    /// Feed the next input. `last` must be set on the final feed.
    pub fn feed(&mut self, input: &[u8], last: bool) -> Result<()> {
        if self.finished {
            return Err(NpzError::Internal(
                "deflate stream was already finished".to_string(),
            ));
        }

        let flush = if last {
            FlushCompress::Finish
        } else {
            FlushCompress::None
        };

        let mut remaining = input;
        loop {
            let in_before = self.codec.total_in();
            let out_before = self.codec.total_out();
            let spare_before = self.output.capacity() - self.output.len();

            let status = self
                .codec
                .compress_vec(remaining, &mut self.output, flush)
                .map_err(|e| NpzError::Internal(format!("deflate failed: {}", e)))?;

            let consumed = (self.codec.total_in() - in_before) as usize;
            remaining = &remaining[consumed..];

            let done = if last {
                status == Status::StreamEnd
            } else {
                remaining.is_empty()
            };
            if done {
                break;
            }

            // The codec may need more room than the initial bound; only a call
            // that had spare output and still moved nothing is a fault
            if consumed == 0 && self.codec.total_out() == out_before && spare_before > 0 {
                return Err(NpzError::Internal(format!(
                    "deflate made no progress ({:?}, {} input bytes left)",
                    status,
                    remaining.len()
                )));
            }
            self.output
                .reserve(deflate_bound(remaining.len()).max(OUTPUT_GROWTH));
        }

        self.fed += input.len() as u64;
        if self.codec.total_in() != self.fed {
            return Err(NpzError::Internal(format!(
                "deflate consumed {} of {} input bytes",
                self.codec.total_in(),
                self.fed
            )));
        }
        if last {
            self.finished = true;
        }

        Ok(())
    }

    /// Compressed bytes of the finished stream
    pub fn finish(self) -> Result<Vec<u8>> {
        if !self.finished {
            return Err(NpzError::Internal(
                "deflate stream was never finished".to_string(),
            ));
        }
        debug_assert_eq!(self.codec.total_out(), self.output.len() as u64);
        Ok(self.output)
    }
}

/// Compress `first` followed by `second` as a single raw DEFLATE stream
pub fn deflate_buffers(
    compression_level: u32,
    first: &[u8],
    second: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let total_len = first.len() + second.map_or(0, <[u8]>::len);
    let mut compressor = StreamingCompressor::new(compression_level, total_len)?;

    compressor.feed(first, second.is_none())?;
    if let Some(second) = second {
        compressor.feed(second, true)?;
    }

    compressor.finish()
}
