//! # npz-stream: Streaming NumPy `.npz` writer
//!
//! `npz-stream` writes NumPy `.npz` archives (ZIP files of `.npy` arrays) entry by
//! entry to any output stream. Arrays go to the output as soon as they are
//! added; only the small central directory stays in memory until the archive
//! is closed.
//!
//! ## Features
//!
//! - **Streaming Write**: each array is encoded and written immediately
//! - **Stored or DEFLATE**: per archive or per entry, raw deflate as ZIP expects
//! - **Any Writer**: files, `Vec<u8>`, stdout; no `Seek` required
//! - **Typed Arrays**: integers, floats, bools and complex numbers map to their
//!   numpy `descr` codes
//!
//! ## Quick Start
//!
//! ```no_run
//! use npz_stream::NpzWriter;
//!
//! // ".npz" is appended automatically
//! let mut npz = NpzWriter::create("dataset")?;
//!
//! npz.add_array("ints", &[1i64, 2, 3, 4], &[4])?;
//! npz.add_array("matrix", &[1.0f32; 6], &[3, 2])?;
//! npz.add_file("README.txt", b"two arrays")?;
//!
//! npz.close()?;
//! # Ok::<(), npz_stream::NpzError>(())
//! ```
//!
//! ### Compression and in-memory archives
//!
//! ```no_run
//! use npz_stream::{CompressionMethod, EntryOptions, NpzWriter, WriterOptions};
//!
//! let options = WriterOptions::default().with_compression(CompressionMethod::Deflate);
//! let mut npz = NpzWriter::from_writer_with_options(Vec::new(), options);
//!
//! npz.add_array("zeros", &[0.0f64; 1024], &[32, 32])?;
//! // Override per entry
//! npz.add_file_with(
//!     "notes.txt",
//!     b"stored as is",
//!     EntryOptions::new().compression(CompressionMethod::Stored),
//! )?;
//!
//! let bytes = npz.finish()?;
//! println!("Created archive with {} bytes", bytes.len());
//! # Ok::<(), npz_stream::NpzError>(())
//! ```

pub mod compress;
pub mod dtype;
pub mod entry;
pub mod error;
pub mod npy;
pub mod writer;

pub use dtype::{DType, NpyElement};
pub use entry::CompressionMethod;
pub use error::{NpzError, Result};
pub use writer::{EntryOptions, NpzWriter, WriterOptions};

pub use num_complex::Complex;
