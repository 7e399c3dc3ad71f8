//! Streaming NPZ writer
//!
//! Entries go to the output as soon as they are added; only the central
//! directory is kept in memory until the archive is closed. The output does not
//! need to be seekable: offsets are tracked by counting written bytes.
//!
//! Supports arbitrary writers (File, Vec<u8>, stdout, network streams, etc.)

use crate::dtype::{DType, NpyElement};
use crate::entry::{CompressionMethod, EndOfCentralDirectory, EntryEncoder, Payload};
use crate::error::{NpzError, Result};
use crate::npy::build_header;
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Archive-wide settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    /// Compression used when an entry does not ask for one
    pub compression: CompressionMethod,
    /// DEFLATE level (0-9)
    pub compression_level: u32,
    /// Store real CRC-32 values. When disabled every CRC field is written as 0,
    /// which CRC-checking readers reject.
    pub compute_crc: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            compression: CompressionMethod::Stored,
            compression_level: 6,
            compute_crc: true,
        }
    }
}

impl WriterOptions {
    pub fn with_compression(mut self, compression: CompressionMethod) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_compression_level(mut self, compression_level: u32) -> Self {
        self.compression_level = compression_level;
        self
    }

    pub fn with_crc(mut self, compute_crc: bool) -> Self {
        self.compute_crc = compute_crc;
        self
    }
}

/// Per-entry overrides
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryOptions {
    /// Compression for this entry, `None` for the writer default
    pub compression: Option<CompressionMethod>,
    /// Unix timestamp (seconds, UTC) of the entry, `None` or 0 for now
    pub timestamp: Option<i64>,
}

impl EntryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compression(mut self, compression: CompressionMethod) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Append `.npz` to an archive path unless it already ends in `.npz` or `.zip`
pub fn archive_path<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    let name = path.as_os_str().to_string_lossy();
    if name.ends_with(".npz") || name.ends_with(".zip") {
        path.to_path_buf()
    } else {
        let mut normalized = path.as_os_str().to_os_string();
        normalized.push(".npz");
        PathBuf::from(normalized)
    }
}

/// Append `extension` to `name` unless it is already there
pub fn name_with_extension<'a>(name: &'a str, extension: &str) -> Cow<'a, str> {
    if name.ends_with(extension) {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("{}{}", name, extension))
    }
}

/// Streaming writer for `.npz` archives
///
/// Close the archive with [`close`](NpzWriter::close) or
/// [`finish`](NpzWriter::finish). Closing twice is a no-op, adding entries
/// after closing fails with [`NpzError::Closed`]. A writer dropped while still
/// open is closed on a best-effort basis.
pub struct NpzWriter<W: Write> {
    output: Option<W>,
    path: Option<PathBuf>,
    central_directory: Vec<u8>,
    num_entries: u16,
    position: u64,
    options: WriterOptions,
}

impl NpzWriter<BufWriter<File>> {
    /// Create (or truncate) an archive file with default options
    ///
    /// `.npz` is appended to the path unless it ends in `.npz` or `.zip`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::create_with_options(path, WriterOptions::default())
    }

    /// Create (or truncate) an archive file with custom options
    pub fn create_with_options<P: AsRef<Path>>(path: P, options: WriterOptions) -> Result<Self> {
        let path = archive_path(path);
        let file = File::create(&path)?;
        debug!(path = %path.display(), "Created archive");

        let mut writer = Self::from_writer_with_options(BufWriter::new(file), options);
        writer.path = Some(path);
        Ok(writer)
    }
}

impl<W: Write> NpzWriter<W> {
    /// Write an archive into an arbitrary writer with default options
    pub fn from_writer(writer: W) -> Self {
        Self::from_writer_with_options(writer, WriterOptions::default())
    }

    /// Write an archive into an arbitrary writer with custom options
    pub fn from_writer_with_options(writer: W, options: WriterOptions) -> Self {
        Self {
            output: Some(writer),
            path: None,
            central_directory: Vec::new(),
            num_entries: 0,
            position: 0,
            options,
        }
    }

    /// Path of the archive, for writers created from a path
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Absolute path of the archive, for writers created from a path
    pub fn full_path(&self) -> Option<PathBuf> {
        self.path
            .as_deref()
            .and_then(|path| std::path::absolute(path).ok())
    }

    /// Number of entries written so far
    pub fn num_files(&self) -> usize {
        self.num_entries as usize
    }

    /// Bytes written to the output so far
    pub fn bytes_written(&self) -> u64 {
        self.position
    }

    pub fn is_closed(&self) -> bool {
        self.output.is_none()
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    /// Add a file whose content is `data`. Returns the bytes written for the
    /// entry's payload (its compressed size).
    pub fn add_file(&mut self, name: &str, data: &[u8]) -> Result<u64> {
        self.add_file_with(name, data, EntryOptions::default())
    }

    /// Add a file with per-entry compression and timestamp
    pub fn add_file_with(&mut self, name: &str, data: &[u8], options: EntryOptions) -> Result<u64> {
        self.add_entry_from_buffers(name, data, None, options)
    }

    /// Add a typed array as `<name>.npy`
    ///
    /// `data` holds the elements in C (row-major) order and must contain
    /// exactly as many elements as `shape` describes.
    ///
    /// # Example
    /// ```no_run
    /// use npz_stream::NpzWriter;
    ///
    /// let mut npz = NpzWriter::create("weights")?; // writes weights.npz
    /// npz.add_array("matrix", &[1.0f32; 6], &[3, 2])?;
    /// npz.close()?;
    /// # Ok::<(), npz_stream::NpzError>(())
    /// ```
    pub fn add_array<T: NpyElement>(&mut self, name: &str, data: &[T], shape: &[usize]) -> Result<u64> {
        self.add_array_with(name, data, shape, EntryOptions::default())
    }

    /// Add a typed array with per-entry compression and timestamp
    pub fn add_array_with<T: NpyElement>(
        &mut self,
        name: &str,
        data: &[T],
        shape: &[usize],
        options: EntryOptions,
    ) -> Result<u64> {
        let bytes = T::le_bytes(data);
        self.add_array_bytes(name, T::DTYPE, &bytes, shape, options)
    }

    /// Add an array given as raw little-endian element bytes
    pub fn add_array_bytes(
        &mut self,
        name: &str,
        dtype: DType,
        data: &[u8],
        shape: &[usize],
        options: EntryOptions,
    ) -> Result<u64> {
        let header = build_header(dtype.descr(), shape)?;

        let expected = shape
            .iter()
            .try_fold(dtype.size(), |acc, &dim| acc.checked_mul(dim))
            .ok_or_else(|| NpzError::TooLarge(format!("array shape {:?} overflows", shape)))?;
        if data.len() != expected {
            return Err(NpzError::DataLength {
                expected,
                actual: data.len(),
            });
        }

        let name = name_with_extension(name, ".npy");
        self.add_entry_from_buffers(&name, &header, Some(data), options)
    }

    /// Add one entry whose content is `first` followed by `second`.
    ///
    /// Both buffers go through a single compression stream. Returns the
    /// compressed size of the entry.
    pub fn add_entry_from_buffers(
        &mut self,
        name: &str,
        first: &[u8],
        second: Option<&[u8]>,
        options: EntryOptions,
    ) -> Result<u64> {
        if self.output.is_none() {
            return Err(NpzError::Closed);
        }
        if self.num_entries == u16::MAX {
            return Err(NpzError::TooManyEntries);
        }
        let local_header_offset = u32::try_from(self.position).map_err(|_| {
            NpzError::TooLarge(format!("entry offset {} exceeds 4 GiB", self.position))
        })?;

        let encoder = EntryEncoder {
            compression: options.compression.unwrap_or(self.options.compression),
            compression_level: self.options.compression_level,
            compute_crc: self.options.compute_crc,
            timestamp: options.timestamp.unwrap_or(0),
        };
        let entry = encoder.encode(name, first, second)?;
        let local_header = entry.header.encode_local(name.as_bytes());
        let central_record = entry
            .header
            .encode_central(name.as_bytes(), local_header_offset);

        // Without ZIP64 the central directory must start below 4 GiB
        let entry_end =
            self.position + local_header.len() as u64 + entry.header.compressed_size as u64;
        if entry_end > u32::MAX as u64 {
            return Err(NpzError::TooLarge(format!(
                "entry '{}' would end at offset {}, beyond 4 GiB",
                name, entry_end
            )));
        }
        let directory_len = self.central_directory.len() + central_record.len();
        if u32::try_from(directory_len).is_err() {
            return Err(NpzError::TooLarge(format!(
                "central directory of {} bytes exceeds 4 GiB",
                directory_len
            )));
        }

        let output = self.output.as_mut().ok_or(NpzError::Closed)?;
        if let Err(e) = write_entry(output, &local_header, &entry.payload) {
            // A partial entry cannot be rolled back; give up on the archive
            self.output = None;
            warn!(entry = %name, error = %e, "Write failed, archive abandoned");
            return Err(e.into());
        }

        let compressed_size = entry.header.compressed_size as u64;
        self.position = entry_end;
        self.central_directory.extend_from_slice(&central_record);
        self.num_entries += 1;

        debug!(
            entry = %name,
            offset = local_header_offset,
            compressed_size,
            uncompressed_size = entry.header.uncompressed_size,
            "Wrote entry"
        );

        Ok(compressed_size)
    }

    /// Write the central directory and end record, then flush and release the
    /// output. Calling it again is a no-op.
    pub fn close(&mut self) -> Result<()> {
        self.finalize().map(|_| ())
    }

    /// Close the archive and return the underlying writer
    pub fn finish(mut self) -> Result<W> {
        self.finalize()?.ok_or(NpzError::Closed)
    }

    fn finalize(&mut self) -> Result<Option<W>> {
        let Some(mut output) = self.output.take() else {
            return Ok(None);
        };

        let central_directory_offset = u32::try_from(self.position).map_err(|_| {
            NpzError::TooLarge(format!(
                "central directory offset {} exceeds 4 GiB",
                self.position
            ))
        })?;
        let central_directory_size = u32::try_from(self.central_directory.len()).map_err(|_| {
            NpzError::TooLarge(format!(
                "central directory of {} bytes exceeds 4 GiB",
                self.central_directory.len()
            ))
        })?;

        let end_record = EndOfCentralDirectory {
            entries: self.num_entries,
            central_directory_size,
            central_directory_offset,
        }
        .encode();

        output.write_all(&self.central_directory)?;
        output.write_all(&end_record)?;
        output.flush()?;
        self.position += self.central_directory.len() as u64 + end_record.len() as u64;

        debug!(
            entries = self.num_entries,
            central_directory_size,
            total_size = self.position,
            "Closed archive"
        );

        Ok(Some(output))
    }
}

fn write_entry<W: Write>(output: &mut W, local_header: &[u8], payload: &Payload<'_>) -> std::io::Result<()> {
    output.write_all(local_header)?;
    match payload {
        Payload::Stored(first, second) => {
            output.write_all(first)?;
            if let Some(second) = second {
                output.write_all(second)?;
            }
        }
        Payload::Deflated(compressed) => output.write_all(compressed)?,
    }
    Ok(())
}

impl<W: Write> Drop for NpzWriter<W> {
    fn drop(&mut self) {
        if self.output.is_some() {
            if let Err(e) = self.close() {
                warn!(error = %e, "Failed to close archive on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_path_normalization() {
        assert_eq!(archive_path("data"), PathBuf::from("data.npz"));
        assert_eq!(archive_path("data.npz"), PathBuf::from("data.npz"));
        assert_eq!(archive_path("data.zip"), PathBuf::from("data.zip"));
        assert_eq!(archive_path("dir/data.npy"), PathBuf::from("dir/data.npy.npz"));
    }

    #[test]
    fn test_name_with_extension() {
        assert_eq!(name_with_extension("matrix", ".npy"), "matrix.npy");
        assert_eq!(name_with_extension("matrix.npy", ".npy"), "matrix.npy");
        assert!(matches!(
            name_with_extension("matrix.npy", ".npy"),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn test_options_defaults() {
        let options = WriterOptions::default();
        assert_eq!(options.compression, CompressionMethod::Stored);
        assert_eq!(options.compression_level, 6);
        assert!(options.compute_crc);

        let entry = EntryOptions::new()
            .compression(CompressionMethod::Deflate)
            .timestamp(42);
        assert_eq!(entry.compression, Some(CompressionMethod::Deflate));
        assert_eq!(entry.timestamp, Some(42));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut writer = NpzWriter::from_writer(Vec::new());
        writer.add_file("a.txt", b"a").unwrap();
        writer.close().unwrap();
        let size = writer.bytes_written();
        writer.close().unwrap();
        assert_eq!(writer.bytes_written(), size);
        assert!(writer.is_closed());
        assert!(matches!(writer.add_file("b.txt", b"b"), Err(NpzError::Closed)));
    }

    #[test]
    fn test_bytes_written_tracks_output() {
        let mut writer = NpzWriter::from_writer(Vec::new());
        writer.add_file("one", b"1").unwrap();
        writer.add_file("two", b"22").unwrap();
        let expected = writer.bytes_written() + 2 * 46 + 3 + 3 + 22;
        let out = writer.finish().unwrap();
        assert_eq!(out.len() as u64, expected);
    }

    #[test]
    fn test_entry_ending_past_4_gib_is_rejected() {
        let mut writer = NpzWriter::from_writer(std::io::sink());
        writer.position = u32::MAX as u64 - 100;

        let result = writer.add_file("big.bin", &[0u8; 200]);
        assert!(matches!(result, Err(NpzError::TooLarge(_))));
        assert_eq!(writer.bytes_written(), u32::MAX as u64 - 100);
        assert_eq!(writer.num_files(), 0);
        assert!(!writer.is_closed());

        // An entry that still ends below the limit is accepted
        writer.add_file("a", &[0u8; 50]).unwrap();
        assert_eq!(writer.bytes_written(), u32::MAX as u64 - 100 + 30 + 1 + 50);
        assert_eq!(writer.num_files(), 1);
        writer.close().unwrap();
    }
}
