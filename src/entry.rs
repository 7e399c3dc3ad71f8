//! ZIP entry encoding: local file headers, central directory records and the
//! end of central directory record.
//!
//! Every record is encoded field by field in little-endian order. Entries are
//! written with their final sizes up front, so no data descriptor is needed.

use crate::compress::deflate_buffers;
use crate::error::{NpzError, Result};
use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use crc32fast::Hasher as Crc32;

/// ZIP local file header signature
pub const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x04034b50;

/// ZIP central directory signature
pub const CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x02014b50;

/// ZIP end of central directory signature
pub const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x06054b50;

/// Version needed to extract and version made by (2.0)
pub const ZIP_VERSION: u16 = 20;

/// Fixed part of a local file header, without the name
pub const LOCAL_FILE_HEADER_LEN: usize = 30;

/// Fixed part of a central directory record, without the name
pub const CENTRAL_DIRECTORY_RECORD_LEN: usize = 46;

/// End of central directory record without comment
pub const END_OF_CENTRAL_DIRECTORY_LEN: usize = 22;

/// Longest entry name the 16-bit length field can describe
pub const MAX_NAME_LEN: usize = u16::MAX as usize;

/// Compression method to use for ZIP entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionMethod {
    /// No compression (stored)
    #[default]
    Stored,
    /// Raw DEFLATE compression
    Deflate,
}

impl CompressionMethod {
    pub(crate) fn to_zip_method(self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
        }
    }
}

/// MS-DOS modification time and date as stored in ZIP headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosDateTime {
    pub time: u16,
    pub date: u16,
}

impl DosDateTime {
    /// 1980-01-01 00:00:00, the DOS epoch
    pub const MIN: DosDateTime = DosDateTime {
        time: 0,
        date: (1 << 5) | 1,
    };

    /// 2107-12-31 23:59:58
    pub const MAX: DosDateTime = DosDateTime {
        time: (23 << 11) | (59 << 5) | 29,
        date: (127 << 9) | (12 << 5) | 31,
    };

    /// Convert a Unix timestamp (seconds, UTC). Zero means "now".
    ///
    /// Times outside the DOS range are clamped to [`DosDateTime::MIN`] and
    /// [`DosDateTime::MAX`].
    pub fn from_unix(timestamp: i64) -> Self {
        let timestamp = if timestamp == 0 {
            Utc::now().timestamp()
        } else {
            timestamp
        };

        match Utc.timestamp_opt(timestamp, 0).single() {
            Some(dt) => Self::from_datetime(&dt),
            None if timestamp < 0 => Self::MIN,
            None => Self::MAX,
        }
    }

    fn from_datetime(dt: &DateTime<Utc>) -> Self {
        match dt.year() {
            y if y < 1980 => Self::MIN,
            y if y > 2107 => Self::MAX,
            y => DosDateTime {
                time: ((dt.hour() << 11) | (dt.minute() << 5) | (dt.second() / 2)) as u16,
                date: (((y - 1980) as u32) << 9 | (dt.month() << 5) | dt.day()) as u16,
            },
        }
    }
}

/// Header fields shared by the local file header and the central directory record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub compression_method: u16,
    pub modified: DosDateTime,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name_len: u16,
}

impl FileHeader {
    fn write_fields(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&ZIP_VERSION.to_le_bytes()); // version needed
        out.extend_from_slice(&0u16.to_le_bytes()); // general purpose bit flag
        out.extend_from_slice(&self.compression_method.to_le_bytes());
        out.extend_from_slice(&self.modified.time.to_le_bytes());
        out.extend_from_slice(&self.modified.date.to_le_bytes());
        out.extend_from_slice(&self.crc32.to_le_bytes());
        out.extend_from_slice(&self.compressed_size.to_le_bytes());
        out.extend_from_slice(&self.uncompressed_size.to_le_bytes());
        out.extend_from_slice(&self.name_len.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // extra len
    }

    /// Local file header followed by the entry name
    pub fn encode_local(&self, name: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(LOCAL_FILE_HEADER_LEN + name.len());
        out.extend_from_slice(&LOCAL_FILE_HEADER_SIGNATURE.to_le_bytes());
        self.write_fields(&mut out);
        out.extend_from_slice(name);
        out
    }

    /// Central directory record pointing at the local header at `local_header_offset`
    pub fn encode_central(&self, name: &[u8], local_header_offset: u32) -> Vec<u8> {
        let mut out = Vec::with_capacity(CENTRAL_DIRECTORY_RECORD_LEN + name.len());
        out.extend_from_slice(&CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&ZIP_VERSION.to_le_bytes()); // version made by
        self.write_fields(&mut out);
        out.extend_from_slice(&0u16.to_le_bytes()); // file comment len
        out.extend_from_slice(&0u16.to_le_bytes()); // disk number start
        out.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
        out.extend_from_slice(&0u32.to_le_bytes()); // external attrs
        out.extend_from_slice(&local_header_offset.to_le_bytes());
        out.extend_from_slice(name);
        out
    }
}

/// End of central directory record (single disk, no comment)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub entries: u16,
    pub central_directory_size: u32,
    pub central_directory_offset: u32,
}

impl EndOfCentralDirectory {
    pub fn encode(&self) -> [u8; END_OF_CENTRAL_DIRECTORY_LEN] {
        let mut out = [0u8; END_OF_CENTRAL_DIRECTORY_LEN];
        out[0..4].copy_from_slice(&END_OF_CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes());
        // disk number and disk with central dir stay 0
        out[8..10].copy_from_slice(&self.entries.to_le_bytes());
        out[10..12].copy_from_slice(&self.entries.to_le_bytes());
        out[12..16].copy_from_slice(&self.central_directory_size.to_le_bytes());
        out[16..20].copy_from_slice(&self.central_directory_offset.to_le_bytes());
        // comment len stays 0
        out
    }
}

/// Entry data as it goes to the output
pub enum Payload<'a> {
    /// Input buffers copied verbatim
    Stored(&'a [u8], Option<&'a [u8]>),
    /// Finished raw DEFLATE stream
    Deflated(Vec<u8>),
}

/// A fully prepared entry: header fields are final before any byte is written
pub struct EncodedEntry<'a> {
    pub header: FileHeader,
    pub payload: Payload<'a>,
}

/// Turns one or two buffers into a ZIP entry
#[derive(Debug, Clone, Copy)]
pub struct EntryEncoder {
    pub compression: CompressionMethod,
    pub compression_level: u32,
    pub compute_crc: bool,
    /// Unix timestamp, 0 for the current time
    pub timestamp: i64,
}

impl EntryEncoder {
    /// Validate `name` and encode `first` followed by `second` as one entry
    pub fn encode<'a>(
        &self,
        name: &str,
        first: &'a [u8],
        second: Option<&'a [u8]>,
    ) -> Result<EncodedEntry<'a>> {
        if name.len() > MAX_NAME_LEN {
            return Err(NpzError::NameTooLong { len: name.len() });
        }

        let total_len = first.len() as u64 + second.map_or(0, |b| b.len() as u64);
        let uncompressed_size = u32::try_from(total_len).map_err(|_| {
            NpzError::TooLarge(format!("entry {} has {} bytes", name, total_len))
        })?;

        let crc32 = if self.compute_crc {
            let mut crc = Crc32::new();
            crc.update(first);
            if let Some(second) = second {
                crc.update(second);
            }
            crc.finalize()
        } else {
            0
        };

        let (payload, compressed_size) = match self.compression {
            CompressionMethod::Stored => (Payload::Stored(first, second), uncompressed_size),
            CompressionMethod::Deflate => {
                let compressed = deflate_buffers(self.compression_level, first, second)?;
                let size = u32::try_from(compressed.len()).map_err(|_| {
                    NpzError::TooLarge(format!(
                        "entry {} compresses to {} bytes",
                        name,
                        compressed.len()
                    ))
                })?;
                (Payload::Deflated(compressed), size)
            }
        };

        Ok(EncodedEntry {
            header: FileHeader {
                compression_method: self.compression.to_zip_method(),
                modified: DosDateTime::from_unix(self.timestamp),
                crc32,
                compressed_size,
                uncompressed_size,
                name_len: name.len() as u16,
            },
            payload,
        })
    }
}
