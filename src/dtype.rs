//! Element types and their numpy `descr` codes
//!
//! The set of supported element types is fixed, so the mapping is a plain enum
//! resolved at the call site through the [`NpyElement`] trait.

use byteorder::{ByteOrder, LittleEndian};
use num_complex::Complex;
use std::borrow::Cow;
#[cfg(target_endian = "little")]
use zerocopy::{Immutable, IntoBytes};

/// Numpy element type of an array entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    /// Single byte string (`|S1`)
    Char,
    /// Complex number of two `f32`
    Complex64,
    /// Complex number of two `f64`
    Complex128,
}

impl DType {
    /// Numpy type string. Multi-byte types are always little endian,
    /// single byte types carry no byte order (`|`).
    pub fn descr(self) -> &'static str {
        match self {
            DType::Bool => "|b1",
            DType::Int8 => "|i1",
            DType::Int16 => "<i2",
            DType::Int32 => "<i4",
            DType::Int64 => "<i8",
            DType::UInt8 => "|u1",
            DType::UInt16 => "<u2",
            DType::UInt32 => "<u4",
            DType::UInt64 => "<u8",
            DType::Float32 => "<f4",
            DType::Float64 => "<f8",
            DType::Char => "|S1",
            DType::Complex64 => "<c8",
            DType::Complex128 => "<c16",
        }
    }

    /// Size of one element in bytes
    pub fn size(self) -> usize {
        match self {
            DType::Bool | DType::Int8 | DType::UInt8 | DType::Char => 1,
            DType::Int16 | DType::UInt16 => 2,
            DType::Int32 | DType::UInt32 | DType::Float32 => 4,
            DType::Int64 | DType::UInt64 | DType::Float64 | DType::Complex64 => 8,
            DType::Complex128 => 16,
        }
    }
}

/// Rust types that can be written as numpy array elements
pub trait NpyElement: Copy {
    /// Numpy type of this element
    const DTYPE: DType;

    /// Encode `src` as little-endian bytes into `dst`.
    ///
    /// `dst` must be exactly `src.len() * Self::DTYPE.size()` bytes long.
    fn write_le_into(src: &[Self], dst: &mut [u8]);

    /// Little-endian bytes of `src`.
    ///
    /// Types whose memory layout already is the file layout borrow the slice;
    /// the rest are encoded into a new buffer.
    fn le_bytes(src: &[Self]) -> Cow<'_, [u8]> {
        Cow::Owned(to_le_bytes(src))
    }
}

/// Encode a typed slice into a freshly allocated little-endian byte buffer
pub(crate) fn to_le_bytes<T: NpyElement>(data: &[T]) -> Vec<u8> {
    let mut bytes = vec![0u8; data.len() * T::DTYPE.size()];
    T::write_le_into(data, &mut bytes);
    bytes
}

/// In-memory bytes of `data`, which are its file bytes on little-endian hosts
#[cfg(target_endian = "little")]
fn native_bytes<T: IntoBytes + Immutable>(data: &[T]) -> Cow<'_, [u8]> {
    Cow::Borrowed(data.as_bytes())
}

macro_rules! impl_element {
    ($ty:ty, $dtype:expr, $write:ident) => {
        impl NpyElement for $ty {
            const DTYPE: DType = $dtype;

            fn write_le_into(src: &[Self], dst: &mut [u8]) {
                LittleEndian::$write(src, dst);
            }

            #[cfg(target_endian = "little")]
            fn le_bytes(src: &[Self]) -> Cow<'_, [u8]> {
                native_bytes(src)
            }
        }
    };
}

impl_element!(i16, DType::Int16, write_i16_into);
impl_element!(i32, DType::Int32, write_i32_into);
impl_element!(i64, DType::Int64, write_i64_into);
impl_element!(u16, DType::UInt16, write_u16_into);
impl_element!(u32, DType::UInt32, write_u32_into);
impl_element!(u64, DType::UInt64, write_u64_into);
impl_element!(f32, DType::Float32, write_f32_into);
impl_element!(f64, DType::Float64, write_f64_into);

impl NpyElement for u8 {
    const DTYPE: DType = DType::UInt8;

    fn write_le_into(src: &[Self], dst: &mut [u8]) {
        dst.copy_from_slice(src);
    }

    fn le_bytes(src: &[Self]) -> Cow<'_, [u8]> {
        Cow::Borrowed(src)
    }
}

impl NpyElement for i8 {
    const DTYPE: DType = DType::Int8;

    fn write_le_into(src: &[Self], dst: &mut [u8]) {
        for (d, s) in dst.iter_mut().zip(src) {
            *d = *s as u8;
        }
    }

    #[cfg(target_endian = "little")]
    fn le_bytes(src: &[Self]) -> Cow<'_, [u8]> {
        native_bytes(src)
    }
}

impl NpyElement for bool {
    const DTYPE: DType = DType::Bool;

    fn write_le_into(src: &[Self], dst: &mut [u8]) {
        for (d, s) in dst.iter_mut().zip(src) {
            *d = u8::from(*s);
        }
    }

    #[cfg(target_endian = "little")]
    fn le_bytes(src: &[Self]) -> Cow<'_, [u8]> {
        native_bytes(src)
    }
}

impl NpyElement for Complex<f32> {
    const DTYPE: DType = DType::Complex64;

    fn write_le_into(src: &[Self], dst: &mut [u8]) {
        for (chunk, c) in dst.chunks_exact_mut(8).zip(src) {
            LittleEndian::write_f32(&mut chunk[..4], c.re);
            LittleEndian::write_f32(&mut chunk[4..], c.im);
        }
    }
}

impl NpyElement for Complex<f64> {
    const DTYPE: DType = DType::Complex128;

    fn write_le_into(src: &[Self], dst: &mut [u8]) {
        for (chunk, c) in dst.chunks_exact_mut(16).zip(src) {
            LittleEndian::write_f64(&mut chunk[..8], c.re);
            LittleEndian::write_f64(&mut chunk[8..], c.im);
        }
    }
}
