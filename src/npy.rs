//! NPY 1.0 header builder
//!
//! An `.npy` file starts with a 10-byte preamble followed by a Python dict
//! literal describing the array:
//!
//! ```text
//! \x93NUMPY 0x01 0x00 <u16 LE header_len> {'descr': '<f4', 'fortran_order': False, 'shape': (3,2)}   \n
//! ```
//!
//! The preamble plus the dict is padded with spaces to a multiple of 64 bytes so
//! the array data that follows is aligned.

use crate::error::{NpzError, Result};

/// NPY magic string
pub const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Magic + version + header length
pub const NPY_PREAMBLE_LEN: usize = 10;

/// Alignment of the array data that follows the header
pub const NPY_ARRAY_ALIGN: usize = 64;

const NPY_MAJOR_VERSION: u8 = 1;
const NPY_MINOR_VERSION: u8 = 0;

/// Build the NPY header for an array of `descr` elements with the given shape.
///
/// `shape` must have at least one dimension.
pub fn build_header(descr: &str, shape: &[usize]) -> Result<Vec<u8>> {
    if shape.is_empty() {
        return Err(NpzError::InvalidShape);
    }

    let dims = shape
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(",");
    // One-element tuples need a trailing comma
    let trailing = if shape.len() == 1 { "," } else { "" };
    let mut dict = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': ({}{})}}",
        descr, dims, trailing
    );

    // Pad so that preamble + dict + newline lands on the alignment boundary
    let pad = NPY_ARRAY_ALIGN - (NPY_PREAMBLE_LEN + dict.len() + 1) % NPY_ARRAY_ALIGN;
    dict.extend(std::iter::repeat(' ').take(pad));
    dict.push('\n');

    let header_len = u16::try_from(dict.len()).map_err(|_| {
        NpzError::Internal(format!(
            "NPY header of {} bytes does not fit a version 1.0 header",
            dict.len()
        ))
    })?;

    let mut header = Vec::with_capacity(NPY_PREAMBLE_LEN + dict.len());
    header.extend_from_slice(NPY_MAGIC);
    header.push(NPY_MAJOR_VERSION);
    header.push(NPY_MINOR_VERSION);
    header.extend_from_slice(&header_len.to_le_bytes());
    header.extend_from_slice(dict.as_bytes());

    if header.len() % NPY_ARRAY_ALIGN != 0 {
        return Err(NpzError::Internal(format!(
            "NPY header length {} is not a multiple of {}",
            header.len(),
            NPY_ARRAY_ALIGN
        )));
    }

    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict_text(header: &[u8]) -> &str {
        std::str::from_utf8(&header[NPY_PREAMBLE_LEN..]).unwrap()
    }

    #[test]
    fn test_one_dimensional_shape_has_trailing_comma() {
        let header = build_header("<i4", &[5]).unwrap();
        assert_eq!(header.len(), 128);
        assert!(dict_text(&header)
            .starts_with("{'descr': '<i4', 'fortran_order': False, 'shape': (5,)}"));
        assert_eq!(*header.last().unwrap(), b'\n');
    }

    #[test]
    fn test_two_dimensional_shape_has_no_trailing_comma() {
        let header = build_header("<f4", &[3, 2]).unwrap();
        assert_eq!(header.len(), 128);
        assert!(dict_text(&header)
            .starts_with("{'descr': '<f4', 'fortran_order': False, 'shape': (3,2)} "));
        // header_len field holds the dict length
        assert_eq!(u16::from_le_bytes([header[8], header[9]]), 118);
    }

    #[test]
    fn test_preamble() {
        let header = build_header("|u1", &[1]).unwrap();
        assert_eq!(&header[..6], NPY_MAGIC);
        assert_eq!(header[6], 1);
        assert_eq!(header[7], 0);
        assert_eq!(u16::from_le_bytes([header[8], header[9]]), 118);
    }

    #[test]
    fn test_only_one_newline_and_space_padding() {
        let header = build_header("<c16", &[10, 20, 30, 40]).unwrap();
        let text = dict_text(&header);
        assert_eq!(text.matches('\n').count(), 1);
        let body_end = text.find('}').unwrap() + 1;
        assert!(text[body_end..text.len() - 1].chars().all(|c| c == ' '));
        assert_eq!(header.len() % NPY_ARRAY_ALIGN, 0);
    }

    #[test]
    fn test_exact_fit_gets_a_full_block_of_padding() {
        // 10 + 117 + 1 == 128: the dict alone would already end on a boundary
        let mut shape = vec![10usize];
        shape.extend(std::iter::repeat(1).take(31));
        let header = build_header("<f8", &shape).unwrap();

        assert_eq!(header.len(), 192);
        assert_eq!(u16::from_le_bytes([header[8], header[9]]), 182);

        let text = dict_text(&header);
        let body_end = text.find('}').unwrap() + 1;
        assert_eq!(body_end, 117);
        assert_eq!(&text[body_end..], format!("{}\n", " ".repeat(64)));
    }

    #[test]
    fn test_empty_shape_is_rejected() {
        assert!(matches!(
            build_header("<f8", &[]),
            Err(NpzError::InvalidShape)
        ));
    }

    #[test]
    fn test_huge_header_is_internal_fault() {
        let shape = vec![1usize; 40_000];
        assert!(matches!(
            build_header("<f8", &shape),
            Err(NpzError::Internal(_))
        ));
    }
}
