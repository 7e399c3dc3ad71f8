// Archives written by npz-stream must be readable by other ZIP and NPY readers.

use npz_stream::{Complex, CompressionMethod, EntryOptions, NpzWriter, WriterOptions};
use std::io::{Cursor, Read};

fn read_entry(archive: &mut zip::ZipArchive<Cursor<Vec<u8>>>, name: &str) -> Vec<u8> {
    let mut file = archive.by_name(name).unwrap();
    let mut data = Vec::new();
    // zip verifies the CRC-32 once the entry is read to the end
    file.read_to_end(&mut data).unwrap();
    data
}

fn read_npy(archive: &mut zip::ZipArchive<Cursor<Vec<u8>>>, name: &str) -> npyz::NpyFile<Cursor<Vec<u8>>> {
    npyz::NpyFile::new(Cursor::new(read_entry(archive, name))).unwrap()
}

fn write_sample(options: WriterOptions) -> Vec<u8> {
    let mut npz = NpzWriter::from_writer_with_options(Vec::new(), options);
    npz.add_array("ints", &[1i64, 2, 3, 4], &[4]).unwrap();
    npz.add_array("floats", &[1.0f64, 2.0], &[2, 1]).unwrap();
    npz.add_array(
        "complex",
        &[Complex::new(1.0f64, -1.0), Complex::new(0.5, 2.5)],
        &[2],
    )
    .unwrap();
    npz.add_array("bytes", &[-1i8, 0, 1, 2, 3, 4], &[2, 3]).unwrap();
    npz.add_file("notes.txt", b"written by npz-stream\n").unwrap();
    npz.finish().unwrap()
}

fn check_sample(bytes: Vec<u8>, expected_method: zip::CompressionMethod) {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.len(), 5);
    for i in 0..archive.len() {
        assert_eq!(archive.by_index(i).unwrap().compression(), expected_method);
    }

    let ints = read_npy(&mut archive, "ints.npy");
    assert_eq!(ints.shape(), &[4]);
    assert_eq!(ints.into_vec::<i64>().unwrap(), vec![1, 2, 3, 4]);

    let floats = read_npy(&mut archive, "floats.npy");
    assert_eq!(floats.shape(), &[2, 1]);
    assert_eq!(floats.into_vec::<f64>().unwrap(), vec![1.0, 2.0]);

    let complex = read_npy(&mut archive, "complex.npy");
    assert_eq!(complex.shape(), &[2]);
    assert_eq!(
        complex.into_vec::<Complex<f64>>().unwrap(),
        vec![Complex::new(1.0, -1.0), Complex::new(0.5, 2.5)]
    );

    let small = read_npy(&mut archive, "bytes.npy");
    assert_eq!(small.shape(), &[2, 3]);
    assert_eq!(small.into_vec::<i8>().unwrap(), vec![-1, 0, 1, 2, 3, 4]);

    assert_eq!(
        read_entry(&mut archive, "notes.txt"),
        b"written by npz-stream\n"
    );
}

#[test]
fn test_stored_archive_is_readable() {
    check_sample(
        write_sample(WriterOptions::default()),
        zip::CompressionMethod::Stored,
    );
}

#[test]
fn test_deflated_archive_is_readable() {
    let options = WriterOptions::default().with_compression(CompressionMethod::Deflate);
    check_sample(write_sample(options), zip::CompressionMethod::Deflated);
}

#[test]
fn test_best_compression_archive_is_readable() {
    let options = WriterOptions::default()
        .with_compression(CompressionMethod::Deflate)
        .with_compression_level(9);
    check_sample(write_sample(options), zip::CompressionMethod::Deflated);
}

#[test]
fn test_mixed_compression_and_large_array() {
    let values: Vec<f32> = (0..250_000).map(|i| (i % 1000) as f32).collect();
    let mut npz = NpzWriter::from_writer(Vec::new());
    let compressed = npz
        .add_array_with(
            "big",
            &values,
            &[500, 500],
            EntryOptions::new().compression(CompressionMethod::Deflate),
        )
        .unwrap();
    let stored = npz.add_array("small", &[7u32; 3], &[3]).unwrap();
    let bytes = npz.finish().unwrap();

    assert!(compressed < 1_000_000);
    assert_eq!(stored, 128 + 12);

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.by_name("big.npy").unwrap().compressed_size(), compressed);
    let big = read_npy(&mut archive, "big.npy");
    assert_eq!(big.shape(), &[500, 500]);
    assert_eq!(big.into_vec::<f32>().unwrap(), values);

    let small = read_npy(&mut archive, "small.npy");
    assert_eq!(small.into_vec::<u32>().unwrap(), vec![7, 7, 7]);
}

#[test]
fn test_incompressible_array_at_fast_level() {
    let mut state = 0x9e37_79b9u32;
    let noise: Vec<u32> = (0..262_144)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state
        })
        .collect();

    let options = WriterOptions::default()
        .with_compression(CompressionMethod::Deflate)
        .with_compression_level(1);
    let mut npz = NpzWriter::from_writer_with_options(Vec::new(), options);
    npz.add_array("noise", &noise, &[512, 512]).unwrap();
    let bytes = npz.finish().unwrap();

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let array = read_npy(&mut archive, "noise.npy");
    assert_eq!(array.shape(), &[512, 512]);
    assert_eq!(array.into_vec::<u32>().unwrap(), noise);
}
