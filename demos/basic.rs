//! Basic usage example for npz-stream

use npz_stream::{CompressionMethod, EntryOptions, NpzWriter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== npz-stream Basic Example ===\n");

    // ".npz" is appended to the name
    println!("Creating example.npz...");
    let mut npz = NpzWriter::create("example")?;

    let size = npz.add_array("ones", &[1.0f32; 6], &[3, 2])?;
    println!("  ones.npy: {} bytes", size);

    let ramp: Vec<i64> = (0..10_000).collect();
    let size = npz.add_array_with(
        "ramp",
        &ramp,
        &[100, 100],
        EntryOptions::new().compression(CompressionMethod::Deflate),
    )?;
    println!("  ramp.npy: {} bytes (deflated from {})", size, ramp.len() * 8);

    npz.add_file("README.txt", b"Load with numpy.load('example.npz')\n")?;

    npz.close()?;
    if let Some(path) = npz.full_path() {
        println!("Created {} with {} entries", path.display(), npz.num_files());
    }

    Ok(())
}
