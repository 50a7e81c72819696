//! NMF to JSON converter

use clap::Parser;
use flate2::read::GzDecoder;
use noir::nmf::{NmfJson, NmfReader};
use std::fs::File;
use std::io::{self, Cursor, Read, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "nmf2json")]
#[command(version = "0.1.0")]
#[command(about = "Convert NMF files to JSON", long_about = None)]
struct Args {
    /// Input NMF file (may be gzip-compressed)
    input: PathBuf,

    /// Output JSON file (writes to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output compact JSON (default is pretty-printed)
    #[arg(short, long)]
    compact: bool,

    /// Reject files whose note table is not in canonical order
    #[arg(short, long)]
    strict: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Read input file
    let data = read_nmf_file(&args.input)?;

    // Parse NMF
    let mut reader = NmfReader::new(Cursor::new(data));
    let parsed = if args.strict {
        reader.parse_sorted()?
    } else {
        reader.parse()?
    };

    // Serialize to JSON
    let nmf_json = NmfJson::new(&parsed);
    let json_string = if args.compact {
        serde_json::to_string(&nmf_json)?
    } else {
        serde_json::to_string_pretty(&nmf_json)?
    };

    // Write output
    match args.output {
        Some(path) => {
            let mut file = File::create(path)?;
            file.write_all(json_string.as_bytes())?;
            file.write_all(b"\n")?;
        }
        None => {
            println!("{}", json_string);
        }
    }

    Ok(())
}

/// Read an NMF file, decompressing if necessary
fn read_nmf_file(path: &PathBuf) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;

    // Check if it's a gzip file by extension or magic
    let is_gzip = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);

    if is_gzip {
        let mut decoder = GzDecoder::new(file);
        let mut data = Vec::new();
        decoder.read_to_end(&mut data)?;
        Ok(data)
    } else {
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        // Check for gzip magic (0x1f 0x8b) even if extension doesn't indicate it
        if data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b {
            let cursor = Cursor::new(data);
            let mut decoder = GzDecoder::new(cursor);
            let mut decompressed = Vec::new();
            decoder.read_to_end(&mut decompressed)?;
            Ok(decompressed)
        } else {
            Ok(data)
        }
    }
}
