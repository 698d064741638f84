//! Driver image to JSON converter

use clap::Parser;
use psgmml::driver::{Image, ImageJson};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "psgdump")]
#[command(version = "0.1.0")]
#[command(about = "Decode a PSG driver image to JSON", long_about = None)]
struct Args {
    /// Input image file
    input: PathBuf,

    /// Output JSON file (writes to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output compact JSON (default is pretty-printed)
    #[arg(short, long)]
    compact: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let data = std::fs::read(&args.input)?;
    let image = Image::parse(&data)?;
    let image_json = ImageJson::new(&image)?;

    let json_string = if args.compact {
        serde_json::to_string(&image_json)?
    } else {
        serde_json::to_string_pretty(&image_json)?
    };

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
