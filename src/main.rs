use clap::Parser;
use psgmml::config::{parse_address, DEFAULT_CAPACITY};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "psgmml")]
#[command(version = "0.1.0")]
#[command(about = "MML to PSG driver bytecode compiler", long_about = None)]
struct Args {
    /// Input MML file
    input: PathBuf,

    /// Output image file
    output: PathBuf,

    /// Load address of the image (decimal, 0x hex or 0 octal)
    #[arg(short, long, value_parser = parse_address, default_value = "0")]
    base: u16,

    /// Maximum bytecode size per channel
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Report ignored lines and channel sizes
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), psgmml::Error> {
    let args = Args::parse();

    let config = psgmml::CompilerConfig {
        capacity: args.capacity,
        base_address: args.base,
        verbose: args.verbose,
    };
    let mut compiler = psgmml::Compiler::new(config);

    match compiler.compile_file(&args.input, &args.output) {
        Err(psgmml::Error::Compile { diagnostics }) => {
            for diagnostic in &diagnostics {
                eprintln!("{}", diagnostic);
            }
            eprintln!("{} error(s), no output written", diagnostics.len());
            std::process::exit(1);
        }
        result => result,
    }
}
