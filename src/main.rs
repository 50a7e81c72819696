use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "noir")]
#[command(version = "0.1.0")]
#[command(about = "Noir notation to NMF compiler", long_about = None)]
struct Args {
    /// Input Noir source file (reads from stdin if not specified)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output NMF file (writes to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let mut compiler = noir::Compiler::new();

    let result = match (&args.input, &args.output) {
        (Some(input), Some(output)) => compiler.compile_file(input, output),
        (Some(input), None) => match std::fs::File::open(input) {
            Ok(file) => compiler.compile(io::BufReader::new(file), io::stdout().lock()),
            Err(e) => Err(e.into()),
        },
        (None, Some(output)) => match std::fs::File::create(output) {
            Ok(file) => compiler.compile(io::stdin().lock(), file),
            Err(e) => Err(e.into()),
        },
        (None, None) => compiler.compile(io::stdin().lock(), io::stdout().lock()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("noir: {}!", e);
            ExitCode::FAILURE
        }
    }
}
