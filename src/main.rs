mod exec;
mod data_area;
mod tokenizer;
mod cli_parser;
mod errors;

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};

use clap::error::ErrorKind;
use clap::Parser;
use cli_parser::CliParser;
use montylib::{Fault, EXIT_SUCCESS};
use tracing_subscriber::EnvFilter;


fn init_logging(verbose: bool) {

    let default_directive = if verbose { "monty=debug" } else { "monty=warn" };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directive))
        )
        .with_writer(io::stderr)
        .without_time()
        .init();
}


fn main() {

    let args = match CliParser::try_parse() {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => err.exit(),
        Err(_) => errors::fatal(&Fault::Usage),
    };

    init_logging(args.verbose);

    let file = File::open(&args.input_file)
        .unwrap_or_else(|_| errors::fatal(&Fault::FileOpen { path: args.input_file.display().to_string() }));

    let mut vm = exec::VM::new();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let result = vm.run(BufReader::new(file), &mut out);

    // Program output must reach stdout before any diagnostic reaches stderr
    let flushed = out.flush();

    if let Err(fault) = result {
        errors::fatal(&fault);
    }
    if let Err(err) = flushed {
        errors::fatal(&Fault::from(err));
    }

    std::process::exit(EXIT_SUCCESS);
}
