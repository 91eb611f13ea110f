use std::path::PathBuf;

use clap::Parser;


#[derive(Parser)]
#[clap(author, about, version)]
pub struct CliParser {

    /// The Monty bytecode file to interpret.
    #[clap(required = true)]
    pub input_file: PathBuf,

    /// Trace every dispatched instruction on stderr.
    #[clap(short='v', long)]
    pub verbose: bool,

}
