#![forbid(unsafe_code)]

use clap::Parser;
use mm_tools::cli::{execute, Cli};
use mm_tools::tracing_init::init_tracing;

fn main() {
    let cli = Cli::parse();
    if let Err(err) = init_tracing() {
        eprintln!("{err}");
        std::process::exit(2);
    }
    match execute(cli) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    }
}
