use std::process::ExitCode;

use clap::Parser;

use clutch_pbp::cli::{self, Cli};

fn main() -> ExitCode {
    env_logger::init();

    let args = Cli::parse();
    match cli::run(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
