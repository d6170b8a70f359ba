use clap::Parser;
use portdex::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
