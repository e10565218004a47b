//! duckpage CLI entry point
//!
//! Parses arguments and delegates to `cli::run`. Failures are printed to
//! stderr with a non-zero exit.

use duckpage::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
