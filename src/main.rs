//! Control naming tool binary

use std::process;

fn main() {
    let mut cli = ctlfix::Cli::new();

    if let Err(e) = cli.run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
