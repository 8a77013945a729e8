//! burrow entry point.
//!
//! ```bash
//! cargo run -p burrow-cli -- --input hello tree.json
//! ```

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> Result<()> {
    // Logs go to stderr so stdout is only the terminal (respects RUST_LOG)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let code = burrow_cli::run(burrow_cli::Args::parse())?;
    std::process::exit(code);
}
