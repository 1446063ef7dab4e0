//! csvgather CLI: gather typed CSV rows from a version/date directory tree into one file.

use anyhow::Result;
use clap::Parser;
use csvgather::engine::arg_parser::Cli;
use csvgather::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
