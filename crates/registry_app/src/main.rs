mod cli;
mod platform;

use std::path::Path;

use clap::Parser;
use log::LevelFilter;
use registry_logging::DEFAULT_LOG_FILE;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    registry_logging::initialize(cli.log.into(), level, Path::new(DEFAULT_LOG_FILE));
    platform::run(cli)
}
