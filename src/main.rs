//! scriptmin - build-time script bundler for HTML templates.

mod asset;
mod cli;
mod config;
mod logger;
mod pipeline;
mod template;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::PipelineConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    logger::set_verbose(cli.verbose());
    if let Commands::Build { build_args } = &cli.command {
        logger::set_quiet(build_args.quiet);
    }

    let config = PipelineConfig::load(&cli)?;

    match &cli.command {
        Commands::Build { .. } => {
            let report = cli::build::build_templates(&config)?;
            if !report.is_success() {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Scan { args } => cli::scan::run_scan(args, &config),
    }
}
