//! Aura CLI entry point

use clap::Parser;
use env_logger::Env;

use aura::cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    match cli.command {
        Commands::Enhance {
            input,
            output,
            config,
            format,
            no_parallel,
            low_ram,
            mock_separator,
        } => aura::cli::enhance(
            &input,
            &output,
            config.as_deref(),
            format.as_deref(),
            no_parallel,
            low_ram,
            mock_separator,
        )?,
        Commands::Inspect { input } => aura::cli::inspect(&input)?,
        Commands::GpuStatus => aura::cli::gpu_status()?,
    }
    Ok(())
}
