//! Command-line interface
//!
//! Subcommands for running an enhancement job, inspecting a file, and
//! checking GPU availability.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::info;

use crate::audio::{io, OutputFormat};
use crate::config::EnhanceConfig;
use crate::engine::{Engine, JobOutcome, PipelineSpec};
use crate::error::{AuraError, Result};
use crate::separation::{GpuInfo, MockSeparator, Separator};

/// Aura - audio enhancement engine
#[derive(Parser, Debug)]
#[command(name = "aura")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the enhancement pipeline over an audio file
    Enhance {
        /// Input WAV file
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format (wav or flac); inferred from the output
        /// extension when omitted
        #[arg(short, long)]
        format: Option<String>,

        /// Force single-chunk execution
        #[arg(long)]
        no_parallel: bool,

        /// Halve the chunk budget and use the lighter separation model
        #[arg(long)]
        low_ram: bool,

        /// Use the deterministic mock separator instead of demucs
        #[arg(long)]
        mock_separator: bool,
    },

    /// Print duration, rate, channels, and levels for an audio file
    Inspect {
        /// Input WAV file
        input: PathBuf,
    },

    /// Report detected GPU state
    GpuStatus,
}

pub fn enhance(
    input: &Path,
    output: &Path,
    config_path: Option<&Path>,
    format: Option<&str>,
    no_parallel: bool,
    low_ram: bool,
    mock_separator: bool,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => EnhanceConfig::load(path)?,
        None => EnhanceConfig::default(),
    };
    if no_parallel {
        config.engine.parallel_enabled = false;
    }
    if low_ram {
        config.engine.low_ram_mode = true;
    }

    let format = match format {
        Some(name) => OutputFormat::parse(name)?,
        None => output
            .extension()
            .and_then(|ext| ext.to_str())
            .map(OutputFormat::parse)
            .transpose()?
            .unwrap_or(OutputFormat::Wav),
    };

    let buffer = io::decode_wav(input)?;
    info!(
        "loaded {}: {:.1}s, {} ch, {} Hz",
        input.display(),
        buffer.duration_secs(),
        buffer.num_channels(),
        buffer.sample_rate()
    );

    let pipeline = PipelineSpec::from_config(&config)?;
    let separator: Arc<dyn Separator> = if mock_separator {
        Arc::new(MockSeparator::new())
    } else {
        Arc::new(crate::separation::DemucsCli::new())
    };
    let engine = Engine::with_separator(config.engine.clone(), separator);

    let handle = engine.submit(pipeline, buffer)?;
    for event in handle.progress().iter() {
        println!("[{:>5.1}%] {}", event.fraction * 100.0, event.stage);
    }

    match handle.wait() {
        JobOutcome::Completed(enhanced) => {
            io::encode(&enhanced, format, output)?;
            println!("Wrote {}", output.display());
            Ok(())
        }
        JobOutcome::Cancelled => Err(AuraError::Cancelled),
        JobOutcome::Failed(err) => Err(err),
    }
}

pub fn inspect(input: &Path) -> Result<()> {
    let buffer = io::decode_wav(input)?;
    println!("File:       {}", input.display());
    println!("Duration:   {:.2} s", buffer.duration_secs());
    println!("Rate:       {} Hz", buffer.sample_rate());
    println!("Channels:   {}", buffer.num_channels());
    println!("Peak:       {:.2} dBFS", buffer.peak_db());
    println!("RMS:        {:.2} dBFS", buffer.rms_db());
    Ok(())
}

pub fn gpu_status() -> Result<()> {
    match GpuInfo::detect() {
        Some(gpu) => {
            println!("GPU: {}", gpu.summary());
            println!(
                "Separation on GPU: {}",
                if gpu.usable { "available" } else { "insufficient free VRAM" }
            );
        }
        None => println!("No compatible GPU detected; separation runs on CPU"),
    }
    Ok(())
}
