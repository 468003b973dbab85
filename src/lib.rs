//! Aura - audio enhancement engine
//!
//! Runs an audio file through a configurable multi-stage pipeline: AI
//! vocal/instrumental separation, three-band EQ, noise gate, compressor,
//! silence trim, and normalization.
//!
//! # Architecture
//!
//! - `audio`: sample buffers and WAV/FLAC codecs
//! - `stage`: the six stage transforms, each pure buffer-to-buffer
//! - `separation`: the inference boundary (demucs backend plus a mock)
//! - `engine`: chunk planning, the parallel executor, stitching, progress,
//!   and cancellation
//!
//! Long inputs are split into overlapping chunks processed across cores,
//! crossfaded back together, then finished with the whole-buffer stages.

pub mod audio;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod separation;
pub mod stage;

pub use audio::SampleBuffer;
pub use config::EnhanceConfig;
pub use engine::{Engine, JobHandle, JobOutcome, PipelineSpec};
pub use error::{AuraError, Result};
