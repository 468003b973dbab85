//! Pipeline stages
//!
//! The six stage kinds form a closed variant type: each stage is a stateless
//! transform from one sample buffer to a new one, so a tagged enum with a
//! dispatch function keeps the pipeline builder simple and avoids open-ended
//! subclassing.

pub mod compressor;
pub mod eq;
pub mod gate;
pub mod normalize;
pub mod trim;

use serde::{Deserialize, Serialize};

use crate::audio::SampleBuffer;
use crate::error::Result;
use crate::separation::{SeparationSpec, Separator};

pub use compressor::CompressorParams;
pub use eq::EqParams;
pub use gate::GateParams;
pub use normalize::{NormalizeMode, NormalizeParams};
pub use trim::TrimParams;

/// One enabled stage with its validated parameters
///
/// Insertion order into a pipeline is execution order; the engine never
/// reorders stages on the caller's behalf.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageConfig {
    Separation(SeparationSpec),
    Eq(EqParams),
    NoiseGate(GateParams),
    Compressor(CompressorParams),
    SilenceTrim(TrimParams),
    Normalize(NormalizeParams),
}

impl StageConfig {
    /// Short label used in progress events and error messages
    pub fn label(&self) -> &'static str {
        match self {
            StageConfig::Separation(_) => "separation",
            StageConfig::Eq(_) => "eq",
            StageConfig::NoiseGate(_) => "gate",
            StageConfig::Compressor(_) => "compressor",
            StageConfig::SilenceTrim(_) => "trim",
            StageConfig::Normalize(_) => "normalize",
        }
    }

    /// Validate this stage's parameters against documented bounds
    pub fn validate(&self) -> Result<()> {
        match self {
            StageConfig::Separation(spec) => spec.validate(),
            StageConfig::Eq(p) => p.validate(),
            StageConfig::NoiseGate(p) => p.validate(),
            StageConfig::Compressor(p) => p.validate(),
            StageConfig::SilenceTrim(p) => p.validate(),
            StageConfig::Normalize(p) => p.validate(),
        }
    }

    /// True if the stage may run independently on a time chunk
    ///
    /// SilenceTrim changes the frame count and Normalize needs the global
    /// peak, so both must run on the stitched buffer, never per chunk.
    pub fn is_chunkable(&self) -> bool {
        !matches!(
            self,
            StageConfig::SilenceTrim(_) | StageConfig::Normalize(_)
        )
    }

    /// Relative cost weight for progress aggregation
    ///
    /// Separation dominates wall-clock time; trim and normalize are cheap
    /// single-pass scans that only get small fixed markers.
    pub fn progress_weight(&self) -> f64 {
        match self {
            StageConfig::Separation(_) => 12.0,
            StageConfig::Eq(_) | StageConfig::NoiseGate(_) | StageConfig::Compressor(_) => 1.0,
            StageConfig::SilenceTrim(_) | StageConfig::Normalize(_) => 0.5,
        }
    }

    /// Run this stage over a buffer, producing a new buffer
    pub fn apply(&self, buffer: &SampleBuffer, separator: &dyn Separator) -> Result<SampleBuffer> {
        match self {
            StageConfig::Separation(spec) => crate::separation::apply(buffer, spec, separator),
            StageConfig::Eq(p) => eq::apply(buffer, p),
            StageConfig::NoiseGate(p) => gate::apply(buffer, p),
            StageConfig::Compressor(p) => compressor::apply(buffer, p),
            StageConfig::SilenceTrim(p) => trim::apply(buffer, p),
            StageConfig::Normalize(p) => normalize::apply(buffer, p),
        }
    }
}

/// Convert decibels to a linear amplitude multiplier
#[inline]
pub(crate) fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels, floored at -120 dB
#[inline]
pub(crate) fn linear_to_db(linear: f32) -> f32 {
    if linear > 0.0 {
        20.0 * linear.log10()
    } else {
        -120.0
    }
}

/// One-pole smoothing coefficient from a time constant in milliseconds
#[inline]
pub(crate) fn smoothing_coefficient(time_ms: f32, sample_rate: u32) -> f32 {
    if time_ms <= 0.0 {
        return 0.0;
    }
    (-1.0 / (time_ms / 1000.0 * sample_rate as f32)).exp()
}
