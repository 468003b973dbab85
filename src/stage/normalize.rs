//! Output loudness normalization.
//!
//! Scales the whole buffer so its peak (or RMS) level lands on a target.
//! Runs on the assembled output, never on individual chunks, because the
//! reference level must be measured over the full signal.

use serde::{Deserialize, Serialize};

use crate::audio::SampleBuffer;
use crate::error::{AuraError, Result};
use crate::stage::db_to_linear;

/// Which level measurement the target refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeMode {
    Peak,
    Rms,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeParams {
    /// Target level in dBFS. Must be at or below 0.
    pub target_db: f32,
    #[serde(default = "default_mode")]
    pub mode: NormalizeMode,
}

fn default_mode() -> NormalizeMode {
    NormalizeMode::Peak
}

impl Default for NormalizeParams {
    fn default() -> Self {
        Self {
            target_db: -3.0,
            mode: NormalizeMode::Peak,
        }
    }
}

impl NormalizeParams {
    pub fn validate(&self) -> Result<()> {
        if !self.target_db.is_finite() || self.target_db > 0.0 {
            return Err(AuraError::InvalidParameter {
                stage: "normalize",
                param: "target_db",
                value: self.target_db.to_string(),
                expected: "finite value <= 0 dBFS",
            });
        }
        Ok(())
    }
}

pub fn apply(buffer: &SampleBuffer, params: &NormalizeParams) -> Result<SampleBuffer> {
    params.validate()?;

    let peak = buffer.peak();
    if peak == 0.0 {
        // Silence has no level to normalize.
        return Ok(buffer.clone());
    }

    let target = db_to_linear(params.target_db);
    let scale = match params.mode {
        NormalizeMode::Peak => target / peak,
        NormalizeMode::Rms => {
            let rms = db_to_linear(buffer.rms_db() as f32);
            // Cap so boosted material still peaks at or below full scale.
            (target / rms).min(1.0 / peak)
        }
    };

    let samples: Vec<f32> = buffer.samples().iter().map(|s| s * scale).collect();
    SampleBuffer::from_interleaved(samples, buffer.num_channels(), buffer.sample_rate())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sine(amplitude: f32, frames: usize) -> SampleBuffer {
        let samples: Vec<f32> = (0..frames)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin())
            .collect();
        SampleBuffer::from_interleaved(samples, 1, 44100).unwrap()
    }

    #[test]
    fn peak_mode_hits_target() {
        let buf = sine(0.25, 44100);
        let params = NormalizeParams {
            target_db: -3.0,
            mode: NormalizeMode::Peak,
        };
        let out = apply(&buf, &params).unwrap();
        assert_relative_eq!(out.peak_db(), -3.0, epsilon = 0.05);
    }

    #[test]
    fn peak_mode_attenuates_hot_input() {
        let buf = sine(0.99, 44100);
        let out = apply(&buf, &NormalizeParams::default()).unwrap();
        assert!(out.peak() < buf.peak());
        assert_relative_eq!(out.peak_db(), -3.0, epsilon = 0.05);
    }

    #[test]
    fn rms_mode_never_clips() {
        // Quiet but peaky input. An uncapped RMS boost to -3 dB would push
        // the peaks well past full scale.
        let mut samples = vec![0.001f32; 44100];
        samples[1000] = 0.5;
        samples[2000] = -0.5;
        let buf = SampleBuffer::from_interleaved(samples, 1, 44100).unwrap();

        let params = NormalizeParams {
            target_db: -3.0,
            mode: NormalizeMode::Rms,
        };
        let out = apply(&buf, &params).unwrap();
        assert!(out.peak() <= 1.0 + 1e-6);
    }

    #[test]
    fn silent_input_is_untouched() {
        let buf = SampleBuffer::new(2, 1000, 44100);
        let out = apply(&buf, &NormalizeParams::default()).unwrap();
        assert_eq!(out.samples(), buf.samples());
    }

    #[test]
    fn positive_target_rejected() {
        let params = NormalizeParams {
            target_db: 1.0,
            mode: NormalizeMode::Peak,
        };
        assert!(matches!(
            apply(&sine(0.5, 100), &params),
            Err(AuraError::InvalidParameter { param: "target_db", .. })
        ));
    }
}
