//! Dynamic range compressor
//!
//! Feed-forward design: a peak envelope follower drives a gain computer
//! that attenuates the dB excess over threshold by `1 - 1/ratio`, with an
//! optional quadratic soft knee. The math is stable for ratio -> infinity
//! (hard limiting); ratio is never a divisor of zero since it is bounded
//! below by 1.

use serde::{Deserialize, Serialize};

use super::{db_to_linear, linear_to_db, smoothing_coefficient};
use crate::audio::SampleBuffer;
use crate::error::{AuraError, Result};

/// Envelope attack in ms (fixed; fast enough for program material)
const ATTACK_MS: f32 = 5.0;
/// Envelope release in ms
const RELEASE_MS: f32 = 80.0;

/// Compressor parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorParams {
    /// Threshold in dBFS (<= 0)
    pub threshold_db: f32,
    /// Ratio, 1.0 (no-op) and up; infinity means hard limiting
    pub ratio: f32,
    /// Knee width in dB (>= 0; 0 = hard knee)
    pub knee_db: f32,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            threshold_db: -18.0,
            ratio: 4.0,
            knee_db: 6.0,
        }
    }
}

impl CompressorParams {
    pub fn validate(&self) -> Result<()> {
        if self.threshold_db.is_nan() || self.threshold_db > 0.0 {
            return Err(AuraError::InvalidParameter {
                stage: "compressor",
                param: "threshold_db",
                value: self.threshold_db.to_string(),
                expected: "<= 0 dBFS",
            });
        }
        // Infinity is a legal ratio (hard limiter)
        if self.ratio.is_nan() || self.ratio < 1.0 {
            return Err(AuraError::InvalidParameter {
                stage: "compressor",
                param: "ratio",
                value: self.ratio.to_string(),
                expected: ">= 1.0",
            });
        }
        if !(self.knee_db >= 0.0 && self.knee_db.is_finite()) {
            return Err(AuraError::InvalidParameter {
                stage: "compressor",
                param: "knee_db",
                value: self.knee_db.to_string(),
                expected: ">= 0 dB",
            });
        }
        Ok(())
    }
}

/// Gain reduction in dB (<= 0) for an input level in dB
fn gain_reduction_db(input_db: f32, params: &CompressorParams) -> f32 {
    let threshold = params.threshold_db;
    let ratio = params.ratio;
    let knee = params.knee_db;
    // 1 - 1/ratio; tends to 1.0 as ratio -> inf
    let slope = 1.0 - 1.0 / ratio;

    if knee > 0.0 {
        let knee_start = threshold - knee / 2.0;
        let knee_end = threshold + knee / 2.0;
        if input_db <= knee_start {
            0.0
        } else if input_db >= knee_end {
            -slope * (input_db - threshold)
        } else {
            // Quadratic interpolation through the knee region
            let over = input_db - knee_start;
            -slope * over * over / (2.0 * knee)
        }
    } else if input_db <= threshold {
        0.0
    } else {
        -slope * (input_db - threshold)
    }
}

/// Apply the compressor, producing a new buffer
pub fn apply(buffer: &SampleBuffer, params: &CompressorParams) -> Result<SampleBuffer> {
    params.validate()?;

    // ratio = 1 is a documented exact no-op
    if params.ratio == 1.0 {
        return Ok(buffer.clone());
    }

    let sample_rate = buffer.sample_rate();
    let attack = smoothing_coefficient(ATTACK_MS, sample_rate);
    let release = smoothing_coefficient(RELEASE_MS, sample_rate);

    let mut out = buffer.clone();
    let channels = out.num_channels();
    let frames = out.num_frames();
    let mut envelope: f32 = 0.0;

    for frame in 0..frames {
        let mut peak: f32 = 0.0;
        for ch in 0..channels {
            if let Some(sample) = out.get(frame, ch) {
                peak = peak.max(sample.abs());
            }
        }

        if peak > envelope {
            envelope = attack * envelope + (1.0 - attack) * peak;
        } else {
            envelope = release * envelope + (1.0 - release) * peak;
        }

        let gain = db_to_linear(gain_reduction_db(linear_to_db(envelope), params));
        for ch in 0..channels {
            if let Some(sample) = out.get(frame, ch) {
                out.set(frame, ch, sample * gain);
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn sine(amp: f32, frames: usize, rate: u32) -> SampleBuffer {
        let mut buf = SampleBuffer::new(1, frames, rate);
        for i in 0..frames {
            let t = i as f32 / rate as f32;
            buf.set(i, 0, (2.0 * std::f32::consts::PI * 440.0 * t).sin() * amp);
        }
        buf
    }

    #[test]
    fn test_ratio_one_is_noop() {
        let buf = sine(0.9, 44100, 44100);
        let params = CompressorParams {
            ratio: 1.0,
            ..CompressorParams::default()
        };
        let out = apply(&buf, &params).unwrap();
        assert_eq!(out.samples(), buf.samples());
    }

    #[test]
    fn test_reduces_loud_material() {
        let buf = sine(0.9, 44100, 44100);
        let out = apply(&buf, &CompressorParams::default()).unwrap();
        assert!(out.rms_db() < buf.rms_db() - 3.0);
    }

    #[test]
    fn test_below_threshold_untouched() {
        // -40 dB signal against a -18 dB threshold with a 6 dB knee
        let buf = sine(0.01, 44100, 44100);
        let out = apply(&buf, &CompressorParams::default()).unwrap();
        assert!((out.rms_db() - buf.rms_db()).abs() < 0.1);
    }

    #[test]
    fn test_infinite_ratio_limits() {
        let buf = sine(1.0, 44100, 44100);
        let params = CompressorParams {
            threshold_db: -20.0,
            ratio: f32::INFINITY,
            knee_db: 0.0,
        };
        let out = apply(&buf, &params).unwrap();
        assert!(out.is_valid());
        // Steady-state output should sit near the threshold
        let tail = out.slice_frames(22050, 44100);
        assert!(tail.peak_db() < -17.0);
    }

    #[test_case(0.0 ; "hard knee")]
    #[test_case(6.0 ; "soft knee")]
    #[test_case(12.0 ; "wide knee")]
    fn test_gain_computer_continuous(knee_db: f32) {
        let params = CompressorParams {
            threshold_db: -18.0,
            ratio: 4.0,
            knee_db,
        };
        // Sweep levels and check the reduction curve has no jumps
        let mut prev = gain_reduction_db(-60.0, &params);
        let mut level = -60.0f32;
        while level < 0.0 {
            let gr = gain_reduction_db(level, &params);
            assert!(gr <= 0.0);
            assert!((gr - prev).abs() < 0.2, "jump at {} dB", level);
            prev = gr;
            level += 0.1;
        }
    }

    #[test]
    fn test_invalid_ratio_rejected() {
        let params = CompressorParams {
            ratio: 0.5,
            ..CompressorParams::default()
        };
        assert!(params.validate().is_err());
    }
}
