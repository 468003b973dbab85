//! 3-band parametric EQ
//!
//! Low/mid/high bands at fixed crossover frequencies (250 Hz and 4 kHz),
//! applied as cascaded biquad filters: a low shelf, a wide peak centered
//! between the crossovers, and a high shelf. Coefficients follow the
//! Audio EQ Cookbook (https://www.w3.org/2011/audio/audio-eq-cookbook.html).

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::audio::SampleBuffer;
use crate::error::{AuraError, Result};

/// Low band shelf corner in Hz
const LOW_CROSSOVER_HZ: f64 = 250.0;
/// High band shelf corner in Hz
const HIGH_CROSSOVER_HZ: f64 = 4000.0;
/// Mid peak center: geometric mean of the crossovers
const MID_CENTER_HZ: f64 = 1000.0;
/// Wide Q so the mid bell spans the whole 250 Hz - 4 kHz band
const MID_Q: f64 = 0.6;
const SHELF_Q: f64 = 0.707;

/// EQ band gains in dB, each bounded to [-24, +24]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EqParams {
    pub low_gain_db: f32,
    pub mid_gain_db: f32,
    pub high_gain_db: f32,
}

impl EqParams {
    pub fn validate(&self) -> Result<()> {
        for (param, value) in [
            ("low_gain_db", self.low_gain_db),
            ("mid_gain_db", self.mid_gain_db),
            ("high_gain_db", self.high_gain_db),
        ] {
            if !(-24.0..=24.0).contains(&value) || !value.is_finite() {
                return Err(AuraError::InvalidParameter {
                    stage: "eq",
                    param,
                    value: value.to_string(),
                    expected: "-24 to +24 dB",
                });
            }
        }
        Ok(())
    }
}

/// Normalized biquad coefficients (a0 divided out)
#[derive(Debug, Clone, Copy, Default)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    fn low_shelf(sample_rate: f64, frequency: f64, gain_db: f64, q: f64) -> Self {
        let (cos_w0, alpha, a) = prewarp(sample_rate, frequency, gain_db, q);
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
        Self::normalize(
            a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
            2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
            a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
            (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
            -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
            (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
        )
    }

    fn high_shelf(sample_rate: f64, frequency: f64, gain_db: f64, q: f64) -> Self {
        let (cos_w0, alpha, a) = prewarp(sample_rate, frequency, gain_db, q);
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
        Self::normalize(
            a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
            -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
            a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
            (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
            2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
            (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
        )
    }

    fn peak(sample_rate: f64, frequency: f64, gain_db: f64, q: f64) -> Self {
        let (cos_w0, alpha, a) = prewarp(sample_rate, frequency, gain_db, q);
        Self::normalize(
            1.0 + alpha * a,
            -2.0 * cos_w0,
            1.0 - alpha * a,
            1.0 + alpha / a,
            -2.0 * cos_w0,
            1.0 - alpha / a,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn normalize(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

fn prewarp(sample_rate: f64, frequency: f64, gain_db: f64, q: f64) -> (f64, f64, f64) {
    let freq = frequency.clamp(20.0, sample_rate / 2.0 - 1.0);
    let w0 = 2.0 * PI * freq / sample_rate;
    let alpha = w0.sin() / (2.0 * q);
    let a = 10.0_f64.powf(gain_db / 40.0);
    (w0.cos(), alpha, a)
}

/// Biquad delay line for one channel, Direct Form I
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    fn process(&mut self, input: f64, c: &BiquadCoeffs) -> f64 {
        let output = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2
            - c.a1 * self.y1
            - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }
}

/// Apply the 3-band EQ, producing a new buffer
pub fn apply(buffer: &SampleBuffer, params: &EqParams) -> Result<SampleBuffer> {
    params.validate()?;

    let sample_rate = buffer.sample_rate() as f64;
    let sections = [
        (
            params.low_gain_db,
            BiquadCoeffs::low_shelf(sample_rate, LOW_CROSSOVER_HZ, params.low_gain_db as f64, SHELF_Q),
        ),
        (
            params.mid_gain_db,
            BiquadCoeffs::peak(sample_rate, MID_CENTER_HZ, params.mid_gain_db as f64, MID_Q),
        ),
        (
            params.high_gain_db,
            BiquadCoeffs::high_shelf(sample_rate, HIGH_CROSSOVER_HZ, params.high_gain_db as f64, SHELF_Q),
        ),
    ];

    let mut out = buffer.clone();
    let channels = out.num_channels();
    let frames = out.num_frames();

    for (gain_db, coeffs) in sections {
        // A flat band is a bypass, not a filter pass
        if gain_db.abs() < 0.01 {
            continue;
        }
        let mut states = vec![BiquadState::default(); channels];
        for frame in 0..frames {
            for (ch, state) in states.iter_mut().enumerate() {
                let input = out.get(frame, ch).unwrap_or(0.0) as f64;
                out.set(frame, ch, state.process(input, &coeffs) as f32);
            }
        }
    }

    if !out.is_valid() {
        return Err(AuraError::Stage {
            stage: "eq",
            reason: "filter produced non-finite samples".to_string(),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, frames: usize, rate: u32) -> SampleBuffer {
        let mut buf = SampleBuffer::new(1, frames, rate);
        for i in 0..frames {
            let t = i as f32 / rate as f32;
            buf.set(i, 0, (2.0 * std::f32::consts::PI * freq * t).sin() * 0.25);
        }
        buf
    }

    #[test]
    fn test_flat_eq_is_identity() {
        let buf = sine(440.0, 4410, 44100);
        let out = apply(&buf, &EqParams::default()).unwrap();
        assert_eq!(out.samples(), buf.samples());
    }

    #[test]
    fn test_low_boost_raises_low_band() {
        let buf = sine(100.0, 44100, 44100);
        let params = EqParams {
            low_gain_db: 6.0,
            ..EqParams::default()
        };
        let out = apply(&buf, &params).unwrap();
        // A 100 Hz tone sits below the 250 Hz shelf corner and should gain ~6 dB
        assert!(out.rms_db() > buf.rms_db() + 4.0);
    }

    #[test]
    fn test_high_cut_leaves_low_band_alone() {
        let buf = sine(100.0, 44100, 44100);
        let params = EqParams {
            high_gain_db: -12.0,
            ..EqParams::default()
        };
        let out = apply(&buf, &params).unwrap();
        assert!((out.rms_db() - buf.rms_db()).abs() < 1.0);
    }

    #[test]
    fn test_gain_bounds_enforced() {
        let buf = sine(440.0, 441, 44100);
        let params = EqParams {
            mid_gain_db: 25.0,
            ..EqParams::default()
        };
        let err = apply(&buf, &params).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMETER");
    }

    #[test]
    fn test_preserves_shape() {
        let buf = sine(440.0, 4410, 44100);
        let params = EqParams {
            low_gain_db: 3.0,
            mid_gain_db: -3.0,
            high_gain_db: 3.0,
        };
        let out = apply(&buf, &params).unwrap();
        assert_eq!(out.num_frames(), buf.num_frames());
        assert_eq!(out.num_channels(), buf.num_channels());
        assert_eq!(out.sample_rate(), buf.sample_rate());
    }
}
