//! Noise gate
//!
//! Attenuates material below a threshold toward silence. An envelope
//! follower tracks the per-frame peak and the applied gain is smoothed
//! with the configured attack/release times so the gate never steps the
//! signal faster than the envelope's slope allows (no clicks).

use serde::{Deserialize, Serialize};

use super::{db_to_linear, smoothing_coefficient};
use crate::audio::SampleBuffer;
use crate::error::{AuraError, Result};

/// Closed-gate attenuation in dB
const RANGE_DB: f32 = -80.0;
/// Fast envelope detector attack in ms
const DETECTOR_ATTACK_MS: f32 = 0.1;
/// Envelope detector release in ms
const DETECTOR_RELEASE_MS: f32 = 50.0;

/// Gate parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct GateParams {
    /// Open threshold in dBFS; negative infinity disables the gate
    pub threshold_db: f32,
    /// Gain smoothing time when opening, in ms (>= 0)
    pub attack_ms: f32,
    /// Gain smoothing time when closing, in ms (>= 0)
    pub release_ms: f32,
}

impl Default for GateParams {
    fn default() -> Self {
        Self {
            threshold_db: -40.0,
            attack_ms: 5.0,
            release_ms: 100.0,
        }
    }
}

impl GateParams {
    pub fn validate(&self) -> Result<()> {
        // -inf is the documented no-op threshold, so only reject NaN/+inf
        if self.threshold_db.is_nan() || self.threshold_db > 0.0 {
            return Err(AuraError::InvalidParameter {
                stage: "gate",
                param: "threshold_db",
                value: self.threshold_db.to_string(),
                expected: "<= 0 dBFS",
            });
        }
        if !(self.attack_ms >= 0.0 && self.attack_ms.is_finite()) {
            return Err(AuraError::InvalidParameter {
                stage: "gate",
                param: "attack_ms",
                value: self.attack_ms.to_string(),
                expected: ">= 0 ms",
            });
        }
        if !(self.release_ms >= 0.0 && self.release_ms.is_finite()) {
            return Err(AuraError::InvalidParameter {
                stage: "gate",
                param: "release_ms",
                value: self.release_ms.to_string(),
                expected: ">= 0 ms",
            });
        }
        Ok(())
    }
}

/// Apply the noise gate, producing a new buffer
pub fn apply(buffer: &SampleBuffer, params: &GateParams) -> Result<SampleBuffer> {
    params.validate()?;

    // Threshold at or below the range floor can never close the gate
    if params.threshold_db == f32::NEG_INFINITY || params.threshold_db <= RANGE_DB {
        return Ok(buffer.clone());
    }

    let sample_rate = buffer.sample_rate();
    let threshold = db_to_linear(params.threshold_db);
    let floor = db_to_linear(RANGE_DB);
    let det_attack = smoothing_coefficient(DETECTOR_ATTACK_MS, sample_rate);
    let det_release = smoothing_coefficient(DETECTOR_RELEASE_MS, sample_rate);
    let gain_attack = smoothing_coefficient(params.attack_ms, sample_rate);
    let gain_release = smoothing_coefficient(params.release_ms, sample_rate);

    let mut out = buffer.clone();
    let channels = out.num_channels();
    let frames = out.num_frames();

    let mut envelope: f32 = 0.0;
    // Start open if the first frame is above threshold so a hot input
    // does not fade in from silence
    let mut gain: f32 = 1.0;

    for frame in 0..frames {
        let mut peak: f32 = 0.0;
        for ch in 0..channels {
            if let Some(sample) = out.get(frame, ch) {
                peak = peak.max(sample.abs());
            }
        }

        // Peak detector: fast attack, slower release
        if peak > envelope {
            envelope = det_attack * envelope + (1.0 - det_attack) * peak;
        } else {
            envelope = det_release * envelope + (1.0 - det_release) * peak;
        }

        let target = if envelope > threshold { 1.0 } else { floor };
        if target > gain {
            gain = gain_attack * gain + (1.0 - gain_attack) * target;
        } else {
            gain = gain_release * gain + (1.0 - gain_release) * target;
        }

        for ch in 0..channels {
            if let Some(sample) = out.get(frame, ch) {
                out.set(frame, ch, sample * gain);
            }
        }
    }

    Ok(out)
}
