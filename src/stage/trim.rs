//! Silence trimming
//!
//! Finds runs of frames whose peak stays below a dB floor for at least a
//! minimum duration and removes the excess, keeping a short guard interval
//! at both edges of each removed run so cuts never land flush against
//! audible material.

use serde::{Deserialize, Serialize};

use super::db_to_linear;
use crate::audio::SampleBuffer;
use crate::error::{AuraError, Result};

/// Guard interval preserved at each edge of a removed run, in ms
const KEEP_MS: f64 = 100.0;

/// Silence trim parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimParams {
    /// Minimum silence run length eligible for trimming, in ms (> 0)
    pub min_silence_ms: f64,
    /// Level below which a frame counts as silence, in dBFS
    pub floor_db: f32,
}

impl Default for TrimParams {
    fn default() -> Self {
        Self {
            min_silence_ms: 500.0,
            floor_db: -50.0,
        }
    }
}

impl TrimParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_silence_ms > 0.0 && self.min_silence_ms.is_finite()) {
            return Err(AuraError::InvalidParameter {
                stage: "trim",
                param: "min_silence_ms",
                value: self.min_silence_ms.to_string(),
                expected: "> 0 ms",
            });
        }
        if self.floor_db.is_nan() || self.floor_db > 0.0 {
            return Err(AuraError::InvalidParameter {
                stage: "trim",
                param: "floor_db",
                value: self.floor_db.to_string(),
                expected: "<= 0 dBFS",
            });
        }
        Ok(())
    }
}

/// Apply silence trimming, producing a new (possibly shorter) buffer
pub fn apply(buffer: &SampleBuffer, params: &TrimParams) -> Result<SampleBuffer> {
    params.validate()?;

    let sample_rate = buffer.sample_rate();
    let channels = buffer.num_channels();
    let frames = buffer.num_frames();
    let floor = db_to_linear(params.floor_db);
    let min_run = ((params.min_silence_ms / 1000.0) * sample_rate as f64) as usize;
    let keep = ((KEEP_MS / 1000.0) * sample_rate as f64) as usize;

    let mut drop = vec![false; frames];
    let mut run_start: Option<usize> = None;

    let mut mark_run = |drop: &mut Vec<bool>, start: usize, end: usize| {
        // Remove only the middle of the run, leaving `keep` frames at
        // both edges; runs shorter than min_run (or the guards) survive.
        if end - start >= min_run && end - start > 2 * keep {
            for flag in &mut drop[start + keep..end - keep] {
                *flag = true;
            }
        }
    };

    for frame in 0..frames {
        let mut peak: f32 = 0.0;
        for ch in 0..channels {
            if let Some(sample) = buffer.get(frame, ch) {
                peak = peak.max(sample.abs());
            }
        }
        if peak < floor {
            if run_start.is_none() {
                run_start = Some(frame);
            }
        } else if let Some(start) = run_start.take() {
            mark_run(&mut drop, start, frame);
        }
    }
    if let Some(start) = run_start {
        mark_run(&mut drop, start, frames);
    }

    let kept = drop.iter().filter(|d| !**d).count();
    if kept == frames {
        return Ok(buffer.clone());
    }

    let mut out = SampleBuffer::new(channels, kept, sample_rate);
    let mut write = 0;
    for (frame, dropped) in drop.iter().enumerate() {
        if *dropped {
            continue;
        }
        for ch in 0..channels {
            if let Some(sample) = buffer.get(frame, ch) {
                out.set(write, ch, sample);
            }
        }
        write += 1;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// tone / silence / tone, each segment `secs` long
    fn tone_gap_tone(secs: f64, rate: u32) -> SampleBuffer {
        let seg = (secs * rate as f64) as usize;
        let mut buf = SampleBuffer::new(1, seg * 3, rate);
        for i in 0..seg * 3 {
            let t = i as f32 / rate as f32;
            let amp = if i < seg || i >= 2 * seg { 0.5 } else { 0.0 };
            buf.set(i, 0, (2.0 * std::f32::consts::PI * 440.0 * t).sin() * amp);
        }
        buf
    }

    #[test]
    fn test_long_gap_is_shortened() {
        let rate = 44100;
        let buf = tone_gap_tone(2.0, rate);
        let out = apply(&buf, &TrimParams::default()).unwrap();

        // 2 s gap collapses to the two 100 ms guards
        let expected = buf.num_frames() - (2 * rate as usize) + 2 * (rate as usize / 10);
        // Zero crossings next to the gap may widen the detected run by a
        // frame or two on each side
        let diff = (out.num_frames() as i64 - expected as i64).abs();
        assert!(diff <= 8, "expected ~{} frames, got {}", expected, out.num_frames());
    }

    #[test]
    fn test_short_gap_survives() {
        let rate = 44100;
        // 200 ms gap below the 500 ms minimum
        let buf = tone_gap_tone(0.2, rate);
        let out = apply(&buf, &TrimParams::default()).unwrap();
        assert_eq!(out.num_frames(), buf.num_frames());
    }

    #[test]
    fn test_no_silence_is_noop() {
        let rate = 44100;
        let mut buf = SampleBuffer::new(1, rate as usize, rate);
        for i in 0..rate as usize {
            let t = i as f32 / rate as f32;
            buf.set(i, 0, (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5);
        }
        let out = apply(&buf, &TrimParams::default()).unwrap();
        assert_eq!(out.samples(), buf.samples());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = TrimParams {
            min_silence_ms: 0.0,
            ..TrimParams::default()
        };
        assert!(params.validate().is_err());
        let params = TrimParams {
            floor_db: 1.0,
            ..TrimParams::default()
        };
        assert!(params.validate().is_err());
    }
}
