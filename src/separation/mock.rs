//! Mock separation backend for testing
//!
//! Does no real inference. Splits the signal deterministically between the
//! two stems so tests can verify routing, stitching, and progress behavior
//! with exact expectations.

use std::time::Duration;

use crate::audio::SampleBuffer;
use crate::error::Result;

use super::{Separated, SeparationSpec, Separator};

/// Deterministic stand-in for a real separation model.
///
/// Vocals receive half the input amplitude and the accompaniment gets the
/// remainder, so `vocals + accompaniment` reconstructs the input exactly.
#[derive(Debug, Default)]
pub struct MockSeparator {
    delay: Option<Duration>,
}

impl MockSeparator {
    pub fn new() -> Self {
        Self { delay: None }
    }

    /// Sleep for `delay` inside each `separate` call. Lets tests open a
    /// window for cancellation while a stage is in flight.
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay: Some(delay) }
    }
}

impl Separator for MockSeparator {
    fn separate(&self, buffer: &SampleBuffer, _spec: &SeparationSpec) -> Result<Separated> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let vocals_samples: Vec<f32> = buffer.samples().iter().map(|s| s * 0.5).collect();
        let accompaniment_samples: Vec<f32> = buffer
            .samples()
            .iter()
            .zip(&vocals_samples)
            .map(|(s, v)| s - v)
            .collect();

        Ok(Separated {
            vocals: SampleBuffer::from_interleaved(
                vocals_samples,
                buffer.num_channels(),
                buffer.sample_rate(),
            )?,
            accompaniment: SampleBuffer::from_interleaved(
                accompaniment_samples,
                buffer.num_channels(),
                buffer.sample_rate(),
            )?,
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stems_sum_to_input() {
        let buf = SampleBuffer::from_interleaved(vec![0.1, -0.4, 0.8, 0.0], 2, 44100).unwrap();
        let out = MockSeparator::new()
            .separate(&buf, &SeparationSpec::default())
            .unwrap();
        for i in 0..buf.samples().len() {
            let sum = out.vocals.samples()[i] + out.accompaniment.samples()[i];
            assert!((sum - buf.samples()[i]).abs() < 1e-7);
        }
    }

    #[test]
    fn preserves_layout() {
        let buf = SampleBuffer::new(2, 100, 48000);
        let out = MockSeparator::new()
            .separate(&buf, &SeparationSpec::default())
            .unwrap();
        assert_eq!(out.vocals.num_channels(), 2);
        assert_eq!(out.vocals.sample_rate(), 48000);
        assert_eq!(out.vocals.num_frames(), 100);
    }
}
