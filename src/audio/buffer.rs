//! Sample buffer type shared by all pipeline stages

use crate::error::{AuraError, Result};

/// Interleaved audio buffer
///
/// Samples are stored in interleaved format: [L0, R0, L1, R1, ...]
/// This matches common audio file formats and simplifies I/O.
///
/// Sample rate and channel count stay constant through a pipeline run;
/// only the separation stage is allowed to remix, and it does so by
/// constructing a new buffer with the updated layout.
#[derive(Clone, Debug)]
pub struct SampleBuffer {
    /// Interleaved sample data
    samples: Vec<f32>,
    /// Number of channels (1 = mono, 2 = stereo)
    num_channels: usize,
    /// Sample rate in Hz
    sample_rate: u32,
}

impl SampleBuffer {
    /// Create a silent buffer with the given shape
    pub fn new(num_channels: usize, num_frames: usize, sample_rate: u32) -> Self {
        Self {
            samples: vec![0.0; num_channels * num_frames],
            num_channels,
            sample_rate,
        }
    }

    /// Create a buffer from existing interleaved samples
    pub fn from_interleaved(
        samples: Vec<f32>,
        num_channels: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        if num_channels == 0 {
            return Err(AuraError::UnsupportedFormat {
                format: "0-channel audio".to_string(),
            });
        }
        if samples.len() % num_channels != 0 {
            return Err(AuraError::Decode {
                path: String::new(),
                reason: format!(
                    "sample count {} is not divisible by channel count {}",
                    samples.len(),
                    num_channels
                ),
            });
        }
        Ok(Self {
            samples,
            num_channels,
            sample_rate,
        })
    }

    /// Number of channels
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (samples per channel)
    pub fn num_frames(&self) -> usize {
        self.samples.len() / self.num_channels
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.num_frames() as f64 / self.sample_rate as f64
    }

    /// True if the buffer holds no frames
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// All interleaved samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// All interleaved samples, mutable
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Get a sample at the given frame and channel
    pub fn get(&self, frame: usize, channel: usize) -> Option<f32> {
        if frame < self.num_frames() && channel < self.num_channels {
            Some(self.samples[frame * self.num_channels + channel])
        } else {
            None
        }
    }

    /// Set a sample at the given frame and channel
    pub fn set(&mut self, frame: usize, channel: usize, value: f32) {
        if frame < self.num_frames() && channel < self.num_channels {
            self.samples[frame * self.num_channels + channel] = value;
        }
    }

    /// Copy a contiguous frame range into a new buffer
    ///
    /// `end_frame` is exclusive and clamped to the buffer length.
    pub fn slice_frames(&self, start_frame: usize, end_frame: usize) -> Self {
        let end = end_frame.min(self.num_frames());
        let start = start_frame.min(end);
        Self {
            samples: self.samples[start * self.num_channels..end * self.num_channels].to_vec(),
            num_channels: self.num_channels,
            sample_rate: self.sample_rate,
        }
    }

    /// Peak absolute sample value across all channels (linear)
    pub fn peak(&self) -> f32 {
        self.samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
    }

    /// Peak level in dBFS across all channels
    pub fn peak_db(&self) -> f64 {
        let peak = self.peak();
        if peak > 0.0 {
            20.0 * (peak as f64).log10()
        } else {
            f64::NEG_INFINITY
        }
    }

    /// RMS level in dBFS across all channels
    pub fn rms_db(&self) -> f64 {
        if self.samples.is_empty() {
            return f64::NEG_INFINITY;
        }
        let sum_sq: f64 = self.samples.iter().map(|&s| (s as f64).powi(2)).sum();
        let rms = (sum_sq / self.samples.len() as f64).sqrt();
        if rms > 0.0 {
            20.0 * rms.log10()
        } else {
            f64::NEG_INFINITY
        }
    }

    /// Check the buffer contains valid audio (no NaN/Inf)
    pub fn is_valid(&self) -> bool {
        self.samples.iter().all(|s| s.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer() {
        let buf = SampleBuffer::new(2, 1000, 44100);
        assert_eq!(buf.num_channels(), 2);
        assert_eq!(buf.num_frames(), 1000);
        assert_eq!(buf.sample_rate(), 44100);
    }

    #[test]
    fn test_get_set() {
        let mut buf = SampleBuffer::new(2, 100, 44100);
        buf.set(0, 0, 0.5);
        buf.set(0, 1, -0.5);
        assert_eq!(buf.get(0, 0), Some(0.5));
        assert_eq!(buf.get(0, 1), Some(-0.5));
        assert_eq!(buf.get(100, 0), None);
    }

    #[test]
    fn test_from_interleaved_rejects_ragged_data() {
        assert!(SampleBuffer::from_interleaved(vec![0.0; 5], 2, 44100).is_err());
        assert!(SampleBuffer::from_interleaved(vec![0.0; 6], 2, 44100).is_ok());
    }

    #[test]
    fn test_rms_db_of_sine() {
        let mut buf = SampleBuffer::new(1, 44100, 44100);
        for i in 0..44100 {
            let t = i as f32 / 44100.0;
            buf.set(i, 0, (2.0 * std::f32::consts::PI * 440.0 * t).sin());
        }
        // RMS of a unity sine is 1/sqrt(2) = -3.01 dB
        assert!((buf.rms_db() - (-3.01)).abs() < 0.1);
    }

    #[test]
    fn test_slice_frames() {
        let mut buf = SampleBuffer::new(2, 10, 48000);
        buf.set(4, 0, 1.0);
        let slice = buf.slice_frames(4, 8);
        assert_eq!(slice.num_frames(), 4);
        assert_eq!(slice.get(0, 0), Some(1.0));
        // End clamped to buffer length
        assert_eq!(buf.slice_frames(8, 20).num_frames(), 2);
    }

    #[test]
    fn test_is_valid() {
        let mut buf = SampleBuffer::new(1, 100, 44100);
        assert!(buf.is_valid());
        buf.set(50, 0, f32::NAN);
        assert!(!buf.is_valid());
    }
}
