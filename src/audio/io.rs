//! Audio file I/O
//!
//! WAV decode/encode via hound, FLAC encode via flacenc. Everything is
//! converted to 32-bit float on import; the engine never retries I/O, it
//! surfaces codec errors verbatim.

use std::io::Read;
use std::path::Path;

use flacenc::component::BitRepr;
use flacenc::error::Verify;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use serde::{Deserialize, Serialize};

use crate::audio::buffer::SampleBuffer;
use crate::error::{AuraError, Result};

/// Output container selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Uncompressed 16-bit PCM WAV
    #[default]
    Wav,
    /// Lossless-compressed FLAC (16-bit)
    Flac,
}

impl OutputFormat {
    /// File extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Wav => "wav",
            OutputFormat::Flac => "flac",
        }
    }

    /// Parse from a file extension or format name
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "wav" => Ok(OutputFormat::Wav),
            "flac" => Ok(OutputFormat::Flac),
            other => Err(AuraError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }
}

/// Decode a WAV file into a sample buffer
///
/// Supports 16/24/32-bit integer and 32-bit float PCM, mono or stereo.
pub fn decode_wav(path: &Path) -> Result<SampleBuffer> {
    if !path.exists() {
        return Err(AuraError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let reader = WavReader::open(path).map_err(|e| AuraError::Decode {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 || channels > 2 {
        return Err(AuraError::UnsupportedFormat {
            format: format!("{}-channel audio (only mono/stereo supported)", channels),
        });
    }

    let samples = read_samples_as_f32(reader, &spec, path)?;
    if samples.is_empty() {
        return Err(AuraError::EmptyAudio);
    }

    SampleBuffer::from_interleaved(samples, channels, spec.sample_rate)
}

fn read_samples_as_f32<R: Read>(
    reader: WavReader<R>,
    spec: &WavSpec,
    path: &Path,
) -> Result<Vec<f32>> {
    let decode_err = |e: hound::Error| AuraError::Decode {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .map(|s| s.map_err(decode_err))
            .collect(),
        (SampleFormat::Int, 16) => reader
            .into_samples::<i16>()
            .map(|s| s.map_err(decode_err).map(|v| v as f32 / 32768.0))
            .collect(),
        (SampleFormat::Int, 24) => reader
            .into_samples::<i32>()
            .map(|s| s.map_err(decode_err).map(|v| v as f32 / 8_388_608.0))
            .collect(),
        (SampleFormat::Int, 32) => reader
            .into_samples::<i32>()
            .map(|s| s.map_err(decode_err).map(|v| v as f32 / 2_147_483_648.0))
            .collect(),
        (format, bits) => Err(AuraError::UnsupportedFormat {
            format: format!("{:?} {}-bit WAV", format, bits),
        }),
    }
}

/// Encode a sample buffer to the given container at `path`
pub fn encode(buffer: &SampleBuffer, format: OutputFormat, path: &Path) -> Result<()> {
    match format {
        OutputFormat::Wav => encode_wav(buffer, path),
        OutputFormat::Flac => encode_flac(buffer, path),
    }
}

/// Write a buffer as 16-bit PCM WAV
pub fn encode_wav(buffer: &SampleBuffer, path: &Path) -> Result<()> {
    let encode_err = |reason: String| AuraError::Encode {
        path: path.display().to_string(),
        reason,
    };

    let spec = WavSpec {
        channels: buffer.num_channels() as u16,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec).map_err(|e| encode_err(e.to_string()))?;
    for &sample in buffer.samples() {
        let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
        writer
            .write_sample(scaled)
            .map_err(|e| encode_err(e.to_string()))?;
    }
    writer.finalize().map_err(|e| encode_err(e.to_string()))?;
    Ok(())
}

/// Write a buffer as 16-bit FLAC
pub fn encode_flac(buffer: &SampleBuffer, path: &Path) -> Result<()> {
    let encode_err = |reason: String| AuraError::Encode {
        path: path.display().to_string(),
        reason,
    };

    let samples: Vec<i32> = buffer
        .samples()
        .iter()
        .map(|&s| (s * 32767.0).clamp(-32768.0, 32767.0) as i32)
        .collect();

    let config = flacenc::config::Encoder::default()
        .into_verified()
        .map_err(|e| encode_err(format!("invalid encoder config: {:?}", e)))?;
    let source = flacenc::source::MemSource::from_samples(
        &samples,
        buffer.num_channels(),
        16,
        buffer.sample_rate() as usize,
    );
    let stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
        .map_err(|e| encode_err(format!("{:?}", e)))?;

    let mut sink = flacenc::bitsink::ByteSink::new();
    stream
        .write(&mut sink)
        .map_err(|e| encode_err(format!("{:?}", e)))?;
    std::fs::write(path, sink.as_slice())?;
    Ok(())
}

/// Resample a buffer to a new rate using linear interpolation
///
/// Good enough for matching a separation model's native rate back to the
/// pipeline's working rate; a sinc resampler would be the upgrade path.
pub fn resample(buffer: &SampleBuffer, target_rate: u32) -> SampleBuffer {
    if buffer.sample_rate() == target_rate || buffer.is_empty() {
        let mut out = buffer.clone();
        // Preserve declared rate even for empty buffers
        if buffer.is_empty() {
            out = SampleBuffer::new(buffer.num_channels(), 0, target_rate);
        }
        return out;
    }

    let channels = buffer.num_channels();
    let src_frames = buffer.num_frames();
    let ratio = target_rate as f64 / buffer.sample_rate() as f64;
    let dst_frames = ((src_frames as f64) * ratio).round() as usize;

    let mut out = SampleBuffer::new(channels, dst_frames, target_rate);
    for frame in 0..dst_frames {
        let src_pos = frame as f64 / ratio;
        let idx = src_pos.floor() as usize;
        let frac = (src_pos - idx as f64) as f32;
        for ch in 0..channels {
            let a = buffer.get(idx, ch).unwrap_or(0.0);
            let b = buffer.get(idx + 1, ch).unwrap_or(a);
            out.set(frame, ch, a + (b - a) * frac);
        }
    }
    out
}
