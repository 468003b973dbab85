//! Chunk reassembly
//!
//! Joins processed chunks back into one buffer with a linear crossfade over
//! each overlap region. The fade weights sum to exactly 1 at every sample,
//! so constant material crosses a seam unchanged.

use crate::audio::SampleBuffer;
use crate::error::{AuraError, Result};

/// Stitch chunk buffers in index order.
///
/// Every buffer except the last must carry `overlap_frames` trailing frames
/// duplicating the head of its successor, and no buffer may be shorter than
/// the overlap. Output length is the sum of chunk
/// lengths minus one overlap per seam, which equals the planner's original
/// frame count.
pub fn stitch(chunks: &[SampleBuffer], overlap_frames: usize) -> Result<SampleBuffer> {
    let first = chunks.first().ok_or(AuraError::EmptyAudio)?;
    if chunks.len() == 1 {
        return Ok(first.clone());
    }

    let channels = first.num_channels();
    let rate = first.sample_rate();
    for (i, chunk) in chunks.iter().enumerate() {
        if chunk.num_channels() != channels || chunk.sample_rate() != rate {
            return Err(AuraError::Stage {
                stage: "stitch",
                reason: format!(
                    "chunk {} layout {}ch/{}Hz does not match {}ch/{}Hz",
                    i,
                    chunk.num_channels(),
                    chunk.sample_rate(),
                    channels,
                    rate
                ),
            });
        }
        // The crossfade reads `overlap_frames` from the head of every
        // successor and from the tail of the running output, so no chunk
        // may be shorter than the overlap.
        if chunk.num_frames() < overlap_frames {
            return Err(AuraError::Stage {
                stage: "stitch",
                reason: format!(
                    "chunk {} has {} frames, shorter than the {} frame overlap",
                    i,
                    chunk.num_frames(),
                    overlap_frames
                ),
            });
        }
    }

    let total_frames: usize = chunks.iter().map(|c| c.num_frames()).sum::<usize>()
        - overlap_frames * (chunks.len() - 1);
    let mut samples = Vec::with_capacity(total_frames * channels);
    samples.extend_from_slice(first.samples());

    for chunk in &chunks[1..] {
        let incoming = chunk.samples();
        let fade_start = samples.len() - overlap_frames * channels;

        for frame in 0..overlap_frames {
            let t = frame as f32 / overlap_frames as f32;
            for ch in 0..channels {
                let i = frame * channels + ch;
                let tail = samples[fade_start + i];
                samples[fade_start + i] = tail * (1.0 - t) + incoming[i] * t;
            }
        }
        samples.extend_from_slice(&incoming[overlap_frames * channels..]);
    }

    SampleBuffer::from_interleaved(samples, channels, rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(value: f32, frames: usize, channels: usize) -> SampleBuffer {
        SampleBuffer::from_interleaved(vec![value; frames * channels], channels, 44100).unwrap()
    }

    #[test]
    fn duration_is_preserved() {
        // Three chunks of 1000 frames, 100 frame overlap: 2800 originals.
        let chunks = vec![
            constant(0.1, 1000, 2),
            constant(0.2, 1000, 2),
            constant(0.3, 1000, 2),
        ];
        let out = stitch(&chunks, 100).unwrap();
        assert_eq!(out.num_frames(), 2800);
        assert_eq!(out.num_channels(), 2);
    }

    #[test]
    fn constant_signal_crosses_seams_unchanged() {
        // fade_out + fade_in sums to 1, so a flat signal shows no seam.
        let chunks = vec![constant(0.5, 500, 1), constant(0.5, 500, 1)];
        let out = stitch(&chunks, 50).unwrap();
        for (i, s) in out.samples().iter().enumerate() {
            assert!((s - 0.5).abs() < 1e-6, "seam artifact at frame {}", i);
        }
    }

    #[test]
    fn crossfade_is_linear_between_levels() {
        let chunks = vec![constant(0.0, 200, 1), constant(1.0, 200, 1)];
        let out = stitch(&chunks, 100).unwrap();
        let fade = &out.samples()[100..200];
        for (f, s) in fade.iter().enumerate() {
            let expected = f as f32 / 100.0;
            assert!((s - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn single_chunk_passes_through() {
        let chunk = constant(0.7, 300, 2);
        let out = stitch(std::slice::from_ref(&chunk), 100).unwrap();
        assert_eq!(out.samples(), chunk.samples());
    }

    #[test]
    fn mismatched_layout_is_rejected() {
        let a = constant(0.1, 500, 1);
        let b = constant(0.1, 500, 2);
        assert!(matches!(
            stitch(&[a, b], 50),
            Err(AuraError::Stage { stage: "stitch", .. })
        ));
    }

    #[test]
    fn chunk_shorter_than_overlap_is_rejected() {
        // A trailing chunk with fewer frames than the overlap must be an
        // error, not an out-of-bounds crossfade.
        let a = constant(0.1, 500, 1);
        let b = constant(0.1, 30, 1);
        assert!(matches!(
            stitch(&[a, b], 100),
            Err(AuraError::Stage { stage: "stitch", .. })
        ));
    }

    #[test]
    fn no_chunks_is_empty_audio() {
        assert!(matches!(stitch(&[], 10), Err(AuraError::EmptyAudio)));
    }
}
