//! Chunk planning
//!
//! Decides whether a job runs whole or split into parallel chunks, and lays
//! out the chunk boundaries. Planning is pure arithmetic over frame counts,
//! so identical inputs always produce identical plans.

use log::debug;

use crate::config::EngineSettings;

/// Trailing overlap between adjacent chunks, crossfaded away at stitch time.
pub const OVERLAP_SECONDS: f64 = 1.0;

/// One chunk's frame range. `end_frame` is exclusive and includes the
/// trailing overlap for every chunk except the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub start_frame: usize,
    pub end_frame: usize,
}

impl Chunk {
    pub fn num_frames(&self) -> usize {
        self.end_frame - self.start_frame
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionPlan {
    /// Run the whole buffer through the pipeline on the calling thread's pool.
    Single,
    /// Run each chunk through the per-chunk stages in parallel, then stitch.
    Chunked {
        chunks: Vec<Chunk>,
        overlap_frames: usize,
    },
}

impl ExecutionPlan {
    /// Plan execution for a buffer of `num_frames` frames.
    ///
    /// Single-chunk when parallelism is off, only one core is available, or
    /// the input is at or below the long-file threshold. Otherwise up to
    /// `min(core_count, max_chunks)` equal chunks, each extended by the
    /// overlap margin on its trailing edge. The chunk count shrinks until
    /// every chunk is at least twice the overlap, so a chunk is never
    /// smaller than the margin it must crossfade.
    pub fn plan(
        num_frames: usize,
        sample_rate: u32,
        core_count: usize,
        settings: &EngineSettings,
    ) -> ExecutionPlan {
        let duration_secs = num_frames as f64 / sample_rate as f64;
        if !settings.parallel_enabled
            || core_count <= 1
            || duration_secs <= settings.long_file_threshold_secs as f64
        {
            return ExecutionPlan::Single;
        }

        let max_chunks = if settings.low_ram_mode {
            (settings.max_chunks / 2).max(1)
        } else {
            settings.max_chunks
        };
        let overlap_frames = (OVERLAP_SECONDS * sample_rate as f64) as usize;

        let mut num_chunks = core_count.min(max_chunks);
        while num_chunks > 1 && num_frames / num_chunks < 2 * overlap_frames {
            num_chunks -= 1;
        }
        if num_chunks <= 1 {
            return ExecutionPlan::Single;
        }

        let base = num_frames / num_chunks;
        let chunks: Vec<Chunk> = (0..num_chunks)
            .map(|index| {
                let start_frame = index * base;
                let end_frame = if index == num_chunks - 1 {
                    num_frames
                } else {
                    (index + 1) * base + overlap_frames
                };
                Chunk {
                    index,
                    start_frame,
                    end_frame,
                }
            })
            .collect();

        debug!(
            "planned {} chunks of ~{} frames with {} overlap frames",
            num_chunks, base, overlap_frames
        );
        ExecutionPlan::Chunked {
            chunks,
            overlap_frames,
        }
    }

    pub fn num_chunks(&self) -> usize {
        match self {
            ExecutionPlan::Single => 1,
            ExecutionPlan::Chunked { chunks, .. } => chunks.len(),
        }
    }
}
