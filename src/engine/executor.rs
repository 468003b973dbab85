//! Worker pool execution
//!
//! Runs a planned job to completion: per-chunk stages across a rayon pool in
//! chunked mode, whole-buffer stages after stitching. Workers poll the cancel
//! token between stages and chunks, and a failing chunk trips the token so
//! its siblings stop at their next poll instead of finishing doomed work.

use std::sync::Mutex;

use log::{debug, info};
use rayon::prelude::*;

use crate::audio::SampleBuffer;
use crate::error::{AuraError, Result};
use crate::separation::Separator;
use crate::stage::StageConfig;

use super::cancel::CancelToken;
use super::pipeline::PipelineSpec;
use super::planner::{Chunk, ExecutionPlan};
use super::progress::ProgressAggregator;
use super::stitcher;

// A single accelerator context services every chunk, so separation calls
// are serialized process-wide.
static INFERENCE_LOCK: Mutex<()> = Mutex::new(());

pub fn run(
    plan: &ExecutionPlan,
    pipeline: &PipelineSpec,
    buffer: &SampleBuffer,
    separator: &dyn Separator,
    token: &CancelToken,
    progress: &ProgressAggregator,
) -> Result<SampleBuffer> {
    match plan {
        ExecutionPlan::Single => run_single(pipeline, buffer, separator, token, progress),
        ExecutionPlan::Chunked {
            chunks,
            overlap_frames,
        } => run_chunked(
            chunks,
            *overlap_frames,
            pipeline,
            buffer,
            separator,
            token,
            progress,
        ),
    }
}

fn run_single(
    pipeline: &PipelineSpec,
    buffer: &SampleBuffer,
    separator: &dyn Separator,
    token: &CancelToken,
    progress: &ProgressAggregator,
) -> Result<SampleBuffer> {
    let mut current = buffer.clone();
    for stage in pipeline.stages() {
        token.check()?;
        current = apply_stage(stage, &current, separator)?;
        progress.record(stage.label(), stage.progress_weight());
    }
    Ok(current)
}

fn run_chunked(
    chunks: &[Chunk],
    overlap_frames: usize,
    pipeline: &PipelineSpec,
    buffer: &SampleBuffer,
    separator: &dyn Separator,
    token: &CancelToken,
    progress: &ProgressAggregator,
) -> Result<SampleBuffer> {
    let chunk_stages = pipeline.chunk_stages();
    let num_chunks = chunks.len();
    info!(
        "processing {} chunks across {} stages",
        num_chunks,
        chunk_stages.len()
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_chunks)
        .build()
        .map_err(|err| AuraError::ResourceExhausted {
            details: format!("failed to build worker pool: {err}"),
        })?;

    let results: Vec<(usize, Result<SampleBuffer>)> = pool.install(|| {
        chunks
            .par_iter()
            .map(|chunk| {
                let result = process_chunk(
                    chunk,
                    &chunk_stages,
                    buffer,
                    separator,
                    token,
                    progress,
                    num_chunks,
                );
                if let Err(ref err) = result {
                    if !err.is_cancelled() {
                        // Stop siblings at their next poll.
                        token.cancel();
                    }
                }
                (chunk.index, result)
            })
            .collect()
    });

    let mut buffers: Vec<Option<SampleBuffer>> = (0..num_chunks).map(|_| None).collect();
    let mut first_error: Option<(usize, AuraError)> = None;
    let mut saw_cancelled = false;
    for (index, result) in results {
        match result {
            Ok(processed) => buffers[index] = Some(processed),
            Err(AuraError::Cancelled) => saw_cancelled = true,
            Err(err) => {
                let replace = first_error
                    .as_ref()
                    .map_or(true, |(lowest, _)| index < *lowest);
                if replace {
                    first_error = Some((index, err));
                }
            }
        }
    }
    if let Some((index, err)) = first_error {
        debug!("chunk {} failed first: {}", index, err);
        return Err(err);
    }
    if saw_cancelled {
        return Err(AuraError::Cancelled);
    }

    let processed: Vec<SampleBuffer> = buffers.into_iter().flatten().collect();
    let mut stitched = stitcher::stitch(&processed, overlap_frames)?;

    for stage in pipeline.tail_stages() {
        token.check()?;
        stitched = apply_stage(stage, &stitched, separator)?;
        progress.record(stage.label(), stage.progress_weight());
    }
    Ok(stitched)
}

fn process_chunk(
    chunk: &Chunk,
    stages: &[&StageConfig],
    buffer: &SampleBuffer,
    separator: &dyn Separator,
    token: &CancelToken,
    progress: &ProgressAggregator,
    num_chunks: usize,
) -> Result<SampleBuffer> {
    token.check()?;
    let mut current = buffer.slice_frames(chunk.start_frame, chunk.end_frame);
    for stage in stages {
        token.check()?;
        current = apply_stage(stage, &current, separator)?;
        progress.record(stage.label(), stage.progress_weight() / num_chunks as f64);
    }
    Ok(current)
}

fn apply_stage(
    stage: &StageConfig,
    buffer: &SampleBuffer,
    separator: &dyn Separator,
) -> Result<SampleBuffer> {
    if matches!(stage, StageConfig::Separation(_)) {
        let _guard = INFERENCE_LOCK.lock().map_err(|_| AuraError::Stage {
            stage: "separation",
            reason: "inference lock poisoned by an earlier panic".to_string(),
        })?;
        stage.apply(buffer, separator)
    } else {
        stage.apply(buffer, separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineSettings;
    use crate::separation::MockSeparator;
    use crate::stage::{EqParams, NormalizeParams};
    use std::sync::mpsc;
    use uuid::Uuid;

    fn tone(frames: usize) -> SampleBuffer {
        let samples: Vec<f32> = (0..frames)
            .map(|i| 0.4 * (2.0 * std::f32::consts::PI * 220.0 * i as f32 / 8000.0).sin())
            .collect();
        SampleBuffer::from_interleaved(samples, 1, 8000).unwrap()
    }

    fn pipeline() -> PipelineSpec {
        PipelineSpec::from_stages(vec![
            StageConfig::Eq(EqParams::default()),
            StageConfig::Normalize(NormalizeParams::default()),
        ])
        .unwrap()
    }

    fn aggregator(
        pipeline: &PipelineSpec,
    ) -> (ProgressAggregator, mpsc::Receiver<crate::engine::ProgressEvent>) {
        let (tx, rx) = mpsc::channel();
        (
            ProgressAggregator::new(Uuid::new_v4(), tx, pipeline.total_weight()),
            rx,
        )
    }

    #[test]
    fn chunked_run_preserves_duration() {
        let mut settings = EngineSettings::default();
        settings.long_file_threshold_secs = 1;
        let buffer = tone(10 * 8000);
        let plan = ExecutionPlan::plan(buffer.num_frames(), 8000, 4, &settings);
        assert_eq!(plan.num_chunks(), 4);

        let pipeline = pipeline();
        let (progress, _rx) = aggregator(&pipeline);
        let out = run(
            &plan,
            &pipeline,
            &buffer,
            &MockSeparator::new(),
            &CancelToken::new(),
            &progress,
        )
        .unwrap();
        assert_eq!(out.num_frames(), buffer.num_frames());
    }

    #[test]
    fn pre_cancelled_token_short_circuits() {
        let buffer = tone(8000);
        let pipeline = pipeline();
        let (progress, _rx) = aggregator(&pipeline);
        let token = CancelToken::new();
        token.cancel();
        let err = run(
            &ExecutionPlan::Single,
            &pipeline,
            &buffer,
            &MockSeparator::new(),
            &token,
            &progress,
        )
        .unwrap_err();
        assert!(err.is_cancelled());
    }
}
