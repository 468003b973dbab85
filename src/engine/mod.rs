//! Processing engine
//!
//! This module provides:
//! - `Engine` facade accepting one job at a time
//! - Chunk planner and worker pool executor
//! - Crossfade stitcher for reassembling parallel chunks
//! - Progress aggregation and cooperative cancellation

mod cancel;
mod executor;
mod pipeline;
mod planner;
mod progress;
mod stitcher;

pub use cancel::CancelToken;
pub use pipeline::PipelineSpec;
pub use planner::{Chunk, ExecutionPlan, OVERLAP_SECONDS};
pub use progress::{ProgressAggregator, ProgressEvent};
pub use stitcher::stitch;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::JoinHandle;

use log::{info, warn};
use uuid::Uuid;

use crate::audio::SampleBuffer;
use crate::config::EngineSettings;
use crate::error::{AuraError, Result};
use crate::separation::{DemucsCli, Separator};

/// Terminal state of a job, delivered exactly once through `JobHandle::wait`.
#[derive(Debug)]
pub enum JobOutcome {
    Completed(SampleBuffer),
    Cancelled,
    Failed(AuraError),
}

/// Handle to a running job.
pub struct JobHandle {
    job_id: Uuid,
    token: CancelToken,
    progress: Receiver<ProgressEvent>,
    worker: JoinHandle<JobOutcome>,
}

impl JobHandle {
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Request cancellation. The job resolves `Cancelled` within at most one
    /// in-flight stage invocation per worker.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Progress events for this job, non-decreasing, ending at exactly 1.0
    /// on success.
    pub fn progress(&self) -> &Receiver<ProgressEvent> {
        &self.progress
    }

    /// Block until the job reaches a terminal state.
    pub fn wait(self) -> JobOutcome {
        match self.worker.join() {
            Ok(outcome) => outcome,
            Err(_) => JobOutcome::Failed(AuraError::Stage {
                stage: "engine",
                reason: "worker thread panicked".to_string(),
            }),
        }
    }
}

/// Single-job processing engine.
///
/// Owns the separation backend and the busy flag. A second `submit` while a
/// job is active fails with `EngineBusy` instead of queueing.
pub struct Engine {
    settings: EngineSettings,
    separator: Arc<dyn Separator>,
    busy: Arc<AtomicBool>,
}

impl Engine {
    pub fn new(settings: EngineSettings) -> Self {
        Self::with_separator(settings, Arc::new(DemucsCli::new()))
    }

    pub fn with_separator(settings: EngineSettings, separator: Arc<dyn Separator>) -> Self {
        Self {
            settings,
            separator,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Submit a job and return immediately with a handle.
    ///
    /// Validation happens up front on the caller's thread; a rejected job
    /// never reaches a worker and leaves the engine idle.
    pub fn submit(&self, pipeline: PipelineSpec, buffer: SampleBuffer) -> Result<JobHandle> {
        if self.busy.swap(true, Ordering::AcqRel) {
            return Err(AuraError::EngineBusy);
        }
        let guard = BusyGuard {
            busy: Arc::clone(&self.busy),
        };

        if buffer.is_empty() {
            return Err(AuraError::EmptyAudio);
        }
        if pipeline.is_empty() {
            return Err(AuraError::Stage {
                stage: "engine",
                reason: "pipeline has no enabled stages".to_string(),
            });
        }

        let job_id = Uuid::new_v4();
        let plan = ExecutionPlan::plan(
            buffer.num_frames(),
            buffer.sample_rate(),
            num_cpus::get(),
            &self.settings,
        );
        info!(
            "job {} submitted: {} frames, {} chunk(s)",
            job_id,
            buffer.num_frames(),
            plan.num_chunks()
        );

        let (tx, rx) = mpsc::channel();
        let token = CancelToken::new();
        let progress = ProgressAggregator::new(job_id, tx, pipeline.total_weight());
        let worker_token = token.clone();
        let separator = Arc::clone(&self.separator);

        let worker = std::thread::spawn(move || {
            let _guard = guard;
            match executor::run(
                &plan,
                &pipeline,
                &buffer,
                separator.as_ref(),
                &worker_token,
                &progress,
            ) {
                Ok(output) => {
                    progress.complete();
                    info!("job {} completed", job_id);
                    JobOutcome::Completed(output)
                }
                Err(err) if err.is_cancelled() => {
                    info!("job {} cancelled", job_id);
                    JobOutcome::Cancelled
                }
                Err(err) => {
                    warn!("job {} failed: {}", job_id, err);
                    JobOutcome::Failed(err)
                }
            }
        });

        Ok(JobHandle {
            job_id,
            token,
            progress: rx,
            worker,
        })
    }
}

/// Clears the busy flag when the job ends, on any path out of the worker.
struct BusyGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
