//! Progress aggregation
//!
//! Maps heterogeneous stage costs onto one monotonic 0..1 fraction per job.
//! Each stage contributes its fixed weight; in chunked mode a chunk finishing
//! a stage contributes that stage's weight divided by the chunk count, so
//! overall progress advances smoothly as workers interleave.

use std::sync::mpsc::Sender;
use std::sync::Mutex;

use uuid::Uuid;

/// One progress notification. Fractions are non-decreasing per job and end
/// at exactly 1.0 on success.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub job_id: Uuid,
    pub fraction: f64,
    pub stage: String,
}

pub struct ProgressAggregator {
    job_id: Uuid,
    total_weight: f64,
    done_weight: Mutex<f64>,
    // Clamp and send stay under one lock: a worker that clamps first must
    // also send first, or interleaved workers could deliver out of order.
    outbound: Mutex<Outbound>,
}

struct Outbound {
    last_fraction: f64,
    sender: Sender<ProgressEvent>,
}

impl ProgressAggregator {
    pub fn new(job_id: Uuid, sender: Sender<ProgressEvent>, total_weight: f64) -> Self {
        Self {
            job_id,
            total_weight: total_weight.max(f64::MIN_POSITIVE),
            done_weight: Mutex::new(0.0),
            outbound: Mutex::new(Outbound {
                last_fraction: 0.0,
                sender,
            }),
        }
    }

    /// Record `weight` units of completed work attributed to `stage`.
    ///
    /// Safe to call concurrently from workers. A lagging or dropped
    /// receiver never blocks or fails the job.
    pub fn record(&self, stage: &str, weight: f64) {
        let fraction = {
            let Ok(mut done) = self.done_weight.lock() else {
                return;
            };
            *done += weight;
            (*done / self.total_weight).min(1.0)
        };
        self.emit(stage, fraction);
    }

    /// Send the terminal 1.0 event.
    pub fn complete(&self) {
        self.emit("done", 1.0);
    }

    fn emit(&self, stage: &str, fraction: f64) {
        let Ok(mut out) = self.outbound.lock() else {
            return;
        };
        let clamped = if fraction < out.last_fraction {
            out.last_fraction
        } else {
            out.last_fraction = fraction;
            fraction
        };
        let _ = out.sender.send(ProgressEvent {
            job_id: self.job_id,
            fraction: clamped,
            stage: stage.to_string(),
        });
    }
}
