//! Progress / cancellation bus.
//!
//! A "lossy, latest-value-wins" notification pattern: a single
//! mutex-guarded slot per job, overwritten on every publish, never queued.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub job_id: String,
    pub stage_name: String,
    pub fraction_complete: f64,
    pub human_message: String,
    pub status: JobStatus,
}

/// Stage weight convention for the fraction complete.
pub mod stage_weight {
    pub const LOAD: f64 = 0.02;
    pub const CLUSTER: f64 = 0.03;
    pub const CPSAT: f64 = 0.10;
    pub const GA: f64 = 0.75;
    pub const RL: f64 = 0.07;
    pub const FINALIZE: f64 = 0.03;
}

#[derive(Debug, Default)]
struct JobState {
    latest: Option<ProgressEvent>,
    cancelled: bool,
}

/// Process-wide typed channel carrying progress events; publication is
/// non-blocking and lossy.
#[derive(Debug, Clone, Default)]
pub struct ProgressBus {
    jobs: Arc<Mutex<HashMap<String, JobState>>>,
}

impl ProgressBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-blocking, lossy publish: the latest value for a job wins.
    pub fn publish(&self, event: ProgressEvent) {
        let mut jobs = self.jobs.lock().expect("progress bus mutex poisoned");
        let state = jobs.entry(event.job_id.clone()).or_default();
        state.latest = Some(event);
    }

    pub fn latest(&self, job_id: &str) -> Option<ProgressEvent> {
        let jobs = self.jobs.lock().expect("progress bus mutex poisoned");
        jobs.get(job_id).and_then(|s| s.latest.clone())
    }

    /// Cheap cancellation poll: stages call this at every externalizable
    /// progress tick.
    pub fn is_cancelled(&self, job_id: &str) -> bool {
        let jobs = self.jobs.lock().expect("progress bus mutex poisoned");
        jobs.get(job_id).map(|s| s.cancelled).unwrap_or(false)
    }

    pub fn cancel(&self, job_id: &str) {
        let mut jobs = self.jobs.lock().expect("progress bus mutex poisoned");
        jobs.entry(job_id.to_string()).or_default().cancelled = true;
    }
}
