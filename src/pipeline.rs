//! Pipeline orchestrator: runs Stages 1 -> 2A -> 2B -> 3 in order,
//! publishing progress and checking cancellation between stages, and
//! compensating on failure by emitting the best assignment seen so far.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::assignment::Assignment;
use crate::catalog::EntityCatalog;
use crate::config::SolverConfig;
use crate::cpsat::Stage2aReport;
use crate::error::{Error, Result};
use crate::metrics::QualityReport;
use crate::model::Course;
use crate::progress::{JobStatus, ProgressBus, ProgressEvent, stage_weight};
use crate::resource_monitor::ResourceMonitor;

/// Per-stage wall-clock timing, folded into [`JobMetrics`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageTimings {
    pub cluster_ms: u128,
    pub cpsat_ms: u128,
    pub ga_ms: u128,
    pub rl_ms: u128,
}

/// One job's complete outcome record: per-kind conflict counts,
/// per-stage timing, CP-SAT strategy success rate, and quality subscores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMetrics {
    pub job_id: String,
    pub faculty_conflicts: usize,
    pub room_conflicts: usize,
    pub student_conflicts: usize,
    pub capacity_violations: usize,
    pub feature_violations: usize,
    pub quality_score: f64,
    pub faculty_pref: f64,
    pub compactness: f64,
    pub room_util: f64,
    pub workload_balance: f64,
    pub cpsat_success_rate: f64,
    pub deferred_sessions: usize,
    #[serde(flatten)]
    pub timings: StageTimings,
    pub degraded: bool,
}

impl JobMetrics {
    fn from_reports(job_id: &str, quality: &QualityReport, stage2a: &Stage2aReport, deferred: usize, timings: StageTimings, degraded: bool) -> Self {
        Self {
            job_id: job_id.to_string(),
            faculty_conflicts: quality.counts.faculty,
            room_conflicts: quality.counts.room,
            student_conflicts: quality.counts.student,
            capacity_violations: quality.counts.capacity,
            feature_violations: quality.counts.feature,
            quality_score: quality.quality_score,
            faculty_pref: quality.subscores.faculty_pref,
            compactness: quality.subscores.compactness,
            room_util: quality.subscores.room_util,
            workload_balance: quality.subscores.workload_balance,
            cpsat_success_rate: stage2a.cpsat_success_rate(),
            deferred_sessions: deferred,
            timings,
            degraded,
        }
    }

    /// One CSV row per job, appended by the demo [`crate::external::PersistenceSink`].
    pub fn to_csv_row(&self) -> Result<String> {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(vec![]);
        writer.serialize(self).map_err(|e| Error::StageFailure { stage: "metrics".into(), cause: e.to_string() })?;
        let bytes = writer.into_inner().map_err(|e| Error::StageFailure { stage: "metrics".into(), cause: e.to_string() })?;
        String::from_utf8(bytes).map_err(|e| Error::StageFailure { stage: "metrics".into(), cause: e.to_string() })
    }
}

/// Runs the full pipeline for one job and returns the final assignment plus
/// its metrics record. Never panics across the stage boundary: any stage
/// failure is caught and converted into `Error::StageFailure`, with the
/// best assignment produced so far still returned via `Ok` wrapped in the
/// `degraded` flag.
pub fn run(job_id: &str, courses: Vec<Course>, catalog: &EntityCatalog, config: &SolverConfig, resource_monitor: &ResourceMonitor, progress: &ProgressBus) -> Result<(Assignment, JobMetrics)> {
    let mut timings = StageTimings::default();
    let mut degraded = false;

    checkpoint(resource_monitor, progress, job_id, "load", stage_weight::LOAD, "catalog loaded");
    if progress.is_cancelled(job_id) {
        publish(progress, job_id, "load", stage_weight::LOAD, "cancelled before clustering", JobStatus::Cancelled);
        return Err(Error::Cancelled);
    }

    let started = Instant::now();
    let clusters = crate::cluster::cluster(courses.clone(), config);
    timings.cluster_ms = started.elapsed().as_millis();
    checkpoint(resource_monitor, progress, job_id, "cluster", stage_weight::LOAD + stage_weight::CLUSTER, "clustering complete");
    if progress.is_cancelled(job_id) {
        publish(progress, job_id, "cluster", stage_weight::LOAD + stage_weight::CLUSTER, "cancelled before cp-sat", JobStatus::Cancelled);
        return Err(Error::Cancelled);
    }

    let started = Instant::now();
    let cpsat_fraction = stage_weight::LOAD + stage_weight::CLUSTER + stage_weight::CPSAT;
    let (stage2a_assignment, stage2a_report) = match crate::cpsat::solve_all(&clusters, catalog, config, config.cpsat_max_parallel) {
        Ok(v) => v,
        Err(e) => {
            let cause = e.to_string();
            publish(progress, job_id, "cpsat", cpsat_fraction, &cause, JobStatus::Failed);
            return Err(Error::StageFailure { stage: "cpsat".into(), cause });
        }
    };
    timings.cpsat_ms = started.elapsed().as_millis();
    checkpoint(resource_monitor, progress, job_id, "cpsat", cpsat_fraction, "cp-sat stage complete");

    let mut best_so_far = stage2a_assignment.clone();

    if progress.is_cancelled(job_id) {
        publish(progress, job_id, "cpsat", cpsat_fraction, "cancelled before genetic refinement", JobStatus::Cancelled);
        return Err(Error::Cancelled);
    }
    if matches!(resource_monitor.current_level(), crate::resource_monitor::ResourceLevel::Emergency) {
        degraded = true;
        let quality = crate::metrics::evaluate(&best_so_far, catalog);
        let metrics = JobMetrics::from_reports(job_id, &quality, &stage2a_report, best_so_far.deferred.len(), timings, degraded);
        publish(progress, job_id, "finalize", cpsat_fraction, "completed in a degraded state under resource pressure", JobStatus::Completed);
        return Ok((best_so_far, metrics));
    }

    let started = Instant::now();
    let ga_result = crate::ga::run(stage2a_assignment, &courses, catalog, config, resource_monitor, progress, job_id);
    timings.ga_ms = started.elapsed().as_millis();
    let ga_fraction = stage_weight::LOAD + stage_weight::CLUSTER + stage_weight::CPSAT + stage_weight::GA;
    let ga_assignment = match ga_result {
        Ok(a) => {
            best_so_far = a.clone();
            a
        }
        Err(Error::Cancelled) => {
            publish(progress, job_id, "ga", ga_fraction, "cancelled during genetic refinement", JobStatus::Cancelled);
            return Err(Error::Cancelled);
        }
        Err(_) => best_so_far.clone(),
    };
    checkpoint(resource_monitor, progress, job_id, "ga", ga_fraction, "genetic refinement complete");

    if progress.is_cancelled(job_id) {
        publish(progress, job_id, "ga", ga_fraction, "cancelled before repair", JobStatus::Cancelled);
        return Err(Error::Cancelled);
    }

    let started = Instant::now();
    let rl_assignment = crate::rl::run(ga_assignment, &courses, catalog, config, resource_monitor, progress, job_id);
    timings.rl_ms = started.elapsed().as_millis();
    best_so_far = rl_assignment;

    let quality = crate::metrics::evaluate(&best_so_far, catalog);
    let metrics = JobMetrics::from_reports(job_id, &quality, &stage2a_report, best_so_far.deferred.len(), timings, degraded);
    publish(progress, job_id, "finalize", 1.0, "job complete", JobStatus::Completed);
    Ok((best_so_far, metrics))
}

fn publish(progress: &ProgressBus, job_id: &str, stage: &str, fraction: f64, message: &str, status: JobStatus) {
    progress.publish(ProgressEvent { job_id: job_id.to_string(), stage_name: stage.to_string(), fraction_complete: fraction, human_message: message.to_string(), status });
}

/// Publishes an in-progress checkpoint and samples current RSS so the
/// resource monitor's level reflects the live run rather than only
/// whatever a caller happened to feed it directly.
fn checkpoint(resource_monitor: &ResourceMonitor, progress: &ProgressBus, job_id: &str, stage: &str, fraction: f64, message: &str) {
    resource_monitor.sample(ResourceMonitor::read_process_rss_bytes());
    publish(progress, job_id, stage, fraction, message, JobStatus::Running);
}
