//! External collaborator contracts.
//!
//! The solver core never reaches past these traits: no HTTP client, no DB
//! handle, no auth scheme lives in this crate. Implementations are supplied
//! by the caller; `loader`/`main.rs` provide minimal in-process ones for
//! the demo harness.

use crate::assignment::Assignment;
use crate::catalog::TimeConfig;
use crate::error::Result;
use crate::model::{Course, Faculty, Room, Student};
use crate::pipeline::JobMetrics;

/// A job's identifying parameters. `time_config_overrides` lets a caller
/// supply a different grid than the provider's default without mutating
/// the provider.
#[derive(Debug, Clone)]
pub struct JobInput {
    pub job_id: String,
    pub org_id: String,
    pub semester: String,
    pub academic_year: u32,
    pub time_config_overrides: Option<TimeConfig>,
}

/// The raw entity set a provider hands back for one organization: courses,
/// faculty, rooms, students, and the time grid they should be scheduled
/// against.
pub struct CatalogPayload {
    pub courses: Vec<Course>,
    pub faculty: Vec<Faculty>,
    pub rooms: Vec<Room>,
    pub students: Vec<Student>,
    pub time_config: TimeConfig,
}

/// Read-only source of entity data, keyed by organization.
pub trait CatalogProvider {
    fn load(&self, org_id: &str) -> Result<CatalogPayload>;
}

/// Sink for a completed job's final assignment and metrics, called once on
/// pipeline success — never on a cancelled or catalog-invalid job.
pub trait PersistenceSink {
    fn store(&self, job_id: &str, assignment: &Assignment, metrics: &JobMetrics) -> Result<()>;
}

/// The caller-facing half of the progress/cancellation bus;
/// [`crate::progress::ProgressBus`] is the concrete implementation used
/// internally, but stages only depend on this trait's shape.
pub trait ProgressBusPort {
    fn publish(&self, job_id: &str, stage: &str, fraction: f64, message: &str);
    fn is_cancelled(&self, job_id: &str) -> bool;
}

impl ProgressBusPort for crate::progress::ProgressBus {
    fn publish(&self, job_id: &str, stage: &str, fraction: f64, message: &str) {
        self.publish(crate::progress::ProgressEvent {
            job_id: job_id.to_string(),
            stage_name: stage.to_string(),
            fraction_complete: fraction,
            human_message: message.to_string(),
            status: crate::progress::JobStatus::Running,
        });
    }

    fn is_cancelled(&self, job_id: &str) -> bool {
        crate::progress::ProgressBus::is_cancelled(self, job_id)
    }
}
