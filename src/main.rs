//! Thin demonstration harness wiring an in-memory catalog through the
//! full pipeline to a stdout persistence sink. No CLI surface, network
//! listener, or persisted schema belongs to the core; this binary is
//! just a caller example.

use std::collections::HashSet;

use nep_timetable_core::assignment::Assignment;
use nep_timetable_core::catalog::{EntityCatalog, TimeConfig};
use nep_timetable_core::config::SolverConfig;
use nep_timetable_core::error::Result;
use nep_timetable_core::external::{CatalogPayload, CatalogProvider, JobInput, PersistenceSink};
use nep_timetable_core::logger;
use nep_timetable_core::model::{Course, Faculty, Room};
use nep_timetable_core::pipeline::{self, JobMetrics};
use nep_timetable_core::progress::ProgressBus;
use nep_timetable_core::resource_monitor::ResourceMonitor;

/// A fixed, in-process catalog for the demo run — real deployments supply
/// their own [`CatalogProvider`] backed by a database or admissions system.
struct DemoCatalogProvider;

impl CatalogProvider for DemoCatalogProvider {
    fn load(&self, _org_id: &str) -> Result<CatalogPayload> {
        let faculty = vec![
            Faculty { faculty_id: "f1".into(), dept_id: "CS".into(), max_weekly_load: 20, availability: (0..5).flat_map(|d| (0..6).map(move |p| (d, p))).collect(), preferences: Default::default() },
            Faculty { faculty_id: "f2".into(), dept_id: "CS".into(), max_weekly_load: 20, availability: (0..5).flat_map(|d| (0..6).map(move |p| (d, p))).collect(), preferences: Default::default() },
        ];
        let rooms = vec![Room { room_id: "r1".into(), seating_capacity: 60, features: HashSet::new(), building_id: "B1".into() }, Room { room_id: "r2".into(), seating_capacity: 40, features: HashSet::new(), building_id: "B1".into() }];
        let courses = vec![
            Course { course_id: "CS101".into(), dept_id: "CS".into(), duration: 2, faculty_id: "f1".into(), student_ids: HashSet::from(["s1".into(), "s2".into()]), required_features: HashSet::new(), enrollment_count: 40 },
            Course { course_id: "CS102".into(), dept_id: "CS".into(), duration: 1, faculty_id: "f2".into(), student_ids: HashSet::from(["s1".into()]), required_features: HashSet::new(), enrollment_count: 30 },
        ];
        let time_config = TimeConfig { working_days: 5, slots_per_day: 6, start_time: "08:00".into(), end_time: "15:00".into(), lunch_break: Some(3) };
        Ok(CatalogPayload { courses, faculty, rooms, students: vec![], time_config })
    }
}

/// Prints the final assignment and metrics instead of persisting them —
/// real deployments supply a `PersistenceSink` backed by their own store.
struct StdoutPersistenceSink;

impl PersistenceSink for StdoutPersistenceSink {
    fn store(&self, job_id: &str, assignment: &Assignment, metrics: &JobMetrics) -> Result<()> {
        log::info!("job {job_id} stored {} sessions ({} deferred)", assignment.len(), assignment.deferred.len());
        println!("{}", metrics.to_csv_row()?);
        Ok(())
    }
}

fn main() {
    logger::init();
    log::info!("Starting demo timetabling run.");

    let job = JobInput { job_id: "demo-job-1".into(), org_id: "demo-org".into(), semester: "fall".into(), academic_year: 2026, time_config_overrides: None };

    let provider = DemoCatalogProvider;
    let payload = match provider.load(&job.org_id) {
        Ok(payload) => payload,
        Err(e) => {
            log::error!("failed to load catalog: {e}");
            return;
        }
    };

    let time_config = job.time_config_overrides.clone().unwrap_or(payload.time_config);
    let catalog = match EntityCatalog::build(payload.courses.clone(), payload.faculty, payload.rooms, payload.students, time_config) {
        Ok(catalog) => catalog,
        Err(e) => {
            log::error!("catalog invalid: {e}");
            return;
        }
    };

    let config = SolverConfig::default();
    let resource_monitor = ResourceMonitor::new(config.resource_ceiling_bytes);
    let progress = ProgressBus::new();

    match pipeline::run(&job.job_id, payload.courses, &catalog, &config, &resource_monitor, &progress) {
        Ok((assignment, metrics)) => {
            let sink = StdoutPersistenceSink;
            if let Err(e) = sink.store(&job.job_id, &assignment, &metrics) {
                log::error!("failed to store result: {e}");
            }
        }
        Err(e) => log::error!("job {} failed: {e}", job.job_id),
    }
}
