//! Stage 3 — tabular Q-learning repair.
//!
//! Runs only when Stage 2B hands off an assignment with enough residual
//! conflicts to be worth repairing; below `rl_skip_threshold` this stage
//! is a pass-through.

pub mod agent;
pub mod qtable;
pub mod state;

use std::collections::HashMap;

use crate::assignment::Assignment;
use crate::catalog::EntityCatalog;
use crate::config::SolverConfig;
use crate::cpsat::domain::build_anchor_domains;
use crate::model::Course;
use crate::progress::ProgressBus;
use crate::resource_monitor::ResourceMonitor;

/// Runs Stage 3 over `seed` and returns the repaired assignment.
pub fn run(seed: Assignment, courses: &[Course], catalog: &EntityCatalog, config: &SolverConfig, resource_monitor: &ResourceMonitor, progress: &ProgressBus, job_id: &str) -> Assignment {
    let courses_map: HashMap<String, Course> = courses.iter().map(|c| (c.course_id.clone(), c.clone())).collect();
    let domains = build_anchor_domains(courses, catalog, config);
    agent::run(seed, &courses_map, &domains, catalog, config, resource_monitor, progress, job_id)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::assignment::{SessionKey, SlotRoomPair};
    use crate::catalog::TimeConfig;
    use crate::metrics;
    use crate::model::{Faculty, Room};

    #[test]
    fn repairing_a_conflict_free_assignment_never_lowers_quality() {
        let faculty = Faculty { faculty_id: "f1".into(), dept_id: "CS".into(), max_weekly_load: 10, availability: HashSet::from([(0, 0), (0, 1)]), preferences: Default::default() };
        let room = Room { room_id: "r1".into(), seating_capacity: 50, features: HashSet::new(), building_id: "B1".into() };
        let a = Course { course_id: "A".into(), dept_id: "CS".into(), duration: 1, faculty_id: "f1".into(), student_ids: HashSet::new(), required_features: HashSet::new(), enrollment_count: 10 };
        let time_config = TimeConfig { working_days: 1, slots_per_day: 2, start_time: "08:00".into(), end_time: "10:00".into(), lunch_break: None };
        let catalog = EntityCatalog::build(vec![a.clone()], vec![faculty], vec![room], vec![], time_config).unwrap();

        let mut seed = Assignment::new();
        seed.set(SessionKey::new("A", 0), SlotRoomPair { slot_id: "CS_0_0".into(), room_id: "r1".into() });

        let config = SolverConfig::default();
        let resource_monitor = ResourceMonitor::new(8 * 1024 * 1024 * 1024);
        let progress = ProgressBus::new();

        let before_quality = metrics::evaluate(&seed, &catalog).quality_score;
        let result = run(seed, &[a], &catalog, &config, &resource_monitor, &progress, "job-1");
        let after_quality = metrics::evaluate(&result, &catalog).quality_score;
        assert!(after_quality >= before_quality);
    }
}
