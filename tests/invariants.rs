//! Property-based checks for pipeline invariants, run over randomly
//! generated small catalogs.

use std::collections::HashSet;

use nep_timetable_core::catalog::{EntityCatalog, TimeConfig};
use nep_timetable_core::config::SolverConfig;
use nep_timetable_core::metrics;
use nep_timetable_core::model::{Course, Faculty, Room};
use proptest::prelude::*;

fn small_catalog(course_count: usize, faculty_count: usize, room_count: usize, durations: &[u32]) -> (Vec<Course>, EntityCatalog) {
    let time_config = TimeConfig { working_days: 3, slots_per_day: 4, start_time: "08:00".into(), end_time: "12:00".into(), lunch_break: None };

    let faculty: Vec<Faculty> = (0..faculty_count.max(1))
        .map(|i| Faculty {
            faculty_id: format!("f{i}"),
            dept_id: "CS".into(),
            max_weekly_load: 20,
            availability: (0..time_config.working_days).flat_map(|d| (0..time_config.slots_per_day).map(move |p| (d, p))).collect(),
            preferences: Default::default(),
        })
        .collect();

    let rooms: Vec<Room> = (0..room_count.max(1))
        .map(|i| Room { room_id: format!("r{i}"), seating_capacity: 200, features: HashSet::new(), building_id: "B1".into() })
        .collect();

    let courses: Vec<Course> = durations
        .iter()
        .take(course_count.max(1))
        .enumerate()
        .map(|(i, duration)| Course {
            course_id: format!("c{i}"),
            dept_id: "CS".into(),
            duration: (*duration).max(1),
            faculty_id: format!("f{}", i % faculty_count.max(1)),
            student_ids: HashSet::new(),
            required_features: HashSet::new(),
            enrollment_count: 10,
        })
        .collect();

    let catalog = EntityCatalog::build(courses.clone(), faculty, rooms, vec![], time_config).expect("synthetic catalog must be valid");
    (courses, catalog)
}

proptest! {
    /// Running quality and conflict detection twice over the same
    /// assignment is a pure function of its inputs.
    #[test]
    fn quality_evaluation_is_idempotent(
        course_count in 1usize..6,
        faculty_count in 1usize..3,
        room_count in 1usize..3,
        durations in proptest::collection::vec(1u32..3, 6),
    ) {
        let (courses, catalog) = small_catalog(course_count, faculty_count, room_count, &durations);
        let config = SolverConfig::default();
        let clusters = nep_timetable_core::cluster::cluster(courses, &config);
        let (assignment, _report) = nep_timetable_core::cpsat::solve_all(&clusters, &catalog, &config, 1).unwrap();

        let first = metrics::evaluate(&assignment, &catalog);
        let second = metrics::evaluate(&assignment, &catalog);
        prop_assert_eq!(first.counts, second.counts);
        prop_assert!((first.quality_score - second.quality_score).abs() < 1e-9);
    }

    /// Cluster membership is a total partition — the sum of per-cluster
    /// sizes always equals the course count, regardless of how the
    /// conflict graph happens to shake out.
    #[test]
    fn clustering_is_a_total_partition(
        course_count in 1usize..8,
        faculty_count in 1usize..4,
        durations in proptest::collection::vec(1u32..3, 8),
    ) {
        let (courses, _catalog) = small_catalog(course_count, faculty_count, 2, &durations);
        let config = SolverConfig::default();
        let total = courses.len();
        let clusters = nep_timetable_core::cluster::cluster(courses, &config);
        let sum: usize = clusters.values().map(|c| c.len()).sum();
        prop_assert_eq!(sum, total);
    }
}
