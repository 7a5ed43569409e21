//! Precomputed valid `(slot_id, room_id)` domains per course session.
//!
//! Shared by Stage 2A (variable domains), Stage 2B (mutation/crossover
//! candidate pairs) and Stage 3 (repair action candidates).

use crate::assignment::SlotRoomPair;
use crate::catalog::EntityCatalog;
use crate::config::SolverConfig;
use crate::model::Course;

/// `(slot_id, room_id)` pairs valid for one `(course, session_index)`,
/// satisfying capacity, feature, availability, and contiguity constraints
/// without inspecting other courses.
#[derive(Debug, Clone, Default)]
pub struct SessionDomain {
    pub pairs: Vec<SlotRoomPair>,
}

/// Computes, for every course in `cluster`, the capped valid domain for
/// session 0 (the "anchor" session a multi-session course starts at);
/// sessions 1..duration are derived from the anchor's `(dept_id, day)` and
/// consecutive periods, so only the anchor needs an explicit domain.
pub fn build_anchor_domains(cluster: &[Course], catalog: &EntityCatalog, config: &SolverConfig) -> std::collections::HashMap<String, SessionDomain> {
    let mut out = std::collections::HashMap::new();
    for course in cluster {
        out.insert(course.course_id.clone(), anchor_domain_for(course, catalog, config));
    }
    out
}

fn anchor_domain_for(course: &Course, catalog: &EntityCatalog, config: &SolverConfig) -> SessionDomain {
    let Some(faculty) = catalog.faculty(&course.faculty_id) else {
        return SessionDomain::default();
    };

    let mut scored: Vec<(f64, SlotRoomPair)> = Vec::new();
    for slot in catalog.slots_in_dept(&course.dept_id) {
        if slot.dept_id != course.dept_id {
            continue;
        }
        // Contiguity: the anchor must leave room for `duration` consecutive
        // periods within the department's day.
        if slot.period + course.duration > periods_per_day(catalog, &course.dept_id) {
            continue;
        }
        if !faculty.is_available(slot.wall_clock()) {
            continue;
        }
        // All `duration` consecutive periods must also be in the faculty's
        // availability, otherwise contiguity and domain validity can't both hold.
        let all_periods_available = (0..course.duration).all(|d| faculty.is_available((slot.day, slot.period + d)));
        if !all_periods_available {
            continue;
        }

        for room in catalog.rooms() {
            if !room.fits(course.enrollment_count, &course.required_features) {
                continue;
            }
            let fit_score = room_fit_score(room.seating_capacity, course.enrollment_count);
            let centrality = slot_centrality_score(catalog, slot.wall_clock());
            scored.push((fit_score + centrality, SlotRoomPair { slot_id: slot.slot_id.clone(), room_id: room.room_id.clone() }));
        }
    }

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(config.max_domain_pairs_per_session);

    SessionDomain { pairs: scored.into_iter().map(|(_, pair)| pair).collect() }
}

fn periods_per_day(catalog: &EntityCatalog, dept_id: &str) -> u32 {
    catalog.slots_in_dept(dept_id).map(|s| s.period + 1).max().unwrap_or(0)
}

/// Tighter room fit (less wasted capacity) scores higher.
fn room_fit_score(capacity: u32, enrollment: u32) -> f64 {
    if capacity == 0 {
        return 0.0;
    }
    enrollment as f64 / capacity as f64
}

/// Wall-clocks with fewer departments already contending for them are more
/// "central" (easier to keep conflict-free), scored inversely by contention.
fn slot_centrality_score(catalog: &EntityCatalog, wall_clock: (u32, u32)) -> f64 {
    let contenders = catalog.wall_clock_slots(wall_clock).len().max(1) as f64;
    1.0 / contenders
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::catalog::TimeConfig;
    use crate::model::{Faculty, Room};

    fn catalog_with_one_room(capacity: u32, features: &[&str]) -> EntityCatalog {
        let course = Course { course_id: "c1".into(), dept_id: "CS".into(), duration: 1, faculty_id: "f1".into(), student_ids: HashSet::new(), required_features: HashSet::from(["projector".to_string()]), enrollment_count: 80 };
        let faculty = Faculty { faculty_id: "f1".into(), dept_id: "CS".into(), max_weekly_load: 10, availability: HashSet::from([(0, 0), (0, 1)]), preferences: Default::default() };
        let room = Room { room_id: "r1".into(), seating_capacity: capacity, features: features.iter().map(|s| s.to_string()).collect(), building_id: "B1".into() };
        let time_config = TimeConfig { working_days: 1, slots_per_day: 2, start_time: "08:00".into(), end_time: "10:00".into(), lunch_break: None };
        EntityCatalog::build(vec![course], vec![faculty], vec![room], vec![], time_config).unwrap()
    }

    #[test]
    fn domain_excludes_rooms_failing_capacity_or_features() {
        let catalog_small_room = catalog_with_one_room(60, &["projector"]);
        let config = SolverConfig::default();
        let course = catalog_small_room.course("c1").unwrap().clone();
        let domain = anchor_domain_for(&course, &catalog_small_room, &config);
        assert!(domain.pairs.is_empty(), "60-capacity room must be excluded for 80-enrollment course");

        let catalog_no_feature = catalog_with_one_room(100, &[]);
        let domain = anchor_domain_for(&course, &catalog_no_feature, &config);
        assert!(domain.pairs.is_empty(), "room without projector must be excluded");

        let catalog_ok = catalog_with_one_room(100, &["projector"]);
        let domain = anchor_domain_for(&course, &catalog_ok, &config);
        assert_eq!(domain.pairs.len(), 2); // two available wall-clock slots
        assert_eq!(domain.pairs[0].room_id, "r1");
    }

    #[test]
    fn domain_is_capped_at_configured_maximum() {
        let course = Course { course_id: "c1".into(), dept_id: "CS".into(), duration: 1, faculty_id: "f1".into(), student_ids: HashSet::new(), required_features: HashSet::new(), enrollment_count: 10 };
        let faculty = Faculty { faculty_id: "f1".into(), dept_id: "CS".into(), max_weekly_load: 50, availability: (0..5).flat_map(|d| (0..10).map(move |p| (d, p))).collect(), preferences: Default::default() };
        let rooms: Vec<Room> = (0..30).map(|i| Room { room_id: format!("r{i}"), seating_capacity: 100, features: HashSet::new(), building_id: "B1".into() }).collect();
        let time_config = TimeConfig { working_days: 5, slots_per_day: 10, start_time: "08:00".into(), end_time: "18:00".into(), lunch_break: None };
        let catalog = EntityCatalog::build(vec![course.clone()], vec![faculty], rooms, vec![], time_config).unwrap();
        let config = SolverConfig::default();
        let domain = anchor_domain_for(&course, &catalog, &config);
        assert_eq!(domain.pairs.len(), config.max_domain_pairs_per_session);
    }
}
