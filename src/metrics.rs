//! Quality and conflict metrics, shared by Stage 2B fitness, Stage 3 reward
//! shaping, and the orchestrator's final report.

use std::collections::HashMap;
use std::sync::Mutex;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::assignment::{Assignment, Conflict};
use crate::catalog::EntityCatalog;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConflictCounts {
    pub faculty: usize,
    pub room: usize,
    pub student: usize,
    pub capacity: usize,
    pub feature: usize,
}

impl ConflictCounts {
    pub fn total(&self) -> usize {
        self.faculty + self.room + self.student + self.capacity + self.feature
    }
}

#[derive(Debug, Clone, Default)]
pub struct QualitySubscores {
    pub faculty_pref: f64,
    pub compactness: f64,
    pub room_util: f64,
    pub workload_balance: f64,
}

#[derive(Debug, Clone, Default)]
pub struct QualityReport {
    pub conflicts: Vec<Conflict>,
    pub counts: ConflictCounts,
    pub subscores: QualitySubscores,
    pub quality_score: f64,
}

/// Detects every hard-constraint conflict in `assignment` in a single pass
/// over the wall-clock index, chunked across a worker pool and merged under
/// a mutex.
pub fn detect_conflicts(assignment: &Assignment, catalog: &EntityCatalog) -> Vec<Conflict> {
    let entries: Vec<_> = assignment.iter().collect();

    // group entries by wall-clock first (sequential — cheap hash grouping),
    // then fan the per-wall-clock duplicate tallies out across chunks.
    let mut by_wall_clock: HashMap<(u32, u32), Vec<&crate::assignment::SessionKey>> = HashMap::new();
    for (key, pair) in &entries {
        if let Some(wc) = catalog.wall_clock_of(&pair.slot_id) {
            by_wall_clock.entry(wc).or_default().push(key);
        }
    }
    let groups: Vec<_> = by_wall_clock.into_iter().collect();

    let merged = Mutex::new(Vec::new());
    groups.par_chunks(64.max(groups.len() / 8 + 1)).for_each(|chunk| {
        let mut local = Vec::new();
        for (wc, keys) in chunk {
            tally_wall_clock_group(*wc, keys, catalog, &mut local);
        }
        merged.lock().unwrap().extend(local);
    });

    let mut conflicts = merged.into_inner().unwrap();

    for (key, pair) in &entries {
        let Some(course) = catalog.course(&key.course_id) else { continue };
        let Some(room) = catalog.room(&pair.room_id) else { continue };
        if room.seating_capacity < course.enrollment_count {
            conflicts.push(Conflict::CapacityViolation { room_id: room.room_id.clone(), course_id: course.course_id.clone() });
        }
        if !course.required_features.is_subset(&room.features) {
            conflicts.push(Conflict::FeatureViolation { room_id: room.room_id.clone(), course_id: course.course_id.clone() });
        }
    }

    // Room exclusivity (room, slot) pairs, counted directly rather than via
    // the wall-clock grouping since two departments at the same wall-clock
    // never share a room-slot pair legitimately.
    let mut room_slot_counts: HashMap<(String, String), usize> = HashMap::new();
    for (_key, pair) in &entries {
        *room_slot_counts.entry((pair.room_id.clone(), pair.slot_id.clone())).or_insert(0) += 1;
    }
    for ((room_id, slot_id), count) in room_slot_counts {
        if count > 1 {
            if let Some(wc) = catalog.wall_clock_of(&slot_id) {
                for _ in 1..count {
                    conflicts.push(Conflict::RoomConflict { room_id: room_id.clone(), wall_clock: wc });
                }
            }
        }
    }

    conflicts
}

fn tally_wall_clock_group(wall_clock: (u32, u32), keys: &[&crate::assignment::SessionKey], catalog: &EntityCatalog, out: &mut Vec<Conflict>) {
    let mut faculty_count: HashMap<String, usize> = HashMap::new();
    let mut student_count: HashMap<String, usize> = HashMap::new();

    for key in keys {
        let Some(course) = catalog.course(&key.course_id) else { continue };
        *faculty_count.entry(course.faculty_id.clone()).or_insert(0) += 1;
        for student_id in &course.student_ids {
            *student_count.entry(student_id.clone()).or_insert(0) += 1;
        }
    }

    for (faculty_id, count) in faculty_count {
        for _ in 1..count {
            out.push(Conflict::FacultyConflict { faculty_id: faculty_id.clone(), wall_clock });
        }
    }
    for (student_id, count) in student_count {
        for _ in 1..count {
            out.push(Conflict::StudentConflict { student_id: student_id.clone(), wall_clock });
        }
    }
}

/// Computes the full quality report for `assignment`. Pure function of its
/// inputs — safe to call repeatedly, always returning the same result for
/// the same assignment and catalog.
pub fn evaluate(assignment: &Assignment, catalog: &EntityCatalog) -> QualityReport {
    let conflicts = detect_conflicts(assignment, catalog);
    let counts = tally_counts(&conflicts);
    let subscores = compute_subscores(assignment, catalog);
    let feasibility = if counts.total() == 0 { 1.0 } else { 0.0 };
    let quality_score = feasibility * (0.3 * subscores.faculty_pref + 0.3 * subscores.compactness + 0.2 * subscores.room_util + 0.2 * subscores.workload_balance);

    QualityReport { conflicts, counts, subscores, quality_score }
}

fn tally_counts(conflicts: &[Conflict]) -> ConflictCounts {
    let mut counts = ConflictCounts::default();
    for c in conflicts {
        match c {
            Conflict::FacultyConflict { .. } => counts.faculty += 1,
            Conflict::RoomConflict { .. } => counts.room += 1,
            Conflict::StudentConflict { .. } => counts.student += 1,
            Conflict::CapacityViolation { .. } => counts.capacity += 1,
            Conflict::FeatureViolation { .. } => counts.feature += 1,
        }
    }
    counts
}

fn compute_subscores(assignment: &Assignment, catalog: &EntityCatalog) -> QualitySubscores {
    let mut faculty_pref_sum = 0.0;
    let mut room_util_sum = 0.0;
    let mut n = 0usize;

    let mut faculty_periods: HashMap<String, Vec<(u32, u32)>> = HashMap::new();
    let mut faculty_load: HashMap<String, u32> = HashMap::new();

    for (key, pair) in assignment.iter() {
        let Some(course) = catalog.course(&key.course_id) else { continue };
        let Some(wc) = catalog.wall_clock_of(&pair.slot_id) else { continue };
        if let Some(faculty) = catalog.faculty(&course.faculty_id) {
            faculty_pref_sum += faculty.preference_for(wc);
        }
        if let Some(room) = catalog.room(&pair.room_id) {
            if room.seating_capacity > 0 {
                room_util_sum += (course.enrollment_count as f64 / room.seating_capacity as f64).min(1.0);
            }
        }
        faculty_periods.entry(course.faculty_id.clone()).or_default().push(wc);
        n += 1;
    }

    for (key, _pair) in assignment.iter() {
        if let Some(course) = catalog.course(&key.course_id) {
            *faculty_load.entry(course.faculty_id.clone()).or_insert(0) += 1;
        }
    }

    let faculty_pref = if n > 0 { faculty_pref_sum / n as f64 } else { 1.0 };
    let room_util = if n > 0 { room_util_sum / n as f64 } else { 1.0 };
    let compactness = compute_compactness(&faculty_periods);
    let workload_balance = compute_workload_balance(&faculty_load, catalog);

    QualitySubscores { faculty_pref, compactness, room_util, workload_balance }
}

fn compute_compactness(faculty_periods: &HashMap<String, Vec<(u32, u32)>>) -> f64 {
    let mut total = 0.0;
    let mut n = 0usize;
    for periods in faculty_periods.values() {
        let mut by_day: HashMap<u32, Vec<u32>> = HashMap::new();
        for &(day, period) in periods {
            by_day.entry(day).or_default().push(period);
        }
        for periods_in_day in by_day.values() {
            let min = *periods_in_day.iter().min().unwrap();
            let max = *periods_in_day.iter().max().unwrap();
            let span = (max - min + 1) as f64;
            let occupied = periods_in_day.len() as f64;
            total += occupied / span;
            n += 1;
        }
    }
    if n == 0 { 1.0 } else { total / n as f64 }
}

fn compute_workload_balance(faculty_load: &HashMap<String, u32>, catalog: &EntityCatalog) -> f64 {
    let fractions: Vec<f64> = faculty_load
        .iter()
        .filter_map(|(id, &load)| {
            let cap = catalog.faculty(id)?.max_weekly_load;
            if cap == 0 { None } else { Some(load as f64 / cap as f64) }
        })
        .collect();
    if fractions.is_empty() {
        return 1.0;
    }
    let mean = fractions.iter().sum::<f64>() / fractions.len() as f64;
    let variance = fractions.iter().map(|f| (f - mean).powi(2)).sum::<f64>() / fractions.len() as f64;
    (1.0 - variance).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::assignment::{SessionKey, SlotRoomPair};
    use crate::catalog::TimeConfig;
    use crate::model::{Course, Faculty, Room};

    fn catalog_two_courses_same_faculty() -> EntityCatalog {
        let faculty = Faculty { faculty_id: "f1".into(), dept_id: "CS".into(), max_weekly_load: 10, availability: HashSet::from([(0, 0), (0, 1)]), preferences: Default::default() };
        let room = Room { room_id: "r1".into(), seating_capacity: 50, features: HashSet::new(), building_id: "B1".into() };
        let a = Course { course_id: "A".into(), dept_id: "CS".into(), duration: 1, faculty_id: "f1".into(), student_ids: HashSet::new(), required_features: HashSet::new(), enrollment_count: 10 };
        let b = Course { course_id: "B".into(), dept_id: "CS".into(), duration: 1, faculty_id: "f1".into(), student_ids: HashSet::new(), required_features: HashSet::new(), enrollment_count: 10 };
        let time_config = TimeConfig { working_days: 1, slots_per_day: 2, start_time: "08:00".into(), end_time: "10:00".into(), lunch_break: None };
        EntityCatalog::build(vec![a, b], vec![faculty], vec![room], vec![], time_config).unwrap()
    }

    #[test]
    fn colliding_faculty_assignment_is_detected() {
        let catalog = catalog_two_courses_same_faculty();
        let mut assignment = Assignment::new();
        assignment.set(SessionKey::new("A", 0), SlotRoomPair { slot_id: "CS_0_0".into(), room_id: "r1".into() });
        assignment.set(SessionKey::new("B", 0), SlotRoomPair { slot_id: "CS_0_0".into(), room_id: "r1".into() });

        let report = evaluate(&assignment, &catalog);
        assert_eq!(report.counts.faculty, 1);
        assert_eq!(report.counts.room, 1);
        assert_eq!(report.quality_score, 0.0);
    }

    #[test]
    fn conflict_free_assignment_scores_positive_quality() {
        let catalog = catalog_two_courses_same_faculty();
        let mut assignment = Assignment::new();
        assignment.set(SessionKey::new("A", 0), SlotRoomPair { slot_id: "CS_0_0".into(), room_id: "r1".into() });
        assignment.set(SessionKey::new("B", 0), SlotRoomPair { slot_id: "CS_0_1".into(), room_id: "r1".into() });

        let report = evaluate(&assignment, &catalog);
        assert_eq!(report.counts.total(), 0);
        assert!(report.quality_score > 0.0);
    }

    #[test]
    fn evaluation_is_idempotent() {
        let catalog = catalog_two_courses_same_faculty();
        let mut assignment = Assignment::new();
        assignment.set(SessionKey::new("A", 0), SlotRoomPair { slot_id: "CS_0_0".into(), room_id: "r1".into() });
        assignment.set(SessionKey::new("B", 0), SlotRoomPair { slot_id: "CS_0_1".into(), room_id: "r1".into() });

        let first = evaluate(&assignment, &catalog);
        let second = evaluate(&assignment, &catalog);
        assert_eq!(first.counts, second.counts);
        assert_eq!(first.quality_score, second.quality_score);
    }
}
