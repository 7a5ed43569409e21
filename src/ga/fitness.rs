//! GA fitness evaluation: CPU path with a hash-keyed cache, and a
//! non-blocking GPU probe that always falls back to CPU in this core (no
//! GPU backend is wired in; the probe is best-effort and silently falls
//! back).

use std::collections::HashMap;
use std::sync::Mutex;

use crate::assignment::Assignment;
use crate::catalog::EntityCatalog;
use crate::metrics;

/// Returns `true` if batched GPU evaluation is available for this job.
/// Always `false` here; kept as a named seam so a real backend can be
/// wired in without touching island evolution logic.
pub fn gpu_available() -> bool {
    false
}

pub fn fitness_of(assignment: &Assignment, catalog: &EntityCatalog) -> f64 {
    let report = metrics::evaluate(assignment, catalog);
    if report.counts.total() > 0 {
        -1000.0 * report.counts.total() as f64
    } else {
        0.3 * report.subscores.faculty_pref + 0.3 * report.subscores.compactness + 0.2 * report.subscores.room_util + 0.2 * report.subscores.workload_balance
    }
}

/// Mutex-guarded, capacity-bounded fitness cache shared by one island: a
/// hash-keyed cache capped at 500 entries, protected by a mutex.
pub struct FitnessCache {
    capacity: usize,
    inner: Mutex<HashMap<u64, f64>>,
    order: Mutex<Vec<u64>>,
}

impl FitnessCache {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, inner: Mutex::new(HashMap::new()), order: Mutex::new(Vec::new()) }
    }

    pub fn get_or_compute(&self, key: u64, assignment: &Assignment, catalog: &EntityCatalog) -> f64 {
        if let Some(&hit) = self.inner.lock().unwrap().get(&key) {
            return hit;
        }
        let value = fitness_of(assignment, catalog);
        let mut map = self.inner.lock().unwrap();
        let mut order = self.order.lock().unwrap();
        if !map.contains_key(&key) {
            if order.len() >= self.capacity {
                if let Some(oldest) = order.first().copied() {
                    map.remove(&oldest);
                    order.remove(0);
                }
            }
            order.push(key);
        }
        map.insert(key, value);
        value
    }
}

/// A cheap, order-independent fingerprint of an assignment's contents,
/// used as the cache key — two individuals with the same placements hash
/// equal regardless of internal map iteration order.
pub fn fingerprint(assignment: &Assignment) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut combined: u64 = 0;
    for (key, pair) in assignment.iter() {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        pair.hash(&mut hasher);
        combined ^= hasher.finish();
    }
    combined
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::assignment::{SessionKey, SlotRoomPair};
    use crate::catalog::TimeConfig;
    use crate::model::{Course, Faculty, Room};

    fn tiny_catalog() -> EntityCatalog {
        let faculty = Faculty { faculty_id: "f1".into(), dept_id: "CS".into(), max_weekly_load: 10, availability: HashSet::from([(0, 0), (0, 1)]), preferences: Default::default() };
        let room = Room { room_id: "r1".into(), seating_capacity: 50, features: HashSet::new(), building_id: "B1".into() };
        let course = Course { course_id: "A".into(), dept_id: "CS".into(), duration: 1, faculty_id: "f1".into(), student_ids: HashSet::new(), required_features: HashSet::new(), enrollment_count: 10 };
        let time_config = TimeConfig { working_days: 1, slots_per_day: 2, start_time: "08:00".into(), end_time: "10:00".into(), lunch_break: None };
        EntityCatalog::build(vec![course], vec![faculty], vec![room], vec![], time_config).unwrap()
    }

    #[test]
    fn infeasible_assignment_has_large_negative_fitness() {
        let catalog = tiny_catalog();
        let mut assignment = Assignment::new();
        assignment.set(SessionKey::new("A", 0), SlotRoomPair { slot_id: "CS_0_0".into(), room_id: "r1".into() });
        // duplicate the same course under a fabricated second key sharing the faculty's wall-clock
        assignment.set(SessionKey::new("A", 0), SlotRoomPair { slot_id: "CS_0_0".into(), room_id: "r1".into() });
        let fitness = fitness_of(&assignment, &catalog);
        assert!(fitness <= 0.0);
    }

    #[test]
    fn fingerprint_is_order_independent() {
        let mut a = Assignment::new();
        a.set(SessionKey::new("A", 0), SlotRoomPair { slot_id: "CS_0_0".into(), room_id: "r1".into() });
        a.set(SessionKey::new("B", 0), SlotRoomPair { slot_id: "CS_0_1".into(), room_id: "r1".into() });

        let mut b = Assignment::new();
        b.set(SessionKey::new("B", 0), SlotRoomPair { slot_id: "CS_0_1".into(), room_id: "r1".into() });
        b.set(SessionKey::new("A", 0), SlotRoomPair { slot_id: "CS_0_0".into(), room_id: "r1".into() });

        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn cache_returns_consistent_values_for_the_same_key() {
        let catalog = tiny_catalog();
        let mut assignment = Assignment::new();
        assignment.set(SessionKey::new("A", 0), SlotRoomPair { slot_id: "CS_0_0".into(), room_id: "r1".into() });
        let cache = FitnessCache::new(4);
        let key = fingerprint(&assignment);
        let first = cache.get_or_compute(key, &assignment, &catalog);
        let second = cache.get_or_compute(key, &assignment, &catalog);
        assert_eq!(first, second);
    }
}
