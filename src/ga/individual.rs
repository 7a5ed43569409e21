//! The GA's chromosome representation.

use std::collections::HashMap;

use rand::Rng;

use crate::assignment::{Assignment, SessionKey, SlotRoomPair};
use crate::cpsat::domain::SessionDomain;
use crate::model::{Course, TimeSlot};

/// A complete assignment map, not necessarily feasible with respect to
/// the hard constraints — feasibility is not a precondition here, the
/// fitness function penalizes infeasibility instead.
#[derive(Debug, Clone)]
pub struct Individual {
    pub assignment: Assignment,
}

impl Individual {
    pub fn seeded(seed: Assignment) -> Self {
        Self { assignment: seed }
    }

    /// Replaces one course's anchor placement (and its derived contiguous
    /// sessions) with a different candidate drawn from its valid domain.
    pub fn mutate_one<R: Rng + ?Sized>(&mut self, courses: &HashMap<String, Course>, domains: &HashMap<String, SessionDomain>, rng: &mut R) {
        let course_ids: Vec<&String> = domains.keys().collect();
        if course_ids.is_empty() {
            return;
        }
        let course_id = course_ids[rng.random_range(0..course_ids.len())];
        self.apply_random_candidate(course_id, courses, domains, rng);
    }

    pub fn apply_random_candidate<R: Rng + ?Sized>(&mut self, course_id: &str, courses: &HashMap<String, Course>, domains: &HashMap<String, SessionDomain>, rng: &mut R) {
        let Some(course) = courses.get(course_id) else { return };
        let Some(domain) = domains.get(course_id) else { return };
        if domain.pairs.is_empty() {
            return;
        }
        let pair = &domain.pairs[rng.random_range(0..domain.pairs.len())];
        place_course(&mut self.assignment, course, pair);
    }
}

/// Writes every derived session of `course` anchored at `pair` into
/// `assignment`, preserving the contiguity invariant by construction.
pub fn place_course(assignment: &mut Assignment, course: &Course, pair: &SlotRoomPair) {
    let Some((rest, period_str)) = pair.slot_id.rsplit_once('_') else { return };
    let Some((dept_id, day_str)) = rest.rsplit_once('_') else { return };
    let (Ok(day), Ok(period)) = (day_str.parse::<u32>(), period_str.parse::<u32>()) else { return };

    for offset in 0..course.duration {
        let slot_id = TimeSlot::make_id(dept_id, day, period + offset);
        let key = SessionKey::new(course.course_id.clone(), offset);
        assignment.set(key, SlotRoomPair { slot_id, room_id: pair.room_id.clone() });
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn placing_a_multi_session_course_derives_consecutive_periods() {
        let course = Course { course_id: "A".into(), dept_id: "CS".into(), duration: 3, faculty_id: "f1".into(), student_ids: HashSet::new(), required_features: HashSet::new(), enrollment_count: 10 };
        let mut assignment = Assignment::new();
        place_course(&mut assignment, &course, &SlotRoomPair { slot_id: "CS_0_1".into(), room_id: "r1".into() });

        assert_eq!(assignment.get(&SessionKey::new("A", 0)).unwrap().slot_id, "CS_0_1");
        assert_eq!(assignment.get(&SessionKey::new("A", 1)).unwrap().slot_id, "CS_0_2");
        assert_eq!(assignment.get(&SessionKey::new("A", 2)).unwrap().slot_id, "CS_0_3");
    }
}
