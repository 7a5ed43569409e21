//! Conflict state fingerprinting.

use std::hash::{Hash, Hasher};

use crate::assignment::{Conflict, SessionKey};

/// Compact fingerprint of a conflict's local neighborhood, hashed to a
/// bounded state space for the Q-table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConflictState {
    pub course_id: String,
    pub current_slot_id: String,
    pub current_room_id: String,
    pub conflict_kind: ConflictKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    Faculty,
    Room,
    Student,
    Capacity,
    Feature,
}

impl From<&Conflict> for ConflictKind {
    fn from(c: &Conflict) -> Self {
        match c {
            Conflict::FacultyConflict { .. } => ConflictKind::Faculty,
            Conflict::RoomConflict { .. } => ConflictKind::Room,
            Conflict::StudentConflict { .. } => ConflictKind::Student,
            Conflict::CapacityViolation { .. } => ConflictKind::Capacity,
            Conflict::FeatureViolation { .. } => ConflictKind::Feature,
        }
    }
}

impl ConflictState {
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// The session-bearing course a conflict attaches to, used to look up the
/// course whose placement an action would change.
pub fn offending_session(conflict: &Conflict, catalog: &crate::catalog::EntityCatalog, assignment: &crate::assignment::Assignment) -> Option<(SessionKey, ConflictState)> {
    let (course_id, slot_id, room_id) = match conflict {
        Conflict::FacultyConflict { faculty_id, wall_clock } => find_session_for_faculty_at(faculty_id, *wall_clock, catalog, assignment)?,
        Conflict::RoomConflict { room_id, wall_clock } => find_session_for_room_at(room_id, *wall_clock, catalog, assignment)?,
        Conflict::StudentConflict { student_id, wall_clock } => find_session_for_student_at(student_id, *wall_clock, catalog, assignment)?,
        Conflict::CapacityViolation { course_id, room_id } | Conflict::FeatureViolation { course_id, room_id } => {
            let (key, pair) = assignment.iter().find(|(k, _)| &k.course_id == course_id)?;
            (key.clone(), pair.slot_id.clone(), room_id.clone())
        }
    };

    let state = ConflictState { course_id: course_id.course_id.clone(), current_slot_id: slot_id, current_room_id: room_id, conflict_kind: ConflictKind::from(conflict) };
    Some((course_id, state))
}

fn find_session_for_faculty_at(faculty_id: &str, wall_clock: (u32, u32), catalog: &crate::catalog::EntityCatalog, assignment: &crate::assignment::Assignment) -> Option<(SessionKey, String, String)> {
    assignment.iter().find_map(|(key, pair)| {
        let course = catalog.course(&key.course_id)?;
        if course.faculty_id != faculty_id {
            return None;
        }
        if catalog.wall_clock_of(&pair.slot_id)? == wall_clock { Some((key.clone(), pair.slot_id.clone(), pair.room_id.clone())) } else { None }
    })
}

fn find_session_for_room_at(room_id: &str, wall_clock: (u32, u32), catalog: &crate::catalog::EntityCatalog, assignment: &crate::assignment::Assignment) -> Option<(SessionKey, String, String)> {
    assignment.iter().find_map(|(key, pair)| {
        if pair.room_id != room_id {
            return None;
        }
        if catalog.wall_clock_of(&pair.slot_id)? == wall_clock { Some((key.clone(), pair.slot_id.clone(), pair.room_id.clone())) } else { None }
    })
}

fn find_session_for_student_at(student_id: &str, wall_clock: (u32, u32), catalog: &crate::catalog::EntityCatalog, assignment: &crate::assignment::Assignment) -> Option<(SessionKey, String, String)> {
    assignment.iter().find_map(|(key, pair)| {
        let course = catalog.course(&key.course_id)?;
        if !course.student_ids.contains(student_id) {
            return None;
        }
        if catalog.wall_clock_of(&pair.slot_id)? == wall_clock { Some((key.clone(), pair.slot_id.clone(), pair.room_id.clone())) } else { None }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_conflict_neighborhood_hashes_identically() {
        let a = ConflictState { course_id: "A".into(), current_slot_id: "CS_0_0".into(), current_room_id: "r1".into(), conflict_kind: ConflictKind::Faculty };
        let b = ConflictState { course_id: "A".into(), current_slot_id: "CS_0_0".into(), current_room_id: "r1".into(), conflict_kind: ConflictKind::Faculty };
        assert_eq!(a.fingerprint(), b.fingerprint());
    }
}
