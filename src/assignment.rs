//! The final mapping from `(course_id, session_index)` to `(slot_id,
//! room_id)`, plus the conflict-record taxonomy and deferred-session
//! bookkeeping for sessions no stage could place.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{CourseId, FacultyId, RoomId, SlotId, StudentId, WallClock};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub course_id: CourseId,
    pub session_index: u32,
}

impl SessionKey {
    pub fn new(course_id: impl Into<CourseId>, session_index: u32) -> Self {
        Self { course_id: course_id.into(), session_index }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRoomPair {
    pub slot_id: SlotId,
    pub room_id: RoomId,
}

/// The `(course_id, session_index) -> (slot_id, room_id)` mapping, plus
/// book-keeping for sessions no stage could place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Assignment {
    entries: HashMap<SessionKey, SlotRoomPair>,
    pub deferred: Vec<SessionKey>,
}

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: SessionKey, value: SlotRoomPair) {
        self.deferred.retain(|k| k != &key);
        self.entries.insert(key, value);
    }

    pub fn get(&self, key: &SessionKey) -> Option<&SlotRoomPair> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &SessionKey) -> Option<SlotRoomPair> {
        self.entries.remove(key)
    }

    pub fn mark_deferred(&mut self, key: SessionKey) {
        if !self.deferred.contains(&key) {
            self.deferred.push(key);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SessionKey, &SlotRoomPair)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &SessionKey> {
        self.entries.keys()
    }

    /// Merges `other` into `self`, overwriting any colliding keys. Used when
    /// merging per-cluster CP-SAT results into the global assignment under
    /// a mutex.
    pub fn merge(&mut self, other: Assignment) {
        for (k, v) in other.entries {
            self.entries.insert(k, v);
        }
        for k in other.deferred {
            self.mark_deferred(k);
        }
    }
}

/// Tagged conflict record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Conflict {
    FacultyConflict { faculty_id: FacultyId, wall_clock: WallClock },
    RoomConflict { room_id: RoomId, wall_clock: WallClock },
    StudentConflict { student_id: StudentId, wall_clock: WallClock },
    CapacityViolation { room_id: RoomId, course_id: CourseId },
    FeatureViolation { room_id: RoomId, course_id: CourseId },
}

impl Conflict {
    pub fn is_hard(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_a_key_clears_any_prior_deferred_marker() {
        let mut a = Assignment::new();
        let key = SessionKey::new("c1", 0);
        a.mark_deferred(key.clone());
        assert_eq!(a.deferred.len(), 1);
        a.set(key.clone(), SlotRoomPair { slot_id: "s".into(), room_id: "r".into() });
        assert!(a.deferred.is_empty());
        assert!(a.get(&key).is_some());
    }

    #[test]
    fn merge_overwrites_colliding_keys_and_unions_deferred() {
        let mut a = Assignment::new();
        let k1 = SessionKey::new("c1", 0);
        a.set(k1.clone(), SlotRoomPair { slot_id: "s1".into(), room_id: "r1".into() });

        let mut b = Assignment::new();
        b.set(k1.clone(), SlotRoomPair { slot_id: "s2".into(), room_id: "r2".into() });
        b.mark_deferred(SessionKey::new("c2", 0));

        a.merge(b);
        assert_eq!(a.get(&k1).unwrap().slot_id, "s2");
        assert_eq!(a.deferred.len(), 1);
    }
}
