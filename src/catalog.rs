//! Entity catalog.
//!
//! Loaded once per job from a [`crate::external::CatalogProvider`], then
//! read-only shared for the whole pipeline. A single primary map plus a
//! secondary wall-clock index, built once and never mutated again, so
//! plain `HashMap`s are enough (no `SlotMap`/`RwLock` churn needed once
//! built).

use std::collections::HashMap;

use bimap::BiHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{Course, CourseId, DeptId, Faculty, FacultyId, Room, RoomId, SlotId, Student, StudentId, TimeSlot, WallClock};

/// Time grid shared by the whole university; each department owns its own
/// independent copy of this grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeConfig {
    pub working_days: u32,
    pub slots_per_day: u32,
    pub start_time: String,
    pub end_time: String,
    pub lunch_break: Option<u32>,
}

/// Immutable, read-only-shared snapshot of every entity in a job.
#[derive(Debug, Clone, Default)]
pub struct EntityCatalog {
    courses: HashMap<CourseId, Course>,
    faculty: HashMap<FacultyId, Faculty>,
    rooms: HashMap<RoomId, Room>,
    students: HashMap<StudentId, Student>,
    slots: HashMap<SlotId, TimeSlot>,

    /// Bijection between a slot's canonical id and its `(dept, day, period)`
    /// triple — every slot id maps to exactly one triple and vice versa.
    slot_index: BiHashMap<SlotId, (DeptId, u32, u32)>,

    /// The single source of truth for cross-department wall-clock
    /// exclusivity: every departmental slot id sharing one `(day, period)`.
    wall_clock_index: HashMap<WallClock, Vec<SlotId>>,

    depts: Vec<DeptId>,
}

impl EntityCatalog {
    /// Builds a catalog from raw entities plus the time grid, synthesizing
    /// one [`TimeSlot`] per `(dept, day, period)` triple — time slots are
    /// generated, not stored externally.
    pub fn build(courses: Vec<Course>, faculty: Vec<Faculty>, rooms: Vec<Room>, students: Vec<Student>, time_config: TimeConfig) -> Result<Self> {
        if courses.is_empty() {
            return Err(Error::CatalogInvalid { reason: "catalog has zero courses".into() });
        }
        for c in &courses {
            if c.duration == 0 {
                return Err(Error::CatalogInvalid { reason: format!("course {} has duration 0", c.course_id) });
            }
        }

        let mut depts: Vec<DeptId> = courses.iter().map(|c| c.dept_id.clone()).collect();
        depts.sort();
        depts.dedup();

        let mut slots = HashMap::new();
        let mut slot_index = BiHashMap::new();
        let mut wall_clock_index: HashMap<WallClock, Vec<SlotId>> = HashMap::new();

        for dept_id in &depts {
            for day in 0..time_config.working_days {
                for period in 0..time_config.slots_per_day {
                    let slot_id = TimeSlot::make_id(dept_id, day, period);
                    slot_index.insert(slot_id.clone(), (dept_id.clone(), day, period));
                    wall_clock_index.entry((day, period)).or_default().push(slot_id.clone());
                    slots.insert(
                        slot_id.clone(),
                        TimeSlot { slot_id, dept_id: dept_id.clone(), day, period, start_time: time_config.start_time.clone(), end_time: time_config.end_time.clone() },
                    );
                }
            }
        }

        Ok(Self {
            courses: courses.into_iter().map(|c| (c.course_id.clone(), c)).collect(),
            faculty: faculty.into_iter().map(|f| (f.faculty_id.clone(), f)).collect(),
            rooms: rooms.into_iter().map(|r| (r.room_id.clone(), r)).collect(),
            students: students.into_iter().map(|s| (s.student_id.clone(), s)).collect(),
            slots,
            slot_index,
            wall_clock_index,
            depts,
        })
    }

    pub fn course(&self, id: &str) -> Option<&Course> {
        self.courses.get(id)
    }

    pub fn faculty(&self, id: &str) -> Option<&Faculty> {
        self.faculty.get(id)
    }

    pub fn room(&self, id: &str) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn student(&self, id: &str) -> Option<&Student> {
        self.students.get(id)
    }

    pub fn slot(&self, id: &str) -> Option<&TimeSlot> {
        self.slots.get(id)
    }

    pub fn courses(&self) -> impl Iterator<Item = &Course> {
        self.courses.values()
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn courses_in_dept<'a>(&'a self, dept_id: &'a str) -> impl Iterator<Item = &'a Course> {
        self.courses.values().filter(move |c| c.dept_id == dept_id)
    }

    pub fn slots_in_dept<'a>(&'a self, dept_id: &'a str) -> impl Iterator<Item = &'a TimeSlot> {
        self.slots.values().filter(move |s| s.dept_id == dept_id)
    }

    pub fn depts(&self) -> &[DeptId] {
        &self.depts
    }

    /// All departmental slot ids that collide at the given wall clock —
    /// the single source for every exclusivity check.
    pub fn wall_clock_slots(&self, wall_clock: WallClock) -> &[SlotId] {
        self.wall_clock_index.get(&wall_clock).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn wall_clock_of(&self, slot_id: &str) -> Option<WallClock> {
        self.slot_index.get_by_left(slot_id).map(|(_, d, p)| (*d, *p))
    }

    pub fn dept_of_slot(&self, slot_id: &str) -> Option<&DeptId> {
        self.slot_index.get_by_left(slot_id).map(|(d, _, _)| d)
    }

    pub fn course_count(&self) -> usize {
        self.courses.len()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn tiny_catalog() -> EntityCatalog {
        let course = Course {
            course_id: "c1".into(),
            dept_id: "CS".into(),
            duration: 1,
            faculty_id: "f1".into(),
            student_ids: HashSet::new(),
            required_features: HashSet::new(),
            enrollment_count: 10,
        };
        let faculty = Faculty { faculty_id: "f1".into(), dept_id: "CS".into(), max_weekly_load: 10, availability: HashSet::from([(0, 0)]), preferences: Default::default() };
        let room = Room { room_id: "r1".into(), seating_capacity: 50, features: HashSet::new(), building_id: "B1".into() };
        let time_config = TimeConfig { working_days: 1, slots_per_day: 2, start_time: "08:00".into(), end_time: "17:00".into(), lunch_break: None };
        EntityCatalog::build(vec![course], vec![faculty], vec![room], vec![], time_config).unwrap()
    }

    #[test]
    fn wall_clock_index_groups_same_day_period_across_depts() {
        let course2 = Course {
            course_id: "c2".into(),
            dept_id: "PH".into(),
            duration: 1,
            faculty_id: "f1".into(),
            student_ids: HashSet::new(),
            required_features: HashSet::new(),
            enrollment_count: 10,
        };
        let faculty = Faculty { faculty_id: "f1".into(), dept_id: "CS".into(), max_weekly_load: 10, availability: HashSet::from([(0, 0)]), preferences: Default::default() };
        let time_config = TimeConfig { working_days: 1, slots_per_day: 1, start_time: "08:00".into(), end_time: "09:00".into(), lunch_break: None };
        let course1 = Course { course_id: "c1".into(), dept_id: "CS".into(), duration: 1, faculty_id: "f1".into(), student_ids: HashSet::new(), required_features: HashSet::new(), enrollment_count: 5 };
        let catalog = EntityCatalog::build(vec![course1, course2], vec![faculty], vec![], vec![], time_config).unwrap();

        let at_0_0 = catalog.wall_clock_slots((0, 0));
        assert_eq!(at_0_0.len(), 2);
        assert!(at_0_0.contains(&"CS_0_0".to_string()));
        assert!(at_0_0.contains(&"PH_0_0".to_string()));
    }

    #[test]
    fn empty_catalog_is_invalid() {
        let time_config = TimeConfig { working_days: 1, slots_per_day: 1, start_time: "08:00".into(), end_time: "09:00".into(), lunch_break: None };
        let err = EntityCatalog::build(vec![], vec![], vec![], vec![], time_config).unwrap_err();
        assert!(matches!(err, Error::CatalogInvalid { .. }));
    }

    #[test]
    fn zero_duration_course_is_invalid() {
        let mut bad = Course { course_id: "c0".into(), dept_id: "CS".into(), duration: 0, faculty_id: "f1".into(), student_ids: HashSet::new(), required_features: HashSet::new(), enrollment_count: 1 };
        bad.duration = 0;
        let time_config = TimeConfig { working_days: 1, slots_per_day: 1, start_time: "08:00".into(), end_time: "09:00".into(), lunch_break: None };
        let err = EntityCatalog::build(vec![bad], vec![], vec![], vec![], time_config).unwrap_err();
        assert!(matches!(err, Error::CatalogInvalid { .. }));
    }

    #[test]
    fn slot_id_round_trips_through_bimap_index() {
        let catalog = tiny_catalog();
        assert_eq!(catalog.wall_clock_of("CS_0_1"), Some((0, 1)));
        assert_eq!(catalog.dept_of_slot("CS_0_1").map(String::as_str), Some("CS"));
    }
}
