use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{CourseId, DeptId, FacultyId, StudentId};

/// A course to be scheduled. Immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub course_id: CourseId,
    pub dept_id: DeptId,

    /// Integer number of contiguous sessions the course requires per week.
    pub duration: u32,

    pub faculty_id: FacultyId,
    pub student_ids: HashSet<StudentId>,
    pub required_features: HashSet<String>,
    pub enrollment_count: u32,
}

impl Course {
    /// `(course_id, session_index)` keys this course should occupy in an
    /// [`crate::assignment::Assignment`].
    pub fn session_indices(&self) -> std::ops::Range<u32> {
        0..self.duration
    }
}
