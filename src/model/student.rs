use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{CourseId, StudentId};

/// A student. Immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub student_id: StudentId,
    pub enrolled_course_ids: HashSet<CourseId>,
}
