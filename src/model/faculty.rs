use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{DeptId, FacultyId, WallClock};

/// A faculty member. Immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Faculty {
    pub faculty_id: FacultyId,
    pub dept_id: DeptId,
    pub max_weekly_load: u32,

    /// `(day, period)` wall-clock coordinates this faculty can teach at.
    pub availability: HashSet<WallClock>,

    /// Optional soft preference weight per wall-clock coordinate, consumed
    /// by the GA's `faculty_pref` fitness component.
    pub preferences: HashMap<WallClock, f64>,
}

impl Faculty {
    pub fn is_available(&self, wall_clock: WallClock) -> bool {
        self.availability.contains(&wall_clock)
    }

    pub fn preference_for(&self, wall_clock: WallClock) -> f64 {
        self.preferences.get(&wall_clock).copied().unwrap_or(0.5)
    }
}
