use serde::{Deserialize, Serialize};

use super::{Day, DeptId, Period, SlotId, WallClock};

/// A department-qualified time slot, synthesized by the catalog (not
/// stored externally) for every `(dept_id, day, period)` triple in the
/// shared time grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlot {
    pub slot_id: SlotId,
    pub dept_id: DeptId,
    pub day: Day,
    pub period: Period,
    pub start_time: String,
    pub end_time: String,
}

impl TimeSlot {
    /// Canonical id of the form `"{dept_id}_{day}_{period}"`.
    pub fn make_id(dept_id: &str, day: Day, period: Period) -> SlotId {
        format!("{dept_id}_{day}_{period}")
    }

    pub fn wall_clock(&self) -> WallClock {
        (self.day, self.period)
    }
}
