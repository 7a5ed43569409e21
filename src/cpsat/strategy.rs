//! The CP-SAT strategy ladder: successive rungs relax student-conflict
//! enforcement to trade completeness for solver time under pressure.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudentPriority {
    /// Student exclusivity enforced for every student.
    All,
    /// Student exclusivity degraded to students enrolled in >= 3 courses.
    High,
    /// Student exclusivity degraded to students enrolled in >= 5 courses.
    Low,
}

impl StudentPriority {
    /// Minimum number of courses a student must be enrolled in (across the
    /// whole cluster) to have their exclusivity constraints included under
    /// this priority.
    pub fn min_course_count(self) -> usize {
        match self {
            StudentPriority::All => 0,
            StudentPriority::High => 3,
            StudentPriority::Low => 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    pub name: String,
    pub student_priority: StudentPriority,
    pub timeout_s: u64,
    pub constraint_budget: usize,
}

/// Result of attempting one rung of the ladder on one cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyOutcome {
    Feasible,
    Infeasible,
    BudgetExceeded,
}
