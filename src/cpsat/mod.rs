//! Stage 2A — adaptive CP-SAT solver.

pub mod domain;
pub mod greedy;
pub mod model;
pub mod solver;
pub mod strategy;

pub use solver::{ClusterOutcome, Stage2aReport, solve_all};
pub use strategy::{Strategy, StrategyOutcome, StudentPriority};
