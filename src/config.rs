//! Explicit, orchestrator-scoped configuration.
//!
//! One struct threaded by shared reference into every stage, in place of
//! module-level `lazy_static` globals.

use crate::cpsat::strategy::{Strategy, StudentPriority};

#[derive(Debug, Clone)]
pub struct SolverConfig {
    // --- Stage 1: Louvain clustering ---
    pub max_cluster_size: usize,
    pub min_cluster_size: usize,
    pub louvain_edge_threshold: f64,
    pub louvain_iteration_cap: usize,
    pub faculty_match_weight: f64,
    pub student_overlap_weight: f64,
    pub dept_match_weight: f64,

    // --- Stage 2A: CP-SAT strategy ladder ---
    pub cpsat_strategies: Vec<Strategy>,
    pub cpsat_max_parallel: usize,
    pub max_domain_pairs_per_session: usize,

    // --- Stage 2B: Island GA ---
    pub ga_num_islands: usize,
    pub ga_population_per_island: usize,
    pub ga_generations: usize,
    pub ga_migration_interval: usize,
    pub ga_early_stop_patience: usize,
    pub ga_mutation_rate_start: f64,
    pub ga_mutation_rate_end: f64,
    pub ga_tournament_size: usize,
    pub ga_fitness_cache_cap: usize,
    pub ga_max_population_times_courses: usize,

    // --- Stage 3: RL repair ---
    pub rl_max_episodes: usize,
    pub rl_batch_size_hi: usize,
    pub rl_batch_size_lo: usize,
    pub rl_per_episode_timeout_s: u64,
    pub rl_skip_threshold: usize,
    pub rl_top_k_actions: usize,
    pub rl_alpha: f64,
    pub rl_gamma: f64,
    pub rl_epsilon_start: f64,
    pub rl_epsilon_end: f64,

    // --- Resource monitor ---
    pub resource_ceiling_bytes: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_cluster_size: 50,
            min_cluster_size: 5,
            louvain_edge_threshold: 0.5,
            louvain_iteration_cap: 100,
            faculty_match_weight: 10.0,
            student_overlap_weight: 5.0,
            dept_match_weight: 1.0,

            cpsat_strategies: vec![
                Strategy { name: "Full Solve".into(), student_priority: StudentPriority::All, timeout_s: 60, constraint_budget: 50_000 },
                Strategy { name: "Relaxed Student".into(), student_priority: StudentPriority::High, timeout_s: 30, constraint_budget: 10_000 },
                Strategy { name: "Faculty+Room Only".into(), student_priority: StudentPriority::Low, timeout_s: 15, constraint_budget: 5_000 },
                Strategy { name: "Minimal".into(), student_priority: StudentPriority::Low, timeout_s: 5, constraint_budget: 2_000 },
            ],
            cpsat_max_parallel: default_cluster_parallelism(),
            max_domain_pairs_per_session: 20,

            ga_num_islands: 4,
            ga_population_per_island: 8,
            ga_generations: 20,
            ga_migration_interval: 5,
            ga_early_stop_patience: 5,
            ga_mutation_rate_start: 0.1,
            ga_mutation_rate_end: 0.02,
            ga_tournament_size: 3,
            ga_fitness_cache_cap: 500,
            ga_max_population_times_courses: 200_000,

            rl_max_episodes: 1000,
            rl_batch_size_hi: 16,
            rl_batch_size_lo: 8,
            rl_per_episode_timeout_s: 5,
            rl_skip_threshold: 10,
            rl_top_k_actions: 10,
            rl_alpha: 0.1,
            rl_gamma: 0.9,
            rl_epsilon_start: 0.3,
            rl_epsilon_end: 0.02,

            resource_ceiling_bytes: 8 * 1024 * 1024 * 1024,
        }
    }
}

fn default_cluster_parallelism() -> usize {
    let cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
    (cores / 2).max(2)
}

impl SolverConfig {
    pub fn builder() -> SolverConfigBuilder {
        SolverConfigBuilder { cfg: SolverConfig::default() }
    }
}

/// Builder chain over [`SolverConfig`], preferring explicit construction
/// over implicit global state.
#[derive(Debug, Clone)]
pub struct SolverConfigBuilder {
    cfg: SolverConfig,
}

impl SolverConfigBuilder {
    pub fn max_cluster_size(mut self, v: usize) -> Self {
        self.cfg.max_cluster_size = v;
        self
    }

    pub fn louvain_edge_threshold(mut self, v: f64) -> Self {
        self.cfg.louvain_edge_threshold = v;
        self
    }

    pub fn cpsat_strategies(mut self, v: Vec<Strategy>) -> Self {
        self.cfg.cpsat_strategies = v;
        self
    }

    pub fn cpsat_max_parallel(mut self, v: usize) -> Self {
        self.cfg.cpsat_max_parallel = v;
        self
    }

    pub fn ga_num_islands(mut self, v: usize) -> Self {
        self.cfg.ga_num_islands = v;
        self
    }

    pub fn ga_population_per_island(mut self, v: usize) -> Self {
        self.cfg.ga_population_per_island = v;
        self
    }

    pub fn ga_generations(mut self, v: usize) -> Self {
        self.cfg.ga_generations = v;
        self
    }

    pub fn rl_max_episodes(mut self, v: usize) -> Self {
        self.cfg.rl_max_episodes = v;
        self
    }

    pub fn resource_ceiling_bytes(mut self, v: u64) -> Self {
        self.cfg.resource_ceiling_bytes = v;
        self
    }

    pub fn build(self) -> SolverConfig {
        self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ladder_has_four_rungs_in_decreasing_budget_order() {
        let cfg = SolverConfig::default();
        assert_eq!(cfg.cpsat_strategies.len(), 4);
        for pair in cfg.cpsat_strategies.windows(2) {
            assert!(pair[0].constraint_budget >= pair[1].constraint_budget);
        }
    }

    #[test]
    fn builder_overrides_apply() {
        let cfg = SolverConfig::builder().max_cluster_size(30).ga_num_islands(2).build();
        assert_eq!(cfg.max_cluster_size, 30);
        assert_eq!(cfg.ga_num_islands, 2);
    }

    #[test]
    fn cluster_parallelism_floor_is_two_regardless_of_core_count() {
        for cores in [1usize, 2, 3] {
            assert_eq!((cores / 2).max(2), 2);
        }
        assert_eq!((4usize / 2).max(2), 2);
        assert_eq!((8usize / 2).max(2), 4);
    }
}
