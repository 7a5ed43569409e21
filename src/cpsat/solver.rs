//! Stage 2A orchestration: the per-cluster strategy ladder, worker pool,
//! and mutex-guarded merge into the global assignment.

use std::sync::Mutex;

use rayon::prelude::*;

use super::domain::build_anchor_domains;
use super::greedy::greedy_assign;
use super::model::solve_cluster;
use crate::assignment::Assignment;
use crate::catalog::EntityCatalog;
use crate::cluster::ClusterSet;
use crate::config::SolverConfig;
use crate::error::Result;

/// Outcome of solving one cluster, used for the stage's success-rate metric.
#[derive(Debug, Clone)]
pub struct ClusterOutcome {
    pub cluster_size: usize,
    pub winning_strategy: Option<String>,
    pub greedy_assigned: usize,
    pub deferred: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Stage2aReport {
    pub outcomes: Vec<ClusterOutcome>,
}

impl Stage2aReport {
    /// Fraction of clusters solved by some CP-SAT rung rather than falling
    /// through entirely to greedy.
    pub fn cpsat_success_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 1.0;
        }
        let solved = self.outcomes.iter().filter(|o| o.winning_strategy.is_some()).count();
        solved as f64 / self.outcomes.len() as f64
    }
}

/// Solves every cluster, merging results into one global [`Assignment`].
/// Per-cluster failures are isolated: a cluster that exhausts its strategy
/// ladder falls back to the deterministic greedy assigner and never aborts
/// the stage.
pub fn solve_all(clusters: &ClusterSet, catalog: &EntityCatalog, config: &SolverConfig, parallelism: usize) -> Result<(Assignment, Stage2aReport)> {
    let pool = rayon::ThreadPoolBuilder::new().num_threads(parallelism.max(1)).build().map_err(|e| crate::error::Error::StageFailure { stage: "cpsat".into(), cause: e.to_string() })?;

    let global = Mutex::new(Assignment::new());
    let report = Mutex::new(Stage2aReport::default());

    pool.install(|| {
        clusters.values().collect::<Vec<_>>().par_iter().for_each(|cluster| {
            let outcome = solve_one_cluster(cluster, catalog, config);
            global.lock().unwrap().merge(outcome.0);
            report.lock().unwrap().outcomes.push(outcome.1);
        });
    });

    Ok((global.into_inner().unwrap(), report.into_inner().unwrap()))
}

fn solve_one_cluster(cluster: &[crate::model::Course], catalog: &EntityCatalog, config: &SolverConfig) -> (Assignment, ClusterOutcome) {
    let domains = build_anchor_domains(cluster, catalog, config);

    for strategy in &config.cpsat_strategies {
        match solve_cluster(cluster, catalog, &domains, strategy) {
            Ok(Some(assignment)) => {
                return (
                    assignment,
                    ClusterOutcome { cluster_size: cluster.len(), winning_strategy: Some(strategy.name.clone()), greedy_assigned: 0, deferred: 0 },
                );
            }
            Ok(None) => continue, // infeasible under this rung; try the next
            Err(_) => continue,   // treat a solver-level error like infeasibility and keep descending the ladder
        }
    }

    let assignment = greedy_assign(cluster, catalog);
    let deferred = assignment.deferred.len();
    let greedy_assigned = assignment.len();
    (assignment, ClusterOutcome { cluster_size: cluster.len(), winning_strategy: None, greedy_assigned, deferred })
}
