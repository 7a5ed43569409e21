//! Stage 2B — island-model genetic refinement.
//!
//! Islands evolve concurrently on a `rayon` thread pool; each `rayon`
//! parallel iteration over the island slice is itself the barrier that
//! all islands complete a generation before migration runs. Process
//! pools are never used here, only scoped thread pools.

pub mod fitness;
pub mod individual;
pub mod island;

use std::collections::HashMap;

use rayon::prelude::*;

use crate::assignment::Assignment;
use crate::catalog::EntityCatalog;
use crate::config::SolverConfig;
use crate::cpsat::domain::build_anchor_domains;
use crate::model::Course;
use crate::progress::{ProgressBus, stage_weight};
use crate::resource_monitor::{ResourceLevel, ResourceMonitor};
use island::Island;

/// Runs the full island-GA stage and returns the best individual's
/// assignment across all islands after termination.
pub fn run(seed: Assignment, courses: &[Course], catalog: &EntityCatalog, config: &SolverConfig, resource_monitor: &ResourceMonitor, progress: &ProgressBus, job_id: &str) -> crate::error::Result<Assignment> {
    let courses_map: HashMap<String, Course> = courses.iter().map(|c| (c.course_id.clone(), c.clone())).collect();
    let domains = build_anchor_domains(courses, catalog, config);

    let (num_islands, population_size) = sized_for_resources(config, resource_monitor);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_islands.max(1))
        .build()
        .map_err(|e| crate::error::Error::StageFailure { stage: "ga".into(), cause: e.to_string() })?;

    let mut islands: Vec<Island> = (0..num_islands)
        .map(|_| {
            let mut rng = rand::rng();
            Island::new(seed.clone(), population_size, &courses_map, &domains, config, &mut rng)
        })
        .collect();
    let stalled: Vec<std::sync::atomic::AtomicBool> = (0..num_islands).map(|_| std::sync::atomic::AtomicBool::new(false)).collect();

    let mut generation = 0usize;
    while generation < config.ga_generations {
        if progress.is_cancelled(job_id) {
            return Err(crate::error::Error::Cancelled);
        }

        let block_end = (generation + config.ga_migration_interval).min(config.ga_generations);
        pool.install(|| {
            islands.par_iter_mut().enumerate().for_each(|(i, island)| {
                use std::sync::atomic::Ordering;
                if stalled[i].load(Ordering::Relaxed) {
                    return;
                }
                let mut rng = rand::rng();
                for g in generation..block_end {
                    let (_, should_stop) = island.step(g, &courses_map, &domains, catalog, config, &mut rng);
                    if should_stop {
                        stalled[i].store(true, Ordering::Relaxed);
                        break;
                    }
                }
            });
        });
        generation = block_end;

        if islands.len() > 1 {
            let bests: Vec<_> = islands.iter().map(|isl| isl.best(catalog).0.clone()).collect();
            for i in 0..islands.len() {
                let donor = (i + islands.len() - 1) % islands.len();
                islands[i].replace_worst(bests[donor].clone(), catalog);
            }
        }

        let fraction = stage_weight::LOAD + stage_weight::CLUSTER + stage_weight::CPSAT + stage_weight::GA * (generation as f64 / config.ga_generations.max(1) as f64);
        progress.publish(crate::progress::ProgressEvent {
            job_id: job_id.to_string(),
            stage_name: "ga".into(),
            fraction_complete: fraction,
            human_message: format!("GA generation {generation}/{}", config.ga_generations),
            status: crate::progress::JobStatus::Running,
        });

        if matches!(resource_monitor.current_level(), ResourceLevel::Critical | ResourceLevel::Emergency) {
            break;
        }
        if stalled.iter().all(|s| s.load(std::sync::atomic::Ordering::Relaxed)) {
            break;
        }
    }

    let best = islands.iter().map(|isl| isl.best(catalog)).max_by(|a, b| a.1.partial_cmp(&b.1).unwrap()).map(|(ind, _)| ind.assignment.clone()).unwrap_or(seed);
    Ok(best)
}

fn sized_for_resources(config: &SolverConfig, resource_monitor: &ResourceMonitor) -> (usize, usize) {
    match resource_monitor.current_level() {
        ResourceLevel::Critical => ((config.ga_num_islands / 2).max(1), (config.ga_population_per_island / 2).max(2)),
        ResourceLevel::Emergency => (1, 2),
        _ => (config.ga_num_islands.max(1), config.ga_population_per_island.max(2)),
    }
}
