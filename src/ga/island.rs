//! One GA island's per-generation evolution loop.

use std::collections::HashMap;

use rand::Rng;

use super::fitness::{FitnessCache, fingerprint};
use super::individual::Individual;
use crate::assignment::{Assignment, SessionKey};
use crate::catalog::EntityCatalog;
use crate::config::SolverConfig;
use crate::cpsat::domain::SessionDomain;
use crate::model::Course;

pub struct Island {
    pub population: Vec<Individual>,
    pub cache: FitnessCache,
    best_fitness: f64,
    stale_generations: usize,
}

impl Island {
    pub fn new(seed: Assignment, size: usize, courses: &HashMap<String, Course>, domains: &HashMap<String, SessionDomain>, config: &SolverConfig, rng: &mut impl Rng) -> Self {
        let mut population = Vec::with_capacity(size);
        population.push(Individual::seeded(seed.clone()));
        for _ in 1..size.max(1) {
            let mut individual = Individual::seeded(seed.clone());
            let perturbations = 1 + rng.random_range(0..(courses.len().max(1) / 10).max(1));
            for _ in 0..perturbations {
                individual.mutate_one(courses, domains, rng);
            }
            population.push(individual);
        }
        Self { population, cache: FitnessCache::new(config_cache_cap(config)), best_fitness: f64::NEG_INFINITY, stale_generations: 0 }
    }

    pub fn best(&self, catalog: &EntityCatalog) -> (&Individual, f64) {
        self.population.iter().map(|ind| (ind, self.cache.get_or_compute(fingerprint(&ind.assignment), &ind.assignment, catalog))).max_by(|a, b| a.1.partial_cmp(&b.1).unwrap()).expect("island population is never empty")
    }

    /// Runs one generation: evaluate, elitism, tournament selection, smart
    /// crossover, annealed mutation, population replacement. Returns the
    /// best fitness observed this generation and whether early stopping
    /// should trigger.
    pub fn step(&mut self, generation: usize, courses: &HashMap<String, Course>, domains: &HashMap<String, SessionDomain>, catalog: &EntityCatalog, config: &SolverConfig, rng: &mut impl Rng) -> (f64, bool) {
        let scored: Vec<(usize, f64)> = self.population.iter().enumerate().map(|(i, ind)| (i, self.cache.get_or_compute(fingerprint(&ind.assignment), &ind.assignment, catalog))).collect();
        let mut ranked = scored.clone();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

        let mutation_rate = anneal(config.ga_mutation_rate_start, config.ga_mutation_rate_end, generation, config.ga_generations);

        let elite_idx = ranked[0].0;
        let mut next_population = vec![self.population[elite_idx].clone()];

        while next_population.len() < self.population.len() {
            let parent_a = tournament_select(&ranked, config.ga_tournament_size, rng);
            let parent_b = tournament_select(&ranked, config.ga_tournament_size, rng);
            let mut child = smart_crossover(&self.population[parent_a], &self.population[parent_b], &ranked, parent_a, parent_b, rng);
            if rng.random_range(0.0..1.0) < mutation_rate {
                child.mutate_one(courses, domains, rng);
            }
            next_population.push(child);
        }
        self.population = next_population;

        let best_fitness = ranked[0].1;
        if best_fitness > self.best_fitness + 1e-9 {
            self.best_fitness = best_fitness;
            self.stale_generations = 0;
        } else {
            self.stale_generations += 1;
        }
        (best_fitness, self.stale_generations >= config.ga_early_stop_patience)
    }

    pub fn replace_worst(&mut self, incoming: Individual, catalog: &EntityCatalog) {
        let worst_idx = self
            .population
            .iter()
            .enumerate()
            .map(|(i, ind)| (i, self.cache.get_or_compute(fingerprint(&ind.assignment), &ind.assignment, catalog)))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap_or(0);
        self.population[worst_idx] = incoming;
    }
}

fn config_cache_cap(config: &SolverConfig) -> usize {
    config.ga_fitness_cache_cap
}

fn anneal(start: f64, end: f64, generation: usize, total_generations: usize) -> f64 {
    if total_generations == 0 {
        return end;
    }
    let t = (generation as f64 / total_generations as f64).min(1.0);
    start + (end - start) * t
}

fn tournament_select(ranked: &[(usize, f64)], size: usize, rng: &mut impl Rng) -> usize {
    let mut best: Option<(usize, f64)> = None;
    for _ in 0..size.max(1) {
        let candidate = ranked[rng.random_range(0..ranked.len())];
        if best.is_none_or(|(_, f)| candidate.1 > f) {
            best = Some(candidate);
        }
    }
    best.map(|(idx, _)| idx).unwrap_or(0)
}

/// Uniform crossover over session keys, biased toward whichever parent
/// scored higher overall — a parent whose value causes fewer conflicts
/// for a key should contribute it more often, approximated here at
/// individual granularity since per-key conflict attribution would require
/// re-evaluating the whole assignment per key.
fn smart_crossover(parent_a: &Individual, parent_b: &Individual, ranked: &[(usize, f64)], idx_a: usize, idx_b: usize, rng: &mut impl Rng) -> Individual {
    let fitness_a = ranked.iter().find(|(i, _)| *i == idx_a).map(|(_, f)| *f).unwrap_or(0.0);
    let fitness_b = ranked.iter().find(|(i, _)| *i == idx_b).map(|(_, f)| *f).unwrap_or(0.0);
    let bias_towards_a = if fitness_a >= fitness_b { 0.7 } else { 0.3 };

    let mut keys: Vec<SessionKey> = parent_a.assignment.keys().cloned().collect();
    for k in parent_b.assignment.keys() {
        if !keys.contains(k) {
            keys.push(k.clone());
        }
    }

    let mut child_assignment = Assignment::new();
    for key in keys {
        let from_a = rng.random_range(0.0..1.0) < bias_towards_a;
        let chosen = if from_a { parent_a.assignment.get(&key).or_else(|| parent_b.assignment.get(&key)) } else { parent_b.assignment.get(&key).or_else(|| parent_a.assignment.get(&key)) };
        match chosen {
            Some(pair) => child_assignment.set(key, pair.clone()),
            None => child_assignment.mark_deferred(key),
        }
    }
    Individual { assignment: child_assignment }
}
