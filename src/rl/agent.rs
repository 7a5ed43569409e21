//! Stage 3 episode loop: epsilon-greedy conflict repair over a shared,
//! mutex-guarded Q-table.

use std::time::{Duration, Instant};

use rand::Rng;
use rayon::prelude::*;

use super::qtable::QTable;
use super::state::offending_session;
use crate::assignment::{Assignment, SessionKey, SlotRoomPair};
use crate::catalog::EntityCatalog;
use crate::config::SolverConfig;
use crate::cpsat::domain::SessionDomain;
use crate::metrics;
use crate::progress::{ProgressBus, stage_weight};
use crate::resource_monitor::{ResourceLevel, ResourceMonitor};

/// One candidate action for a conflicting session: either move it to one of
/// its top-k domain pairs, or "defer" (an explicit no-op action).
enum Action {
    Move(SlotRoomPair),
    Defer,
}

struct EpisodeResult {
    key: SessionKey,
    action: Action,
    state_fp: u64,
    action_idx: usize,
    reward: f64,
    next_fp: u64,
}

/// Repairs residual conflicts in `assignment` via tabular Q-learning,
/// returning the repaired assignment. A no-op if conflicts are already
/// below `rl_skip_threshold` or the assignment is already conflict-free.
pub fn run(mut assignment: Assignment, courses: &std::collections::HashMap<String, crate::model::Course>, domains: &std::collections::HashMap<String, SessionDomain>, catalog: &EntityCatalog, config: &SolverConfig, resource_monitor: &ResourceMonitor, progress: &ProgressBus, job_id: &str) -> Assignment {
    let initial_conflicts = metrics::detect_conflicts(&assignment, catalog);
    if initial_conflicts.len() < config.rl_skip_threshold {
        return assignment;
    }

    let qtable = QTable::new();
    let mut episodes_run = 0usize;

    loop {
        if progress.is_cancelled(job_id) {
            break;
        }
        let conflicts = metrics::detect_conflicts(&assignment, catalog);
        if conflicts.is_empty() {
            break;
        }
        if episodes_run >= config.rl_max_episodes {
            break;
        }
        if matches!(resource_monitor.current_level(), ResourceLevel::Emergency) {
            break;
        }

        let batch_size = if matches!(resource_monitor.current_level(), ResourceLevel::Warn | ResourceLevel::Critical) { config.rl_batch_size_lo } else { config.rl_batch_size_hi };
        let batch: Vec<_> = conflicts.into_iter().take(batch_size).collect();
        let base = assignment.clone();
        let epsilon = anneal(config.rl_epsilon_start, config.rl_epsilon_end, episodes_run, config.rl_max_episodes);

        let deadline_s = config.rl_per_episode_timeout_s;
        let results: Vec<Option<EpisodeResult>> = batch
            .par_iter()
            .map(|conflict| run_one_episode(conflict, &base, courses, domains, catalog, &qtable, epsilon, config.rl_top_k_actions, Duration::from_secs(deadline_s)))
            .collect();

        for result in results.into_iter().flatten() {
            qtable.update(result.state_fp, result.action_idx, result.reward, result.next_fp, config.rl_top_k_actions + 1, config.rl_alpha, config.rl_gamma);
            if result.reward >= 0.0 {
                if let Action::Move(pair) = result.action {
                    if let Some(course) = courses.get(&result.key.course_id) {
                        crate::ga::individual::place_course(&mut assignment, course, &pair);
                    }
                }
            }
            episodes_run += 1;
        }

        let fraction = stage_weight::LOAD + stage_weight::CLUSTER + stage_weight::CPSAT + stage_weight::GA + stage_weight::RL * (episodes_run as f64 / config.rl_max_episodes.max(1) as f64).min(1.0);
        progress.publish(crate::progress::ProgressEvent {
            job_id: job_id.to_string(),
            stage_name: "rl".into(),
            fraction_complete: fraction,
            human_message: format!("RL repair: {episodes_run} episodes"),
            status: crate::progress::JobStatus::Running,
        });
    }

    assignment
}

fn run_one_episode(
    conflict: &crate::assignment::Conflict,
    base: &Assignment,
    courses: &std::collections::HashMap<String, crate::model::Course>,
    domains: &std::collections::HashMap<String, SessionDomain>,
    catalog: &EntityCatalog,
    qtable: &QTable,
    epsilon: f64,
    top_k: usize,
    per_episode_budget: Duration,
) -> Option<EpisodeResult> {
    let started = Instant::now();
    let (key, state) = offending_session(conflict, catalog, base)?;
    let course = courses.get(&key.course_id)?;
    let domain = domains.get(&key.course_id);
    let candidates: Vec<&SlotRoomPair> = domain.map(|d| d.pairs.iter().take(top_k).collect()).unwrap_or_default();

    let state_fp = state.fingerprint();
    let num_actions = candidates.len() + 1; // + defer
    let mut rng = rand::rng();
    let action_idx = if rng.random_range(0.0..1.0) < epsilon {
        rng.random_range(0..num_actions)
    } else {
        (0..num_actions).max_by(|&a, &b| qtable.value(state_fp, a).partial_cmp(&qtable.value(state_fp, b)).unwrap()).unwrap_or(candidates.len())
    };

    if started.elapsed() > per_episode_budget {
        return None;
    }

    let action = if action_idx < candidates.len() { Action::Move(candidates[action_idx].clone()) } else { Action::Defer };

    let before = metrics::evaluate(base, catalog);
    let mut candidate_assignment = base.clone();
    if let Action::Move(pair) = &action {
        crate::ga::individual::place_course(&mut candidate_assignment, course, pair);
    }
    let after = metrics::evaluate(&candidate_assignment, catalog);

    let delta_conflicts = after.counts.total() as f64 - before.counts.total() as f64;
    let delta_quality = after.quality_score - before.quality_score;
    let reward = -100.0 * delta_conflicts + 0.3 * delta_quality;

    let next_state = ConflictStateNext { course_id: key.course_id.clone(), conflict_kind: state.conflict_kind };
    let next_fp = next_state.fingerprint();

    Some(EpisodeResult { key, action, state_fp, action_idx, reward, next_fp })
}

/// The next state's fingerprint needs only enough identity to look up
/// `max_a' Q(s', a')`; a coarser key than the full neighborhood is fine
/// since the Bellman target only needs a consistent bucket per course.
struct ConflictStateNext {
    course_id: String,
    conflict_kind: super::state::ConflictKind,
}

impl ConflictStateNext {
    fn fingerprint(&self) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.course_id.hash(&mut hasher);
        self.conflict_kind.hash(&mut hasher);
        hasher.finish()
    }
}

fn anneal(start: f64, end: f64, episode: usize, max_episodes: usize) -> f64 {
    if max_episodes == 0 {
        return end;
    }
    let t = (episode as f64 / max_episodes as f64).min(1.0);
    start + (end - start) * t
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use super::*;
    use crate::assignment::SessionKey;
    use crate::catalog::TimeConfig;
    use crate::config::SolverConfig;
    use crate::cpsat::domain::build_anchor_domains;
    use crate::model::{Course, Faculty, Room};
    use crate::progress::ProgressBus;
    use crate::resource_monitor::ResourceMonitor;

    #[test]
    fn zero_conflict_assignment_is_a_no_op() {
        let faculty = Faculty { faculty_id: "f1".into(), dept_id: "CS".into(), max_weekly_load: 10, availability: HashSet::from([(0, 0), (0, 1)]), preferences: Default::default() };
        let room = Room { room_id: "r1".into(), seating_capacity: 50, features: HashSet::new(), building_id: "B1".into() };
        let a = Course { course_id: "A".into(), dept_id: "CS".into(), duration: 1, faculty_id: "f1".into(), student_ids: HashSet::new(), required_features: HashSet::new(), enrollment_count: 10 };
        let time_config = TimeConfig { working_days: 1, slots_per_day: 2, start_time: "08:00".into(), end_time: "10:00".into(), lunch_break: None };
        let catalog = EntityCatalog::build(vec![a.clone()], vec![faculty], vec![room], vec![], time_config).unwrap();

        let mut assignment = Assignment::new();
        assignment.set(SessionKey::new("A", 0), SlotRoomPair { slot_id: "CS_0_0".into(), room_id: "r1".into() });

        let config = SolverConfig::default();
        let courses: HashMap<String, Course> = [(a.course_id.clone(), a)].into_iter().collect();
        let domains = build_anchor_domains(&courses.values().cloned().collect::<Vec<_>>(), &catalog, &config);
        let resource_monitor = ResourceMonitor::new(8 * 1024 * 1024 * 1024);
        let progress = ProgressBus::new();

        let before = assignment.clone();
        let result = run(assignment, &courses, &domains, &catalog, &config, &resource_monitor, &progress, "job-1");
        assert_eq!(result.get(&SessionKey::new("A", 0)), before.get(&SessionKey::new("A", 0)));
    }
}
