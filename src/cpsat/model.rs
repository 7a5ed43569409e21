//! The per-cluster ILP model, built with `good_lp` over the HiGHS backend.
//!
//! One binary variable per candidate assignment, a `scheduled_once == 1`
//! constraint per course, and `<= 1` exclusivity constraints built by
//! filtering the variable map, generalized to wall-clock exclusivity and
//! contiguous multi-session courses.

use std::collections::HashMap;

use good_lp::{Expression, ProblemVariables, Solution, SolverModel, Variable, constraint, default_solver, variable};

use super::domain::SessionDomain;
use super::strategy::Strategy;
use crate::assignment::{Assignment, SessionKey, SlotRoomPair};
use crate::catalog::EntityCatalog;
use crate::model::{Course, TimeSlot, WallClock};

/// One course's candidate anchor placement, with the wall-clocks and
/// `(room, slot)` pairs its `duration` consecutive sessions would occupy.
struct Candidate {
    wall_clocks: Vec<WallClock>,
    room_slot_pairs: Vec<(String, String)>,
}

fn expand_candidate(course: &Course, anchor: &SlotRoomPair, catalog: &EntityCatalog) -> Option<Candidate> {
    let base_wc = catalog.wall_clock_of(&anchor.slot_id)?;
    let dept = catalog.dept_of_slot(&anchor.slot_id)?.clone();
    let mut wall_clocks = Vec::with_capacity(course.duration as usize);
    let mut room_slot_pairs = Vec::with_capacity(course.duration as usize);
    for offset in 0..course.duration {
        let wc = (base_wc.0, base_wc.1 + offset);
        let slot_id = TimeSlot::make_id(&dept, wc.0, wc.1);
        if catalog.slot(&slot_id).is_none() {
            return None; // contiguity would run off the edge of the department's grid
        }
        wall_clocks.push(wc);
        room_slot_pairs.push((anchor.room_id.clone(), slot_id));
    }
    Some(Candidate { wall_clocks, room_slot_pairs })
}

/// Attempts to solve one cluster under one strategy rung. `Ok(Some(_))` is a
/// feasible assignment; `Ok(None)` means the ILP was infeasible or timed
/// out under this strategy — infeasibility is a metric to report, not an
/// error to propagate.
pub fn solve_cluster(cluster: &[Course], catalog: &EntityCatalog, domains: &HashMap<String, SessionDomain>, strategy: &Strategy) -> crate::error::Result<Option<Assignment>> {
    let mut problem = ProblemVariables::new();
    let mut candidates_by_course: HashMap<String, Vec<(Variable, Candidate)>> = HashMap::new();

    for course in cluster {
        let Some(domain) = domains.get(&course.course_id) else { return Ok(None) };
        let mut entries = Vec::new();
        for pair in &domain.pairs {
            let Some(candidate) = expand_candidate(course, pair, catalog) else { continue };
            let var = problem.add(variable().binary());
            entries.push((var, candidate));
        }
        if entries.is_empty() {
            return Ok(None); // this course has no valid placement at all; the cluster cannot be feasible
        }
        candidates_by_course.insert(course.course_id.clone(), entries);
    }

    // Mild objective: prefer candidates that were ranked earlier (better
    // room fit / slot centrality) by weighting the first-listed pair per
    // course more heavily. This has no bearing on feasibility.
    let mut objective = Expression::from(0.0);
    for entries in candidates_by_course.values() {
        for (rank, (var, _)) in entries.iter().enumerate() {
            let weight = 1.0 / (rank as f64 + 1.0);
            objective += weight * *var;
        }
    }

    let mut model = problem
        .maximise(objective)
        .using(default_solver)
        .set_option("time_limit", strategy.timeout_s as f64)
        .set_option("random_seed", 1234)
        .set_option("log_to_console", "false");

    // scheduled-once
    for entries in candidates_by_course.values() {
        let sum: Expression = entries.iter().map(|(v, _)| *v).sum();
        model.add_constraint(constraint!(sum == 1));
    }

    // faculty exclusivity and weekly workload cap
    let mut faculty_wc_vars: HashMap<(String, WallClock), Vec<Variable>> = HashMap::new();
    let mut faculty_load_expr: HashMap<String, Expression> = HashMap::new();
    // room exclusivity
    let mut room_slot_vars: HashMap<(String, String), Vec<Variable>> = HashMap::new();
    // student exclusivity
    let mut student_wc_vars: HashMap<(String, WallClock), Vec<Variable>> = HashMap::new();

    let min_course_count = strategy.student_priority.min_course_count();

    let mut student_course_counts: HashMap<String, usize> = HashMap::new();
    for course in cluster {
        for student_id in &course.student_ids {
            *student_course_counts.entry(student_id.clone()).or_insert(0) += 1;
        }
    }

    for course in cluster {
        let Some(entries) = candidates_by_course.get(&course.course_id) else { continue };
        let faculty_id = course.faculty_id.clone();
        for (var, candidate) in entries {
            for wc in &candidate.wall_clocks {
                faculty_wc_vars.entry((faculty_id.clone(), *wc)).or_default().push(*var);
            }
            for (room_id, slot_id) in &candidate.room_slot_pairs {
                room_slot_vars.entry((room_id.clone(), slot_id.clone())).or_default().push(*var);
            }
            let entry = faculty_load_expr.entry(faculty_id.clone()).or_insert_with(|| Expression::from(0.0));
            *entry += (course.duration as f64) * *var;

            for student_id in &course.student_ids {
                let load = student_course_counts.get(student_id).copied().unwrap_or(0);
                if min_course_count == 0 || load >= min_course_count {
                    for wc in &candidate.wall_clocks {
                        student_wc_vars.entry((student_id.clone(), *wc)).or_default().push(*var);
                    }
                }
            }
        }
    }

    for vars in faculty_wc_vars.values() {
        let sum: Expression = vars.iter().copied().sum();
        model.add_constraint(constraint!(sum <= 1));
    }
    for vars in room_slot_vars.values() {
        let sum: Expression = vars.iter().copied().sum();
        model.add_constraint(constraint!(sum <= 1));
    }
    for vars in student_wc_vars.values() {
        let sum: Expression = vars.iter().copied().sum();
        model.add_constraint(constraint!(sum <= 1));
    }
    for course in cluster {
        let Some(faculty) = catalog.faculty(&course.faculty_id) else { continue };
        if let Some(load) = faculty_load_expr.get(&course.faculty_id) {
            model.add_constraint(constraint!(load.clone() <= faculty.max_weekly_load as f64));
        }
    }

    let solution = match model.solve() {
        Ok(s) => s,
        Err(_) => return Ok(None),
    };

    let mut assignment = Assignment::new();
    for (course_id, entries) in &candidates_by_course {
        let course = cluster.iter().find(|c| &c.course_id == course_id).expect("candidates only built for cluster courses");
        let chosen = entries.iter().find(|(v, _)| solution.value(*v) > 0.5);
        let Some((_, candidate)) = chosen else { continue };
        for offset in 0..course.duration {
            let key = SessionKey::new(course.course_id.clone(), offset);
            let (room_id, slot_id) = &candidate.room_slot_pairs[offset as usize];
            assignment.set(key, SlotRoomPair { slot_id: slot_id.clone(), room_id: room_id.clone() });
        }
    }

    Ok(Some(assignment))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::catalog::TimeConfig;
    use crate::config::SolverConfig;
    use crate::cpsat::domain::build_anchor_domains;
    use crate::cpsat::strategy::StudentPriority;
    use crate::model::{Faculty, Room};

    fn two_courses_one_faculty_one_room_two_periods() -> (Vec<Course>, EntityCatalog) {
        let faculty = Faculty { faculty_id: "f1".into(), dept_id: "CS".into(), max_weekly_load: 10, availability: HashSet::from([(0, 0), (0, 1)]), preferences: Default::default() };
        let room = Room { room_id: "r1".into(), seating_capacity: 50, features: HashSet::new(), building_id: "B1".into() };
        let a = Course { course_id: "A".into(), dept_id: "CS".into(), duration: 1, faculty_id: "f1".into(), student_ids: HashSet::new(), required_features: HashSet::new(), enrollment_count: 10 };
        let b = Course { course_id: "B".into(), dept_id: "CS".into(), duration: 1, faculty_id: "f1".into(), student_ids: HashSet::new(), required_features: HashSet::new(), enrollment_count: 10 };
        let time_config = TimeConfig { working_days: 1, slots_per_day: 2, start_time: "08:00".into(), end_time: "10:00".into(), lunch_break: None };
        let catalog = EntityCatalog::build(vec![a.clone(), b.clone()], vec![faculty], vec![room], vec![], time_config).unwrap();
        (vec![a, b], catalog)
    }

    #[test]
    fn two_courses_same_faculty_take_distinct_periods() {
        let (cluster, catalog) = two_courses_one_faculty_one_room_two_periods();
        let config = SolverConfig::default();
        let domains = build_anchor_domains(&cluster, &catalog, &config);
        let strategy = Strategy { name: "Full Solve".into(), student_priority: StudentPriority::All, timeout_s: 5, constraint_budget: 1000 };
        let result = solve_cluster(&cluster, &catalog, &domains, &strategy).unwrap();
        let assignment = result.expect("this cluster must be feasible");
        let a_slot = assignment.get(&SessionKey::new("A", 0)).unwrap().slot_id.clone();
        let b_slot = assignment.get(&SessionKey::new("B", 0)).unwrap().slot_id.clone();
        assert_ne!(catalog.wall_clock_of(&a_slot), catalog.wall_clock_of(&b_slot));
    }
}
