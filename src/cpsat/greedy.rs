//! Deterministic greedy fallback, engaged once the strategy ladder is
//! exhausted for a cluster. Always returns a — possibly partial —
//! assignment; unassigned sessions are recorded as deferred for Stage 3.

use std::collections::HashSet;

use crate::assignment::{Assignment, SessionKey, SlotRoomPair};
use crate::catalog::EntityCatalog;
use crate::model::{Course, TimeSlot, WallClock};

/// Greedily assigns every course in `cluster`, highest constraint-density
/// first, to the first hard-constraint-valid placement found in canonical
/// scan order.
pub fn greedy_assign(cluster: &[Course], catalog: &EntityCatalog) -> Assignment {
    let mut ordered: Vec<&Course> = cluster.iter().collect();
    ordered.sort_by(|a, b| {
        let density_a = a.student_ids.len() * a.required_features.len().max(1);
        let density_b = b.student_ids.len() * b.required_features.len().max(1);
        density_b.cmp(&density_a).then_with(|| a.course_id.cmp(&b.course_id))
    });

    let mut assignment = Assignment::new();
    let mut faculty_busy: HashSet<(String, WallClock)> = HashSet::new();
    let mut room_busy: HashSet<(String, String)> = HashSet::new();
    let mut student_busy: HashSet<(String, WallClock)> = HashSet::new();
    let mut faculty_load: std::collections::HashMap<String, u32> = std::collections::HashMap::new();

    for course in ordered {
        match place_course(course, catalog, &faculty_busy, &room_busy, &student_busy, &faculty_load) {
            Some(placement) => {
                for (offset, (room_id, slot_id, wc)) in placement.iter().enumerate() {
                    let key = SessionKey::new(course.course_id.clone(), offset as u32);
                    assignment.set(key, SlotRoomPair { slot_id: slot_id.clone(), room_id: room_id.clone() });
                    faculty_busy.insert((course.faculty_id.clone(), *wc));
                    room_busy.insert((room_id.clone(), slot_id.clone()));
                    for student_id in &course.student_ids {
                        student_busy.insert((student_id.clone(), *wc));
                    }
                }
                *faculty_load.entry(course.faculty_id.clone()).or_insert(0) += course.duration;
            }
            None => {
                for session_index in course.session_indices() {
                    assignment.mark_deferred(SessionKey::new(course.course_id.clone(), session_index));
                }
            }
        }
    }

    assignment
}

type Placement = Vec<(String, String, WallClock)>;

fn place_course(
    course: &Course,
    catalog: &EntityCatalog,
    faculty_busy: &HashSet<(String, WallClock)>,
    room_busy: &HashSet<(String, String)>,
    student_busy: &HashSet<(String, WallClock)>,
    faculty_load: &std::collections::HashMap<String, u32>,
) -> Option<Placement> {
    let faculty = catalog.faculty(&course.faculty_id)?;
    let current_load = faculty_load.get(&course.faculty_id).copied().unwrap_or(0);
    if current_load + course.duration > faculty.max_weekly_load {
        return None;
    }

    let mut candidate_starts: Vec<&crate::model::TimeSlot> = catalog.slots_in_dept(&course.dept_id).collect();
    // Canonical scan order: ascending day, then ascending period.
    candidate_starts.sort_by_key(|s| (s.day, s.period));

    let periods_per_day = candidate_starts.iter().map(|s| s.period + 1).max().unwrap_or(0);

    let mut rooms: Vec<&crate::model::Room> = catalog.rooms().filter(|r| r.fits(course.enrollment_count, &course.required_features)).collect();
    rooms.sort_by_key(|r| r.seating_capacity);

    for start in &candidate_starts {
        if start.period + course.duration > periods_per_day {
            continue;
        }
        let wall_clocks: Vec<WallClock> = (0..course.duration).map(|d| (start.day, start.period + d)).collect();

        let faculty_ok = wall_clocks.iter().all(|wc| faculty.is_available(*wc) && !faculty_busy.contains(&(course.faculty_id.clone(), *wc)));
        if !faculty_ok {
            continue;
        }
        let student_ok = wall_clocks.iter().all(|wc| course.student_ids.iter().all(|s| !student_busy.contains(&(s.clone(), *wc))));
        if !student_ok {
            continue;
        }

        let slot_ids: Option<Vec<String>> = wall_clocks.iter().map(|wc| TimeSlot::make_id(&course.dept_id, wc.0, wc.1)).map(|id| if catalog.slot(&id).is_some() { Some(id) } else { None }).collect();
        let Some(slot_ids) = slot_ids else { continue };

        for room in &rooms {
            let room_ok = slot_ids.iter().all(|slot_id| !room_busy.contains(&(room.room_id.clone(), slot_id.clone())));
            if !room_ok {
                continue;
            }
            return Some(slot_ids.iter().zip(wall_clocks.iter()).map(|(slot_id, wc)| (room.room_id.clone(), slot_id.clone(), *wc)).collect());
        }
    }

    None
}
