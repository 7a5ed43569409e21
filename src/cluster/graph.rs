//! Sparse weighted conflict graph over courses.
//!
//! Built in parallel using `rayon`'s data-parallel iterators over disjoint
//! chunks of node indices, backed by precomputed `student_id -> [course
//! index]` / `faculty_id -> [course index]` inverted indexes so per-node
//! edge candidates are found without an O(n^2) scan.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::config::SolverConfig;
use crate::model::Course;

/// A sparse, undirected, weighted graph over `0..n` course indices.
#[derive(Debug, Clone, Default)]
pub struct ConflictGraph {
    pub num_nodes: usize,
    /// Canonical `(min(i,j), max(i,j)) -> weight`, weights already above the
    /// sparsity threshold.
    pub edges: HashMap<(usize, usize), f64>,
    pub adjacency: Vec<Vec<(usize, f64)>>,
}

impl ConflictGraph {
    pub fn neighbors(&self, node: usize) -> &[(usize, f64)] {
        &self.adjacency[node]
    }
}

/// Builds the inverted indexes and dispatches chunked edge construction
/// across a `rayon` thread pool.
pub fn build_conflict_graph(courses: &[Course], config: &SolverConfig) -> ConflictGraph {
    let n = courses.len();
    if n == 0 {
        return ConflictGraph::default();
    }

    let mut student_index: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut faculty_index: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, course) in courses.iter().enumerate() {
        for student_id in &course.student_ids {
            student_index.entry(student_id.as_str()).or_default().push(idx);
        }
        faculty_index.entry(course.faculty_id.as_str()).or_default().push(idx);
    }

    const CHUNK_SIZE: usize = 64;
    let chunk_starts: Vec<usize> = (0..n).step_by(CHUNK_SIZE).collect();

    // Each worker produces a disjoint-by-construction partial edge map for
    // its chunk of "owning" nodes (edge (i,j) is owned by the chunk
    // containing min(i,j)), then we merge the partials — the merge itself
    // is not a contended hot path since chunks don't share keys.
    let partials: Vec<HashMap<(usize, usize), f64>> = chunk_starts
        .par_iter()
        .map(|&start| {
            let end = (start + CHUNK_SIZE).min(n);
            let mut local: HashMap<(usize, usize), f64> = HashMap::new();
            for i in start..end {
                let mut candidates: std::collections::HashSet<usize> = std::collections::HashSet::new();
                if let Some(same_faculty) = faculty_index.get(courses[i].faculty_id.as_str()) {
                    candidates.extend(same_faculty.iter().copied());
                }
                for student_id in &courses[i].student_ids {
                    if let Some(peers) = student_index.get(student_id.as_str()) {
                        candidates.extend(peers.iter().copied());
                    }
                }
                candidates.remove(&i);

                for j in candidates {
                    let key = if i < j { (i, j) } else { (j, i) };
                    if local.contains_key(&key) {
                        continue;
                    }
                    let weight = edge_weight(&courses[i], &courses[j], config);
                    if weight >= config.louvain_edge_threshold {
                        local.insert(key, weight);
                    }
                }
            }
            local
        })
        .collect();

    let mut edges = HashMap::new();
    for partial in partials {
        edges.extend(partial);
    }

    let mut adjacency = vec![Vec::new(); n];
    for (&(i, j), &w) in &edges {
        adjacency[i].push((j, w));
        adjacency[j].push((i, w));
    }

    ConflictGraph { num_nodes: n, edges, adjacency }
}

fn edge_weight(a: &Course, b: &Course, config: &SolverConfig) -> f64 {
    let mut weight = 0.0;
    if a.faculty_id == b.faculty_id {
        weight += config.faculty_match_weight;
    }
    let overlap = a.student_ids.intersection(&b.student_ids).count();
    if overlap > 0 {
        let denom = a.student_ids.len().min(b.student_ids.len()).max(1) as f64;
        weight += config.student_overlap_weight * (overlap as f64 / denom);
    }
    if a.dept_id == b.dept_id {
        weight += config.dept_match_weight;
    }
    weight
}
