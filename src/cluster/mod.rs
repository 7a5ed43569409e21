//! Stage 1 — conflict-graph clustering.

pub mod graph;
pub mod louvain;
pub mod partition;

use slotmap::{SlotMap, new_key_type};

use crate::config::SolverConfig;
use crate::model::Course;

new_key_type! {
    /// Opaque key for one cluster; stable for the lifetime of Stages 2A+2B.
    pub struct ClusterId;
}

pub type ClusterSet = SlotMap<ClusterId, Vec<Course>>;

/// Partitions `courses` into independent sub-problems: total course count
/// preserved, every course in exactly one cluster, no cluster exceeding
/// `max_cluster_size` by more than 20%.
pub fn cluster(courses: Vec<Course>, config: &SolverConfig) -> ClusterSet {
    let n = courses.len();
    if n == 0 {
        return ClusterSet::with_key();
    }

    let community_of = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let graph = graph::build_conflict_graph(&courses, config);
        let raw = louvain::louvain_partition(&graph, config.louvain_iteration_cap);
        partition::enforce_size_bounds(&graph, raw, config)
    }))
    .unwrap_or_else(|_| partition::hash_bucket_fallback(&courses, config));

    let mut by_community: std::collections::HashMap<usize, Vec<Course>> = std::collections::HashMap::new();
    for (course, community) in courses.into_iter().zip(community_of) {
        by_community.entry(community).or_default().push(course);
    }

    let mut clusters = ClusterSet::with_key();
    for (_community, members) in by_community {
        clusters.insert(members);
    }
    clusters
}

pub fn total_course_count(clusters: &ClusterSet) -> usize {
    clusters.values().map(|v| v.len()).sum()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn make_courses(n: usize) -> Vec<Course> {
        (0..n)
            .map(|i| Course {
                course_id: format!("c{i}"),
                dept_id: if i % 2 == 0 { "CS".into() } else { "PH".into() },
                duration: 1,
                faculty_id: format!("f{}", i % 4),
                student_ids: HashSet::from([format!("s{}", i % 10)]),
                required_features: HashSet::new(),
                enrollment_count: 10,
            })
            .collect()
    }

    #[test]
    fn clustering_is_a_total_partition() {
        let courses = make_courses(80);
        let config = SolverConfig::default();
        let clusters = cluster(courses, &config);
        assert_eq!(total_course_count(&clusters), 80);
    }

    #[test]
    fn no_cluster_exceeds_bound_by_more_than_20_percent() {
        let courses = make_courses(300);
        let config = SolverConfig::default();
        let clusters = cluster(courses, &config);
        for members in clusters.values() {
            assert!(members.len() as f64 <= config.max_cluster_size as f64 * 1.2);
        }
    }
}
