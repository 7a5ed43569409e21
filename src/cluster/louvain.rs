//! Weighted Louvain community detection.
//!
//! Runs a union-find connected-components pre-pass (`union_find::QuickUnionUf`
//! merging a co-allocation graph) so trivial isolated components skip
//! modularity optimization entirely, then refines each non-trivial
//! component with a single-level greedy local-moving pass — nodes
//! repeatedly reassigned to whichever neighboring community maximizes
//! modularity gain — to convergence or a fixed iteration cap. There is no
//! super-node contraction/coarsening step; communities are computed in one
//! level over the original node set.

use union_find::{QuickUnionUf, UnionBySize, UnionFind};

use super::graph::ConflictGraph;

/// Returns one community id per original node index, `0..num_nodes`, not
/// necessarily contiguous.
pub fn louvain_partition(graph: &ConflictGraph, iteration_cap: usize) -> Vec<usize> {
    let n = graph.num_nodes;
    if n == 0 {
        return Vec::new();
    }

    // --- connected-components pre-pass ---
    let mut uf: QuickUnionUf<UnionBySize> = QuickUnionUf::new(n);
    for &(i, j) in graph.edges.keys() {
        uf.union(i, j);
    }
    let components: Vec<usize> = (0..n).map(|i| uf.find(i)).collect();

    // Group node indices by component so each is refined independently;
    // isolated singleton components need no modularity optimization.
    let mut by_component: std::collections::HashMap<usize, Vec<usize>> = std::collections::HashMap::new();
    for (node, &comp) in components.iter().enumerate() {
        by_component.entry(comp).or_default().push(node);
    }

    let mut community_of = vec![0usize; n];
    let mut next_id = 0usize;
    for (_comp, members) in by_component {
        if members.len() <= 2 {
            for &m in &members {
                community_of[m] = next_id;
            }
            next_id += 1;
            continue;
        }
        let local = refine_component(graph, &members, iteration_cap);
        let base = next_id;
        let max_local = local.iter().copied().max().unwrap_or(0);
        for (idx, &m) in members.iter().enumerate() {
            community_of[m] = base + local[idx];
        }
        next_id = base + max_local + 1;
    }

    community_of
}

/// Greedy local-move Louvain restricted to one connected component.
fn refine_component(graph: &ConflictGraph, members: &[usize], iteration_cap: usize) -> Vec<usize> {
    let m = members.len();
    let index_of: std::collections::HashMap<usize, usize> = members.iter().enumerate().map(|(local, &global)| (global, local)).collect();

    // local adjacency restricted to this component
    let mut local_adj: Vec<Vec<(usize, f64)>> = vec![Vec::new(); m];
    let mut total_weight = 0.0;
    let mut degree = vec![0.0; m];
    for (local_i, &global_i) in members.iter().enumerate() {
        for &(global_j, w) in graph.neighbors(global_i) {
            if let Some(&local_j) = index_of.get(&global_j) {
                local_adj[local_i].push((local_j, w));
                degree[local_i] += w;
                if local_i < local_j {
                    total_weight += w;
                }
            }
        }
    }
    if total_weight <= 0.0 {
        return (0..m).collect();
    }

    let mut community = (0..m).collect::<Vec<usize>>();
    let mut community_degree = degree.clone();

    for _pass in 0..iteration_cap.max(1) {
        let mut moved = false;
        for node in 0..m {
            let current_comm = community[node];

            // Withdraw node's degree from its current community's total.
            community_degree[current_comm] -= degree[node];

            let mut neighbor_comm_weight: std::collections::HashMap<usize, f64> = std::collections::HashMap::new();
            for &(nbr, w) in &local_adj[node] {
                *neighbor_comm_weight.entry(community[nbr]).or_insert(0.0) += w;
            }

            let mut best_comm = current_comm;
            let mut best_gain = f64::NEG_INFINITY;
            for (&comm, &w_in) in &neighbor_comm_weight {
                let gain = w_in - (community_degree[comm] * degree[node]) / (2.0 * total_weight);
                if gain > best_gain {
                    best_gain = gain;
                    best_comm = comm;
                }
            }
            // Staying put is always a valid (zero-delta) option.
            let stay_gain = neighbor_comm_weight.get(&current_comm).copied().unwrap_or(0.0) - (community_degree[current_comm] * degree[node]) / (2.0 * total_weight);
            if best_gain <= stay_gain {
                best_comm = current_comm;
            }

            community_degree[best_comm] += degree[node];
            if best_comm != current_comm {
                community[node] = best_comm;
                moved = true;
            }
        }
        if !moved {
            break;
        }
    }

    renumber(&community)
}

fn renumber(community: &[usize]) -> Vec<usize> {
    let mut remap = std::collections::HashMap::new();
    let mut next = 0usize;
    community
        .iter()
        .map(|&c| {
            *remap.entry(c).or_insert_with(|| {
                let id = next;
                next += 1;
                id
            })
        })
        .collect()
}
