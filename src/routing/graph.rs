//! Pool graph and structural path search
//!
//! Assets are nodes, pools are bidirectional edges. Path search is purely
//! topological: it never looks at reserves or amounts, so its results can be
//! cached per (input, output) pair.

use crate::models::{AssetReference, PoolDescriptor};
use solana_sdk::pubkey::Pubkey;
use std::collections::{HashMap, HashSet, VecDeque};

/// A directed traversal of one pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolEdge {
    pub pool: PoolDescriptor,
    pub input: AssetReference,
    pub output: AssetReference,
}

/// Sequence of edges from an input asset to an output asset
pub type StructuralPath = Vec<PoolEdge>;

/// Adjacency-list pool graph keyed by mint
#[derive(Debug, Clone, Default)]
pub struct PoolGraph {
    pub adjacency: HashMap<Pubkey, Vec<PoolEdge>>,
    pub pool_count: usize,
}

impl PoolGraph {
    /// Number of distinct assets
    pub fn asset_count(&self) -> usize {
        self.adjacency.len()
    }
}

/// Build a pool graph from the listed pools.
///
/// Each pool contributes an edge in both directions. Pools listing the same
/// mint on both sides are ignored, as are duplicate addresses.
pub fn build_pool_graph(pools: &[PoolDescriptor]) -> PoolGraph {
    let mut adjacency: HashMap<Pubkey, Vec<PoolEdge>> = HashMap::new();
    let mut seen = HashSet::new();
    let mut pool_count = 0;

    for pool in pools {
        if pool.asset_a.mint == pool.asset_b.mint || !seen.insert(pool.address) {
            continue;
        }

        adjacency
            .entry(pool.asset_a.mint)
            .or_default()
            .push(PoolEdge {
                pool: pool.clone(),
                input: pool.asset_a,
                output: pool.asset_b,
            });
        adjacency
            .entry(pool.asset_b.mint)
            .or_default()
            .push(PoolEdge {
                pool: pool.clone(),
                input: pool.asset_b,
                output: pool.asset_a,
            });

        pool_count += 1;
    }

    PoolGraph {
        adjacency,
        pool_count,
    }
}

/// Find all acyclic paths from `source` to `target`, up to `max_hops`.
///
/// Breadth-first, so shorter paths come first. No asset is revisited and no
/// pool is used twice within a path.
pub fn find_paths(
    graph: &PoolGraph,
    source: &Pubkey,
    target: &Pubkey,
    max_hops: usize,
) -> Vec<StructuralPath> {
    let mut results = Vec::new();
    if max_hops == 0 || source == target {
        return results;
    }

    type SearchState = (Pubkey, StructuralPath, HashSet<Pubkey>, HashSet<Pubkey>);
    let mut queue: VecDeque<SearchState> = VecDeque::new();

    let mut initial_visited = HashSet::new();
    initial_visited.insert(*source);
    queue.push_back((*source, Vec::new(), initial_visited, HashSet::new()));

    while let Some((current, path, visited, used_pools)) = queue.pop_front() {
        let Some(edges) = graph.adjacency.get(&current) else {
            continue;
        };

        for edge in edges {
            if used_pools.contains(&edge.pool.address) {
                continue;
            }

            if edge.output.mint == *target {
                let mut complete = path.clone();
                complete.push(edge.clone());
                results.push(complete);
            } else if path.len() + 1 < max_hops && !visited.contains(&edge.output.mint) {
                let mut next_path = path.clone();
                next_path.push(edge.clone());
                let mut next_visited = visited.clone();
                next_visited.insert(edge.output.mint);
                let mut next_pools = used_pools.clone();
                next_pools.insert(edge.pool.address);
                queue.push_back((edge.output.mint, next_path, next_visited, next_pools));
            }
        }
    }

    results
}

/// Distinct pools appearing on any of `paths`, in first-seen order
pub fn pools_on_paths(paths: &[StructuralPath]) -> Vec<PoolDescriptor> {
    let mut seen = HashSet::new();
    paths
        .iter()
        .flatten()
        .filter(|edge| seen.insert(edge.pool.address))
        .map(|edge| edge.pool.clone())
        .collect()
}
