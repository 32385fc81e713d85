use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::ir::Edge;

/// Longest-path layering over a topological order. Cycles are broken by
/// promoting the earliest-declared unprocessed node to a source, so every
/// node gets a rank even when the graph is not a DAG.
pub(super) fn compute_ranks(
    node_ids: &[String],
    edges: &[Edge],
    node_order: &HashMap<String, usize>,
) -> HashMap<String, usize> {
    let set: HashSet<&str> = node_ids.iter().map(String::as_str).collect();
    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut indeg: HashMap<&str, usize> = set.iter().map(|id| (*id, 0)).collect();

    for edge in edges {
        let (from, to) = (edge.source.as_str(), edge.target.as_str());
        if !set.contains(from) || !set.contains(to) {
            continue;
        }
        adj.entry(from).or_default().push(to);
        if let Some(deg) = indeg.get_mut(to) {
            *deg += 1;
        }
    }

    let order_key = |id: &str| -> usize { node_order.get(id).copied().unwrap_or(usize::MAX) };

    let mut ready: BinaryHeap<Reverse<(usize, &str)>> = BinaryHeap::new();
    for id in &set {
        if indeg.get(id).copied().unwrap_or(0) == 0 {
            ready.push(Reverse((order_key(*id), *id)));
        }
    }

    let mut order: Vec<&str> = Vec::with_capacity(set.len());
    let mut processed: HashSet<&str> = HashSet::new();
    loop {
        while let Some(Reverse((_key, id))) = ready.pop() {
            if !processed.insert(id) {
                continue;
            }
            order.push(id);
            if let Some(nexts) = adj.get(id) {
                for next in nexts {
                    if processed.contains(next) {
                        continue;
                    }
                    if let Some(deg) = indeg.get_mut(next) {
                        *deg = deg.saturating_sub(1);
                        if *deg == 0 {
                            ready.push(Reverse((order_key(*next), *next)));
                        }
                    }
                }
            }
        }

        if processed.len() >= set.len() {
            break;
        }

        // Cycle: treat the remaining node declared first as the next source.
        let best = set
            .iter()
            .filter(|id| !processed.contains(*id))
            .min_by_key(|id| (order_key(**id), **id));
        match best {
            Some(id) => ready.push(Reverse((order_key(*id), *id))),
            None => break,
        }
    }

    let order_index: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(idx, id)| (*id, idx))
        .collect();

    let mut ranks: HashMap<String, usize> = HashMap::new();
    for node in &order {
        let rank = *ranks.entry(node.to_string()).or_insert(0);
        let Some(nexts) = adj.get(node) else {
            continue;
        };
        let from_idx = order_index.get(node).copied().unwrap_or(0);
        for next in nexts {
            let to_idx = order_index.get(next).copied().unwrap_or(from_idx);
            if to_idx <= from_idx {
                continue;
            }
            let entry = ranks.entry(next.to_string()).or_insert(0);
            *entry = (*entry).max(rank + 1);
        }
    }

    ranks
}

/// Reorders every rank by the median slot of its neighbours in the adjacent
/// rank, sweeping down then up, to reduce crossings. Self-loops carry no
/// ordering information and are ignored.
pub(super) fn order_rank_nodes(rank_nodes: &mut [Vec<String>], edges: &[Edge], passes: usize) {
    if rank_nodes.len() <= 1 {
        return;
    }
    let mut parents: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges.iter().filter(|edge| edge.source != edge.target) {
        children
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
        parents
            .entry(edge.target.as_str())
            .or_default()
            .push(edge.source.as_str());
    }

    let last = rank_nodes.len() - 1;
    for _ in 0..passes.max(1) {
        for rank in 1..=last {
            let (above, rest) = rank_nodes.split_at_mut(rank);
            reorder(&mut rest[0], &above[rank - 1], &parents);
        }
        for rank in (0..last).rev() {
            let (upto, below) = rank_nodes.split_at_mut(rank + 1);
            reorder(&mut upto[rank], &below[0], &children);
        }
    }
}

/// Sorts `bucket` against the fixed neighbouring rank. Nodes with no
/// neighbour there keep their current slot as key; ties keep current order.
fn reorder(bucket: &mut Vec<String>, fixed: &[String], neighbours: &HashMap<&str, Vec<&str>>) {
    if bucket.len() <= 1 {
        return;
    }
    let slot_of: HashMap<&str, usize> = fixed
        .iter()
        .enumerate()
        .map(|(slot, id)| (id.as_str(), slot))
        .collect();

    let mut keyed: Vec<(f32, usize, String)> = bucket
        .drain(..)
        .enumerate()
        .map(|(current, id)| {
            let mut slots: Vec<usize> = neighbours
                .get(id.as_str())
                .into_iter()
                .flatten()
                .filter_map(|neighbour| slot_of.get(neighbour).copied())
                .collect();
            let key = median(&mut slots).unwrap_or(current as f32);
            (key, current, id)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    bucket.extend(keyed.into_iter().map(|(_, _, id)| id));
}

fn median(slots: &mut [usize]) -> Option<f32> {
    if slots.is_empty() {
        return None;
    }
    slots.sort_unstable();
    let mid = slots.len() / 2;
    if slots.len() % 2 == 1 {
        Some(slots[mid] as f32)
    } else {
        Some((slots[mid - 1] + slots[mid]) as f32 / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|id| id.to_string()).collect()
    }

    fn order_of(list: &[String]) -> HashMap<String, usize> {
        list.iter().enumerate().map(|(idx, id)| (id.clone(), idx)).collect()
    }

    #[test]
    fn ranks_follow_longest_path() {
        let nodes = ids(&["a", "b", "c", "d"]);
        let edges = vec![
            Edge::new("1", "a", "b"),
            Edge::new("2", "b", "c"),
            Edge::new("3", "a", "c"),
            Edge::new("4", "a", "d"),
        ];
        let ranks = compute_ranks(&nodes, &edges, &order_of(&nodes));
        assert_eq!(ranks["a"], 0);
        assert_eq!(ranks["b"], 1);
        assert_eq!(ranks["c"], 2);
        assert_eq!(ranks["d"], 1);
    }

    #[test]
    fn cycles_and_self_loops_still_rank_everything() {
        let nodes = ids(&["a", "b", "c", "lonely"]);
        let edges = vec![
            Edge::new("1", "a", "b"),
            Edge::new("2", "b", "a"),
            Edge::new("3", "c", "c"),
        ];
        let ranks = compute_ranks(&nodes, &edges, &order_of(&nodes));
        assert_eq!(ranks.len(), 4);
        assert_eq!(ranks["a"], 0);
        assert_eq!(ranks["b"], 1);
        assert_eq!(ranks["c"], 0);
        assert_eq!(ranks["lonely"], 0);
    }

    #[test]
    fn ordering_uncrosses_children() {
        let edges = vec![Edge::new("1", "p", "y"), Edge::new("2", "q", "x")];
        let mut ranks = vec![ids(&["p", "q"]), ids(&["x", "y"])];
        order_rank_nodes(&mut ranks, &edges, 2);
        let top = ranks[0].iter().position(|id| id == "p").unwrap();
        let bottom = ranks[1].iter().position(|id| id == "y").unwrap();
        assert_eq!(top, bottom);
    }

    #[test]
    fn grandchildren_follow_their_parents_despite_self_loops() {
        let edges = vec![
            Edge::new("1", "r", "a"),
            Edge::new("2", "r", "b"),
            Edge::new("3", "a", "a1"),
            Edge::new("4", "b", "b1"),
            Edge::new("5", "a1", "a1"),
        ];
        let mut ranks = vec![ids(&["r"]), ids(&["a", "b"]), ids(&["b1", "a1"])];
        order_rank_nodes(&mut ranks, &edges, 1);
        assert_eq!(ranks[1], ids(&["a", "b"]));
        assert_eq!(ranks[2], ids(&["a1", "b1"]));
    }

    #[test]
    fn unanchored_nodes_keep_their_slot() {
        let edges = vec![Edge::new("1", "p", "y")];
        let mut ranks = vec![ids(&["p"]), ids(&["x", "y", "z"])];
        order_rank_nodes(&mut ranks, &edges, 3);
        assert_eq!(ranks[1], ids(&["x", "y", "z"]));
    }

    #[test]
    fn median_of_even_count_is_midpoint() {
        assert_eq!(median(&mut [4, 0, 2, 6]), Some(3.0));
        assert_eq!(median(&mut [5]), Some(5.0));
        assert_eq!(median(&mut []), None);
    }
}
