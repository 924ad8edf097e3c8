// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Cycle detection and topological ordering over the successor view.
//!
//! Both use depth-first search with a recursion stack: `visited` marks nodes whose
//! search has started, `rec_stack` marks nodes on the current path. An edge back into
//! `rec_stack` is a cycle. Every unvisited node is used as a root so disconnected
//! components are covered. Roots and successors are visited in ascending id order,
//! which makes the resulting order deterministic.
//!
//! The search keeps its own stack of `(node, next successor index)` frames, so graph
//! depth is bounded by memory rather than by the thread's call stack.

use std::collections::{BTreeMap, HashSet};

use super::OperatorId;

type Successors = BTreeMap<OperatorId, Vec<OperatorId>>;

/// Successor `index` of `node`, if it has that many.
fn successor(successors: &Successors, node: OperatorId, index: usize) -> Option<OperatorId> {
    successors.get(&node).and_then(|next| next.get(index)).copied()
}

/// Returns the first cycle found, as a path ending with the node that closes it.
pub(crate) fn find_cycle(successors: &Successors) -> Option<Vec<OperatorId>> {
    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();

    for &id in successors.keys() {
        if !visited.contains(&id) {
            if let Some(cycle) = dfs_cycle(id, successors, &mut visited, &mut rec_stack) {
                return Some(cycle);
            }
        }
    }
    None
}

fn dfs_cycle(
    root: OperatorId,
    successors: &Successors,
    visited: &mut HashSet<OperatorId>,
    rec_stack: &mut HashSet<OperatorId>,
) -> Option<Vec<OperatorId>> {
    visited.insert(root);
    rec_stack.insert(root);
    let mut frames = vec![(root, 0usize)];

    while let Some(frame) = frames.last_mut() {
        let node = frame.0;
        let Some(next) = successor(successors, node, frame.1) else {
            rec_stack.remove(&node);
            frames.pop();
            continue;
        };
        frame.1 += 1;

        if !visited.contains(&next) {
            visited.insert(next);
            rec_stack.insert(next);
            frames.push((next, 0));
        } else if rec_stack.contains(&next) {
            // The frames are exactly the current path.
            let start = frames.iter().position(|(id, _)| *id == next).unwrap_or(0);
            let mut cycle: Vec<OperatorId> = frames[start..].iter().map(|(id, _)| *id).collect();
            cycle.push(next);
            return Some(cycle);
        }
    }
    None
}

/// Reverse DFS postorder. `Err` carries the cycle that prevented an ordering.
pub(crate) fn topological_order(successors: &Successors) -> Result<Vec<OperatorId>, Vec<OperatorId>> {
    if let Some(cycle) = find_cycle(successors) {
        return Err(cycle);
    }

    let mut visited = HashSet::new();
    let mut postorder = Vec::with_capacity(successors.len());
    for &id in successors.keys() {
        if !visited.contains(&id) {
            dfs_postorder(id, successors, &mut visited, &mut postorder);
        }
    }
    postorder.reverse();
    Ok(postorder)
}

fn dfs_postorder(
    root: OperatorId,
    successors: &Successors,
    visited: &mut HashSet<OperatorId>,
    postorder: &mut Vec<OperatorId>,
) {
    visited.insert(root);
    let mut frames = vec![(root, 0usize)];

    while let Some(frame) = frames.last_mut() {
        let node = frame.0;
        let Some(next) = successor(successors, node, frame.1) else {
            postorder.push(node);
            frames.pop();
            continue;
        };
        frame.1 += 1;

        if visited.insert(next) {
            frames.push((next, 0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(usize, usize)], nodes: usize) -> Successors {
        let mut successors: Successors = (0..nodes).map(|i| (OperatorId(i), Vec::new())).collect();
        for &(from, to) in edges {
            successors.entry(OperatorId(from)).or_default().push(OperatorId(to));
        }
        successors
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let cycle = find_cycle(&graph(&[(0, 0)], 1)).unwrap();
        assert_eq!(cycle, vec![OperatorId(0), OperatorId(0)]);
    }

    #[test]
    fn test_nested_cycle_path() {
        // 0 -> 1 -> 2 -> 3 -> 1
        let cycle = find_cycle(&graph(&[(0, 1), (1, 2), (2, 3), (3, 1)], 4)).unwrap();
        assert_eq!(
            cycle,
            vec![OperatorId(1), OperatorId(2), OperatorId(3), OperatorId(1)]
        );
    }

    #[test]
    fn test_disconnected_components_are_ordered() {
        let order = topological_order(&graph(&[(0, 1), (2, 3)], 4)).unwrap();
        assert_eq!(order.len(), 4);
        let pos = |i| order.iter().position(|id| *id == OperatorId(i)).unwrap();
        assert!(pos(0) < pos(1));
        assert!(pos(2) < pos(3));
    }

    #[test]
    fn test_deep_chain_does_not_exhaust_the_stack() {
        const DEPTH: usize = 100_000;
        let edges: Vec<(usize, usize)> = (1..DEPTH).map(|i| (i - 1, i)).collect();
        let chain = graph(&edges, DEPTH);

        assert!(find_cycle(&chain).is_none());
        let order = topological_order(&chain).unwrap();
        assert_eq!(order.len(), DEPTH);
        assert_eq!(order.first(), Some(&OperatorId(0)));
        assert_eq!(order.last(), Some(&OperatorId(DEPTH - 1)));

        let mut closed = edges;
        closed.push((DEPTH - 1, 0));
        let cycle = find_cycle(&graph(&closed, DEPTH)).unwrap();
        assert_eq!(cycle.len(), DEPTH + 1);
        assert_eq!(cycle.first(), cycle.last());
    }

    #[test]
    fn test_cycle_in_second_component_found() {
        assert!(find_cycle(&graph(&[(0, 1), (2, 3), (3, 2)], 4)).is_some());
    }
}
