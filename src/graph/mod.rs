// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The execution graph: operators keyed by id plus mirrored adjacency views.
//!
//! Every id present in `operators` has an entry (possibly empty) in both `successors`
//! and `predecessors`, and every edge `a -> b` appears as `b` in `successors[a]` and as
//! `a` in `predecessors[b]`. Mutation happens only while a single builder owns the
//! graph; once submitted to an engine it is shared read-only behind an `Arc`.

mod node;
mod validation;

pub use node::{Lifecycle, OperatorId, OperatorNode};

use std::collections::BTreeMap;

use crate::errors::GraphError;
use crate::traits::Operator;

#[derive(Debug, Default)]
pub struct ExecutionGraph {
    operators: BTreeMap<OperatorId, OperatorNode>,
    successors: BTreeMap<OperatorId, Vec<OperatorId>>,
    predecessors: BTreeMap<OperatorId, Vec<OperatorId>>,
    next_id: usize,
}

impl ExecutionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an operator under the next unused id. Never fails.
    pub fn add_operator(&mut self, operator: Box<dyn Operator>) -> OperatorId {
        let id = OperatorId(self.next_id);
        self.next_id += 1;
        self.operators.insert(id, OperatorNode::new(operator));
        self.successors.insert(id, Vec::new());
        self.predecessors.insert(id, Vec::new());
        id
    }

    pub fn add<O: Operator + 'static>(&mut self, operator: O) -> OperatorId {
        self.add_operator(Box::new(operator))
    }

    /// Adds the edge `source -> target`.
    ///
    /// Duplicate edges and self-loops are accepted here; self-loops are reported by
    /// [`validate`](Self::validate). Unknown ids are rejected.
    pub fn connect_operators(
        &mut self,
        source: OperatorId,
        target: OperatorId,
    ) -> Result<(), GraphError> {
        for id in [source, target] {
            if !self.operators.contains_key(&id) {
                return Err(GraphError::UnknownOperator(id));
            }
        }
        self.successors.entry(source).or_default().push(target);
        self.predecessors.entry(target).or_default().push(source);
        Ok(())
    }

    /// Removes an operator and scrubs it from every other operator's adjacency lists.
    pub fn remove_operator(&mut self, id: OperatorId) -> Option<Box<dyn Operator>> {
        let node = self.operators.remove(&id)?;
        self.successors.remove(&id);
        self.predecessors.remove(&id);
        for list in self
            .successors
            .values_mut()
            .chain(self.predecessors.values_mut())
        {
            list.retain(|other| *other != id);
        }
        Some(node.into_operator())
    }

    /// Ids in an order that respects every edge. An empty graph yields an empty order.
    pub fn topological_order(&self) -> Result<Vec<OperatorId>, GraphError> {
        validation::topological_order(&self.successors).map_err(|cycle| GraphError::Cycle { cycle })
    }

    pub fn find_cycle(&self) -> Option<Vec<OperatorId>> {
        validation::find_cycle(&self.successors)
    }

    pub fn is_valid(&self) -> bool {
        self.find_cycle().is_none()
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        match self.find_cycle() {
            Some(cycle) => Err(GraphError::Cycle { cycle }),
            None => Ok(()),
        }
    }

    /// Operators without predecessors.
    pub fn source_operators(&self) -> Vec<OperatorId> {
        self.predecessors
            .iter()
            .filter(|(_, preds)| preds.is_empty())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Operators without successors.
    pub fn sink_operators(&self) -> Vec<OperatorId> {
        self.successors
            .iter()
            .filter(|(_, succs)| succs.is_empty())
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn successors(&self, id: OperatorId) -> &[OperatorId] {
        self.successors.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn predecessors(&self, id: OperatorId) -> &[OperatorId] {
        self.predecessors.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn node(&self, id: OperatorId) -> Option<&OperatorNode> {
        self.operators.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (OperatorId, &OperatorNode)> {
        self.operators.iter().map(|(id, node)| (*id, node))
    }

    pub fn contains(&self, id: OperatorId) -> bool {
        self.operators.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Clears everything and restarts id assignment from zero.
    pub fn reset(&mut self) {
        self.operators.clear();
        self.successors.clear();
        self.predecessors.clear();
        self.next_id = 0;
    }

    /// Moves every operator and edge of `other` into this graph under fresh ids.
    /// Returns the mapping from `other`'s ids to the new ones.
    pub fn absorb(&mut self, other: ExecutionGraph) -> BTreeMap<OperatorId, OperatorId> {
        let ExecutionGraph {
            operators,
            successors,
            ..
        } = other;

        let mut mapping = BTreeMap::new();
        for (old_id, node) in operators {
            let new_id = OperatorId(self.next_id);
            self.next_id += 1;
            self.operators.insert(new_id, node);
            self.successors.insert(new_id, Vec::new());
            self.predecessors.insert(new_id, Vec::new());
            mapping.insert(old_id, new_id);
        }

        for (old_source, targets) in successors {
            let Some(&source) = mapping.get(&old_source) else {
                continue;
            };
            for old_target in targets {
                if let Some(&target) = mapping.get(&old_target) {
                    self.successors.entry(source).or_default().push(target);
                    self.predecessors.entry(target).or_default().push(source);
                }
            }
        }
        mapping
    }
}
