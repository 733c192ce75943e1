// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Topological re-ordering of node lists.
//!
//! Rewrite passes append new nodes wherever convenient; [`Graph::toposort`]
//! restores producer-before-consumer order afterwards. The sort is stable:
//! among ready nodes the one that came first in the old list is emitted first,
//! so an already-ordered graph is left untouched.

use crate::graph::node_outer_references;
use crate::{Graph, ModelError, Node};
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

impl Graph {
    /// Sorts this graph's nodes, and those of every nested graph, into
    /// dependency order.
    ///
    /// A node depends on the producers of its explicit inputs and of every
    /// name its nested graphs read from this scope.
    pub fn toposort(&mut self) -> Result<(), ModelError> {
        for node in &mut self.nodes {
            for sub in node.subgraphs_mut() {
                sub.toposort()?;
            }
        }

        let index = self.value_index();
        let n = self.nodes.len();
        let mut indegree = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (i, node) in self.nodes.iter().enumerate() {
            let mut deps = BTreeSet::new();
            let reads = node
                .inputs
                .iter()
                .filter(|name| !name.is_empty())
                .cloned()
                .chain(node_outer_references(node));
            for name in reads {
                deps.extend(index.producers(&name).iter().copied());
            }
            indegree[i] = deps.len();
            for d in deps {
                dependents[d].push(i);
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> =
            (0..n).filter(|&i| indegree[i] == 0).map(Reverse).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(Reverse(i)) = ready.pop() {
            order.push(i);
            for &j in &dependents[i] {
                indegree[j] -= 1;
                if indegree[j] == 0 {
                    ready.push(Reverse(j));
                }
            }
        }

        if order.len() != n {
            let node = (0..n)
                .find(|&i| indegree[i] > 0)
                .map(|i| self.nodes[i].label().to_string())
                .unwrap_or_default();
            return Err(ModelError::Cycle {
                graph: self.name.clone(),
                node,
            });
        }

        let mut slots: Vec<Option<Node>> = std::mem::take(&mut self.nodes)
            .into_iter()
            .map(Some)
            .collect();
        self.nodes = order.into_iter().filter_map(|i| slots[i].take()).collect();
        tracing::trace!(graph = %self.name, nodes = n, "topologically sorted");
        Ok(())
    }

    /// Returns `true` if every producer precedes its consumers.
    pub fn is_topologically_sorted(&self) -> bool {
        let index = self.value_index();
        self.nodes.iter().enumerate().all(|(i, node)| {
            node.inputs
                .iter()
                .filter(|name| !name.is_empty())
                .cloned()
                .chain(node_outer_references(node))
                .all(|name| index.producers(&name).iter().all(|&p| p < i))
        })
    }
}
