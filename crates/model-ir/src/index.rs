// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Name-keyed producer/consumer index for one graph level.

use crate::graph::node_outer_references;
use crate::Graph;
use std::collections::HashMap;

/// Maps each value name to the nodes that write and read it.
///
/// Built from a snapshot of a graph level; node indices refer to positions
/// in `graph.nodes` at build time, so rebuild after structural edits.
#[derive(Debug, Default, Clone)]
pub struct ValueIndex {
    producers: HashMap<String, Vec<usize>>,
    consumers: HashMap<String, Vec<usize>>,
    implicit_consumers: HashMap<String, Vec<usize>>,
}

impl ValueIndex {
    pub fn build(graph: &Graph) -> Self {
        let mut index = Self::default();
        for (i, node) in graph.nodes.iter().enumerate() {
            for out in node.outputs.iter().filter(|o| !o.is_empty()) {
                index.producers.entry(out.clone()).or_default().push(i);
            }
            for input in node.inputs.iter().filter(|n| !n.is_empty()) {
                let readers = index.consumers.entry(input.clone()).or_default();
                if readers.last() != Some(&i) {
                    readers.push(i);
                }
            }
            for name in node_outer_references(node) {
                index.implicit_consumers.entry(name).or_default().push(i);
            }
        }
        index
    }

    /// Nodes writing `name`.
    pub fn producers(&self, name: &str) -> &[usize] {
        self.producers.get(name).map_or(&[], Vec::as_slice)
    }

    /// The first node writing `name`, if any.
    pub fn producer(&self, name: &str) -> Option<usize> {
        self.producers(name).first().copied()
    }

    /// Nodes listing `name` as an explicit input, each at most once.
    pub fn consumers(&self, name: &str) -> &[usize] {
        self.consumers.get(name).map_or(&[], Vec::as_slice)
    }

    /// Nodes whose nested graphs read `name` from this scope.
    pub fn implicit_consumers(&self, name: &str) -> &[usize] {
        self.implicit_consumers.get(name).map_or(&[], Vec::as_slice)
    }
}
