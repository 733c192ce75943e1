// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Computation graphs.
//!
//! A [`Graph`] is one nesting level: an ordered node list plus declared
//! inputs, outputs, auxiliary value-info entries and initializers. Nodes may
//! own further graphs (control-flow bodies) through their attributes; a nested
//! graph can read any value visible in an enclosing graph by name.

use crate::{Initializer, Node, ValueIndex, ValueInfo};
use std::collections::{BTreeSet, HashSet};

/// One level of a computation graph.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub inputs: Vec<ValueInfo>,
    #[serde(default)]
    pub outputs: Vec<ValueInfo>,
    /// Declared types of intermediate values.
    #[serde(default)]
    pub value_info: Vec<ValueInfo>,
    #[serde(default)]
    pub initializers: Vec<Initializer>,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builds the name -> producer/consumer index for this level.
    pub fn value_index(&self) -> ValueIndex {
        ValueIndex::build(self)
    }

    /// Indices of nodes at this level that write `name`.
    pub fn find_producers(&self, name: &str) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.outputs.iter().any(|o| o == name))
            .map(|(i, _)| i)
            .collect()
    }

    /// Returns `true` if `name` is a graph input, an initializer or a node
    /// output at this level.
    pub fn defines(&self, name: &str) -> bool {
        self.inputs.iter().any(|v| v.name == name)
            || self.initializers.iter().any(|i| i.name == name)
            || self.nodes.iter().any(|n| n.outputs.iter().any(|o| o == name))
    }

    pub fn is_graph_output(&self, name: &str) -> bool {
        self.outputs.iter().any(|v| v.name == name)
    }

    /// Counts the nodes reading `name`, here and in nested graphs that see it
    /// from this scope.
    pub fn count_consumers(&self, name: &str) -> usize {
        self.nodes
            .iter()
            .map(|node| {
                let here = usize::from(node.inputs.iter().any(|i| i == name));
                let nested: usize = node
                    .subgraphs()
                    .filter(|g| !g.defines(name))
                    .map(|g| g.count_consumers(name))
                    .sum();
                here + nested
            })
            .sum()
    }

    /// Re-points every read of `from` to `to`.
    ///
    /// With `include_subgraphs`, nested graphs that do not shadow `from` are
    /// rewritten too. Returns the number of rewritten input slots.
    pub fn redirect_consumers(&mut self, from: &str, to: &str, include_subgraphs: bool) -> usize {
        let mut n = 0;
        for node in &mut self.nodes {
            n += node.rename_input(from, to);
            if include_subgraphs {
                for g in node.subgraphs_mut() {
                    if !g.defines(from) {
                        n += g.redirect_consumers(from, to, true);
                    }
                }
            }
        }
        n
    }

    /// Names this graph reads from enclosing scopes.
    ///
    /// Includes reads made by nested graphs that are not satisfied inside this
    /// graph, and outputs that simply forward an outer value.
    pub fn outer_references(&self) -> BTreeSet<String> {
        let mut local: HashSet<&str> = HashSet::new();
        local.extend(self.inputs.iter().map(|v| v.name.as_str()));
        local.extend(self.initializers.iter().map(|i| i.name.as_str()));
        for node in &self.nodes {
            local.extend(node.outputs.iter().map(String::as_str));
        }

        let mut refs = BTreeSet::new();
        for node in &self.nodes {
            for input in node.inputs.iter().filter(|i| !i.is_empty()) {
                if !local.contains(input.as_str()) {
                    refs.insert(input.clone());
                }
            }
            for name in node_outer_references(node) {
                if !local.contains(name.as_str()) {
                    refs.insert(name);
                }
            }
        }
        for out in &self.outputs {
            if !local.contains(out.name.as_str()) {
                refs.insert(out.name.clone());
            }
        }
        refs
    }

    /// Looks up a value-info entry by name.
    pub fn value_info_mut(&mut self, name: &str) -> Option<&mut ValueInfo> {
        self.value_info.iter_mut().find(|v| v.name == name)
    }

    /// Total number of nodes, including nodes of nested graphs.
    pub fn node_count_recursive(&self) -> usize {
        self.nodes
            .iter()
            .map(|n| 1 + n.subgraphs().map(Graph::node_count_recursive).sum::<usize>())
            .sum()
    }

    /// Number of nested graphs at any depth below this one.
    pub fn subgraph_count(&self) -> usize {
        self.nodes
            .iter()
            .flat_map(Node::subgraphs)
            .map(|g| 1 + g.subgraph_count())
            .sum()
    }

    /// Total tensor payload (initializers and attribute tensors) in bytes,
    /// including nested graphs.
    pub fn tensor_bytes(&self) -> usize {
        let inits: usize = self.initializers.iter().map(|i| i.tensor.size_bytes()).sum();
        let attrs: usize = self
            .nodes
            .iter()
            .map(|n| {
                n.attribute_tensors().map(|t| t.size_bytes()).sum::<usize>()
                    + n.subgraphs().map(Graph::tensor_bytes).sum::<usize>()
            })
            .sum();
        inits + attrs
    }

    /// Visits this graph and every nested graph, parents before children.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Graph)) {
        f(self);
        for node in &self.nodes {
            for g in node.subgraphs() {
                g.walk(f);
            }
        }
    }
}

/// Names a node's nested graphs read from the node's scope.
pub(crate) fn node_outer_references(node: &Node) -> BTreeSet<String> {
    node.subgraphs().flat_map(Graph::outer_references).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AttributeValue;
    use tensor_core::DType;

    fn chain() -> Graph {
        let mut g = Graph::new("main");
        g.inputs.push(ValueInfo::new("x", DType::F32));
        g.nodes.push(Node::new("Relu", "r0", ["x"], ["a"]));
        g.nodes.push(Node::new("Add", "add", ["a", "x"], ["b"]));
        g.outputs.push(ValueInfo::new("b", DType::F32));
        g
    }

    fn branch_reading(name: &str) -> Graph {
        let mut body = Graph::new("body");
        body.nodes.push(Node::new("Neg", "neg", [name], ["out"]));
        body.outputs.push(ValueInfo::new("out", DType::F32));
        body
    }

    #[test]
    fn test_producers_and_consumers() {
        let g = chain();
        assert_eq!(g.find_producers("a"), vec![0]);
        assert_eq!(g.count_consumers("x"), 2);
        assert!(g.find_producers("x").is_empty());
        assert!(g.defines("x"));
        assert!(!g.defines("nope"));
    }

    #[test]
    fn test_redirect_reaches_unshadowed_subgraphs() {
        let mut g = chain();
        g.nodes.push(
            Node::new("If", "if0", ["b"], ["c"])
                .with_attribute("then_branch", AttributeValue::Graph(branch_reading("x"))),
        );
        let mut shadowing = branch_reading("x");
        shadowing.inputs.push(ValueInfo::new("x", DType::F32));
        g.nodes.push(
            Node::new("Loop", "loop0", ["b"], ["d"])
                .with_attribute("body", AttributeValue::Graph(shadowing)),
        );

        assert_eq!(g.count_consumers("x"), 3);
        let n = g.redirect_consumers("x", "x_fp16", true);
        assert_eq!(n, 3);
        let if_body = g.nodes[2].subgraphs().next().unwrap();
        assert_eq!(if_body.nodes[0].inputs, vec!["x_fp16"]);
        let loop_body = g.nodes[3].subgraphs().next().unwrap();
        assert_eq!(loop_body.nodes[0].inputs, vec!["x"]);
    }

    #[test]
    fn test_redirect_without_subgraphs() {
        let mut g = chain();
        g.nodes.push(
            Node::new("If", "if0", ["b"], ["c"])
                .with_attribute("then_branch", AttributeValue::Graph(branch_reading("a"))),
        );
        assert_eq!(g.redirect_consumers("a", "a2", false), 1);
        let body = g.nodes[2].subgraphs().next().unwrap();
        assert_eq!(body.nodes[0].inputs, vec!["a"]);
    }

    #[test]
    fn test_outer_references() {
        let body = branch_reading("a");
        assert_eq!(
            body.outer_references().into_iter().collect::<Vec<_>>(),
            vec!["a".to_string()]
        );

        let mut g = chain();
        g.nodes.push(
            Node::new("If", "if0", ["b"], ["c"])
                .with_attribute("then_branch", AttributeValue::Graph(body)),
        );
        // Everything the body reads is defined at the top level.
        assert!(g.outer_references().is_empty());
    }

    #[test]
    fn test_counts_and_walk() {
        let mut g = chain();
        g.nodes.push(
            Node::new("If", "if0", ["b"], ["c"])
                .with_attribute("then_branch", AttributeValue::Graph(branch_reading("a")))
                .with_attribute("else_branch", AttributeValue::Graph(branch_reading("b"))),
        );
        assert_eq!(g.node_count_recursive(), 5);
        assert_eq!(g.subgraph_count(), 2);
        let mut names = Vec::new();
        g.walk(&mut |graph| names.push(graph.name.clone()));
        assert_eq!(names, vec!["main", "body", "body"]);
    }
}
