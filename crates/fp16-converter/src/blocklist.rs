// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Which nodes must stay in float32.

use crate::config::DEFAULT_OP_BLOCK_LIST;
use model_ir::Node;
use std::collections::HashSet;

/// Operation types and node names excluded from the downcast.
///
/// A node is blocked if its op type or its name is listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockList {
    ops: HashSet<String>,
    nodes: HashSet<String>,
}

impl BlockList {
    pub fn new<S: AsRef<str>>(ops: &[S], nodes: &[S]) -> Self {
        let mut list = Self {
            ops: HashSet::new(),
            nodes: HashSet::new(),
        };
        for op in ops {
            list.block_op(op.as_ref());
        }
        for node in nodes {
            list.block_node(node.as_ref());
        }
        list
    }

    /// Returns `true` if a node with this op type or name stays in float32.
    pub fn is_blocked_op(&self, op_type: &str, node_name: &str) -> bool {
        self.ops.contains(op_type) || self.nodes.contains(node_name)
    }

    pub fn is_blocked(&self, node: &Node) -> bool {
        self.is_blocked_op(&node.op_type, &node.name)
    }

    /// Adds an operation type. Surrounding whitespace is ignored and blank
    /// entries are dropped.
    pub fn block_op(&mut self, op_type: &str) {
        let op_type = op_type.trim();
        if !op_type.is_empty() {
            self.ops.insert(op_type.to_string());
        }
    }

    /// Adds an individual node name. A blank name would match every unnamed
    /// node, so it is dropped.
    pub fn block_node(&mut self, name: &str) {
        let name = name.trim();
        if !name.is_empty() {
            self.nodes.insert(name.to_string());
        }
    }
}

impl Default for BlockList {
    fn default() -> Self {
        Self::new(DEFAULT_OP_BLOCK_LIST, &[])
    }
}
