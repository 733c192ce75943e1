// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Detection of models that already carry float16 values.
//!
//! Converting twice inserts a second layer of boundary casts and clamps
//! already-clamped weights, so the driver refuses a model for which
//! [`ReadinessReport::is_fp16_ready`] holds unless the caller opts out.
//! Only the top-level graph is inspected.

use model_ir::Graph;
use std::fmt;
use tensor_core::DType;

/// Which parts of a graph already use float16.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadinessReport {
    /// A declared input, output or value-info entry is float16.
    pub value_info: bool,
    /// An initializer is float16.
    pub initializers: bool,
    /// A conversion node targets float16.
    pub cast_nodes: bool,
}

impl ReadinessReport {
    pub fn check(graph: &Graph) -> Self {
        let value_info = graph
            .outputs
            .iter()
            .chain(&graph.inputs)
            .chain(&graph.value_info)
            .any(|v| v.dtype == DType::F16);
        let initializers = graph
            .initializers
            .iter()
            .any(|i| i.tensor.dtype() == DType::F16);
        let cast_nodes = graph
            .nodes
            .iter()
            .any(|n| n.cast_target() == Some(DType::F16));
        Self {
            value_info,
            initializers,
            cast_nodes,
        }
    }

    /// Returns `true` if any category already uses float16.
    pub fn is_fp16_ready(&self) -> bool {
        self.value_info || self.initializers || self.cast_nodes
    }
}

impl fmt::Display for ReadinessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let found: Vec<&str> = [
            (self.value_info, "float16 value descriptors"),
            (self.initializers, "float16 initializers"),
            (self.cast_nodes, "casts to float16"),
        ]
        .iter()
        .filter(|(hit, _)| *hit)
        .map(|(_, what)| *what)
        .collect();
        if found.is_empty() {
            f.write_str("no float16 content")
        } else {
            write!(f, "found {}", found.join(", "))
        }
    }
}

/// Shorthand for `ReadinessReport::check(graph).is_fp16_ready()`.
pub fn is_fp16_ready(graph: &Graph) -> bool {
    ReadinessReport::check(graph).is_fp16_ready()
}
