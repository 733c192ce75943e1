// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Removal of `Identity` nodes.

use model_ir::{Graph, IDENTITY_OP};

/// Removes `Identity` nodes from `graph` and every nested graph.
///
/// Readers of an identity's output are re-pointed to its input. When the
/// output is a graph output, the node is folded into its upstream producer
/// instead, which then writes the graph output directly; this only happens if
/// the identity is the sole reader of that producer's value. Identities that
/// cannot be removed either way are kept.
///
/// Returns the number of removed nodes.
pub fn remove_identity_nodes(graph: &mut Graph) -> usize {
    let mut removed = 0;
    for node in graph.nodes.iter_mut() {
        for sub in node.subgraphs_mut() {
            removed += remove_identity_nodes(sub);
        }
    }

    let mut idx = 0;
    while idx < graph.nodes.len() {
        if remove_at(graph, idx) {
            removed += 1;
        } else {
            idx += 1;
        }
    }
    removed
}

fn remove_at(graph: &mut Graph, idx: usize) -> bool {
    let node = &graph.nodes[idx];
    if node.op_type != IDENTITY_OP || node.inputs.len() != 1 || node.outputs.len() != 1 {
        return false;
    }
    let input = node.inputs[0].clone();
    let output = node.outputs[0].clone();
    if input.is_empty() || output.is_empty() {
        return false;
    }

    if !graph.is_graph_output(&output) {
        graph.nodes.remove(idx);
        let rewired = graph.redirect_consumers(&output, &input, true);
        graph.value_info.retain(|v| v.name != output);
        tracing::debug!(%input, %output, rewired, "removed identity node");
        return true;
    }

    if graph.inputs.iter().any(|v| v.name == input) || graph.is_graph_output(&input) {
        return false;
    }
    let producers = graph.find_producers(&input);
    let &[producer] = producers.as_slice() else {
        return false;
    };
    if graph.count_consumers(&input) != 1 {
        return false;
    }

    graph.nodes.remove(idx);
    let producer = if producer > idx { producer - 1 } else { producer };
    for out in graph.nodes[producer].outputs.iter_mut() {
        if *out == input {
            *out = output.clone();
        }
    }
    graph.value_info.retain(|v| v.name != input);
    tracing::debug!(%input, %output, "folded identity into its producer");
    true
}
