// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-node rewrites of one graph level.
//!
//! Two independent steps:
//!
//! 1. [`convert_node_tensors`] downcasts float32 tensors embedded in node
//!    attributes, skipping blocked nodes and conversion nodes.
//! 2. [`wrap_blocked_nodes`] surrounds every blocked node with conversion
//!    nodes so that it reads and writes float32 while its neighbours use
//!    float16:
//!
//! ```text
//! a (f16) ── Cast(to=f32) ── TopK ── Cast(to=f16) ── b (f16)
//! ```

use crate::{BlockList, ConversionSummary, ConvertError};
use model_ir::{Graph, Node, ValueInfo};
use std::collections::BTreeSet;
use tensor_core::{ClampRange, DType};

/// Downcasts the float32 attribute tensors of every eligible node.
///
/// Returns the outputs of blocked nodes and conversion nodes; their declared
/// types must survive the value-info retyping that follows.
pub(crate) fn convert_node_tensors(
    graph: &mut Graph,
    blocklist: &BlockList,
    range: &ClampRange,
    summary: &mut ConversionSummary,
) -> Result<BTreeSet<String>, ConvertError> {
    let mut keep_types = BTreeSet::new();
    for node in &mut graph.nodes {
        if blocklist.is_blocked(node) || node.is_cast() {
            keep_types.extend(node.outputs.iter().filter(|o| !o.is_empty()).cloned());
            continue;
        }
        for tensor in node.attribute_tensors_mut() {
            if tensor.dtype() == DType::F32 {
                *tensor = tensor.downcast_to_f16(range)?;
                summary.record_tensor();
            }
        }
    }
    Ok(keep_types)
}

/// Where a value's declared type lives.
#[derive(Debug, Clone, Copy)]
enum Declared {
    ValueInfo(usize),
    Input(usize),
    Output(usize),
}

impl Declared {
    /// Looks `name` up in the value-info entries, then in the graph inputs
    /// (or outputs, with `outputs`).
    fn find(graph: &Graph, name: &str, outputs: bool) -> Option<Self> {
        if let Some(i) = graph.value_info.iter().position(|v| v.name == name) {
            return Some(Declared::ValueInfo(i));
        }
        if outputs {
            graph.outputs.iter().position(|v| v.name == name).map(Declared::Output)
        } else {
            graph.inputs.iter().position(|v| v.name == name).map(Declared::Input)
        }
    }

    fn get(self, graph: &Graph) -> &ValueInfo {
        match self {
            Declared::ValueInfo(i) => &graph.value_info[i],
            Declared::Input(i) => &graph.inputs[i],
            Declared::Output(i) => &graph.outputs[i],
        }
    }

    fn get_mut(self, graph: &mut Graph) -> &mut ValueInfo {
        match self {
            Declared::ValueInfo(i) => &mut graph.value_info[i],
            Declared::Input(i) => &mut graph.inputs[i],
            Declared::Output(i) => &mut graph.outputs[i],
        }
    }
}

/// Inserts float32 conversions around every blocked node of this level.
///
/// An input is wrapped when its declared type is float16; an output when its
/// declared type is float32, after which the original output name carries the
/// float16 value. Values without a declared type are left alone.
pub(crate) fn wrap_blocked_nodes(
    graph: &mut Graph,
    blocklist: &BlockList,
    summary: &mut ConversionSummary,
) {
    let original_len = graph.nodes.len();
    for idx in 0..original_len {
        if !blocklist.is_blocked(&graph.nodes[idx]) {
            continue;
        }
        let base = wrapper_base_name(&graph.nodes[idx], idx);

        for slot in 0..graph.nodes[idx].inputs.len() {
            let input = graph.nodes[idx].inputs[slot].clone();
            if input.is_empty() {
                continue;
            }
            let Some(declared) = Declared::find(graph, &input, false) else {
                continue;
            };
            if declared.get(graph).dtype != DType::F16 {
                continue;
            }
            let cast_out = format!("{base}_input_cast_{slot}");
            let vi = declared.get(graph).renamed(&cast_out, DType::F32);
            graph.value_info.push(vi);
            graph.nodes.push(Node::cast(
                &format!("{base}_input_cast{slot}"),
                &input,
                &cast_out,
                DType::F32,
            ));
            graph.nodes[idx].inputs[slot] = cast_out;
            summary.record_wrapper_cast();
        }

        for slot in 0..graph.nodes[idx].outputs.len() {
            let output = graph.nodes[idx].outputs[slot].clone();
            if output.is_empty() {
                continue;
            }
            let Some(declared) = Declared::find(graph, &output, true) else {
                continue;
            };
            if declared.get(graph).dtype != DType::F32 {
                continue;
            }
            let cast_in = format!("{base}_output_cast_{slot}");
            let vi = declared.get(graph).renamed(&cast_in, DType::F32);
            declared.get_mut(graph).dtype = DType::F16;
            graph.value_info.push(vi);
            graph.nodes.push(Node::cast(
                &format!("{base}_output_cast{slot}"),
                &cast_in,
                &output,
                DType::F16,
            ));
            graph.nodes[idx].outputs[slot] = cast_in;
            summary.record_wrapper_cast();
        }

        let node = &graph.nodes[idx];
        tracing::debug!(node = %node.label(), op = %node.op_type, "wrapped blocked node");
    }
}

/// Prefix for the names of conversion nodes wrapping `node`.
///
/// Unnamed nodes get `<op_type>_<position>` so that wrappers of different
/// unnamed nodes never collide.
fn wrapper_base_name(node: &Node, idx: usize) -> String {
    if node.name.is_empty() {
        format!("{}_{idx}", node.op_type)
    } else {
        node.name.clone()
    }
}
