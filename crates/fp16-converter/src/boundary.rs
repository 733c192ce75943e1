// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Graph input/output handling.
//!
//! Nested graphs and top-level graphs converted without `keep_io_types` simply
//! have their float32 inputs and outputs retyped to float16. With
//! `keep_io_types`, the top-level graph keeps its float32 interface and gets
//! conversion nodes instead:
//!
//! ```text
//! x (f32) ── Cast(to=f16) ── x_fp16 ── consumers…
//! producer ── y_fp16 ── Cast(to=f32) ── y (f32)
//! ```

use crate::{ConversionSummary, ConvertError};
use model_ir::{Graph, Node, ValueInfo};
use std::collections::{BTreeSet, HashMap, HashSet};
use tensor_core::DType;

/// Suffix of values that carry the float16 copy of a float32 boundary value.
pub const FP16_SUFFIX: &str = "_fp16";

/// Maps a top-level input name to the value now carrying its float16 copy.
///
/// Filled while the top-level inputs are processed and consulted for every
/// nested graph afterwards, so that bodies reading an outer input by name end
/// up reading the converted value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameTable {
    names: HashMap<String, String>,
}

impl RenameTable {
    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.names.insert(from.into(), to.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.names.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Original names in the table that `graph` defines itself.
    pub(crate) fn shadowed_by(&self, graph: &Graph) -> BTreeSet<String> {
        self.names
            .keys()
            .filter(|name| graph.defines(name))
            .cloned()
            .collect()
    }

    /// Re-points node inputs of `graph` through the table.
    ///
    /// Names in `shadowed` or defined by `graph` itself refer to local values
    /// and are left alone. Returns the number of rewritten input slots.
    pub(crate) fn apply(&self, graph: &mut Graph, shadowed: &BTreeSet<String>) -> usize {
        if self.names.is_empty() {
            return 0;
        }
        let local = self.shadowed_by(graph);
        let mut n = 0;
        for node in &mut graph.nodes {
            for input in node.inputs.iter_mut() {
                if shadowed.contains(input.as_str()) || local.contains(input.as_str()) {
                    continue;
                }
                if let Some(to) = self.names.get(input.as_str()) {
                    *input = to.clone();
                    n += 1;
                }
            }
        }
        n
    }
}

/// Rewrites the declared inputs of one graph level.
pub(crate) fn process_inputs(
    graph: &mut Graph,
    insert_casts: bool,
    renames: &mut RenameTable,
    summary: &mut ConversionSummary,
) {
    if !insert_casts {
        for input in graph.inputs.iter_mut().filter(|v| v.dtype == DType::F32) {
            input.dtype = DType::F16;
            summary.record_retype();
        }
        return;
    }

    let fp32_inputs: Vec<ValueInfo> = graph
        .inputs
        .iter()
        .filter(|v| v.dtype == DType::F32)
        .cloned()
        .collect();

    for input in fp32_inputs {
        if renames.get(&input.name).is_some() || graph.count_consumers(&input.name) == 0 {
            continue;
        }
        let cast_out = format!("{}{FP16_SUFFIX}", input.name);

        // Redirect first so the new cast is not counted as a consumer.
        let redirected = graph.redirect_consumers(&input.name, &cast_out, true);
        if graph.value_info.iter().all(|v| v.name != cast_out) {
            graph.value_info.push(input.renamed(&cast_out, DType::F16));
        }
        graph
            .nodes
            .push(Node::cast(&cast_out, &input.name, &cast_out, DType::F16));
        renames.insert(&input.name, &cast_out);
        summary.record_boundary_cast();

        tracing::debug!(
            input = %input.name,
            cast = %cast_out,
            redirected,
            "inserted input boundary cast"
        );
    }
}

/// Rewrites the declared outputs of one graph level.
///
/// `original_types` holds the output types before the pass started; with
/// `insert_casts` every output that was float32 then is fed through a
/// conversion node and stays float32, even if an earlier step retyped its
/// descriptor.
pub(crate) fn process_outputs(
    graph: &mut Graph,
    insert_casts: bool,
    original_types: &HashMap<String, DType>,
    summary: &mut ConversionSummary,
) -> Result<(), ConvertError> {
    if !insert_casts {
        for output in graph.outputs.iter_mut().filter(|v| v.dtype == DType::F32) {
            output.dtype = DType::F16;
            summary.record_retype();
        }
        return Ok(());
    }

    let mut handled: HashSet<String> = HashSet::new();
    for pos in 0..graph.outputs.len() {
        let name = graph.outputs[pos].name.clone();
        if original_types.get(&name) != Some(&DType::F32) {
            continue;
        }
        // A value listed twice is cast once; later entries share that cast.
        if handled.contains(&name) {
            graph.outputs[pos].dtype = DType::F32;
            continue;
        }

        let producers = graph.find_producers(&name);
        let producer = match producers.as_slice() {
            [p] => *p,
            [] => {
                tracing::warn!(output = %name, "graph output has no producing node; left as is");
                continue;
            }
            many => {
                return Err(ConvertError::MultipleProducers {
                    name,
                    count: many.len(),
                })
            }
        };

        let internal = format!("{name}{FP16_SUFFIX}");
        for out in graph.nodes[producer].outputs.iter_mut().filter(|o| **o == name) {
            *out = internal.clone();
        }
        // Same-level readers keep the float16 value; nested bodies see the
        // float32 output through the new cast.
        graph.redirect_consumers(&name, &internal, false);

        let template = graph.outputs[pos].clone();
        match graph.value_info_mut(&name) {
            Some(vi) => {
                let internal_vi = vi.renamed(&internal, DType::F16);
                vi.dtype = DType::F32;
                graph.value_info.push(internal_vi);
            }
            None => graph.value_info.push(template.renamed(&internal, DType::F16)),
        }

        let cast_name = format!("{internal}_output_cast{pos}");
        graph
            .nodes
            .push(Node::cast(&cast_name, &internal, &name, DType::F32));
        graph.outputs[pos].dtype = DType::F32;
        summary.record_boundary_cast();
        handled.insert(name.clone());

        tracing::debug!(output = %name, cast = %cast_name, "inserted output boundary cast");
    }
    Ok(())
}
