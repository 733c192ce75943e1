// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Level-by-level traversal of a graph and its nested bodies.
//!
//! Graphs are processed breadth-first, one nesting depth at a time. Every
//! graph of a level is fully rewritten before any graph of the next level is
//! touched, so rename-table entries recorded at the top-level boundary are in
//! place when nested bodies are visited.
//!
//! Per graph the steps run in this order:
//!
//! 1. inputs ([`boundary::process_inputs`])
//! 2. attribute tensors ([`rewrite::convert_node_tensors`])
//! 3. value-info retyping, skipping outputs of blocked and conversion nodes
//! 4. wrapping of blocked nodes ([`rewrite::wrap_blocked_nodes`])
//! 5. initializers not read by blocked nodes
//! 6. outputs ([`boundary::process_outputs`])
//! 7. nested graphs only: inputs re-pointed through the rename table
//!
//! Bodies of blocked nodes are not descended into.

use crate::boundary::{self, RenameTable};
use crate::rewrite;
use crate::{BlockList, ConversionSummary, ConvertError};
use model_ir::Graph;
use std::collections::{BTreeSet, HashMap, HashSet};
use tensor_core::{ClampRange, DType};

/// Settings shared by every level of one pass.
#[derive(Debug, Clone)]
pub struct PassOptions<'a> {
    pub blocklist: &'a BlockList,
    pub range: ClampRange,
    pub keep_io_types: bool,
}

/// A graph awaiting processing, with the rename-table keys an enclosing
/// nested graph redefines.
struct Pending<'g> {
    graph: &'g mut Graph,
    shadowed: BTreeSet<String>,
}

/// Rewrites `graph` and every reachable nested graph to float16.
///
/// Returns the rename table built at the top-level boundary.
pub fn convert_graphs(
    graph: &mut Graph,
    options: &PassOptions<'_>,
    summary: &mut ConversionSummary,
) -> Result<RenameTable, ConvertError> {
    let original_output_types: HashMap<String, DType> = graph
        .outputs
        .iter()
        .map(|v| (v.name.clone(), v.dtype))
        .collect();
    let mut renames = RenameTable::default();

    let mut level = vec![Pending {
        graph,
        shadowed: BTreeSet::new(),
    }];
    let mut depth = 0usize;

    while !level.is_empty() {
        let is_top = depth == 0;
        let mut next = Vec::new();
        tracing::debug!(depth, graphs = level.len(), "processing graph level");

        for Pending { graph, shadowed } in level {
            let io_casts = is_top && options.keep_io_types;

            boundary::process_inputs(graph, io_casts, &mut renames, summary);
            let keep_types =
                rewrite::convert_node_tensors(graph, options.blocklist, &options.range, summary)?;
            retype_value_info(graph, &keep_types, summary);
            rewrite::wrap_blocked_nodes(graph, options.blocklist, summary);
            convert_initializers(graph, options.blocklist, &options.range, summary)?;
            boundary::process_outputs(graph, io_casts, &original_output_types, summary)?;

            let child_shadowed = if is_top {
                BTreeSet::new()
            } else {
                let renamed = renames.apply(graph, &shadowed);
                if renamed > 0 {
                    tracing::debug!(graph = %graph.name, renamed, "re-pointed outer references");
                }
                let mut s = shadowed;
                s.extend(renames.shadowed_by(graph));
                s
            };

            summary.record_graph();
            for node in graph.nodes.iter_mut() {
                if options.blocklist.is_blocked(node) {
                    continue;
                }
                for sub in node.subgraphs_mut() {
                    if !sub.nodes.is_empty() {
                        next.push(Pending {
                            graph: sub,
                            shadowed: child_shadowed.clone(),
                        });
                    }
                }
            }
        }

        level = next;
        depth += 1;
    }

    summary.levels = depth;
    Ok(renames)
}

/// Retypes float32 value-info entries to float16 unless listed in `keep`.
fn retype_value_info(graph: &mut Graph, keep: &BTreeSet<String>, summary: &mut ConversionSummary) {
    for vi in graph.value_info.iter_mut() {
        if vi.dtype == DType::F32 && !keep.contains(&vi.name) {
            vi.dtype = DType::F16;
            summary.record_retype();
        }
    }
}

/// Downcasts float32 initializers, except those read by blocked nodes.
fn convert_initializers(
    graph: &mut Graph,
    blocklist: &BlockList,
    range: &ClampRange,
    summary: &mut ConversionSummary,
) -> Result<(), ConvertError> {
    let blocked_reads: HashSet<&str> = graph
        .nodes
        .iter()
        .filter(|n| blocklist.is_blocked(n))
        .flat_map(|n| n.inputs.iter().map(String::as_str))
        .collect();

    for init in graph.initializers.iter_mut() {
        if init.tensor.dtype() != DType::F32 || blocked_reads.contains(init.name.as_str()) {
            continue;
        }
        init.tensor = init.tensor.downcast_to_f16(range)?;
        summary.record_tensor();
    }
    Ok(())
}
