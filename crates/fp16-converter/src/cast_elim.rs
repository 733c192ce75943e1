// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Removal of redundant float32 → float16 → float32 conversion pairs.
//!
//! Wrapping blocked nodes next to a float32 boundary produces chains such as
//!
//! ```text
//! x (f32) ── Cast(to=f16) ── x_fp16 ── Cast(to=f32) ── TopK
//! ```
//!
//! where the round trip only loses precision. This pass bypasses the pair:
//! every reader of the second cast reads `x` directly, and both casts are
//! deleted. Only the top-level graph is examined.

use crate::ConvertError;
use model_ir::{Graph, ValueIndex, CONSTANT_OP};
use std::collections::{BTreeSet, HashMap};
use tensor_core::DType;

/// A float16 cast and the float32 casts reading its output.
#[derive(Debug)]
struct RoundTrip {
    first: usize,
    seconds: Vec<usize>,
}

/// Removes redundant cast pairs from the top level of `graph`.
///
/// A pair qualifies when the first cast converts a value declared float32 to
/// float16, every reader of its output is a cast back to float32, and each of
/// those casts has at least one reader and does not feed a graph output.
/// Casts whose input comes from a `Constant` node are never touched.
///
/// Returns the number of removed nodes.
///
/// # Errors
/// [`ConvertError::MalformedCast`] if a conversion node does not have exactly
/// one input.
pub fn remove_redundant_casts(graph: &mut Graph) -> Result<usize, ConvertError> {
    let index = graph.value_index();
    let candidates = candidate_casts(graph, &index)?;
    let declared = declared_types(graph);

    let mut trips = Vec::new();
    for &first in &candidates {
        if let Some(trip) = round_trip_from(graph, &index, &candidates, &declared, first) {
            trips.push(trip);
        }
    }
    if trips.is_empty() {
        return Ok(0);
    }

    let mut doomed = BTreeSet::new();
    let mut orphaned = BTreeSet::new();
    for trip in &trips {
        let source = graph.nodes[trip.first].inputs[0].clone();
        orphaned.insert(graph.nodes[trip.first].outputs[0].clone());
        doomed.insert(trip.first);
        for &second in &trip.seconds {
            let out = graph.nodes[second].outputs[0].clone();
            let rewired = graph.redirect_consumers(&out, &source, false);
            tracing::debug!(
                first = %graph.nodes[trip.first].label(),
                second = %graph.nodes[second].label(),
                source = %source,
                rewired,
                "eliminated cast round trip"
            );
            orphaned.insert(out);
            doomed.insert(second);
        }
    }

    let mut position = 0;
    graph.nodes.retain(|_| {
        let keep = !doomed.contains(&position);
        position += 1;
        keep
    });
    graph.value_info.retain(|v| !orphaned.contains(&v.name));

    Ok(doomed.len())
}

/// Conversion nodes eligible for elimination, by position.
fn candidate_casts(graph: &Graph, index: &ValueIndex) -> Result<BTreeSet<usize>, ConvertError> {
    let mut candidates = BTreeSet::new();
    for (i, node) in graph.nodes.iter().enumerate() {
        if !node.is_cast() {
            continue;
        }
        if node.inputs.len() != 1 {
            return Err(ConvertError::MalformedCast {
                name: node.label().to_string(),
                inputs: node.inputs.len(),
            });
        }
        let from_constant = index
            .producer(&node.inputs[0])
            .is_some_and(|p| graph.nodes[p].op_type == CONSTANT_OP);
        if !from_constant && node.outputs.len() == 1 {
            candidates.insert(i);
        }
    }
    Ok(candidates)
}

/// Declared element types from value-info entries and graph inputs; inputs
/// win when both declare a name.
fn declared_types(graph: &Graph) -> HashMap<&str, DType> {
    graph
        .value_info
        .iter()
        .chain(&graph.inputs)
        .map(|v| (v.name.as_str(), v.dtype))
        .collect()
}

fn round_trip_from(
    graph: &Graph,
    index: &ValueIndex,
    candidates: &BTreeSet<usize>,
    declared: &HashMap<&str, DType>,
    first: usize,
) -> Option<RoundTrip> {
    let node = &graph.nodes[first];
    if node.cast_target() != Some(DType::F16) {
        return None;
    }
    if declared.get(node.inputs[0].as_str()) != Some(&DType::F32) {
        return None;
    }

    let mid = &node.outputs[0];
    if graph.is_graph_output(mid) || !index.implicit_consumers(mid).is_empty() {
        return None;
    }
    let readers = index.consumers(mid);
    if readers.is_empty() {
        return None;
    }
    let all_upcasts = readers
        .iter()
        .all(|&r| candidates.contains(&r) && graph.nodes[r].cast_target() == Some(DType::F32));
    if !all_upcasts {
        return None;
    }

    // A round trip ending at a graph output has nobody to rewire.
    let rewirable = readers.iter().all(|&r| {
        let out = &graph.nodes[r].outputs[0];
        !graph.is_graph_output(out)
            && index.implicit_consumers(out).is_empty()
            && !index.consumers(out).is_empty()
    });
    if !rewirable {
        tracing::debug!(cast = %node.label(), "cast round trip feeds a graph output; kept");
        return None;
    }

    Some(RoundTrip {
        first,
        seconds: readers.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::{AttributeValue, Node, ValueInfo};
    use tensor_core::Tensor;

    /// `a -> Cast(f16) -> Cast(f32) -> b`
    fn round_trip_graph() -> Graph {
        let mut g = Graph::new("g");
        g.inputs.push(ValueInfo::new("x", DType::F32));
        g.nodes.push(Node::new("Relu", "A", ["x"], ["a"]));
        g.nodes.push(Node::cast("c16", "a", "a16", DType::F16));
        g.nodes.push(Node::cast("c32", "a16", "a32", DType::F32));
        g.nodes.push(Node::new("Neg", "B", ["a32"], ["b"]));
        g.value_info.push(ValueInfo::new("a", DType::F32));
        g.value_info.push(ValueInfo::new("a16", DType::F16));
        g.value_info.push(ValueInfo::new("a32", DType::F32));
        g.outputs.push(ValueInfo::new("b", DType::F32));
        g
    }

    #[test]
    fn test_round_trip_removed() {
        let mut g = round_trip_graph();
        assert_eq!(remove_redundant_casts(&mut g).unwrap(), 2);
        assert_eq!(g.nodes.len(), 2);
        assert_eq!(g.nodes[0].outputs, vec!["a"]);
        assert_eq!(g.nodes[1].inputs, vec!["a"]);
        let names: Vec<&str> = g.value_info.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["a"]);
    }

    #[test]
    fn test_round_trip_from_graph_input() {
        let mut g = Graph::new("g");
        g.inputs.push(ValueInfo::new("x", DType::F32));
        g.nodes.push(Node::cast("x_fp16", "x", "x_fp16", DType::F16));
        g.nodes.push(Node::cast("topk_input_cast0", "x_fp16", "t32", DType::F32));
        g.nodes.push(Node::new("TopK", "topk", ["t32", "k"], ["v", "i"]));
        g.outputs.push(ValueInfo::new("v", DType::F32));

        assert_eq!(remove_redundant_casts(&mut g).unwrap(), 2);
        assert_eq!(g.nodes.len(), 1);
        assert_eq!(g.nodes[0].inputs, vec!["x", "k"]);
    }

    #[test]
    fn test_fan_out_of_upcasts_removed_together() {
        let mut g = round_trip_graph();
        g.nodes.push(Node::cast("c32b", "a16", "a32b", DType::F32));
        g.nodes.push(Node::new("Abs", "C", ["a32b"], ["c"]));
        g.outputs.push(ValueInfo::new("c", DType::F32));

        assert_eq!(remove_redundant_casts(&mut g).unwrap(), 3);
        assert!(g.nodes.iter().all(|n| !n.is_cast()));
        assert!(g.nodes.iter().filter(|n| n.name != "A").all(|n| n.inputs == vec!["a"]));
    }

    #[test]
    fn test_mixed_readers_kept() {
        let mut g = round_trip_graph();
        g.nodes.push(Node::new("Abs", "C", ["a16"], ["c"]));
        assert_eq!(remove_redundant_casts(&mut g).unwrap(), 0);
        assert_eq!(g.nodes.len(), 5);
    }

    #[test]
    fn test_pair_ending_at_graph_output_kept() {
        let mut g = round_trip_graph();
        g.nodes.pop();
        g.outputs[0].name = "a32".into();
        assert_eq!(remove_redundant_casts(&mut g).unwrap(), 0);
        assert_eq!(g.nodes.len(), 3);
    }

    #[test]
    fn test_undeclared_or_f16_source_kept() {
        let mut g = round_trip_graph();
        g.value_info.retain(|v| v.name != "a");
        assert_eq!(remove_redundant_casts(&mut g).unwrap(), 0);

        let mut g = round_trip_graph();
        g.value_info[0].dtype = DType::F16;
        assert_eq!(remove_redundant_casts(&mut g).unwrap(), 0);
    }

    #[test]
    fn test_constant_sourced_cast_kept() {
        let mut g = round_trip_graph();
        g.nodes[0] = Node::new(CONSTANT_OP, "A", Vec::<String>::new(), ["a"])
            .with_attribute("value", AttributeValue::Tensor(Tensor::scalar_f32(1.0)));
        assert_eq!(remove_redundant_casts(&mut g).unwrap(), 0);
    }

    #[test]
    fn test_reverse_order_not_matched() {
        let mut g = Graph::new("g");
        g.inputs.push(ValueInfo::new("x", DType::F16));
        g.nodes.push(Node::cast("up", "x", "x32", DType::F32));
        g.nodes.push(Node::cast("down", "x32", "x16", DType::F16));
        g.nodes.push(Node::new("Neg", "n", ["x16"], ["y"]));
        g.value_info.push(ValueInfo::new("x32", DType::F32));
        assert_eq!(remove_redundant_casts(&mut g).unwrap(), 0);
    }

    #[test]
    fn test_nested_reader_blocks_elimination() {
        let mut body = Graph::new("body");
        body.nodes.push(Node::new("Neg", "neg", ["a32"], ["t"]));
        body.outputs.push(ValueInfo::new("t", DType::F32));
        let mut g = round_trip_graph();
        g.nodes.push(
            Node::new("If", "if0", ["x"], ["o"])
                .with_attribute("then_branch", AttributeValue::Graph(body)),
        );
        assert_eq!(remove_redundant_casts(&mut g).unwrap(), 0);
    }

    #[test]
    fn test_malformed_cast() {
        let mut g = round_trip_graph();
        g.nodes[1].inputs.push("extra".into());
        assert!(matches!(
            remove_redundant_casts(&mut g),
            Err(ConvertError::MalformedCast { inputs: 2, .. })
        ));
    }
}
