// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Shape/type inference run before the conversion pass.
//!
//! The pass decides where to insert conversions from *declared* value types,
//! so intermediate values without a value-info entry are invisible to it.
//! A [`ShapeInference`] implementation fills those entries in first.

use crate::ConvertError;
use model_ir::{AttributeValue, Graph, Loaded, Model, Node, ValueInfo, CAST_OP, CONSTANT_OP};
use std::collections::{HashMap, HashSet};
use tensor_core::DType;

/// A collaborator that annotates a model with value types before conversion.
pub trait ShapeInference {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Returns `model` with value-info entries added for its intermediate values.
    fn infer(&self, model: Model<Loaded>) -> Result<Model<Loaded>, ConvertError>;
}

/// Element-type propagation without shapes.
///
/// Walks each graph level in node order and records a type for every node
/// output that has no declared descriptor:
///
/// | op                                                | output type            |
/// |---------------------------------------------------|------------------------|
/// | `Cast`                                            | its `to` attribute     |
/// | `Constant`                                        | its tensor's type      |
/// | `Shape`, `Size`, `NonZero`, `ArgMax`, `ArgMin`    | `i64`                  |
/// | comparisons, logical ops, `IsNaN`, `IsInf`        | `bool`                 |
/// | `ConstantOfShape`                                 | its tensor's type, f32 |
/// | `TopK`                                            | input type, then `i64` |
/// | `Dropout`                                         | input type, then bool  |
/// | `Where`                                           | type of input 1        |
/// | `Reshape`, `Gather`, `Slice`, `Range`, ...        | type of input 0        |
/// | `If`, `Loop`, `Scan`                              | body output types      |
/// | anything else                                     | shared input type      |
///
/// An unlisted op whose typed inputs disagree gets no entry.
///
/// Nested graphs see the types of every value visible in their enclosing scopes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElemTypeInference;

impl ShapeInference for ElemTypeInference {
    fn name(&self) -> &str {
        "elem-type"
    }

    fn infer(&self, mut model: Model<Loaded>) -> Result<Model<Loaded>, ConvertError> {
        let added = infer_graph(&mut model.graph, &HashMap::new());
        tracing::debug!(added, "inferred element types");
        Ok(model)
    }
}

const INDEX_OPS: &[&str] = &["Shape", "Size", "NonZero", "ArgMax", "ArgMin"];
const BOOL_OPS: &[&str] = &[
    "Equal",
    "Less",
    "LessOrEqual",
    "Greater",
    "GreaterOrEqual",
    "And",
    "Or",
    "Xor",
    "Not",
    "IsNaN",
    "IsInf",
];

fn infer_graph(graph: &mut Graph, outer: &HashMap<String, DType>) -> usize {
    let mut known = outer.clone();
    let mut declared: HashSet<String> = HashSet::new();
    for v in graph.inputs.iter().chain(&graph.outputs).chain(&graph.value_info) {
        known.insert(v.name.clone(), v.dtype);
        declared.insert(v.name.clone());
    }
    for init in &graph.initializers {
        known.insert(init.name.clone(), init.tensor.dtype());
        declared.insert(init.name.clone());
    }

    let mut added = Vec::new();
    let mut nested = 0;
    for node in graph.nodes.iter_mut() {
        for sub in node.subgraphs_mut() {
            nested += infer_graph(sub, &known);
        }
        let types = output_types(node, &known);
        for (out, ty) in node.outputs.iter().zip(types) {
            let Some(ty) = ty else { continue };
            if out.is_empty() || declared.contains(out) {
                continue;
            }
            known.insert(out.clone(), ty);
            declared.insert(out.clone());
            added.push(ValueInfo::new(out.clone(), ty));
        }
    }

    let n = added.len();
    graph.value_info.extend(added);
    n + nested
}

/// Ops whose outputs take the type of input 0; later inputs are shapes,
/// indices, axes or scales.
const DATA_FIRST_OPS: &[&str] = &[
    "Reshape",
    "Expand",
    "Tile",
    "Gather",
    "GatherElements",
    "GatherND",
    "Slice",
    "Squeeze",
    "Unsqueeze",
    "Pad",
    "Resize",
    "Upsample",
    "ScatterElements",
    "ScatterND",
    "Split",
    "CumSum",
    "Range",
    "ReduceSum",
    "ReduceMean",
    "ReduceMax",
    "ReduceMin",
    "ReduceProd",
];

/// Inferred type of each output of `node`, positionally.
fn output_types(node: &Node, known: &HashMap<String, DType>) -> Vec<Option<DType>> {
    let n = node.outputs.len();
    let input = |i: usize| {
        node.inputs
            .get(i)
            .filter(|name| !name.is_empty())
            .and_then(|name| known.get(name).copied())
    };

    match node.op_type.as_str() {
        CAST_OP => vec![node.cast_target(); n],
        CONSTANT_OP => vec![constant_type(node); n],
        "ConstantOfShape" => {
            let ty = match node.attribute("value") {
                Some(AttributeValue::Tensor(t)) => t.dtype(),
                _ => DType::F32,
            };
            vec![Some(ty); n]
        }
        op if INDEX_OPS.contains(&op) => vec![Some(DType::I64); n],
        op if BOOL_OPS.contains(&op) => vec![Some(DType::Bool); n],
        "Where" => vec![input(1); n],
        "TopK" => with_trailing(input(0), Some(DType::I64), n),
        "Dropout" => with_trailing(input(0), Some(DType::Bool), n),
        "If" | "Loop" | "Scan" => body_output_types(node),
        op if DATA_FIRST_OPS.contains(&op) => vec![input(0); n],
        _ => vec![common_input_type(node, known); n],
    }
}

/// `first` for output 0, `rest` for every further output.
fn with_trailing(first: Option<DType>, rest: Option<DType>, n: usize) -> Vec<Option<DType>> {
    let mut types = vec![rest; n];
    if let Some(slot) = types.first_mut() {
        *slot = first;
    }
    types
}

/// The type shared by every typed input; `None` when they disagree.
fn common_input_type(node: &Node, known: &HashMap<String, DType>) -> Option<DType> {
    let mut types = node
        .inputs
        .iter()
        .filter(|i| !i.is_empty())
        .filter_map(|i| known.get(i).copied());
    let first = types.next()?;
    if types.all(|t| t == first) {
        Some(first)
    } else {
        tracing::debug!(node = %node.label(), op = %node.op_type, "input types disagree; not inferred");
        None
    }
}

fn constant_type(node: &Node) -> Option<DType> {
    match node.attributes.iter().next()? {
        (_, AttributeValue::Tensor(t)) => Some(t.dtype()),
        (name, AttributeValue::Float(_) | AttributeValue::Floats(_)) if name.starts_with("value") => {
            Some(DType::F32)
        }
        (name, AttributeValue::Int(_) | AttributeValue::Ints(_)) if name.starts_with("value") => {
            Some(DType::I64)
        }
        _ => None,
    }
}

/// Output types of a control-flow node, read from its first body.
///
/// A `Loop` body additionally returns the continuation condition first.
fn body_output_types(node: &Node) -> Vec<Option<DType>> {
    let skip = usize::from(node.op_type == "Loop");
    let body_types: Vec<DType> = node
        .subgraphs()
        .next()
        .map(|g| g.outputs.iter().skip(skip).map(|v| v.dtype).collect())
        .unwrap_or_default();
    (0..node.outputs.len())
        .map(|i| body_types.get(i).copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::{Shape, Tensor};

    fn vi_type(g: &Graph, name: &str) -> Option<DType> {
        g.value_info.iter().find(|v| v.name == name).map(|v| v.dtype)
    }

    #[test]
    fn test_propagates_through_chain() {
        let mut g = Graph::new("g");
        g.inputs.push(ValueInfo::new("x", DType::F32));
        g.nodes.push(Node::new("MatMul", "mm", ["x", "w"], ["y"]));
        g.nodes.push(Node::new("Relu", "r", ["y"], ["z"]));
        g.nodes.push(Node::new("Shape", "s", ["z"], ["dims"]));
        g.nodes.push(Node::new("Greater", "gt", ["z", "x"], ["mask"]));
        g.nodes.push(Node::cast("c", "mask", "mask_i", DType::I32));
        g.outputs.push(ValueInfo::new("z", DType::F32));

        let model = ElemTypeInference.infer(Model::new(g)).unwrap();
        let g = &model.graph;
        assert_eq!(vi_type(g, "y"), Some(DType::F32));
        assert_eq!(vi_type(g, "z"), None, "graph outputs are not duplicated");
        assert_eq!(vi_type(g, "dims"), Some(DType::I64));
        assert_eq!(vi_type(g, "mask"), Some(DType::Bool));
        assert_eq!(vi_type(g, "mask_i"), Some(DType::I32));
        assert_eq!(g.value_info.len(), 4);
    }

    #[test]
    fn test_declared_types_win() {
        let mut g = Graph::new("g");
        g.inputs.push(ValueInfo::new("x", DType::F32));
        g.nodes.push(Node::new("Relu", "r", ["x"], ["y"]));
        g.value_info.push(ValueInfo::new("y", DType::F16));
        let model = ElemTypeInference.infer(Model::new(g)).unwrap();
        assert_eq!(model.graph.value_info.len(), 1);
        assert_eq!(model.graph.value_info[0].dtype, DType::F16);
    }

    #[test]
    fn test_constant_and_topk() {
        let mut g = Graph::new("g");
        g.nodes.push(
            Node::new(CONSTANT_OP, "k", Vec::<String>::new(), ["k_out"]).with_attribute(
                "value",
                AttributeValue::Tensor(Tensor::zeros(Shape::vector(1), DType::I64)),
            ),
        );
        g.nodes.push(
            Node::new(CONSTANT_OP, "f", Vec::<String>::new(), ["f_out"])
                .with_attribute("value_float", AttributeValue::Float(1.0)),
        );
        g.nodes.push(Node::new("TopK", "t", ["f_out", "k_out"], ["vals", "idx"]));
        let model = ElemTypeInference.infer(Model::new(g)).unwrap();
        let g = &model.graph;
        assert_eq!(vi_type(g, "k_out"), Some(DType::I64));
        assert_eq!(vi_type(g, "f_out"), Some(DType::F32));
        assert_eq!(vi_type(g, "vals"), Some(DType::F32));
        assert_eq!(vi_type(g, "idx"), Some(DType::I64));
    }

    #[test]
    fn test_nested_graph_sees_outer_types() {
        let mut body = Graph::new("then");
        body.nodes.push(Node::new("Neg", "neg", ["y"], ["t"]));
        body.nodes.push(Node::new("Abs", "abs", ["t"], ["t2"]));
        body.outputs.push(ValueInfo::new("t2", DType::F32));

        let mut g = Graph::new("g");
        g.inputs.push(ValueInfo::new("x", DType::F32));
        g.inputs.push(ValueInfo::new("c", DType::Bool));
        g.nodes.push(Node::new("Relu", "r", ["x"], ["y"]));
        g.nodes.push(
            Node::new("If", "if0", ["c"], ["o"])
                .with_attribute("then_branch", AttributeValue::Graph(body)),
        );

        let model = ElemTypeInference.infer(Model::new(g)).unwrap();
        let g = &model.graph;
        assert_eq!(vi_type(g, "o"), Some(DType::F32));
        let body = g.nodes[1].subgraphs().next().unwrap();
        assert_eq!(vi_type(body, "t"), Some(DType::F32));
        assert_eq!(vi_type(body, "t2"), None);
    }

    #[test]
    fn test_unknown_inputs_leave_no_entry() {
        let mut g = Graph::new("g");
        g.nodes.push(Node::new("Relu", "r", ["mystery"], ["y"]));
        let model = ElemTypeInference.infer(Model::new(g)).unwrap();
        assert!(model.graph.value_info.is_empty());
    }

    #[test]
    fn test_where_takes_branch_type() {
        let mut g = Graph::new("g");
        g.inputs.push(ValueInfo::new("cond", DType::Bool));
        g.inputs.push(ValueInfo::new("a", DType::F32));
        g.inputs.push(ValueInfo::new("b", DType::F32));
        g.nodes.push(Node::new("Where", "w", ["cond", "a", "b"], ["sel"]));
        let model = ElemTypeInference.infer(Model::new(g)).unwrap();
        assert_eq!(vi_type(&model.graph, "sel"), Some(DType::F32));
    }

    #[test]
    fn test_constant_of_shape_and_range() {
        let mut g = Graph::new("g");
        g.inputs.push(ValueInfo::new("dims", DType::I64));
        g.inputs.push(ValueInfo::new("start", DType::F32));
        g.inputs.push(ValueInfo::new("limit", DType::F32));
        g.inputs.push(ValueInfo::new("step", DType::F32));
        g.nodes.push(Node::new("ConstantOfShape", "plain", ["dims"], ["zeros"]));
        g.nodes.push(
            Node::new("ConstantOfShape", "ints", ["dims"], ["ones"]).with_attribute(
                "value",
                AttributeValue::Tensor(Tensor::zeros(Shape::vector(1), DType::I32)),
            ),
        );
        g.nodes.push(Node::new("Range", "rng", ["start", "limit", "step"], ["seq"]));
        g.nodes.push(Node::new("Reshape", "rs", ["seq", "dims"], ["seq2"]));
        let model = ElemTypeInference.infer(Model::new(g)).unwrap();
        let g = &model.graph;
        assert_eq!(vi_type(g, "zeros"), Some(DType::F32));
        assert_eq!(vi_type(g, "ones"), Some(DType::I32));
        assert_eq!(vi_type(g, "seq"), Some(DType::F32));
        assert_eq!(vi_type(g, "seq2"), Some(DType::F32));
    }

    #[test]
    fn test_disagreeing_inputs_leave_no_entry() {
        let mut g = Graph::new("g");
        g.inputs.push(ValueInfo::new("x", DType::F32));
        g.inputs.push(ValueInfo::new("n", DType::I64));
        g.nodes.push(Node::new("CustomMix", "mix", ["n", "x"], ["y"]));
        g.nodes.push(Node::new("Dropout", "drop", ["x"], ["d", "mask"]));
        let model = ElemTypeInference.infer(Model::new(g)).unwrap();
        let g = &model.graph;
        assert_eq!(vi_type(g, "y"), None);
        assert_eq!(vi_type(g, "d"), Some(DType::F32));
        assert_eq!(vi_type(g, "mask"), Some(DType::Bool));
    }

    #[test]
    fn test_idempotent() {
        let mut g = Graph::new("g");
        g.inputs.push(ValueInfo::new("x", DType::F32));
        g.nodes.push(Node::new("Relu", "r", ["x"], ["y"]));
        let once = ElemTypeInference.infer(Model::new(g)).unwrap();
        let twice = ElemTypeInference.infer(once.clone()).unwrap();
        assert_eq!(once.graph, twice.graph);
    }
}
