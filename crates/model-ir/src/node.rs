// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operation nodes and their attributes.
//!
//! Nodes are linked to each other only by value *names*: a node's `inputs`
//! refer to outputs of other nodes, graph inputs, initializers or values of an
//! enclosing graph. There are no object references between nodes.

use crate::Graph;
use std::collections::BTreeMap;
use tensor_core::{DType, Tensor};

/// Operation type of a type-conversion node.
pub const CAST_OP: &str = "Cast";
/// Operation type of a node emitting a literal constant.
pub const CONSTANT_OP: &str = "Constant";
/// Operation type of a pass-through node.
pub const IDENTITY_OP: &str = "Identity";

/// Attribute holding a conversion node's target type code.
pub const CAST_TO_ATTR: &str = "to";

/// A node attribute value.
///
/// Control-flow nodes (`If`, `Loop`, `Scan`) own their bodies through the
/// [`AttributeValue::Graph`] and [`AttributeValue::Graphs`] variants.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeValue {
    Float(f32),
    Int(i64),
    String(String),
    Floats(Vec<f32>),
    Ints(Vec<i64>),
    Strings(Vec<String>),
    Tensor(Tensor),
    Tensors(Vec<Tensor>),
    Graph(Graph),
    Graphs(Vec<Graph>),
}

/// A single operation instance.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Node {
    /// Optional unique name; empty when the producer did not assign one.
    #[serde(default)]
    pub name: String,
    pub op_type: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Node {
    /// Creates a node without attributes.
    pub fn new<I, O>(op_type: &str, name: &str, inputs: I, outputs: O) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        Self {
            name: name.to_string(),
            op_type: op_type.to_string(),
            inputs: inputs.into_iter().map(Into::into).collect(),
            outputs: outputs.into_iter().map(Into::into).collect(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, name: &str, value: AttributeValue) -> Self {
        self.attributes.insert(name.to_string(), value);
        self
    }

    /// Creates a conversion node from `input` to `output` with target type `to`.
    pub fn cast(name: &str, input: &str, output: &str, to: DType) -> Self {
        Self::new(CAST_OP, name, [input], [output])
            .with_attribute(CAST_TO_ATTR, AttributeValue::Int(to.onnx_code()))
    }

    /// Returns `true` for conversion nodes.
    pub fn is_cast(&self) -> bool {
        self.op_type == CAST_OP
    }

    /// Returns the target type of a conversion node.
    ///
    /// `None` for other nodes, or when the `to` attribute is missing or names
    /// an unknown type.
    pub fn cast_target(&self) -> Option<DType> {
        if !self.is_cast() {
            return None;
        }
        match self.attributes.get(CAST_TO_ATTR) {
            Some(AttributeValue::Int(code)) => DType::from_onnx_code(*code),
            _ => None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// A name for diagnostics: the node name, or its op type when unnamed.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.op_type
        } else {
            &self.name
        }
    }

    /// Iterates over the graphs owned by this node's attributes.
    pub fn subgraphs(&self) -> impl Iterator<Item = &Graph> {
        self.attributes.values().flat_map(|attr| match attr {
            AttributeValue::Graph(g) => std::slice::from_ref(g),
            AttributeValue::Graphs(gs) => gs.as_slice(),
            _ => &[],
        })
    }

    /// Mutable counterpart of [`Node::subgraphs`].
    pub fn subgraphs_mut(&mut self) -> impl Iterator<Item = &mut Graph> {
        self.attributes.values_mut().flat_map(|attr| match attr {
            AttributeValue::Graph(g) => std::slice::from_mut(g),
            AttributeValue::Graphs(gs) => gs.as_mut_slice(),
            _ => &mut [],
        })
    }

    /// Iterates over the constant tensors embedded in this node's attributes.
    pub fn attribute_tensors(&self) -> impl Iterator<Item = &Tensor> {
        self.attributes.values().flat_map(|attr| match attr {
            AttributeValue::Tensor(t) => std::slice::from_ref(t),
            AttributeValue::Tensors(ts) => ts.as_slice(),
            _ => &[],
        })
    }

    /// Mutable counterpart of [`Node::attribute_tensors`].
    pub fn attribute_tensors_mut(&mut self) -> impl Iterator<Item = &mut Tensor> {
        self.attributes.values_mut().flat_map(|attr| match attr {
            AttributeValue::Tensor(t) => std::slice::from_mut(t),
            AttributeValue::Tensors(ts) => ts.as_mut_slice(),
            _ => &mut [],
        })
    }

    /// Replaces every occurrence of `from` in this node's input list.
    ///
    /// Returns the number of replaced slots.
    pub fn rename_input(&mut self, from: &str, to: &str) -> usize {
        let mut n = 0;
        for input in self.inputs.iter_mut().filter(|i| *i == from) {
            *input = to.to_string();
            n += 1;
        }
        n
    }
}
