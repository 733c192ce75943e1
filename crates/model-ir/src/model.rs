// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The model: a top-level graph plus metadata.
//!
//! # Type-State Pattern
//!
//! A model transitions through states enforced at compile time:
//!
//! ```text
//! Model<Loaded> : parsed or freshly rewritten, not yet checked.
//!       │  .validate()
//!       ▼
//! Model<Validated> : every name resolves, producers precede consumers.
//! ```
//!
//! Rewrite passes accept a model in any state and hand back `Model<Loaded>`,
//! so a rewritten model has to be validated again before it can be saved.

use crate::{Graph, ModelError};
use std::collections::HashSet;
use std::fmt;

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: model has been loaded or modified but not validated.
#[derive(Debug, Clone, Default)]
pub struct Loaded;

/// Marker: model has passed structural validation.
#[derive(Debug, Clone, Default)]
pub struct Validated;

/// Sealed trait for model states.
pub trait ModelState: fmt::Debug + Clone + Default {}
impl ModelState for Loaded {}
impl ModelState for Validated {}

/// An operator set the model was exported against.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OpsetImport {
    #[serde(default)]
    pub domain: String,
    pub version: i64,
}

// ── Model ──────────────────────────────────────────────────────────

/// A computation-graph model.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Model<S: ModelState = Loaded> {
    #[serde(default = "default_ir_version")]
    pub ir_version: i64,
    #[serde(default)]
    pub producer_name: String,
    #[serde(default)]
    pub opset_imports: Vec<OpsetImport>,
    pub graph: Graph,
    #[serde(skip)]
    _state: std::marker::PhantomData<S>,
}

fn default_ir_version() -> i64 {
    8
}

// ── Loaded state ───────────────────────────────────────────────────

impl Model<Loaded> {
    /// Wraps a graph into a model in the `Loaded` state.
    pub fn new(graph: Graph) -> Self {
        Self {
            ir_version: default_ir_version(),
            producer_name: String::new(),
            opset_imports: vec![OpsetImport {
                domain: String::new(),
                version: 17,
            }],
            graph,
            _state: std::marker::PhantomData,
        }
    }

    /// Validates the model and transitions to the `Validated` state.
    ///
    /// # Checks (at every nesting level, with enclosing names in scope)
    /// - Every value name has at most one producer.
    /// - Every node input resolves to a graph input, an initializer, an
    ///   enclosing-scope value or an output of an earlier node. This also
    ///   rules out cycles.
    /// - Every graph output resolves.
    /// - Conversion nodes carry a `to` attribute naming a known type.
    pub fn validate(self) -> Result<Model<Validated>, ModelError> {
        validate_graph(&self.graph, &HashSet::new())?;
        Ok(self.with_state())
    }
}

// ── Validated state ────────────────────────────────────────────────

impl Model<Validated> {
    /// Total tensor payload of the model in bytes.
    pub fn tensor_bytes(&self) -> usize {
        self.graph.tensor_bytes()
    }
}

// ── Shared implementations ─────────────────────────────────────────

impl<S: ModelState> Model<S> {
    /// Drops the validation guarantee, e.g. before mutating the graph.
    pub fn into_loaded(self) -> Model<Loaded> {
        self.with_state()
    }

    fn with_state<T: ModelState>(self) -> Model<T> {
        Model {
            ir_version: self.ir_version,
            producer_name: self.producer_name,
            opset_imports: self.opset_imports,
            graph: self.graph,
            _state: std::marker::PhantomData,
        }
    }

    /// Returns a one-line summary of the model.
    pub fn summary(&self) -> String {
        format!(
            "Model '{}': {} nodes ({} top-level), {} nested graphs, {:.2} MB of tensors",
            self.graph.name,
            self.graph.node_count_recursive(),
            self.graph.nodes.len(),
            self.graph.subgraph_count(),
            self.graph.tensor_bytes() as f64 / (1024.0 * 1024.0),
        )
    }
}

impl<S: ModelState> fmt::Display for Model<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        for node in &self.graph.nodes {
            writeln!(
                f,
                "  {} [{}] ({}) -> ({})",
                node.label(),
                node.op_type,
                node.inputs.join(", "),
                node.outputs.join(", "),
            )?;
        }
        Ok(())
    }
}

fn validate_graph(graph: &Graph, outer: &HashSet<String>) -> Result<(), ModelError> {
    let mut produced = HashSet::new();
    for node in &graph.nodes {
        for out in node.outputs.iter().filter(|o| !o.is_empty()) {
            if !produced.insert(out.as_str()) {
                return Err(ModelError::DuplicateProducer {
                    graph: graph.name.clone(),
                    name: out.clone(),
                });
            }
        }
    }

    let mut visible = outer.clone();
    visible.extend(graph.inputs.iter().map(|v| v.name.clone()));
    visible.extend(graph.initializers.iter().map(|i| i.name.clone()));

    for node in &graph.nodes {
        for input in node.inputs.iter().filter(|i| !i.is_empty()) {
            if visible.contains(input) {
                continue;
            }
            if produced.contains(input.as_str()) {
                return Err(ModelError::InvalidGraph(format!(
                    "node '{}' reads '{input}' before it is produced",
                    node.label()
                )));
            }
            return Err(ModelError::UnresolvedInput {
                node: node.label().to_string(),
                input: input.clone(),
            });
        }
        if node.is_cast() && node.cast_target().is_none() {
            return Err(ModelError::InvalidGraph(format!(
                "conversion node '{}' has no valid 'to' attribute",
                node.label()
            )));
        }
        for sub in node.subgraphs() {
            validate_graph(sub, &visible)?;
        }
        visible.extend(node.outputs.iter().filter(|o| !o.is_empty()).cloned());
    }

    for out in &graph.outputs {
        if !visible.contains(&out.name) {
            return Err(ModelError::UnresolvedOutput {
                graph: graph.name.clone(),
                output: out.name.clone(),
            });
        }
    }
    Ok(())
}
