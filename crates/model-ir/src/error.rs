// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for model loading, validation and persistence.

/// Errors that can occur when working with model representations.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A model or external data file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The model document is malformed JSON or does not match the schema.
    #[error("failed to parse model document: {0}")]
    Parse(#[from] serde_json::Error),

    /// The document root is not a model object.
    #[error("expected a model document at the root, got {found}")]
    WrongRootType { found: String },

    /// The external SafeTensors data file is unreadable or inconsistent.
    #[error("external data error: {0}")]
    SafeTensors(String),

    /// A tensor payload is inconsistent with its declared shape or dtype.
    #[error("invalid tensor '{name}': {source}")]
    Tensor {
        name: String,
        #[source]
        source: tensor_core::TensorError,
    },

    /// A node input refers to a name with no producer in scope.
    #[error("node '{node}' reads '{input}', which is not produced in scope")]
    UnresolvedInput { node: String, input: String },

    /// A graph output names a value that nothing produces.
    #[error("graph '{graph}' output '{output}' is not produced in scope")]
    UnresolvedOutput { graph: String, output: String },

    /// More than one producer writes the same value name.
    #[error("value '{name}' is produced more than once in graph '{graph}'")]
    DuplicateProducer { graph: String, name: String },

    /// The node list contains a dependency cycle.
    #[error("dependency cycle in graph '{graph}' involving node '{node}'")]
    Cycle { graph: String, node: String },

    /// The model graph is otherwise malformed.
    #[error("invalid model graph: {0}")]
    InvalidGraph(String),

    /// A human-readable byte size (e.g. `"2G"`) could not be parsed.
    #[error("invalid size '{0}': expected a number followed by an optional suffix (K, M, G)")]
    InvalidSize(String),
}
