// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the float16 conversion pass.

use crate::ReadinessReport;

/// Errors raised while converting a model to float16.
///
/// Any error raised after traversal has started leaves the graph partially
/// rewritten; the model must not be used further.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The model already carries float16 values and the readiness check is on.
    #[error(
        "model is already converted to float16 ({0}); converting again may corrupt it, \
         disable the readiness check to force a second pass"
    )]
    AlreadyConverted(ReadinessReport),

    /// A top-level output has more than one producing node.
    #[error("graph output '{name}' has {count} producers, expected exactly one")]
    MultipleProducers { name: String, count: usize },

    /// A conversion node does not have exactly one input.
    #[error("conversion node '{name}' should have exactly one input, but has {inputs}")]
    MalformedCast { name: String, inputs: usize },

    /// The shape/type inference collaborator failed.
    #[error("shape inference failed: {0}")]
    ShapeInference(String),

    /// The conversion configuration is invalid or unreadable.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Model(#[from] model_ir::ModelError),

    #[error(transparent)]
    Tensor(#[from] tensor_core::TensorError),
}
