// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Concrete tensor shapes.

use crate::DType;

/// Dimensions of a [`crate::Tensor`] payload.
///
/// Payloads always have fully known dimensions; symbolic dimensions only
/// appear on declared graph values (see `model_ir::Dim`). Serialised as a
/// plain array, e.g. `[2, 3]`.
///
/// ```
/// use tensor_core::{DType, Shape};
/// let s = Shape::new(vec![2, 3, 4]);
/// assert_eq!(s.num_elements(), 24);
/// assert_eq!(s.size_bytes(DType::F16), 48);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Shape(Vec<usize>);

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Self(dims)
    }

    /// Rank-0 shape holding one element.
    pub fn scalar() -> Self {
        Self(Vec::new())
    }

    pub fn vector(len: usize) -> Self {
        Self(vec![len])
    }

    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self(vec![rows, cols])
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Element count; 1 for a scalar, 0 if any dimension is 0.
    pub fn num_elements(&self) -> usize {
        self.0.iter().product()
    }

    /// Payload size of this shape at element type `dtype`.
    pub fn size_bytes(&self, dtype: DType) -> usize {
        self.num_elements() * dtype.size_bytes()
    }
}
