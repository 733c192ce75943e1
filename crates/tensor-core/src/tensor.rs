// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Owned constant tensor type.

use crate::{DType, Shape, TensorError};
use half::f16;

/// An owned, n-dimensional tensor stored as a little-endian byte buffer.
///
/// `Tensor` is the payload of graph initializers and of tensor-valued node
/// attributes. The buffer length always equals
/// `shape.num_elements() * dtype.size_bytes()`; every constructor, including
/// deserialisation, enforces it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "TensorRepr", into = "TensorRepr")]
pub struct Tensor {
    shape: Shape,
    dtype: DType,
    data: Vec<u8>,
}

/// Wire form of a [`Tensor`]; validated on the way in.
#[derive(serde::Serialize, serde::Deserialize)]
struct TensorRepr {
    dtype: DType,
    dims: Shape,
    #[serde(default)]
    data: Vec<u8>,
}

impl TryFrom<TensorRepr> for Tensor {
    type Error = TensorError;

    fn try_from(repr: TensorRepr) -> Result<Self, Self::Error> {
        Tensor::from_bytes(repr.dims, repr.dtype, repr.data)
    }
}

impl From<Tensor> for TensorRepr {
    fn from(t: Tensor) -> Self {
        TensorRepr {
            dtype: t.dtype,
            dims: t.shape,
            data: t.data,
        }
    }
}

impl Tensor {
    /// Creates a new tensor filled with zeros.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape, DType};
    /// let t = Tensor::zeros(Shape::matrix(2, 3), DType::F32);
    /// assert_eq!(t.size_bytes(), 24); // 2 * 3 * 4 bytes
    /// ```
    pub fn zeros(shape: Shape, dtype: DType) -> Self {
        let size = shape.size_bytes(dtype);
        Self {
            shape,
            dtype,
            data: vec![0u8; size],
        }
    }

    /// Creates a tensor from raw little-endian bytes.
    ///
    /// Returns an error if the buffer size does not match `shape.size_bytes(dtype)`.
    pub fn from_bytes(shape: Shape, dtype: DType, data: Vec<u8>) -> Result<Self, TensorError> {
        let expected = shape.size_bytes(dtype);
        if data.len() != expected {
            return Err(TensorError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, dtype, data })
    }

    /// Creates a tensor from a slice of `f32` values.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape};
    /// let t = Tensor::from_f32(Shape::vector(3), &[1.0, 2.0, 3.0]).unwrap();
    /// assert_eq!(t.to_f32_vec().unwrap(), vec![1.0, 2.0, 3.0]);
    /// ```
    pub fn from_f32(shape: Shape, values: &[f32]) -> Result<Self, TensorError> {
        let data = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::from_bytes(shape, DType::F32, data)
    }

    /// Creates a tensor from a slice of `f16` values.
    pub fn from_f16(shape: Shape, values: &[f16]) -> Result<Self, TensorError> {
        let data = values.iter().flat_map(|v| v.to_bits().to_le_bytes()).collect();
        Self::from_bytes(shape, DType::F16, data)
    }

    /// Creates a rank-0 `f32` tensor.
    pub fn scalar_f32(value: f32) -> Self {
        Self {
            shape: Shape::scalar(),
            dtype: DType::F32,
            data: value.to_le_bytes().to_vec(),
        }
    }

    /// Returns the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the tensor's data type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Returns the number of elements.
    pub fn num_elements(&self) -> usize {
        self.shape.num_elements()
    }

    /// Returns the raw byte slice backing this tensor.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the memory footprint of this tensor in bytes.
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Decodes the buffer as `f32` values.
    ///
    /// `f16` tensors are widened, which makes this usable for inspecting
    /// converted payloads as well.
    pub fn to_f32_vec(&self) -> Result<Vec<f32>, TensorError> {
        match self.dtype {
            DType::F32 => Ok(self
                .data
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect()),
            DType::F16 => Ok(self.to_f16_vec()?.into_iter().map(f16::to_f32).collect()),
            dtype => Err(TensorError::UnsupportedDType {
                op: "to_f32_vec",
                dtype,
            }),
        }
    }

    /// Decodes the buffer as `f16` values.
    pub fn to_f16_vec(&self) -> Result<Vec<f16>, TensorError> {
        if self.dtype != DType::F16 {
            return Err(TensorError::UnsupportedDType {
                op: "to_f16_vec",
                dtype: self.dtype,
            });
        }
        Ok(self
            .data
            .chunks_exact(2)
            .map(|c| f16::from_bits(u16::from_le_bytes([c[0], c[1]])))
            .collect())
    }
}
