// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Declared value descriptors and named constants.

use tensor_core::{DType, Tensor};

/// One dimension of a declared value shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Dim {
    /// A known extent.
    Fixed(usize),
    /// A named, run-time extent such as `"batch"`.
    Symbolic(String),
}

impl std::fmt::Display for Dim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dim::Fixed(n) => write!(f, "{n}"),
            Dim::Symbolic(s) => f.write_str(s),
        }
    }
}

/// Declared element type and (optionally) shape of a named value.
///
/// Graph inputs, graph outputs and auxiliary value-info entries all use this type.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ValueInfo {
    pub name: String,
    pub dtype: DType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<Dim>>,
}

impl ValueInfo {
    /// Creates a descriptor with unknown shape.
    pub fn new(name: impl Into<String>, dtype: DType) -> Self {
        Self {
            name: name.into(),
            dtype,
            shape: None,
        }
    }

    /// Creates a descriptor with fully known dimensions.
    pub fn with_dims(name: impl Into<String>, dtype: DType, dims: &[usize]) -> Self {
        Self {
            name: name.into(),
            dtype,
            shape: Some(dims.iter().map(|&d| Dim::Fixed(d)).collect()),
        }
    }

    /// Copies this descriptor under a new name and element type, keeping the shape.
    pub fn renamed(&self, name: impl Into<String>, dtype: DType) -> Self {
        Self {
            name: name.into(),
            dtype,
            shape: self.shape.clone(),
        }
    }
}

/// A named constant tensor stored in a graph.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Initializer {
    pub name: String,
    pub tensor: Tensor,
}

impl Initializer {
    pub fn new(name: impl Into<String>, tensor: Tensor) -> Self {
        Self {
            name: name.into(),
            tensor,
        }
    }

    pub fn dtype(&self) -> DType {
        self.tensor.dtype()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dim_serde_untagged() {
        let shape = vec![Dim::Symbolic("batch".into()), Dim::Fixed(768)];
        let json = serde_json::to_string(&shape).unwrap();
        assert_eq!(json, r#"["batch",768]"#);
        let back: Vec<Dim> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, shape);
    }

    #[test]
    fn test_renamed_keeps_shape() {
        let vi = ValueInfo::with_dims("x", DType::F32, &[1, 4]);
        let copy = vi.renamed("x_fp16", DType::F16);
        assert_eq!(copy.name, "x_fp16");
        assert_eq!(copy.dtype, DType::F16);
        assert_eq!(copy.shape, vi.shape);
    }

    #[test]
    fn test_value_info_shape_optional() {
        let vi: ValueInfo = serde_json::from_str(r#"{"name":"y","dtype":"f32"}"#).unwrap();
        assert_eq!(vi, ValueInfo::new("y", DType::F32));
    }
}
