// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model loading from a JSON document and optional SafeTensors data file.
//!
//! Small models keep every tensor inline in the JSON document. Large models
//! keep their top-level initializers in a sibling SafeTensors file, which is
//! read here through a memory map so that only the requested tensors are
//! copied out.

use crate::document::{ExternalData, ModelDocument};
use crate::{Initializer, Loaded, Model, ModelError};
use std::path::Path;
use tensor_core::{DType, Shape, Tensor};

/// Loads models from disk into the `Loaded` state.
///
/// # Example
/// ```no_run
/// use model_ir::ModelLoader;
/// use std::path::Path;
///
/// let model = ModelLoader::load(Path::new("./models/encoder.json")).unwrap();
/// println!("{}", model.summary());
/// ```
pub struct ModelLoader;

impl ModelLoader {
    /// Loads a model document and resolves any external tensor data.
    pub fn load(path: &Path) -> Result<Model<Loaded>, ModelError> {
        let content = std::fs::read_to_string(path)?;
        let doc = ModelDocument::from_json(&content)?;
        let mut model = doc.model;

        if let Some(external) = doc.external_data {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let mut inits = read_external(&dir.join(&external.location), &external)?;
            inits.append(&mut model.graph.initializers);
            model.graph.initializers = inits;
        }

        tracing::debug!(path = %path.display(), "{}", model.summary());
        Ok(model)
    }

    /// Parses a self-contained model document from a JSON string.
    ///
    /// Documents that reference external data cannot be resolved without a
    /// file location and are rejected.
    pub fn from_json(json: &str) -> Result<Model<Loaded>, ModelError> {
        let doc = ModelDocument::from_json(json)?;
        if let Some(external) = doc.external_data {
            return Err(ModelError::SafeTensors(format!(
                "document references external data '{}'; load it from a file instead",
                external.location
            )));
        }
        Ok(doc.model)
    }
}

fn read_external(path: &Path, external: &ExternalData) -> Result<Vec<Initializer>, ModelError> {
    let file = std::fs::File::open(path).map_err(|e| {
        ModelError::SafeTensors(format!("cannot open '{}': {e}", path.display()))
    })?;

    let mmap = unsafe { memmap2::Mmap::map(&file) }
        .map_err(|e| ModelError::SafeTensors(format!("mmap failed: {e}")))?;

    let tensors = safetensors::SafeTensors::deserialize(&mmap)
        .map_err(|e| ModelError::SafeTensors(format!("SafeTensors parse error: {e}")))?;

    let mut inits = Vec::with_capacity(external.tensors.len());
    for name in &external.tensors {
        let view = tensors.tensor(name).map_err(|e| {
            ModelError::SafeTensors(format!("tensor '{name}' missing from '{}': {e}", path.display()))
        })?;
        let dtype = convert_safetensor_dtype(view.dtype())?;
        let tensor = Tensor::from_bytes(Shape::new(view.shape().to_vec()), dtype, view.data().to_vec())
            .map_err(|source| ModelError::Tensor {
                name: name.clone(),
                source,
            })?;
        inits.push(Initializer::new(name.clone(), tensor));
    }
    Ok(inits)
}

/// Converts a SafeTensors `Dtype` to our [`DType`].
fn convert_safetensor_dtype(st_dtype: safetensors::Dtype) -> Result<DType, ModelError> {
    match st_dtype {
        safetensors::Dtype::F32 => Ok(DType::F32),
        safetensors::Dtype::F16 => Ok(DType::F16),
        safetensors::Dtype::BF16 => Ok(DType::BF16),
        safetensors::Dtype::F64 => Ok(DType::F64),
        safetensors::Dtype::I8 => Ok(DType::I8),
        safetensors::Dtype::U8 => Ok(DType::U8),
        safetensors::Dtype::I32 => Ok(DType::I32),
        safetensors::Dtype::I64 => Ok(DType::I64),
        safetensors::Dtype::BOOL => Ok(DType::Bool),
        other => Err(ModelError::SafeTensors(format!(
            "unsupported SafeTensors dtype: {other:?}"
        ))),
    }
}

/// Converts our [`DType`] to a SafeTensors `Dtype`.
pub(crate) fn to_safetensor_dtype(dtype: DType) -> safetensors::Dtype {
    match dtype {
        DType::F32 => safetensors::Dtype::F32,
        DType::F16 => safetensors::Dtype::F16,
        DType::BF16 => safetensors::Dtype::BF16,
        DType::F64 => safetensors::Dtype::F64,
        DType::I8 => safetensors::Dtype::I8,
        DType::U8 => safetensors::Dtype::U8,
        DType::I32 => safetensors::Dtype::I32,
        DType::I64 => safetensors::Dtype::I64,
        DType::Bool => safetensors::Dtype::BOOL,
    }
}
