// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model persistence.
//!
//! Models whose tensor payload stays under [`SaveOptions::external_data_threshold`]
//! are written as a single JSON document. Larger models move their top-level
//! initializers into a SafeTensors file named `<file name>_data` next to the
//! document, keeping the JSON small enough to parse comfortably.

use crate::document::{ExternalData, ModelDocument};
use crate::loader::to_safetensor_dtype;
use crate::{Model, ModelError, Validated};
use std::fmt;
use std::path::{Path, PathBuf};

/// Largest tensor payload written inline by default (2 GiB).
pub const MAXIMUM_INLINE_BYTES: usize = 2 * 1024 * 1024 * 1024;

/// Options controlling how a model is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOptions {
    /// Payload size at which initializers move to an external data file.
    pub external_data_threshold: usize,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            external_data_threshold: MAXIMUM_INLINE_BYTES,
        }
    }
}

/// Where the tensors of a saved model ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveLayout {
    /// Everything is inside the JSON document.
    Inline,
    /// Top-level initializers live in a SafeTensors file.
    External { data_path: PathBuf },
}

impl fmt::Display for SaveLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveLayout::Inline => f.write_str("inline"),
            SaveLayout::External { data_path } => {
                write!(f, "external data in {}", data_path.display())
            }
        }
    }
}

/// Writes validated models to disk.
pub struct ModelSaver;

impl ModelSaver {
    /// Saves `model` to `path`, choosing the layout from its payload size.
    ///
    /// A data file left behind by an earlier save of the same path is removed
    /// first, so the directory never holds a sidecar that the document does
    /// not reference.
    pub fn save(
        model: &Model<Validated>,
        path: &Path,
        options: &SaveOptions,
    ) -> Result<SaveLayout, ModelError> {
        let data_path = data_path_for(path)?;
        if data_path.exists() {
            std::fs::remove_file(&data_path)?;
        }

        let payload = model.tensor_bytes();
        if payload < options.external_data_threshold {
            let doc = ModelDocument {
                model: model.clone().into_loaded(),
                external_data: None,
            };
            std::fs::write(path, serde_json::to_string_pretty(&doc)?)?;
            tracing::debug!(path = %path.display(), payload, "saved model inline");
            return Ok(SaveLayout::Inline);
        }

        let mut stripped = model.clone().into_loaded();
        let initializers = std::mem::take(&mut stripped.graph.initializers);

        let views = initializers
            .iter()
            .map(|init| {
                let view = safetensors::tensor::TensorView::new(
                    to_safetensor_dtype(init.tensor.dtype()),
                    init.tensor.shape().dims().to_vec(),
                    init.tensor.as_bytes(),
                )
                .map_err(|e| {
                    ModelError::SafeTensors(format!("tensor '{}': {e}", init.name))
                })?;
                Ok((init.name.clone(), view))
            })
            .collect::<Result<Vec<_>, ModelError>>()?;
        safetensors::serialize_to_file(views, &None, &data_path)
            .map_err(|e| ModelError::SafeTensors(format!("write failed: {e}")))?;

        let location = data_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let doc = ModelDocument {
            model: stripped,
            external_data: Some(ExternalData {
                location,
                tensors: initializers.iter().map(|i| i.name.clone()).collect(),
            }),
        };
        std::fs::write(path, serde_json::to_string_pretty(&doc)?)?;

        tracing::info!(
            path = %path.display(),
            data = %data_path.display(),
            tensors = initializers.len(),
            payload,
            "saved model with external data"
        );
        Ok(SaveLayout::External { data_path })
    }
}

fn data_path_for(path: &Path) -> Result<PathBuf, ModelError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| ModelError::InvalidGraph(format!("'{}' is not a file path", path.display())))?;
    let mut data_name = file_name.to_os_string();
    data_name.push("_data");
    Ok(path.with_file_name(data_name))
}

/// Parses a human-readable byte size.
///
/// Accepted formats: `"512M"`, `"512MB"`, `"2G"`, `"2GB"`, `"64K"`, `"64KB"`,
/// `"100B"` or a plain byte count. Case-insensitive; binary multiples.
///
/// ```
/// assert_eq!(model_ir::parse_byte_size("2G").unwrap(), 2 * 1024 * 1024 * 1024usize);
/// assert_eq!(model_ir::parse_byte_size("64kb").unwrap(), 64 * 1024);
/// ```
pub fn parse_byte_size(s: &str) -> Result<usize, ModelError> {
    let s = s.trim();
    let upper = s.to_ascii_uppercase();

    let (digits, multiplier) = [
        ("GB", 1usize << 30),
        ("G", 1 << 30),
        ("MB", 1 << 20),
        ("M", 1 << 20),
        ("KB", 1 << 10),
        ("K", 1 << 10),
        ("B", 1),
    ]
    .iter()
    .find(|(suffix, _)| upper.ends_with(suffix))
    .map_or((s, 1), |(suffix, mult)| (&s[..s.len() - suffix.len()], *mult));

    let value: usize = digits
        .trim()
        .parse()
        .map_err(|_| ModelError::InvalidSize(s.to_string()))?;
    let bytes = value
        .checked_mul(multiplier)
        .ok_or_else(|| ModelError::InvalidSize(s.to_string()))?;
    if bytes == 0 {
        return Err(ModelError::InvalidSize(s.to_string()));
    }
    Ok(bytes)
}
