// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! On-disk JSON model document.
//!
//! # Format
//! ```json
//! {
//!   "model": {
//!     "ir_version": 8,
//!     "producer_name": "exporter",
//!     "opset_imports": [{ "domain": "", "version": 17 }],
//!     "graph": {
//!       "name": "main",
//!       "inputs":  [{ "name": "x", "dtype": "f32", "shape": ["batch", 4] }],
//!       "outputs": [{ "name": "z", "dtype": "f32" }],
//!       "nodes": [{ "name": "relu0", "op_type": "Relu", "inputs": ["x"], "outputs": ["z"] }],
//!       "initializers": []
//!     }
//!   },
//!   "external_data": { "location": "model.json_data", "tensors": ["w"] }
//! }
//! ```
//!
//! `external_data` is present only for models saved in the split layout; the
//! listed top-level initializers then live in the SafeTensors file named by
//! `location` (relative to the document), in the listed order.

use crate::{Loaded, Model, ModelError};
use serde_json::Value;

/// Root object of a model file.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub(crate) struct ModelDocument {
    pub model: Model<Loaded>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_data: Option<ExternalData>,
}

/// Location and order of initializers stored outside the JSON document.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub(crate) struct ExternalData {
    pub location: String,
    pub tensors: Vec<String>,
}

impl ModelDocument {
    /// Parses a document, rejecting roots that are not model documents
    /// before attempting the full schema.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let value: Value = serde_json::from_str(json)?;
        check_root(&value)?;
        Ok(serde_json::from_value(value)?)
    }
}

fn check_root(value: &Value) -> Result<(), ModelError> {
    let found = match value {
        Value::Object(map) => match map.get("model") {
            Some(Value::Object(_)) => return Ok(()),
            Some(_) => "an object whose 'model' field is not an object",
            None if map.contains_key("nodes") => "a bare graph object",
            None => "an object without a 'model' field",
        },
        Value::Array(_) => "an array",
        Value::String(_) => "a string",
        Value::Number(_) => "a number",
        Value::Bool(_) => "a boolean",
        Value::Null => "null",
    };
    Err(ModelError::WrongRootType {
        found: found.to_string(),
    })
}
