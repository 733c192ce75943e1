// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Conversion options, loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! min_positive_val = 1e-7
//! max_finite_val = 10000.0
//! keep_io_types = true
//! disable_shape_infer = false
//! op_block_list = ["Resize", "TopK", "Cast"]
//! node_block_list = ["/decoder/attn/Softmax"]
//! check_fp16_ready = true
//! ```
//!
//! Every field is optional; omitted fields take their defaults. Omitting
//! `op_block_list` selects [`DEFAULT_OP_BLOCK_LIST`], while an explicit empty
//! list blocks no operation types at all.

use crate::inference::{ElemTypeInference, ShapeInference};
use crate::{BlockList, ConvertError};
use std::path::Path;
use tensor_core::ClampRange;

/// Operation types kept in float32 unless the caller overrides the list.
///
/// These are operators without float16 kernels in common runtimes, or whose
/// semantics change under reduced precision. `Cast` is included because its
/// output type is fixed by its own `to` attribute.
pub const DEFAULT_OP_BLOCK_LIST: &[&str] = &[
    "ArrayFeatureExtractor",
    "Binarizer",
    "CastMap",
    "CategoryMapper",
    "DictVectorizer",
    "FeatureVectorizer",
    "Imputer",
    "LabelEncoder",
    "LinearClassifier",
    "LinearRegressor",
    "Normalizer",
    "OneHotEncoder",
    "RandomUniformLike",
    "SVMClassifier",
    "SVMRegressor",
    "Scaler",
    "TreeEnsembleClassifier",
    "TreeEnsembleRegressor",
    "ZipMap",
    "NonMaxSuppression",
    "TopK",
    "RoiAlign",
    "Resize",
    "CumSum",
    "Min",
    "Max",
    "Upsample",
    "RandomNormalLike",
    "Cast",
];

/// Options of the float16 conversion pass.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Non-zero magnitudes below this are raised to it.
    pub min_positive_val: f32,
    /// Finite magnitudes above this are lowered to it.
    pub max_finite_val: f32,
    /// Keep float32 on the top-level inputs and outputs.
    pub keep_io_types: bool,
    /// Skip the shape/type inference step before the pass.
    pub disable_shape_infer: bool,
    /// Operation types that stay in float32.
    pub op_block_list: Vec<String>,
    /// Individual node names that stay in float32.
    pub node_block_list: Vec<String>,
    /// Refuse models that already contain float16 values.
    pub check_fp16_ready: bool,
}

impl ConvertConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConvertError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConvertError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConvertError> {
        toml::from_str(toml_str)
            .map_err(|e| ConvertError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, ConvertError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConvertError::Config(format!("TOML serialise error: {e}")))
    }

    /// Checks that the clamping thresholds describe a usable range.
    pub fn validate(&self) -> Result<(), ConvertError> {
        let (lo, hi) = (self.min_positive_val, self.max_finite_val);
        if !lo.is_finite() || !hi.is_finite() {
            return Err(ConvertError::Config(format!(
                "thresholds must be finite (min_positive_val = {lo}, max_finite_val = {hi})"
            )));
        }
        if lo <= 0.0 {
            return Err(ConvertError::Config(format!(
                "min_positive_val must be positive, got {lo}"
            )));
        }
        if hi <= lo {
            return Err(ConvertError::Config(format!(
                "max_finite_val ({hi}) must exceed min_positive_val ({lo})"
            )));
        }
        Ok(())
    }

    /// The clamping thresholds as a [`ClampRange`].
    pub fn clamp_range(&self) -> ClampRange {
        ClampRange::new(self.min_positive_val, self.max_finite_val)
    }

    /// Builds the blocklist described by this config.
    pub fn block_list(&self) -> BlockList {
        let mut list = BlockList::new::<&str>(&[], &[]);
        for op in &self.op_block_list {
            list.block_op(op);
        }
        for node in &self.node_block_list {
            list.block_node(node);
        }
        list
    }

    /// Creates the inference collaborator selected by this config.
    pub fn create_shape_inference(&self) -> Option<Box<dyn ShapeInference>> {
        if self.disable_shape_infer {
            None
        } else {
            Some(Box::new(ElemTypeInference))
        }
    }
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            min_positive_val: ClampRange::DEFAULT_MIN_POSITIVE,
            max_finite_val: ClampRange::DEFAULT_MAX_FINITE,
            keep_io_types: false,
            disable_shape_infer: false,
            op_block_list: DEFAULT_OP_BLOCK_LIST.iter().map(|s| s.to_string()).collect(),
            node_block_list: Vec::new(),
            check_fp16_ready: true,
        }
    }
}
