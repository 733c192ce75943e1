// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # fp16-converter
//!
//! Rewrites a float32 computation graph so that it computes in float16.
//!
//! The [`Fp16Converter`] drives one pass over a [`Model`]:
//! ```text
//! Model<S>
//!     │  shape inference (optional)
//!     │  readiness check (optional)
//!     │  convert_graphs: level by level, nested bodies included
//!     │  remove_redundant_casts: top level
//!     │  toposort
//!     ▼
//! Model<Loaded>
//! ```
//! Operations in the [`BlockList`] keep computing in float32 behind
//! conversion nodes. With `keep_io_types`, the top-level inputs and outputs
//! stay float32 and conversion nodes are placed at the boundary.
//!
//! The result is returned in the `Loaded` state; callers validate it before
//! saving.
//!
//! # Example
//! ```no_run
//! use fp16_converter::{convert_model_path, ConvertConfig};
//! use model_ir::{ModelSaver, SaveOptions};
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConvertConfig {
//!     keep_io_types: true,
//!     ..ConvertConfig::default()
//! };
//! let model = convert_model_path(Path::new("./models/encoder.json"), &config)?;
//! let model = model.validate()?;
//! ModelSaver::save(&model, Path::new("./encoder_fp16.json"), &SaveOptions::default())?;
//! # Ok(())
//! # }
//! ```

mod blocklist;
mod boundary;
mod cast_elim;
mod config;
mod error;
mod identity;
mod inference;
mod readiness;
mod rewrite;
mod summary;
mod walker;

pub use blocklist::BlockList;
pub use boundary::{RenameTable, FP16_SUFFIX};
pub use cast_elim::remove_redundant_casts;
pub use config::{ConvertConfig, DEFAULT_OP_BLOCK_LIST};
pub use error::ConvertError;
pub use identity::remove_identity_nodes;
pub use inference::{ElemTypeInference, ShapeInference};
pub use readiness::{is_fp16_ready, ReadinessReport};
pub use summary::ConversionSummary;
pub use walker::{convert_graphs, PassOptions};

use model_ir::{Loaded, Model, ModelLoader, ModelState};
use std::fmt;
use std::path::Path;

/// The float16 conversion driver.
pub struct Fp16Converter {
    config: ConvertConfig,
    blocklist: BlockList,
    shape_inference: Option<Box<dyn ShapeInference>>,
}

impl Fp16Converter {
    /// Creates a converter, with the inference collaborator `config` selects.
    pub fn new(config: ConvertConfig) -> Result<Self, ConvertError> {
        config.validate()?;
        Ok(Self {
            blocklist: config.block_list(),
            shape_inference: config.create_shape_inference(),
            config,
        })
    }

    /// Replaces the inference collaborator.
    pub fn with_shape_inference(mut self, inference: Box<dyn ShapeInference>) -> Self {
        self.shape_inference = Some(inference);
        self
    }

    pub fn without_shape_inference(mut self) -> Self {
        self.shape_inference = None;
        self
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// Converts `model` to float16.
    pub fn convert<S: ModelState>(&self, model: Model<S>) -> Result<Model<Loaded>, ConvertError> {
        self.convert_with_summary(model).map(|(model, _)| model)
    }

    /// Converts `model` to float16 and reports what the pass did.
    ///
    /// # Errors
    /// - [`ConvertError::AlreadyConverted`] if the readiness check is enabled
    ///   and the model already contains float16 values.
    /// - [`ConvertError::MultipleProducers`] / [`ConvertError::MalformedCast`]
    ///   for structurally unsupported graphs.
    /// - [`ConvertError::Model`] if the rewritten graph contains a cycle.
    pub fn convert_with_summary<S: ModelState>(
        &self,
        model: Model<S>,
    ) -> Result<(Model<Loaded>, ConversionSummary), ConvertError> {
        let mut model = model.into_loaded();

        if let Some(inference) = &self.shape_inference {
            tracing::debug!("running shape inference '{}'", inference.name());
            model = inference.infer(model)?;
        }

        if self.config.check_fp16_ready {
            let report = ReadinessReport::check(&model.graph);
            if report.is_fp16_ready() {
                return Err(ConvertError::AlreadyConverted(report));
            }
        }

        let options = PassOptions {
            blocklist: &self.blocklist,
            range: self.config.clamp_range(),
            keep_io_types: self.config.keep_io_types,
        };
        let mut summary = ConversionSummary::default();
        convert_graphs(&mut model.graph, &options, &mut summary)?;

        summary.casts_eliminated = remove_redundant_casts(&mut model.graph)?;
        model.graph.toposort()?;

        tracing::info!("converted '{}': {}", model.graph.name, summary.summary());
        Ok((model, summary))
    }
}

impl fmt::Debug for Fp16Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fp16Converter")
            .field("config", &self.config)
            .field(
                "shape_inference",
                &self.shape_inference.as_ref().map(|i| i.name()),
            )
            .finish()
    }
}

/// Converts `model` with the given options.
pub fn convert_float_to_float16<S: ModelState>(
    model: Model<S>,
    config: &ConvertConfig,
) -> Result<Model<Loaded>, ConvertError> {
    Fp16Converter::new(config.clone())?.convert(model)
}

/// Loads the model at `path` and converts it.
pub fn convert_model_path(path: &Path, config: &ConvertConfig) -> Result<Model<Loaded>, ConvertError> {
    let model = ModelLoader::load(path)?;
    tracing::info!("{}", model.summary());
    convert_float_to_float16(model, config)
}
