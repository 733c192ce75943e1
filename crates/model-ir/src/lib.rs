// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # model-ir
//!
//! An in-memory representation of ONNX-style computation graphs.
//!
//! - [`Model`]: metadata plus the top-level [`Graph`], with a **type-state
//!   pattern** (`Loaded` → `Validated`).
//! - [`Graph`]: one nesting level: nodes, declared inputs/outputs,
//!   value-info entries and initializers.
//! - [`Node`] / [`AttributeValue`]: operations linked by value *names*;
//!   control-flow bodies are nested graphs held in attributes.
//! - [`ValueIndex`]: name → producer/consumer lookup for one level.
//! - [`ModelLoader`] / [`ModelSaver`]: JSON documents, with large payloads
//!   split into a SafeTensors data file.
//!
//! # Example
//! ```no_run
//! use model_ir::{ModelLoader, ModelSaver, SaveOptions};
//! use std::path::Path;
//!
//! let model = ModelLoader::load(Path::new("./models/encoder.json")).unwrap();
//! println!("{}", model.summary());
//! let model = model.validate().unwrap();
//! ModelSaver::save(&model, Path::new("./out.json"), &SaveOptions::default()).unwrap();
//! ```

mod document;
mod error;
pub mod graph;
mod index;
mod loader;
mod model;
mod node;
mod saver;
mod toposort;
mod value;

pub use error::ModelError;
pub use graph::Graph;
pub use index::ValueIndex;
pub use loader::ModelLoader;
pub use model::{Loaded, Model, ModelState, OpsetImport, Validated};
pub use node::{AttributeValue, Node, CAST_OP, CAST_TO_ATTR, CONSTANT_OP, IDENTITY_OP};
pub use saver::{parse_byte_size, ModelSaver, SaveLayout, SaveOptions, MAXIMUM_INLINE_BYTES};
pub use value::{Dim, Initializer, ValueInfo};
