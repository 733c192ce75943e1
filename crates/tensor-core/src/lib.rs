// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Element types and constant tensors for computation-graph rewriting.
//!
//! This crate provides:
//! - [`DType`]: supported element data types, with their ONNX type codes.
//! - [`Shape`]: concrete tensor dimensions.
//! - [`Tensor`]: an owned little-endian byte buffer with a validated size.
//! - [`downcast_to_f16`]: the clamped `f32` -> `f16` value conversion.
//!
//! # Design Goals
//! - A tensor's buffer size always matches its shape and dtype.
//! - Downcasting never changes the sign or finiteness of a value.
//! - Clean error types via `thiserror`.

mod downcast;
mod dtype;
mod error;
mod shape;
mod tensor;

pub use downcast::{downcast_to_f16, ClampRange, OutOfRange};
pub use dtype::DType;
pub use error::TensorError;
pub use half::f16;
pub use shape::Shape;
pub use tensor::Tensor;
