// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Clamped `f32` -> `f16` conversion.
//!
//! Plain rounding to half precision flushes tiny magnitudes to zero and
//! overflows large ones to infinity, both of which change the meaning of a
//! weight. [`downcast_to_f16`] instead keeps the sign and finiteness of every
//! element:
//!
//! | input `x`                         | stored as          |
//! |-----------------------------------|--------------------|
//! | `0`, `NaN`, `+inf`, `-inf`        | unchanged          |
//! | `0 < x < min_positive`            | `min_positive`     |
//! | `max_finite < x < +inf`           | `max_finite`       |
//! | negative values                   | mirrored rules     |
//!
//! The conversion is lossy and not reversible.

use crate::{DType, Tensor, TensorError};
use half::f16;

/// Clamping thresholds applied before rounding to `f16`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClampRange {
    /// Smallest magnitude a non-zero value may take.
    pub min_positive: f32,
    /// Largest magnitude a finite value may take.
    pub max_finite: f32,
}

impl ClampRange {
    /// Default smallest magnitude kept for non-zero values.
    pub const DEFAULT_MIN_POSITIVE: f32 = 1e-7;
    /// Default largest magnitude kept for finite values.
    pub const DEFAULT_MAX_FINITE: f32 = 1e4;

    pub fn new(min_positive: f32, max_finite: f32) -> Self {
        Self {
            min_positive,
            max_finite,
        }
    }

    /// Clamps a single value. Zero, NaN and infinities pass through.
    pub fn clamp(&self, x: f32) -> f32 {
        let (lo, hi) = (self.min_positive, self.max_finite);
        if 0.0 < x && x < lo {
            lo
        } else if -lo < x && x < 0.0 {
            -lo
        } else if hi < x && x < f32::INFINITY {
            hi
        } else if f32::NEG_INFINITY < x && x < -hi {
            -hi
        } else {
            x
        }
    }
}

impl Default for ClampRange {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN_POSITIVE, Self::DEFAULT_MAX_FINITE)
    }
}

/// Converts `values` to half precision under `range`.
///
/// Emits a `tracing` warning for each side (positive/negative) whose extreme
/// magnitude reaches a threshold (see [`ClampRange::out_of_range`]). Warnings
/// are advisory only.
pub fn downcast_to_f16(values: &[f32], range: &ClampRange) -> Vec<f16> {
    let report = range.out_of_range(values);
    for (value, bound) in report.offenders(range) {
        tracing::warn!("the float32 number {value} will be truncated to {bound}");
    }
    values.iter().map(|&x| f16::from_f32(range.clamp(x))).collect()
}

/// The extreme values of an array that reach a [`ClampRange`] threshold.
///
/// Each field holds the most extreme offending value on that side, or `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OutOfRange {
    /// Largest positive value, if `>= max_finite`.
    pub positive_max: Option<f32>,
    /// Smallest positive value, if `<= min_positive`.
    pub positive_min: Option<f32>,
    /// Most negative value, if `<= -max_finite`.
    pub negative_max: Option<f32>,
    /// Negative value closest to zero, if `>= -min_positive`.
    pub negative_min: Option<f32>,
}

impl OutOfRange {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Offending values paired with the threshold they are reported against.
    fn offenders(&self, range: &ClampRange) -> impl Iterator<Item = (f32, f32)> {
        [
            self.positive_max.map(|v| (v, range.max_finite)),
            self.positive_min.map(|v| (v, range.min_positive)),
            self.negative_max.map(|v| (v, -range.max_finite)),
            self.negative_min.map(|v| (v, -range.min_positive)),
        ]
        .into_iter()
        .flatten()
    }
}

impl ClampRange {
    /// Finds the extremes of `values` that meet or pass a threshold.
    ///
    /// Bounds are inclusive: a value exactly at a threshold is reported even
    /// though [`ClampRange::clamp`] leaves it unchanged. Zero, NaN and
    /// infinities are never reported.
    pub fn out_of_range(&self, values: &[f32]) -> OutOfRange {
        let mut pos: Option<(f32, f32)> = None;
        let mut neg: Option<(f32, f32)> = None;
        for &x in values.iter().filter(|x| x.is_finite()) {
            let side = if x > 0.0 {
                &mut pos
            } else if x < 0.0 {
                &mut neg
            } else {
                continue;
            };
            let (lo, hi) = side.get_or_insert((x, x));
            *lo = lo.min(x);
            *hi = hi.max(x);
        }

        let mut report = OutOfRange::default();
        if let Some((lo, hi)) = pos {
            report.positive_max = (hi >= self.max_finite).then_some(hi);
            report.positive_min = (lo <= self.min_positive).then_some(lo);
        }
        if let Some((lo, hi)) = neg {
            report.negative_max = (lo <= -self.max_finite).then_some(lo);
            report.negative_min = (hi >= -self.min_positive).then_some(hi);
        }
        report
    }
}

impl Tensor {
    /// Returns an `f16` copy of an `f32` tensor, clamped under `range`.
    pub fn downcast_to_f16(&self, range: &ClampRange) -> Result<Tensor, TensorError> {
        if self.dtype() != DType::F32 {
            return Err(TensorError::UnsupportedDType {
                op: "downcast_to_f16",
                dtype: self.dtype(),
            });
        }
        let halves = downcast_to_f16(&self.to_f32_vec()?, range);
        Tensor::from_f16(self.shape().clone(), &halves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Shape;

    fn h(x: f32) -> f16 {
        f16::from_f32(x)
    }

    #[test]
    fn test_specials_pass_through() {
        let out = downcast_to_f16(
            &[0.0, -0.0, f32::INFINITY, f32::NEG_INFINITY, f32::NAN],
            &ClampRange::default(),
        );
        assert_eq!(out[0], f16::ZERO);
        assert!(out[1].is_sign_negative() && out[1].to_f32() == 0.0);
        assert_eq!(out[2], f16::INFINITY);
        assert_eq!(out[3], f16::NEG_INFINITY);
        assert!(out[4].is_nan());
    }

    #[test]
    fn test_tiny_values_raised_to_min() {
        let out = downcast_to_f16(&[1e-9, -1e-9, 5e-8], &ClampRange::default());
        assert_eq!(out[0], h(1e-7));
        assert_eq!(out[1], h(-1e-7));
        assert_eq!(out[2], h(1e-7));
        assert!(out[0].to_f32() > 0.0);
        assert!(out[1].to_f32() < 0.0);
    }

    #[test]
    fn test_large_values_capped_to_max() {
        let out = downcast_to_f16(&[1e5, -3e6, 70000.0], &ClampRange::default());
        assert_eq!(out[0], h(1e4));
        assert_eq!(out[1], h(-1e4));
        assert_eq!(out[2], h(1e4));
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_in_range_values_only_rounded() {
        let values = [0.5f32, -1.25, 3.0, 1e-3, 9999.0];
        let out = downcast_to_f16(&values, &ClampRange::default());
        for (x, y) in values.iter().zip(&out) {
            assert_eq!(*y, h(*x));
        }
    }

    #[test]
    fn test_sign_preserved() {
        let values = [1e-12f32, -1e-12, 1e12, -1e12, 0.1, -0.1, 42.0, -42.0];
        let out = downcast_to_f16(&values, &ClampRange::default());
        for (x, y) in values.iter().zip(&out) {
            assert_eq!(x.is_sign_negative(), y.is_sign_negative());
            assert!(y.to_f32() != 0.0);
        }
    }

    #[test]
    fn test_custom_range() {
        let range = ClampRange::new(1e-2, 10.0);
        let out = downcast_to_f16(&[1e-3, 11.0, -20.0, 5.0], &range);
        assert_eq!(out, vec![h(1e-2), h(10.0), h(-10.0), h(5.0)]);
    }

    #[test]
    fn test_tensor_downcast() {
        let t = Tensor::from_f32(Shape::matrix(1, 3), &[1.0, 1e-9, 2e5]).unwrap();
        let half = t.downcast_to_f16(&ClampRange::default()).unwrap();
        assert_eq!(half.dtype(), DType::F16);
        assert_eq!(half.shape(), &Shape::matrix(1, 3));
        assert_eq!(half.size_bytes(), 6);
        assert_eq!(half.to_f16_vec().unwrap(), vec![h(1.0), h(1e-7), h(1e4)]);
    }

    #[test]
    fn test_out_of_range_inclusive_at_thresholds() {
        let range = ClampRange::default();
        let report = range.out_of_range(&[1e4, 1e-7, -1e4, -1e-7, 1.0]);
        assert_eq!(
            report,
            OutOfRange {
                positive_max: Some(1e4),
                positive_min: Some(1e-7),
                negative_max: Some(-1e4),
                negative_min: Some(-1e-7),
            }
        );
        // Values exactly at a threshold are reported but not altered.
        let out = downcast_to_f16(&[1e4, -1e4], &range);
        assert_eq!(out, vec![h(1e4), h(-1e4)]);
    }

    #[test]
    fn test_out_of_range_reports_extremes_per_sign() {
        let range = ClampRange::default();
        let report = range.out_of_range(&[3e5, 2e4, 1e-9, 1e-8, -5.0]);
        assert_eq!(report.positive_max, Some(3e5));
        assert_eq!(report.positive_min, Some(1e-9));
        assert_eq!(report.negative_max, None);
        assert_eq!(report.negative_min, None);

        let report = range.out_of_range(&[-2e4, -7e6, -1e-8, -1e-10]);
        assert_eq!(report.negative_max, Some(-7e6));
        assert_eq!(report.negative_min, Some(-1e-10));
        assert_eq!(report.positive_max, None);
    }

    #[test]
    fn test_out_of_range_empty_when_in_range() {
        let range = ClampRange::default();
        let values = [0.0, -0.0, 0.5, -0.5, 9999.0, -9999.0, 2e-7, -2e-7];
        assert!(range.out_of_range(&values).is_empty());
        let specials = [f32::NAN, f32::INFINITY, f32::NEG_INFINITY];
        assert!(range.out_of_range(&specials).is_empty());
        assert!(range.out_of_range(&[]).is_empty());
    }

    #[test]
    fn test_tensor_downcast_rejects_non_f32() {
        let t = Tensor::zeros(Shape::vector(2), DType::F16);
        assert!(t.downcast_to_f16(&ClampRange::default()).is_err());
    }
}
