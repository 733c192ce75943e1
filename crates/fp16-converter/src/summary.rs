// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Counters describing what a conversion pass changed.

/// What one run of the pass did to a model.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ConversionSummary {
    /// Graphs rewritten, the top-level graph included.
    pub graphs_processed: usize,
    /// Nesting levels visited.
    pub levels: usize,
    /// Constant tensors (initializers and attributes) downcast.
    pub tensors_converted: usize,
    /// Declared value types changed from float32 to float16.
    pub values_retyped: usize,
    /// Conversion nodes added at the top-level inputs and outputs.
    pub boundary_casts: usize,
    /// Conversion nodes added around blocked nodes.
    pub wrapper_casts: usize,
    /// Conversion nodes removed as redundant round trips.
    pub casts_eliminated: usize,
}

impl ConversionSummary {
    /// Net number of conversion nodes the pass added.
    pub fn net_casts_added(&self) -> isize {
        (self.boundary_casts + self.wrapper_casts) as isize - self.casts_eliminated as isize
    }

    pub(crate) fn record_graph(&mut self) {
        self.graphs_processed += 1;
    }

    pub(crate) fn record_tensor(&mut self) {
        self.tensors_converted += 1;
    }

    pub(crate) fn record_retype(&mut self) {
        self.values_retyped += 1;
    }

    pub(crate) fn record_boundary_cast(&mut self) {
        self.boundary_casts += 1;
    }

    pub(crate) fn record_wrapper_cast(&mut self) {
        self.wrapper_casts += 1;
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "{} graphs over {} levels, {} tensors converted, {} values retyped, \
             {} boundary casts, {} wrapper casts, {} casts eliminated",
            self.graphs_processed,
            self.levels,
            self.tensors_converted,
            self.values_retyped,
            self.boundary_casts,
            self.wrapper_casts,
            self.casts_eliminated,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let s = ConversionSummary::default();
        assert_eq!(s.graphs_processed, 0);
        assert_eq!(s.net_casts_added(), 0);
    }

    #[test]
    fn test_net_casts() {
        let mut s = ConversionSummary::default();
        s.record_boundary_cast();
        s.record_wrapper_cast();
        s.record_wrapper_cast();
        s.casts_eliminated = 2;
        assert_eq!(s.net_casts_added(), 1);
    }

    #[test]
    fn test_summary() {
        let mut s = ConversionSummary::default();
        s.record_graph();
        s.levels = 1;
        s.record_tensor();
        s.record_retype();
        let text = s.summary();
        assert!(text.contains("1 graphs over 1 levels"));
        assert!(text.contains("1 tensors converted"));
        assert!(text.contains("1 values retyped"));
    }

    #[test]
    fn test_serialises_every_counter() {
        let mut s = ConversionSummary::default();
        s.record_graph();
        s.record_wrapper_cast();
        s.casts_eliminated = 1;
        let json: serde_json::Value = serde_json::to_value(&s).unwrap();
        assert_eq!(json["graphs_processed"], 1);
        assert_eq!(json["wrapper_casts"], 1);
        assert_eq!(json["casts_eliminated"], 1);
        assert_eq!(json["boundary_casts"], 0);
        assert_eq!(json.as_object().unwrap().len(), 7);
    }
}
