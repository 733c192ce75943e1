// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `fp16c inspect` command: display model structure.
//!
//! Counts are taken over the top-level graph and every nested graph.

use std::collections::BTreeMap;
use std::path::PathBuf;
use tensor_core::DType;

pub fn execute(model: PathBuf) -> anyhow::Result<()> {
    let loaded = super::load_model(&model)?;
    let graph = &loaded.graph;

    let mut ops: BTreeMap<&str, usize> = BTreeMap::new();
    let mut dtypes: BTreeMap<DType, usize> = BTreeMap::new();
    let mut casts: BTreeMap<String, usize> = BTreeMap::new();
    graph.walk(&mut |g| {
        for node in &g.nodes {
            *ops.entry(node.op_type.as_str()).or_default() += 1;
            if node.is_cast() {
                let target = node
                    .cast_target()
                    .map_or_else(|| "?".to_string(), |t| t.to_string());
                *casts.entry(target).or_default() += 1;
            }
        }
        for v in g.inputs.iter().chain(&g.outputs).chain(&g.value_info) {
            *dtypes.entry(v.dtype).or_default() += 1;
        }
        for init in &g.initializers {
            *dtypes.entry(init.tensor.dtype()).or_default() += 1;
        }
    });

    // ── Summary ────────────────────────────────────────────────
    println!("  {}", loaded.summary());
    println!("  IR version: {}", loaded.ir_version);
    for opset in &loaded.opset_imports {
        let domain = if opset.domain.is_empty() { "ai.onnx" } else { &opset.domain };
        println!("  Opset: {domain} v{}", opset.version);
    }
    println!("  Nested graphs: {}", graph.subgraph_count());
    println!(
        "  Inputs: {}  Outputs: {}  Initializers: {}",
        graph.inputs.len(),
        graph.outputs.len(),
        graph.initializers.len(),
    );
    println!();

    // ── Operations ─────────────────────────────────────────────
    println!("  {:<28} {:>8}", "Op type", "Count");
    println!("  {}", "-".repeat(37));
    let mut by_count: Vec<(&str, usize)> = ops.into_iter().collect();
    by_count.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    for (op, n) in by_count {
        println!("  {:<28} {:>8}", truncate(op, 28), n);
    }
    println!();

    // ── Element types ──────────────────────────────────────────
    println!("  {:<28} {:>8}", "Element type", "Count");
    println!("  {}", "-".repeat(37));
    for (dtype, n) in &dtypes {
        println!("  {:<28} {:>8}", dtype.to_string(), n);
    }
    println!();

    let total: usize = casts.values().sum();
    println!("  Cast nodes: {total}");
    for (target, n) in &casts {
        println!("   to {target}: {n}");
    }
    Ok(())
}

/// Truncates a string to `max_len` with ellipsis if needed.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    }
}
