// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `fp16c check` command: report float16 content of a model.

use fp16_converter::ReadinessReport;
use std::path::PathBuf;

pub fn execute(model: PathBuf) -> anyhow::Result<()> {
    let loaded = super::load_model(&model)?;
    let report = ReadinessReport::check(&loaded.graph);

    let mark = |hit: bool| if hit { "float16" } else { "-" };
    println!("  Model: {}", model.display());
    println!("   Value descriptors: {}", mark(report.value_info));
    println!("   Initializers:      {}", mark(report.initializers));
    println!("   Cast nodes:        {}", mark(report.cast_nodes));
    println!();
    if report.is_fp16_ready() {
        println!("  Already converted ({report}).");
    } else {
        println!("  Ready for conversion.");
    }
    Ok(())
}
