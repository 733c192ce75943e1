// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `fp16c convert` command: run the pass and save the result.
//!
//! ```text
//! load → [remove identities] → convert → validate → save
//! ```

use anyhow::Context;
use fp16_converter::{remove_identity_nodes, ConversionSummary, ConvertConfig, Fp16Converter};
use model_ir::{parse_byte_size, ModelSaver, SaveOptions};
use std::path::{Path, PathBuf};

/// Conversion flags. Each one that is given overrides the config file.
#[derive(clap::Args, Debug)]
pub struct ConvertArgs {
    /// Keep float32 on the top-level inputs and outputs.
    #[arg(long)]
    keep_io_types: bool,

    /// Smallest non-zero magnitude kept (default 1e-7).
    #[arg(long)]
    min_positive_val: Option<f32>,

    /// Largest finite magnitude kept (default 1e4).
    #[arg(long)]
    max_finite_val: Option<f32>,

    /// Comma-separated operation types kept in float32; replaces the default list.
    #[arg(long, value_delimiter = ',')]
    op_block_list: Option<Vec<String>>,

    /// Comma-separated node names kept in float32.
    #[arg(long, value_delimiter = ',')]
    node_block_list: Option<Vec<String>>,

    /// Skip element-type inference before the pass.
    #[arg(long)]
    disable_shape_infer: bool,

    /// Convert even if the model already contains float16 values.
    #[arg(long)]
    skip_fp16_check: bool,

    /// Remove Identity nodes before converting.
    #[arg(long)]
    remove_identity: bool,

    /// Payload size from which initializers go to a separate data file (e.g., "512M", "2G").
    #[arg(long, default_value = "2G")]
    external_threshold: String,

    /// Write the conversion counters as JSON to this file.
    #[arg(long)]
    summary_json: Option<PathBuf>,
}

impl ConvertArgs {
    fn apply(&self, config: &mut ConvertConfig) {
        if self.keep_io_types {
            config.keep_io_types = true;
        }
        if let Some(v) = self.min_positive_val {
            config.min_positive_val = v;
        }
        if let Some(v) = self.max_finite_val {
            config.max_finite_val = v;
        }
        if let Some(ops) = &self.op_block_list {
            config.op_block_list = non_empty(ops);
        }
        if let Some(nodes) = &self.node_block_list {
            config.node_block_list = non_empty(nodes);
        }
        if self.disable_shape_infer {
            config.disable_shape_infer = true;
        }
        if self.skip_fp16_check {
            config.check_fp16_ready = false;
        }
    }
}

fn non_empty(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn write_summary(summary: &ConversionSummary, path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write summary to '{}'", path.display()))
}

pub fn execute(
    model: PathBuf,
    output: PathBuf,
    config_path: Option<PathBuf>,
    args: ConvertArgs,
) -> anyhow::Result<()> {
    // ── Configuration ──────────────────────────────────────────
    let mut config = match &config_path {
        Some(path) => ConvertConfig::from_file(path)?,
        None => ConvertConfig::default(),
    };
    args.apply(&mut config);
    let save_options = SaveOptions {
        external_data_threshold: parse_byte_size(&args.external_threshold)
            .context("invalid --external-threshold")?,
    };

    println!("  Config:");
    println!("   Model:         {}", model.display());
    println!("   Output:        {}", output.display());
    println!("   Keep IO types: {}", config.keep_io_types);
    println!(
        "   Clamp range:   [{:e}, {:e}]",
        config.min_positive_val, config.max_finite_val
    );
    println!("   Blocked ops:   {}", config.op_block_list.len());
    println!("   Blocked nodes: {}", config.node_block_list.len());
    println!();

    // ── Conversion ─────────────────────────────────────────────
    let mut loaded = super::load_model(&model)?;
    println!("  {}", loaded.summary());

    if args.remove_identity {
        let removed = remove_identity_nodes(&mut loaded.graph);
        println!("  Removed {removed} identity nodes");
    }

    let converter = Fp16Converter::new(config)?;
    let (converted, summary) = converter
        .convert_with_summary(loaded)
        .with_context(|| format!("failed to convert '{}'", model.display()))?;
    println!("  {}", summary.summary());
    if let Some(path) = &args.summary_json {
        write_summary(&summary, path)?;
        println!("  Summary written to {}", path.display());
    }

    // ── Save ───────────────────────────────────────────────────
    let validated = converted
        .validate()
        .context("converted model failed validation")?;
    let layout = ModelSaver::save(&validated, &output, &save_options)
        .with_context(|| format!("failed to save '{}'", output.display()))?;
    println!("  {}", validated.summary());
    println!("  Saved {layout}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_summary_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let summary = ConversionSummary {
            graphs_processed: 2,
            boundary_casts: 3,
            ..ConversionSummary::default()
        };
        write_summary(&summary, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["graphs_processed"], 2);
        assert_eq!(json["boundary_casts"], 3);
        assert_eq!(json["casts_eliminated"], 0);
    }

    #[test]
    fn test_write_summary_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("summary.json");
        let err = write_summary(&ConversionSummary::default(), &path).unwrap_err();
        assert!(err.to_string().contains("failed to write summary"));
    }
}
