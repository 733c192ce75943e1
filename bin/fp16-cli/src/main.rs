// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # fp16c
//!
//! Command-line interface for the float16 conversion pass.
//!
//! ## Usage
//! ```bash
//! # Convert a model, keeping float32 inputs and outputs
//! fp16c convert -m ./models/encoder.json -o ./encoder_fp16.json --keep-io-types
//!
//! # Check whether a model already carries float16 values
//! fp16c check -m ./encoder_fp16.json
//!
//! # Inspect model structure
//! fp16c inspect -m ./models/encoder.json
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "fp16c",
    about = "Converts float32 computation graphs to float16",
    version,
    author
)]
struct Cli {
    /// Path to a TOML conversion config; explicit flags override its values.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a model to float16 and save it.
    Convert {
        /// Path to the input model document.
        #[arg(short, long)]
        model: PathBuf,

        /// Where to write the converted model.
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        options: commands::convert::ConvertArgs,
    },

    /// Report which parts of a model already use float16.
    Check {
        /// Path to the model document.
        #[arg(short, long)]
        model: PathBuf,
    },

    /// Inspect a model: op types, element types, nesting and casts.
    Inspect {
        /// Path to the model document.
        #[arg(short, long)]
        model: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Convert {
            model,
            output,
            options,
        } => commands::convert::execute(model, output, cli.config, options),
        Commands::Check { model } => commands::check::execute(model),
        Commands::Inspect { model } => commands::inspect::execute(model),
    }
}
