// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # mldev-test
//!
//! Command-line harness for the model lifecycle on an ML device.
//!
//! ## Usage
//! ```bash
//! # Load, start, stop and unload two models, one lane each
//! mldev-test run --model ./models/a.bin --model ./models/b.bin --batches 4
//!
//! # Same, with options from a TOML file
//! mldev-test run --config ./harness.toml
//!
//! # Print a model's runtime metadata
//! mldev-test info --model ./models/a.bin --json
//!
//! # Print device capabilities
//! mldev-test device
//! ```

mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "mldev-test",
    about = "Model lifecycle test harness for ML devices",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file (overrides CLI arguments).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by commands that bring up the device.
#[derive(Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Device identifier.
    #[arg(short, long, default_value_t = 0)]
    pub device_id: u16,

    /// NUMA socket for staging memory (defaults to the device's socket).
    #[arg(short, long)]
    pub socket_id: Option<u32>,

    /// Batch count override; 0 uses the model's natural batch size.
    #[arg(short, long, default_value_t = 0)]
    pub batches: u32,

    /// Queue pairs to configure on the device.
    #[arg(long, default_value_t = 1)]
    pub queue_pairs: u16,

    /// Ceiling on concurrently staged model bytes (e.g., "512M", "1G").
    #[arg(long, default_value = "1G")]
    pub staging_budget: String,

    /// Natural batch size reported by the simulated device.
    #[arg(long, default_value_t = 1)]
    pub sim_batch_size: u32,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive each model through load, start, stop and unload.
    Run {
        #[command(flatten)]
        device: DeviceArgs,

        /// Model image file (repeat for several models).
        #[arg(short, long = "model")]
        models: Vec<PathBuf>,

        /// Lifecycle round trips per model.
        #[arg(short, long, default_value_t = 1)]
        repetitions: u32,
    },

    /// Load a model and print its runtime metadata.
    Info {
        #[command(flatten)]
        device: DeviceArgs,

        /// Model image file.
        #[arg(short, long)]
        model: PathBuf,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Print the device's capabilities.
    Device {
        /// Device identifier.
        #[arg(short, long, default_value_t = 0)]
        device_id: u16,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            device,
            models,
            repetitions,
        } => {
            let config = commands::resolve_config(cli.config.as_deref(), &device, models)?;
            commands::run::execute(config, device.sim_batch_size, repetitions).await
        }
        Commands::Info {
            device,
            model,
            json,
        } => {
            let config = commands::resolve_config(cli.config.as_deref(), &device, vec![model])?;
            commands::info::execute(config, device.sim_batch_size, json).await
        }
        Commands::Device { device_id, json } => commands::device::execute(device_id, json).await,
    }
}
