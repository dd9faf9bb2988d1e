// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

pub mod device;
pub mod info;
pub mod run;

use crate::DeviceArgs;
use lifecycle::HarnessConfig;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins over `-v`.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Builds the harness config from a TOML file if given, else from flags.
///
/// Models named on the command line replace the file's model list.
pub fn resolve_config(
    config_path: Option<&Path>,
    args: &DeviceArgs,
    models: Vec<PathBuf>,
) -> anyhow::Result<HarnessConfig> {
    let config = match config_path {
        Some(path) => {
            let mut config = HarnessConfig::from_file(path)?;
            if !models.is_empty() {
                tracing::debug!(
                    file_models = config.models.len(),
                    flag_models = models.len(),
                    "command-line models override config file"
                );
                config.models = models;
            }
            config
        }
        None => HarnessConfig {
            device_id: args.device_id,
            socket_id: args.socket_id,
            batches: args.batches,
            queue_pairs: args.queue_pairs,
            staging_budget: args.staging_budget.clone(),
            models,
        },
    };
    config.validate()?;
    tracing::debug!(?config, "harness configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> DeviceArgs {
        DeviceArgs {
            device_id: 0,
            socket_id: None,
            batches: 0,
            queue_pairs: 1,
            staging_budget: "1G".into(),
            sim_batch_size: 1,
        }
    }

    fn config_file(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mldev-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, "batches = 4\nmodels = [\"from-file.bin\"]\n").unwrap();
        path
    }

    #[test]
    fn test_flag_models_override_config_file() {
        let path = config_file("override.toml");
        let config =
            resolve_config(Some(&path), &args(), vec![PathBuf::from("from-flag.bin")]).unwrap();
        assert_eq!(config.models, vec![PathBuf::from("from-flag.bin")]);
        assert_eq!(config.batches, 4);
    }

    #[test]
    fn test_config_file_models_used_without_flags() {
        let path = config_file("keep.toml");
        let config = resolve_config(Some(&path), &args(), Vec::new()).unwrap();
        assert_eq!(config.models, vec![PathBuf::from("from-file.bin")]);
    }

    #[test]
    fn test_flags_without_models_rejected() {
        assert!(resolve_config(None, &args(), Vec::new()).is_err());
    }
}
