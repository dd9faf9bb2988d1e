// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Harness configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! device_id = 0
//! socket_id = 0
//! batches = 0
//! queue_pairs = 1
//! staging_budget = "1G"
//! models = ["./models/resnet.bin", "./models/bert.bin"]
//! ```

use crate::LifecycleError;
use memory_manager::MemoryBudget;
use std::path::{Path, PathBuf};

/// Options the lifecycle consumes from the surrounding harness.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HarnessConfig {
    /// Device to drive.
    #[serde(default)]
    pub device_id: u16,
    /// NUMA socket for staging memory and device configuration. `None`
    /// accepts whatever socket the device reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_id: Option<u32>,
    /// Batch count override; 0 uses each model's natural batch size.
    #[serde(default)]
    pub batches: u32,
    /// Queue pairs requested when configuring the device.
    #[serde(default = "default_queue_pairs")]
    pub queue_pairs: u16,
    /// Ceiling on concurrently staged model bytes (e.g. `"1G"`).
    #[serde(default = "default_staging_budget")]
    pub staging_budget: String,
    /// Model image files, one model per entry.
    #[serde(default)]
    pub models: Vec<PathBuf>,
}

fn default_queue_pairs() -> u16 {
    1
}

fn default_staging_budget() -> String {
    "1G".to_string()
}

impl HarnessConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, LifecycleError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LifecycleError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, LifecycleError> {
        toml::from_str(toml_str)
            .map_err(|e| LifecycleError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, LifecycleError> {
        toml::to_string_pretty(self)
            .map_err(|e| LifecycleError::Config(format!("TOML serialise error: {e}")))
    }

    /// Parses the staging budget string into a [`MemoryBudget`].
    pub fn parse_budget(&self) -> Result<MemoryBudget, LifecycleError> {
        MemoryBudget::parse(&self.staging_budget)
            .map_err(|e| LifecycleError::Config(format!("invalid staging budget: {e}")))
    }

    /// Checks the options that do not depend on the device.
    pub fn validate(&self) -> Result<(), LifecycleError> {
        if self.models.is_empty() {
            return Err(LifecycleError::Config("no model files given".into()));
        }
        if self.queue_pairs == 0 {
            return Err(LifecycleError::Config("queue_pairs must be at least 1".into()));
        }
        self.parse_budget()?;
        Ok(())
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            device_id: 0,
            socket_id: None,
            batches: 0,
            queue_pairs: default_queue_pairs(),
            staging_budget: default_staging_budget(),
            models: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let c = HarnessConfig::default();
        assert_eq!(c.device_id, 0);
        assert_eq!(c.batches, 0);
        assert_eq!(c.queue_pairs, 1);
        assert_eq!(c.parse_budget().unwrap().as_mb(), 1024);
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
device_id = 1
socket_id = 0
batches = 4
staging_budget = "256M"
models = ["/tmp/a.bin", "/tmp/b.bin"]
"#;
        let c = HarnessConfig::from_toml(toml).unwrap();
        assert_eq!(c.device_id, 1);
        assert_eq!(c.socket_id, Some(0));
        assert_eq!(c.batches, 4);
        assert_eq!(c.queue_pairs, 1);
        assert_eq!(c.models, vec![PathBuf::from("/tmp/a.bin"), PathBuf::from("/tmp/b.bin")]);
        assert_eq!(c.parse_budget().unwrap().as_mb(), 256);
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let c = HarnessConfig {
            models: vec!["m.bin".into()],
            ..Default::default()
        };
        let toml = c.to_toml().unwrap();
        assert!(!toml.contains("socket_id"));
        let back = HarnessConfig::from_toml(&toml).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_validate() {
        assert!(HarnessConfig::default().validate().is_err());

        let ok = HarnessConfig {
            models: vec!["m.bin".into()],
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let bad_budget = HarnessConfig {
            staging_budget: "lots".into(),
            ..ok.clone()
        };
        assert!(matches!(bad_budget.validate(), Err(LifecycleError::Config(_))));

        let no_queues = HarnessConfig { queue_pairs: 0, ..ok };
        assert!(no_queues.validate().is_err());
    }

    #[test]
    fn test_bad_toml() {
        assert!(HarnessConfig::from_toml("device_id = \"zero\"").is_err());
    }
}
