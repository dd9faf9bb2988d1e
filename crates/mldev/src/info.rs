// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Device and model metadata.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle assigned by a device when a model image is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelId(pub u16);

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model#{}", self.0)
    }
}

/// Device-wide capabilities, collected once at bring-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_id: u16,
    pub driver_name: String,
    /// Maximum number of models the device can hold registered at once.
    pub max_models: u16,
    pub max_queue_pairs: u16,
    /// Minimum alignment, in bytes, of buffers handed to the device.
    pub min_align_size: usize,
    /// NUMA socket the device is attached to; `None` if unknown.
    pub socket_id: Option<u32>,
}

/// Runtime metadata the device reports for a registered model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub version: String,
    /// Natural batch size of the model.
    pub batch_size: u32,
    /// Quantized input bytes per batch.
    pub input_size: u64,
    /// Quantized output bytes per batch.
    pub output_size: u64,
}

impl ModelInfo {
    /// Input bytes needed for `batches` batches.
    pub fn input_bytes(&self, batches: u32) -> u64 {
        self.input_size * u64::from(batches)
    }

    /// Output bytes needed for `batches` batches.
    pub fn output_bytes(&self, batches: u32) -> u64 {
        self.output_size * u64::from(batches)
    }
}

/// Parameters used to configure a device before any model is registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub socket_id: Option<u32>,
    pub nb_models: u16,
    pub nb_queue_pairs: u16,
}

/// Operations exposed by an ML device, used to label errors and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceOp {
    Configure,
    DeviceStart,
    DeviceStop,
    Close,
    Register,
    ModelInfo,
    Start,
    Stop,
    Release,
}

impl DeviceOp {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Configure => "configure",
            Self::DeviceStart => "device start",
            Self::DeviceStop => "device stop",
            Self::Close => "close",
            Self::Register => "register",
            Self::ModelInfo => "model info",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Release => "release",
        }
    }
}

impl fmt::Display for DeviceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_bytes_scale_with_batches() {
        let info = ModelInfo {
            name: "m".into(),
            version: "1".into(),
            batch_size: 8,
            input_size: 100,
            output_size: 10,
        };
        assert_eq!(info.input_bytes(4), 400);
        assert_eq!(info.output_bytes(8), 80);
    }

    #[test]
    fn test_model_info_json() {
        let info = ModelInfo {
            name: "resnet".into(),
            version: "2.1".into(),
            batch_size: 4,
            input_size: 1024,
            output_size: 16,
        };
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"batch_size\":4"));
        let back: ModelInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
    }

    #[test]
    fn test_display() {
        assert_eq!(ModelId(3).to_string(), "model#3");
        assert_eq!(DeviceOp::ModelInfo.to_string(), "model info");
    }
}
