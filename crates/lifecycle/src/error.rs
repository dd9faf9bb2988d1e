// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the model lifecycle.
//!
//! Only [`LifecycleError::Device`] moves a model to the `Error` state.
//! Every other variant is raised before the device is contacted and
//! leaves the model untouched.

use crate::ModelState;
use memory_manager::MemoryError;
use mldev::DeviceError;
use std::fmt;
use std::path::PathBuf;

/// The four lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Load,
    Unload,
    Start,
    Stop,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Load => "load",
            Self::Unload => "unload",
            Self::Start => "start",
            Self::Stop => "stop",
        };
        f.write_str(name)
    }
}

/// Errors returned by lifecycle operations and device bring-up.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The operation is not valid from the model's current state.
    #[error("cannot {op} model '{}' in state {state}", .path.display())]
    InvalidState {
        op: Operation,
        state: ModelState,
        path: PathBuf,
    },

    /// The model image could not be opened or read.
    #[error("failed to read model file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The model image ended before its reported length.
    #[error("short read on model file '{}': expected {expected} bytes, got {read}", .path.display())]
    ShortRead {
        path: PathBuf,
        expected: usize,
        read: usize,
    },

    /// No staging buffer could be obtained for the model image.
    #[error("failed to allocate staging memory for '{}': {source}", .path.display())]
    Allocation {
        path: PathBuf,
        #[source]
        source: MemoryError,
    },

    /// A device call failed; the model is now in the `Error` state.
    #[error("device rejected {op} of model '{}': {source}", .path.display())]
    Device {
        op: Operation,
        path: PathBuf,
        #[source]
        source: DeviceError,
    },

    /// Device bring-up or teardown failed.
    #[error("device session error: {0}")]
    Session(#[from] DeviceError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl LifecycleError {
    /// Errno-style device status, if the device reported one.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Device { source, .. } | Self::Session(source) => Some(source.code()),
            _ => None,
        }
    }

    /// Whether this error left the model in the `Error` state.
    pub fn is_device_failure(&self) -> bool {
        matches!(self, Self::Device { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mldev::{errno, DeviceOp};

    #[test]
    fn test_invalid_state_message() {
        let e = LifecycleError::InvalidState {
            op: Operation::Start,
            state: ModelState::Initial,
            path: "models/a.bin".into(),
        };
        assert_eq!(e.to_string(), "cannot start model 'models/a.bin' in state initial");
        assert_eq!(e.code(), None);
        assert!(!e.is_device_failure());
    }

    #[test]
    fn test_device_error_code() {
        let e = LifecycleError::Device {
            op: Operation::Load,
            path: "a.bin".into(),
            source: DeviceError::call(DeviceOp::Register, errno::EIO),
        };
        assert_eq!(e.code(), Some(errno::EIO));
        assert!(e.is_device_failure());
        assert!(e.to_string().contains("register failed with code -5"));
    }
}
