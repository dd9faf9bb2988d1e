// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for device capability calls.

use crate::DeviceOp;

/// Negative errno values used as device status codes.
pub mod errno {
    pub const ENOENT: i32 = -2;
    pub const EIO: i32 = -5;
    pub const ENOMEM: i32 = -12;
    pub const EBUSY: i32 = -16;
    pub const ENODEV: i32 = -19;
    pub const EINVAL: i32 = -22;
    pub const ENOSPC: i32 = -28;
}

/// Errors reported by an ML device or by device bring-up checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// A device call returned a non-zero status.
    #[error("{op} failed with code {code}")]
    Call { op: DeviceOp, code: i32 },

    /// The requested device id does not address the device.
    #[error("invalid device id {requested}: device id is {actual}")]
    InvalidDeviceId { requested: u16, actual: u16 },

    /// The requested socket does not match the device's socket.
    #[error("invalid socket id {requested}: device {device_id} is on socket {actual}")]
    InvalidSocket {
        device_id: u16,
        requested: u32,
        actual: u32,
    },

    /// The device cannot hold any model.
    #[error("device {0} supports no models")]
    NoModelCapacity(u16),

    /// More queue pairs requested than the device offers.
    #[error("device {device_id} supports {max} queue pairs, {requested} requested")]
    TooManyQueuePairs { device_id: u16, requested: u16, max: u16 },
}

impl DeviceError {
    pub fn call(op: DeviceOp, code: i32) -> Self {
        Self::Call { op, code }
    }

    /// Errno-style status code for this error (always negative).
    pub fn code(&self) -> i32 {
        match self {
            Self::Call { code, .. } => *code,
            Self::InvalidDeviceId { .. } | Self::InvalidSocket { .. } => errno::EINVAL,
            Self::NoModelCapacity(_) => errno::ENOSPC,
            Self::TooManyQueuePairs { .. } => errno::EINVAL,
        }
    }

    /// The device operation that failed, if this came from a device call.
    pub fn op(&self) -> Option<DeviceOp> {
        match self {
            Self::Call { op, .. } => Some(*op),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_error_display_and_code() {
        let e = DeviceError::call(DeviceOp::Register, errno::EIO);
        assert_eq!(e.code(), -5);
        assert_eq!(e.op(), Some(DeviceOp::Register));
        assert_eq!(e.to_string(), "register failed with code -5");
    }

    #[test]
    fn test_check_errors_map_to_errno() {
        let e = DeviceError::InvalidDeviceId { requested: 3, actual: 0 };
        assert_eq!(e.code(), errno::EINVAL);
        assert_eq!(e.op(), None);
        assert_eq!(DeviceError::NoModelCapacity(0).code(), errno::ENOSPC);
    }
}
