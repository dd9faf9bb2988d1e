// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Device bring-up and teardown around the model lifecycle.
//!
//! ```text
//! DeviceSession::open   option checks → capability check → configure → start
//!        │
//!        ├── controller()   ModelController sharing the device
//!        ▼
//! DeviceSession::shutdown   stop → close
//! ```

use crate::{HarnessConfig, LifecycleError, ModelController};
use memory_manager::StagingPool;
use mldev::{DeviceConfig, DeviceError, DeviceInfo, MlDevice};
use std::sync::Arc;

/// A configured, running device.
pub struct DeviceSession<D: MlDevice + ?Sized> {
    device: Arc<D>,
    info: DeviceInfo,
}

impl<D: MlDevice + ?Sized> DeviceSession<D> {
    /// Checks `config` against the device, then configures and starts it.
    pub fn open(device: Arc<D>, config: &HarnessConfig) -> Result<Self, LifecycleError> {
        let info = device.info();
        check_options(&info, config)?;

        let dev_config = DeviceConfig {
            socket_id: config.socket_id.or(info.socket_id),
            nb_models: info.max_models,
            nb_queue_pairs: config.queue_pairs,
        };
        device.configure(&dev_config).map_err(|e| {
            tracing::error!(device = info.device_id, "failed to configure ML device: {e}");
            e
        })?;
        device.start_device().map_err(|e| {
            tracing::error!(device = info.device_id, "failed to start ML device: {e}");
            e
        })?;

        tracing::info!(
            device = info.device_id,
            driver = %info.driver_name,
            max_models = info.max_models,
            min_align = info.min_align_size,
            "ML device started"
        );
        Ok(Self { device, info })
    }

    /// Device capabilities captured at open.
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn device(&self) -> &Arc<D> {
        &self.device
    }

    /// Builds a controller whose staging pool follows `config`.
    pub fn controller(&self, config: &HarnessConfig) -> Result<ModelController<D>, LifecycleError> {
        let budget = config.parse_budget()?;
        let socket = config.socket_id.or(self.info.socket_id);
        let pool = StagingPool::with_socket(budget, socket);
        Ok(ModelController::new(Arc::clone(&self.device), pool, config.batches))
    }

    /// Stops and closes the device. Both steps are attempted; the first
    /// failure is returned.
    pub fn shutdown(self) -> Result<(), LifecycleError> {
        let id = self.info.device_id;
        let stopped = self.device.stop_device();
        if let Err(e) = &stopped {
            tracing::error!(device = id, "failed to stop ML device: {e}");
        }
        let closed = self.device.close();
        if let Err(e) = &closed {
            tracing::error!(device = id, "failed to close ML device: {e}");
        }
        stopped.and(closed)?;
        tracing::info!(device = id, "ML device closed");
        Ok(())
    }
}

impl<D: MlDevice + ?Sized> std::fmt::Debug for DeviceSession<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession").field("info", &self.info).finish()
    }
}

/// Validates harness options against device capabilities.
pub fn check_options(info: &DeviceInfo, config: &HarnessConfig) -> Result<(), DeviceError> {
    if config.device_id != info.device_id {
        return Err(DeviceError::InvalidDeviceId {
            requested: config.device_id,
            actual: info.device_id,
        });
    }
    if let (Some(requested), Some(actual)) = (config.socket_id, info.socket_id) {
        if requested != actual {
            return Err(DeviceError::InvalidSocket {
                device_id: info.device_id,
                requested,
                actual,
            });
        }
    }
    if info.max_models == 0 {
        return Err(DeviceError::NoModelCapacity(info.device_id));
    }
    if config.queue_pairs > info.max_queue_pairs {
        return Err(DeviceError::TooManyQueuePairs {
            device_id: info.device_id,
            requested: config.queue_pairs,
            max: info.max_queue_pairs,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mldev::{errno, DeviceOp, SimulatedDevice};

    fn config() -> HarnessConfig {
        HarnessConfig {
            models: vec!["m.bin".into()],
            staging_budget: "16M".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_open_and_shutdown() {
        let dev = Arc::new(SimulatedDevice::new(0));
        let session = DeviceSession::open(Arc::clone(&dev), &config()).unwrap();
        assert!(dev.is_running());
        assert_eq!(session.info().device_id, 0);

        session.shutdown().unwrap();
        assert!(!dev.is_running());
        assert_eq!(dev.calls(DeviceOp::Close), 1);
    }

    #[test]
    fn test_wrong_device_id() {
        let dev = Arc::new(SimulatedDevice::new(0));
        let cfg = HarnessConfig { device_id: 2, ..config() };
        let err = DeviceSession::open(Arc::clone(&dev), &cfg).unwrap_err();
        assert_eq!(err.code(), Some(errno::EINVAL));
        assert_eq!(dev.calls(DeviceOp::Configure), 0);
    }

    #[test]
    fn test_socket_mismatch() {
        let info = SimulatedDevice::new(0).with_socket(Some(1)).info();
        let cfg = HarnessConfig { socket_id: Some(0), ..config() };
        assert!(matches!(
            check_options(&info, &cfg),
            Err(DeviceError::InvalidSocket { requested: 0, actual: 1, .. })
        ));

        // An unknown device socket accepts any request.
        let any = SimulatedDevice::new(0).with_socket(None).info();
        assert!(check_options(&any, &cfg).is_ok());
    }

    #[test]
    fn test_no_model_capacity() {
        let dev = Arc::new(SimulatedDevice::new(0).with_max_models(0));
        let err = DeviceSession::open(dev, &config()).unwrap_err();
        assert!(matches!(err, LifecycleError::Session(DeviceError::NoModelCapacity(0))));
    }

    #[test]
    fn test_too_many_queue_pairs() {
        let dev = Arc::new(SimulatedDevice::new(0));
        let cfg = HarnessConfig { queue_pairs: 5, ..config() };
        let err = DeviceSession::open(Arc::clone(&dev), &cfg).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Session(DeviceError::TooManyQueuePairs { requested: 5, max: 4, .. })
        ));
        assert_eq!(dev.calls(DeviceOp::Configure), 0);
    }

    #[test]
    fn test_configure_failure_propagates() {
        let dev = Arc::new(SimulatedDevice::new(0));
        dev.fail_on(DeviceOp::Configure, errno::EIO);
        let err = DeviceSession::open(Arc::clone(&dev), &config()).unwrap_err();
        assert_eq!(err.code(), Some(errno::EIO));
        assert!(!dev.is_running());
    }

    #[test]
    fn test_controller_pool_follows_config() {
        let dev = Arc::new(SimulatedDevice::new(0).with_socket(Some(1)));
        let session = DeviceSession::open(dev, &config()).unwrap();
        let ctl = session.controller(&config()).unwrap();
        assert_eq!(ctl.pool().budget().as_mb(), 16);
        assert_eq!(ctl.pool().socket_id(), Some(1));
    }

    #[test]
    fn test_shutdown_reports_stop_failure() {
        let dev = Arc::new(SimulatedDevice::new(0));
        let session = DeviceSession::open(Arc::clone(&dev), &config()).unwrap();
        dev.fail_on(DeviceOp::DeviceStop, errno::EBUSY);

        let err = session.shutdown().unwrap_err();
        assert_eq!(err.code(), Some(errno::EBUSY));
        // Close is still attempted.
        assert_eq!(dev.calls(DeviceOp::Close), 1);
    }
}
