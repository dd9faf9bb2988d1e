// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The device capability trait.

use crate::{DeviceConfig, DeviceError, DeviceInfo, ModelId, ModelInfo};

/// Capability interface of one ML accelerator device.
///
/// Implementations wrap a driver; every call is blocking and synchronous.
/// The trait is object safe so callers can hold an `Arc<dyn MlDevice>`.
///
/// # Contract
/// - [`register`](MlDevice::register) must have copied or consumed `image`
///   by the time it returns. Callers free the buffer right after the call.
/// - A [`ModelId`] is only meaningful between a successful `register` and
///   the matching successful [`release`](MlDevice::release).
pub trait MlDevice: Send + Sync + std::fmt::Debug {
    /// Device-wide capabilities.
    fn info(&self) -> DeviceInfo;

    fn configure(&self, config: &DeviceConfig) -> Result<(), DeviceError>;

    fn start_device(&self) -> Result<(), DeviceError>;

    fn stop_device(&self) -> Result<(), DeviceError>;

    fn close(&self) -> Result<(), DeviceError>;

    /// Registers a model image and returns its handle.
    fn register(&self, image: &[u8]) -> Result<ModelId, DeviceError>;

    /// Queries runtime metadata of a registered model.
    fn model_info(&self, id: ModelId) -> Result<ModelInfo, DeviceError>;

    /// Makes a registered model ready for inference.
    fn start(&self, id: ModelId) -> Result<(), DeviceError>;

    fn stop(&self, id: ModelId) -> Result<(), DeviceError>;

    /// Releases a registered, stopped model.
    fn release(&self, id: ModelId) -> Result<(), DeviceError>;
}
