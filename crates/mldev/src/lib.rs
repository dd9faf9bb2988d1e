// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # mldev
//!
//! The capability interface of an ML accelerator device, as consumed by the
//! model lifecycle controller.
//!
//! # Key Components
//!
//! - [`MlDevice`] — register, query, start, stop and release models, plus
//!   device bring-up (configure, start, stop, close).
//! - [`DeviceInfo`] / [`ModelInfo`] — device-wide and per-model metadata.
//! - [`DeviceError`] — a failed call, carrying the operation and an
//!   errno-style status code.
//! - [`SimulatedDevice`] — a software device with fault injection and call
//!   counters, used by the CLI and tests.
//!
//! # Example
//! ```
//! use mldev::{DeviceConfig, MlDevice, SimulatedDevice};
//!
//! let dev = SimulatedDevice::new(0);
//! let info = dev.info();
//! dev.configure(&DeviceConfig {
//!     socket_id: info.socket_id,
//!     nb_models: info.max_models,
//!     nb_queue_pairs: 1,
//! })
//! .unwrap();
//! dev.start_device().unwrap();
//! ```

mod device;
pub mod error;
mod info;
mod simulated;

pub use device::MlDevice;
pub use error::{errno, DeviceError};
pub use info::{DeviceConfig, DeviceInfo, DeviceOp, ModelId, ModelInfo};
pub use simulated::SimulatedDevice;
