// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # lifecycle
//!
//! Guarded lifecycle of inference models on an ML device.
//!
//! The crate takes:
//! - An [`MlDevice`](mldev::MlDevice) from `mldev`.
//! - A [`StagingPool`](memory_manager::StagingPool) from `memory-manager`.
//! - A [`HarnessConfig`] naming the device, socket, batch override and model files.
//!
//! and moves each [`Model`] through its state machine:
//! ```text
//! Initial ─load─► Loaded ─start─► Started ─stop─► Loaded ─unload─► Initial
//! ```
//! Any failed device call parks the model in `Error`.
//!
//! # Threading
//! Operations borrow the model mutably, so a model is driven by one thread
//! at a time. Different models may share one [`ModelController`] across
//! threads; nothing is shared between them except the device and the
//! staging budget.

mod config;
mod controller;
mod error;
mod model;
mod session;

pub use config::HarnessConfig;
pub use controller::ModelController;
pub use error::{LifecycleError, Operation};
pub use model::{effective_batch_count, Model, ModelState};
pub use session::{check_options, DeviceSession};
