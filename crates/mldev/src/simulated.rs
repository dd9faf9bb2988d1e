// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! A software ML device.
//!
//! [`SimulatedDevice`] implements [`MlDevice`] without hardware. It keeps
//! its own per-model state, so driving it in the wrong order fails the way
//! a real driver would. It also supports:
//!
//! - **Fault injection**: [`fail_on`](SimulatedDevice::fail_on) makes every
//!   call of one operation return a chosen status code until cleared.
//! - **Call accounting**: [`calls`](SimulatedDevice::calls) counts how often
//!   each operation reached the device, including failed calls.

use crate::error::errno;
use crate::{DeviceConfig, DeviceError, DeviceInfo, DeviceOp, MlDevice, ModelId, ModelInfo};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Default minimum alignment reported by the simulated device.
const DEFAULT_MIN_ALIGN: usize = 128;

#[derive(Debug)]
struct SimModel {
    info: ModelInfo,
    started: bool,
}

#[derive(Debug, Default)]
struct SimState {
    configured: Option<DeviceConfig>,
    running: bool,
    next_id: u16,
    models: HashMap<ModelId, SimModel>,
    faults: HashMap<DeviceOp, i32>,
    calls: HashMap<DeviceOp, u64>,
    registered_bytes: u64,
}

/// Simulated ML device with fault injection and call counters.
///
/// # Example
/// ```
/// use mldev::{DeviceConfig, MlDevice, SimulatedDevice};
///
/// let dev = SimulatedDevice::new(0).with_batch_size(8);
/// dev.configure(&DeviceConfig { socket_id: None, nb_models: 4, nb_queue_pairs: 1 }).unwrap();
///
/// let id = dev.register(b"model image").unwrap();
/// assert_eq!(dev.model_info(id).unwrap().batch_size, 8);
/// dev.release(id).unwrap();
/// ```
#[derive(Debug)]
pub struct SimulatedDevice {
    info: DeviceInfo,
    batch_size: u32,
    input_size: u64,
    output_size: u64,
    state: Mutex<SimState>,
}

impl SimulatedDevice {
    pub fn new(device_id: u16) -> Self {
        Self {
            info: DeviceInfo {
                device_id,
                driver_name: "ml_sim".into(),
                max_models: 8,
                max_queue_pairs: 4,
                min_align_size: DEFAULT_MIN_ALIGN,
                socket_id: Some(0),
            },
            batch_size: 1,
            input_size: 4096,
            output_size: 64,
            state: Mutex::new(SimState::default()),
        }
    }

    pub fn with_max_models(mut self, max_models: u16) -> Self {
        self.info.max_models = max_models;
        self
    }

    pub fn with_min_align(mut self, align: usize) -> Self {
        self.info.min_align_size = align;
        self
    }

    pub fn with_socket(mut self, socket_id: Option<u32>) -> Self {
        self.info.socket_id = socket_id;
        self
    }

    /// Natural batch size reported for every registered model.
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Per-batch quantized input/output sizes reported for every model.
    pub fn with_io_sizes(mut self, input_size: u64, output_size: u64) -> Self {
        self.input_size = input_size;
        self.output_size = output_size;
        self
    }

    /// Makes every subsequent `op` call fail with `code` until cleared.
    pub fn fail_on(&self, op: DeviceOp, code: i32) {
        self.lock().faults.insert(op, code);
    }

    pub fn clear_fault(&self, op: DeviceOp) {
        self.lock().faults.remove(&op);
    }

    /// Number of times `op` reached the device.
    pub fn calls(&self, op: DeviceOp) -> u64 {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Number of models currently registered.
    pub fn registered_models(&self) -> usize {
        self.lock().models.len()
    }

    /// Total image bytes consumed by successful registrations.
    pub fn registered_bytes(&self) -> u64 {
        self.lock().registered_bytes
    }

    pub fn is_started(&self, id: ModelId) -> bool {
        self.lock().models.get(&id).is_some_and(|m| m.started)
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // A panic while holding the lock cannot leave SimState half-updated
        // in a way that matters to callers, so recover from poisoning.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Counts the call and applies any injected fault.
    fn enter(&self, op: DeviceOp) -> Result<MutexGuard<'_, SimState>, DeviceError> {
        let mut state = self.lock();
        *state.calls.entry(op).or_insert(0) += 1;
        if let Some(&code) = state.faults.get(&op) {
            tracing::debug!(device = self.info.device_id, %op, code, "injected fault");
            return Err(DeviceError::call(op, code));
        }
        Ok(state)
    }
}

impl MlDevice for SimulatedDevice {
    fn info(&self) -> DeviceInfo {
        self.info.clone()
    }

    fn configure(&self, config: &DeviceConfig) -> Result<(), DeviceError> {
        let mut state = self.enter(DeviceOp::Configure)?;
        if state.running
            || config.nb_models == 0
            || config.nb_models > self.info.max_models
            || config.nb_queue_pairs > self.info.max_queue_pairs
        {
            return Err(DeviceError::call(DeviceOp::Configure, errno::EINVAL));
        }
        state.configured = Some(config.clone());
        Ok(())
    }

    fn start_device(&self) -> Result<(), DeviceError> {
        let mut state = self.enter(DeviceOp::DeviceStart)?;
        if state.configured.is_none() {
            return Err(DeviceError::call(DeviceOp::DeviceStart, errno::EINVAL));
        }
        state.running = true;
        Ok(())
    }

    fn stop_device(&self) -> Result<(), DeviceError> {
        let mut state = self.enter(DeviceOp::DeviceStop)?;
        if state.models.values().any(|m| m.started) {
            return Err(DeviceError::call(DeviceOp::DeviceStop, errno::EBUSY));
        }
        state.running = false;
        Ok(())
    }

    fn close(&self) -> Result<(), DeviceError> {
        let mut state = self.enter(DeviceOp::Close)?;
        if state.running || !state.models.is_empty() {
            return Err(DeviceError::call(DeviceOp::Close, errno::EBUSY));
        }
        state.configured = None;
        Ok(())
    }

    fn register(&self, image: &[u8]) -> Result<ModelId, DeviceError> {
        let mut state = self.enter(DeviceOp::Register)?;
        let capacity = match &state.configured {
            Some(config) => config.nb_models,
            None => return Err(DeviceError::call(DeviceOp::Register, errno::EINVAL)),
        };
        if image.is_empty() {
            return Err(DeviceError::call(DeviceOp::Register, errno::EINVAL));
        }
        if state.models.len() >= usize::from(capacity) {
            return Err(DeviceError::call(DeviceOp::Register, errno::ENOSPC));
        }

        // Capacity is below 65536, so a free handle always exists.
        let mut next = state.next_id;
        while state.models.contains_key(&ModelId(next)) {
            next = next.wrapping_add(1);
        }
        let id = ModelId(next);
        state.next_id = next.wrapping_add(1);
        let info = ModelInfo {
            name: format!("sim-model-{}", id.0),
            version: "1.0.0".into(),
            batch_size: self.batch_size,
            input_size: self.input_size,
            output_size: self.output_size,
        };
        state.models.insert(id, SimModel { info, started: false });
        state.registered_bytes += image.len() as u64;
        tracing::debug!(device = self.info.device_id, %id, bytes = image.len(), "model registered");
        Ok(id)
    }

    fn model_info(&self, id: ModelId) -> Result<ModelInfo, DeviceError> {
        let state = self.enter(DeviceOp::ModelInfo)?;
        state
            .models
            .get(&id)
            .map(|m| m.info.clone())
            .ok_or_else(|| DeviceError::call(DeviceOp::ModelInfo, errno::ENOENT))
    }

    fn start(&self, id: ModelId) -> Result<(), DeviceError> {
        let mut state = self.enter(DeviceOp::Start)?;
        let running = state.running;
        let model = state
            .models
            .get_mut(&id)
            .ok_or_else(|| DeviceError::call(DeviceOp::Start, errno::ENOENT))?;
        if !running {
            return Err(DeviceError::call(DeviceOp::Start, errno::EINVAL));
        }
        if model.started {
            return Err(DeviceError::call(DeviceOp::Start, errno::EBUSY));
        }
        model.started = true;
        Ok(())
    }

    fn stop(&self, id: ModelId) -> Result<(), DeviceError> {
        let mut state = self.enter(DeviceOp::Stop)?;
        let model = state
            .models
            .get_mut(&id)
            .ok_or_else(|| DeviceError::call(DeviceOp::Stop, errno::ENOENT))?;
        if !model.started {
            return Err(DeviceError::call(DeviceOp::Stop, errno::EINVAL));
        }
        model.started = false;
        Ok(())
    }

    fn release(&self, id: ModelId) -> Result<(), DeviceError> {
        let mut state = self.enter(DeviceOp::Release)?;
        match state.models.get(&id) {
            None => Err(DeviceError::call(DeviceOp::Release, errno::ENOENT)),
            Some(m) if m.started => Err(DeviceError::call(DeviceOp::Release, errno::EBUSY)),
            Some(_) => {
                state.models.remove(&id);
                tracing::debug!(device = self.info.device_id, %id, "model released");
                Ok(())
            }
        }
    }
}
