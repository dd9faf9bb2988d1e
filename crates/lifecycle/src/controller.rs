// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The model lifecycle controller.
//!
//! | Operation | Valid from        | No-op in | Success  |
//! |-----------|-------------------|----------|----------|
//! | `load`    | Initial, Loaded   | Loaded   | Loaded   |
//! | `unload`  | Initial, Loaded   | Initial  | Initial  |
//! | `start`   | Loaded, Started   | Started  | Started  |
//! | `stop`    | Loaded, Started   | Loaded   | Loaded   |
//!
//! A failed device call moves the model to `Error`. Precondition, I/O and
//! allocation failures happen before the device is contacted and leave the
//! model as it was.
//!
//! Every operation takes `&mut Model`, so the state check and the state
//! update form one critical section per model. One controller can be
//! shared by many threads, each driving its own models.

use crate::error::Operation;
use crate::model::effective_batch_count;
use crate::{LifecycleError, Model, ModelState};
use memory_manager::{StagingBuffer, StagingPool};
use mldev::{DeviceError, MlDevice, ModelId};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::Arc;

/// Drives models through load, start, stop and unload on one device.
///
/// # Example
/// ```no_run
/// use lifecycle::{Model, ModelController, ModelState};
/// use memory_manager::{MemoryBudget, StagingPool};
/// use mldev::SimulatedDevice;
/// use std::sync::Arc;
///
/// # fn example() -> Result<(), lifecycle::LifecycleError> {
/// let device = Arc::new(SimulatedDevice::new(0));
/// let controller = ModelController::new(device, StagingPool::new(MemoryBudget::from_mb(64)), 0);
///
/// let mut model = Model::new("./models/resnet.bin");
/// controller.load(&mut model)?;
/// controller.start(&mut model)?;
/// assert_eq!(model.state(), ModelState::Started);
/// # Ok(())
/// # }
/// ```
pub struct ModelController<D: MlDevice + ?Sized> {
    device: Arc<D>,
    pool: StagingPool,
    /// Device minimum alignment, captured at construction.
    min_align: usize,
    /// Configured batch count; 0 means use the natural batch size.
    batches_override: u32,
}

impl<D: MlDevice + ?Sized> ModelController<D> {
    /// Creates a controller for `device`, staging images in `pool`.
    pub fn new(device: Arc<D>, pool: StagingPool, batches_override: u32) -> Self {
        let min_align = device.info().min_align_size;
        Self {
            device,
            pool,
            min_align,
            batches_override,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// The staging pool used by `load`.
    pub fn pool(&self) -> &StagingPool {
        &self.pool
    }

    /// Reads the model image, registers it with the device and records the
    /// device-reported metadata.
    pub fn load(&self, model: &mut Model) -> Result<(), LifecycleError> {
        match model.state() {
            ModelState::Loaded => {
                tracing::debug!(path = %model.path().display(), "load: already loaded");
                return Ok(());
            }
            ModelState::Initial => {}
            state => return Err(invalid_state(Operation::Load, state, model)),
        }

        let file = File::open(model.path()).map_err(|source| io_error(model.path(), source))?;
        let len = file
            .metadata()
            .map_err(|source| io_error(model.path(), source))?
            .len();
        let len = usize::try_from(len).map_err(|_| {
            io_error(
                model.path(),
                std::io::Error::new(ErrorKind::InvalidData, "model image does not fit in memory"),
            )
        })?;

        self.load_image(model, file, len)
    }

    /// Releases the model's device registration.
    pub fn unload(&self, model: &mut Model) -> Result<(), LifecycleError> {
        self.transition(model, Operation::Unload, ModelState::Loaded, ModelState::Initial, |dev, id| {
            dev.release(id)
        })
    }

    /// Starts a loaded model.
    pub fn start(&self, model: &mut Model) -> Result<(), LifecycleError> {
        self.transition(model, Operation::Start, ModelState::Loaded, ModelState::Started, |dev, id| {
            dev.start(id)
        })
    }

    /// Stops a started model.
    pub fn stop(&self, model: &mut Model) -> Result<(), LifecycleError> {
        self.transition(model, Operation::Stop, ModelState::Started, ModelState::Loaded, |dev, id| {
            dev.stop(id)
        })
    }

    /// Stages `len` bytes from `reader` and registers them. The model must
    /// be `Initial`.
    pub(crate) fn load_image<R: Read>(
        &self,
        model: &mut Model,
        reader: R,
        len: usize,
    ) -> Result<(), LifecycleError> {
        // The reader (the file handle) is consumed and closed by staging.
        let staged = self.stage(model.path(), reader, len)?;

        let registered = self.device.register(staged.as_slice());
        drop(staged);

        let id = match registered {
            Ok(id) => id,
            Err(source) => return Err(self.device_failure(Operation::Load, model, source)),
        };

        let info = match self.device.model_info(id) {
            Ok(info) => info,
            Err(source) => {
                // Roll back so the device does not keep an orphaned model.
                if let Err(e) = self.device.release(id) {
                    tracing::warn!(
                        path = %model.path().display(),
                        %id,
                        "rollback release after failed info query also failed: {e}"
                    );
                }
                return Err(self.device_failure(Operation::Load, model, source));
            }
        };

        let batches = effective_batch_count(self.batches_override, info.batch_size);
        tracing::info!(
            path = %model.path().display(),
            %id,
            name = %info.name,
            natural_batch = info.batch_size,
            batches,
            "model loaded"
        );
        model.mark_loaded(id, info, batches);
        Ok(())
    }

    /// Copies exactly `len` bytes into a fresh staging buffer.
    fn stage<R: Read>(&self, path: &Path, mut reader: R, len: usize) -> Result<StagingBuffer, LifecycleError> {
        let mut buffer = self.pool.allocate(len, self.min_align).map_err(|source| {
            tracing::error!(path = %path.display(), "failed to allocate memory for model: {source}");
            LifecycleError::Allocation {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let read = read_full(&mut reader, buffer.as_mut_slice()).map_err(|source| io_error(path, source))?;
        if read != len {
            tracing::error!(path = %path.display(), expected = len, read, "failed to read model file");
            return Err(LifecycleError::ShortRead {
                path: path.to_path_buf(),
                expected: len,
                read,
            });
        }

        tracing::debug!(path = %path.display(), len, align = buffer.alignment(), "model image staged");
        Ok(buffer)
    }

    /// Shared protocol of unload, start and stop: one device call on the
    /// registered handle.
    fn transition<F>(
        &self,
        model: &mut Model,
        op: Operation,
        from: ModelState,
        to: ModelState,
        call: F,
    ) -> Result<(), LifecycleError>
    where
        F: FnOnce(&D, ModelId) -> Result<(), DeviceError>,
    {
        let state = model.state();
        if state == to {
            tracing::debug!(path = %model.path().display(), %op, "already {to}");
            return Ok(());
        }
        let id = match model.identity() {
            Some(id) if state == from => id,
            _ => return Err(invalid_state(op, state, model)),
        };

        call(&*self.device, id).map_err(|source| self.device_failure(op, model, source))?;

        model.mark(to);
        tracing::info!(path = %model.path().display(), %id, "model {to}");
        Ok(())
    }

    fn device_failure(&self, op: Operation, model: &mut Model, source: DeviceError) -> LifecycleError {
        tracing::error!(
            path = %model.path().display(),
            device = self.device.info().device_id,
            %op,
            code = source.code(),
            "failed to {op} model: {source}"
        );
        model.mark_error();
        LifecycleError::Device {
            op,
            path: model.path().to_path_buf(),
            source,
        }
    }
}

impl<D: MlDevice + ?Sized> std::fmt::Debug for ModelController<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelController")
            .field("device", &self.device)
            .field("pool", &self.pool)
            .field("min_align", &self.min_align)
            .field("batches_override", &self.batches_override)
            .finish()
    }
}

fn invalid_state(op: Operation, state: ModelState, model: &Model) -> LifecycleError {
    tracing::error!(path = %model.path().display(), %op, %state, "invalid model state");
    LifecycleError::InvalidState {
        op,
        state,
        path: model.path().to_path_buf(),
    }
}

fn io_error(path: &Path, source: std::io::Error) -> LifecycleError {
    tracing::error!(path = %path.display(), "failed to read model file: {source}");
    LifecycleError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Reads until `buf` is full or the reader is exhausted; returns bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
