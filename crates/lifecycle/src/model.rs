// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The model entity and its lifecycle states.
//!
//! ```text
//!            load              start
//!  Initial ────────► Loaded ────────► Started
//!     ▲                │  ▲              │
//!     └────────────────┘  └──────────────┘
//!           unload              stop
//!
//!  any failed device call ──► Error (terminal)
//! ```
//!
//! The device handle and runtime metadata live together in one
//! [`Registration`], which exists exactly while the model is `Loaded` or
//! `Started`. Only the controller can change a model's state.

use mldev::{ModelId, ModelInfo};
use std::fmt;
use std::path::{Path, PathBuf};

/// Lifecycle state of a [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ModelState {
    /// Not registered with the device.
    Initial,
    /// Registered, metadata known, not accepting inference.
    Loaded,
    /// Registered and started.
    Started,
    /// A device call failed. The model must be discarded.
    Error,
}

impl ModelState {
    /// Whether the model holds a device registration in this state.
    pub fn is_registered(self) -> bool {
        matches!(self, Self::Loaded | Self::Started)
    }
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initial => "initial",
            Self::Loaded => "loaded",
            Self::Started => "started",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// What the device handed back for a successful load.
#[derive(Debug, Clone)]
struct Registration {
    id: ModelId,
    info: ModelInfo,
    effective_batches: u32,
}

/// One loadable inference model, addressed by its image file.
#[derive(Debug, Clone)]
pub struct Model {
    path: PathBuf,
    state: ModelState,
    registration: Option<Registration>,
}

impl Model {
    /// Creates a model in the `Initial` state.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: ModelState::Initial,
            registration: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    /// Device handle; `Some` only while `Loaded` or `Started`.
    pub fn identity(&self) -> Option<ModelId> {
        self.registration.as_ref().map(|r| r.id)
    }

    /// Device-reported metadata; `Some` only while `Loaded` or `Started`.
    pub fn runtime_info(&self) -> Option<&ModelInfo> {
        self.registration.as_ref().map(|r| &r.info)
    }

    /// Batch count used by inference: the configured override, or the
    /// natural batch size when no override was given.
    pub fn effective_batches(&self) -> Option<u32> {
        self.registration.as_ref().map(|r| r.effective_batches)
    }

    pub(crate) fn mark_loaded(&mut self, id: ModelId, info: ModelInfo, effective_batches: u32) {
        self.registration = Some(Registration {
            id,
            info,
            effective_batches,
        });
        self.state = ModelState::Loaded;
    }

    /// Moves between registered states, or back to `Initial`.
    pub(crate) fn mark(&mut self, state: ModelState) {
        debug_assert!(state != ModelState::Error, "use mark_error");
        if !state.is_registered() {
            self.registration = None;
        }
        self.state = state;
    }

    /// Enters `Error`, dropping the local copy of the device handle.
    pub(crate) fn mark_error(&mut self) {
        self.registration = None;
        self.state = ModelState::Error;
    }
}

/// Derives the effective batch count: a nonzero override wins.
pub fn effective_batch_count(batches_override: u32, natural_batch_size: u32) -> u32 {
    if batches_override == 0 {
        natural_batch_size
    } else {
        batches_override
    }
}
