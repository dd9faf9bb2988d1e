// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `mldev-test run` command: lifecycle round trips, one lane per model.
//!
//! ```text
//! DeviceSession::open
//!     │
//!     ├── lane 0: load → start → stop → unload  (× repetitions)
//!     ├── lane 1: load → start → stop → unload
//!     │   ...
//!     ▼
//! DeviceSession::shutdown
//! ```

use lifecycle::{DeviceSession, HarnessConfig, LifecycleError, Model, ModelController, ModelState};
use mldev::SimulatedDevice;
use std::path::PathBuf;
use std::sync::Arc;

/// Outcome of one model lane.
struct LaneReport {
    path: PathBuf,
    state: ModelState,
    batches: Option<u32>,
    completed: u32,
    error: Option<LifecycleError>,
}

pub async fn execute(config: HarnessConfig, sim_batch_size: u32, repetitions: u32) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            mldev-test · Lifecycle Runner            ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    println!("  Config:");
    println!("   Device:   {}", config.device_id);
    println!(
        "   Socket:   {}",
        config.socket_id.map_or_else(|| "device default".to_string(), |s| s.to_string())
    );
    println!(
        "   Batches:  {}",
        if config.batches == 0 { "natural".to_string() } else { config.batches.to_string() }
    );
    println!("   Staging:  {}", config.staging_budget);
    println!("   Models:   {}", config.models.len());
    println!("   Rounds:   {repetitions}");
    println!();

    let device = Arc::new(SimulatedDevice::new(config.device_id).with_batch_size(sim_batch_size));
    let session = DeviceSession::open(device, &config)?;
    let controller = Arc::new(session.controller(&config)?);

    let mut lanes = Vec::with_capacity(config.models.len());
    for path in &config.models {
        let controller = Arc::clone(&controller);
        let path = path.clone();
        lanes.push(tokio::task::spawn_blocking(move || run_lane(&controller, path, repetitions)));
    }

    let mut reports = Vec::with_capacity(lanes.len());
    for lane in lanes {
        reports.push(lane.await?);
    }

    print_reports(&reports, repetitions);
    println!("  {}", controller.pool().stats().summary());
    println!();

    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    drop(controller);
    if let Err(e) = session.shutdown() {
        tracing::warn!("device shutdown failed: {e}");
        if failed == 0 {
            return Err(e.into());
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} models failed", reports.len());
    }
    Ok(())
}

/// Runs `repetitions` round trips on one model, stopping at the first error.
fn run_lane(controller: &ModelController<SimulatedDevice>, path: PathBuf, repetitions: u32) -> LaneReport {
    let mut model = Model::new(path);
    let mut batches = None;
    let mut completed = 0;

    let mut round_trip = |model: &mut Model| -> Result<(), LifecycleError> {
        controller.load(model)?;
        batches = model.effective_batches();
        controller.start(model)?;
        controller.stop(model)?;
        controller.unload(model)
    };

    let mut error = None;
    for _ in 0..repetitions {
        match round_trip(&mut model) {
            Ok(()) => completed += 1,
            Err(e) => {
                error = Some(e);
                break;
            }
        }
    }

    LaneReport {
        path: model.path().to_path_buf(),
        state: model.state(),
        batches,
        completed,
        error,
    }
}

fn print_reports(reports: &[LaneReport], repetitions: u32) {
    println!("  {:<40} {:>8} {:>8} {:>9}", "Model", "Batches", "Rounds", "State");
    println!("  {}", "-".repeat(68));
    for r in reports {
        println!(
            "  {:<40} {:>8} {:>8} {:>9}",
            truncate(&r.path.display().to_string(), 40),
            r.batches.map_or_else(|| "-".to_string(), |b| b.to_string()),
            format!("{}/{repetitions}", r.completed),
            r.state.to_string(),
        );
        if let Some(e) = &r.error {
            println!("    error: {e}");
        }
    }
    println!();
}

/// Keeps the tail of a long path, which is the informative part.
fn truncate(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else {
        let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
        format!("...{tail}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_tail() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("/very/long/path/model.bin", 12), "...model.bin");
    }

    #[test]
    fn test_lane_stops_at_first_error() {
        let config = HarnessConfig {
            models: vec![PathBuf::from("/nonexistent/model.bin")],
            ..Default::default()
        };
        let session = DeviceSession::open(Arc::new(SimulatedDevice::new(0)), &config).unwrap();
        let controller = session.controller(&config).unwrap();

        let report = run_lane(&controller, config.models[0].clone(), 3);
        assert_eq!(report.completed, 0);
        assert_eq!(report.state, ModelState::Initial);
        assert!(matches!(report.error, Some(LifecycleError::Io { .. })));
    }
}
