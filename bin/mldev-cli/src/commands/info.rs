// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `mldev-test info` command: load a model and print its runtime metadata.

use lifecycle::{DeviceSession, HarnessConfig, Model, ModelController};
use mldev::{ModelId, ModelInfo, SimulatedDevice};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, serde::Serialize)]
struct InfoReport {
    path: PathBuf,
    model_id: ModelId,
    effective_batches: u32,
    input_bytes: u64,
    output_bytes: u64,
    info: ModelInfo,
}

pub async fn execute(config: HarnessConfig, sim_batch_size: u32, json: bool) -> anyhow::Result<()> {
    let device = Arc::new(SimulatedDevice::new(config.device_id).with_batch_size(sim_batch_size));
    let session = DeviceSession::open(device, &config)?;
    let report = tokio::task::block_in_place(|| inspect(session, &config))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              mldev-test · Model Info                ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();
    println!("   File:           {}", report.path.display());
    println!("   Handle:         {}", report.model_id);
    println!("   Name:           {}", report.info.name);
    println!("   Version:        {}", report.info.version);
    println!("   Natural batch:  {}", report.info.batch_size);
    println!("   Batches used:   {}", report.effective_batches);
    println!(
        "   Input:          {} B/batch, {} B total",
        report.info.input_size, report.input_bytes
    );
    println!(
        "   Output:         {} B/batch, {} B total",
        report.info.output_size, report.output_bytes
    );
    println!();

    Ok(())
}

/// Loads and unloads the first configured model, then shuts the session
/// down whether or not the model could be inspected.
fn inspect(session: DeviceSession<SimulatedDevice>, config: &HarnessConfig) -> anyhow::Result<InfoReport> {
    let outcome = session
        .controller(config)
        .map_err(anyhow::Error::from)
        .and_then(|controller| describe(&controller, config));
    let shutdown = session.shutdown();

    match (outcome, shutdown) {
        (Ok(report), shutdown) => {
            shutdown?;
            Ok(report)
        }
        (Err(e), Err(shutdown_err)) => {
            tracing::warn!("device shutdown after failed inspection: {shutdown_err}");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
    }
}

fn describe(controller: &ModelController<SimulatedDevice>, config: &HarnessConfig) -> anyhow::Result<InfoReport> {
    let path = config
        .models
        .first()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("no model file given"))?;
    let mut model = Model::new(path);

    controller.load(&mut model)?;
    let (Some(model_id), Some(info), Some(batches)) =
        (model.identity(), model.runtime_info().cloned(), model.effective_batches())
    else {
        anyhow::bail!("model '{}' loaded without metadata", model.path().display());
    };
    let report = InfoReport {
        path: model.path().to_path_buf(),
        model_id,
        effective_batches: batches,
        input_bytes: info.input_bytes(batches),
        output_bytes: info.output_bytes(batches),
        info,
    };
    controller.unload(&mut model)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifecycle::LifecycleError;
    use mldev::DeviceOp;

    fn open(model: PathBuf) -> (Arc<SimulatedDevice>, DeviceSession<SimulatedDevice>, HarnessConfig) {
        let config = HarnessConfig { models: vec![model], ..Default::default() };
        let device = Arc::new(SimulatedDevice::new(0).with_batch_size(4));
        let session = DeviceSession::open(Arc::clone(&device), &config).unwrap();
        (device, session, config)
    }

    #[test]
    fn test_failed_load_still_shuts_down() {
        let (device, session, config) = open(PathBuf::from("/nonexistent/model.bin"));

        let err = inspect(session, &config).unwrap_err();
        assert!(matches!(err.downcast_ref::<LifecycleError>(), Some(LifecycleError::Io { .. })));
        assert!(!device.is_running());
        assert_eq!(device.calls(DeviceOp::Close), 1);
    }

    #[test]
    fn test_inspect_reports_and_unloads() {
        let dir = std::env::temp_dir().join(format!("mldev-cli-info-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("model.bin");
        std::fs::write(&path, vec![7u8; 512]).unwrap();
        let (device, session, config) = open(path);

        let report = inspect(session, &config).unwrap();
        assert_eq!(report.effective_batches, 4);
        assert_eq!(report.info.batch_size, 4);
        assert_eq!(device.registered_models(), 0);
        assert_eq!(device.calls(DeviceOp::Close), 1);
    }
}
