// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Example: drive one model through its whole lifecycle, then show what a
//! failed device call does to a second model.
//!
//! ```bash
//! cargo run -p lifecycle --example round_trip
//! ```

use lifecycle::{DeviceSession, HarnessConfig, Model};
use mldev::{errno, DeviceOp, SimulatedDevice};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let path = std::env::temp_dir().join("lifecycle-example.bin");
    std::fs::write(&path, vec![0x5Au8; 64 * 1024])?;

    let config = HarnessConfig {
        batches: 0,
        models: vec![path.clone()],
        ..Default::default()
    };
    config.validate()?;

    let device = Arc::new(SimulatedDevice::new(0).with_batch_size(8));
    let session = DeviceSession::open(Arc::clone(&device), &config)?;
    let controller = session.controller(&config)?;

    let mut model = Model::new(&path);
    println!("{:<8} {}", "initial", model.state());

    controller.load(&mut model)?;
    println!(
        "{:<8} {} (id {}, batches {})",
        "load",
        model.state(),
        model.identity().map(|id| id.to_string()).unwrap_or_default(),
        model.effective_batches().unwrap_or_default(),
    );

    controller.start(&mut model)?;
    println!("{:<8} {}", "start", model.state());
    controller.stop(&mut model)?;
    println!("{:<8} {}", "stop", model.state());
    controller.unload(&mut model)?;
    println!("{:<8} {}", "unload", model.state());

    // A rejected registration parks the model in Error.
    device.fail_on(DeviceOp::Register, errno::EIO);
    let mut doomed = Model::new(&path);
    if let Err(e) = controller.load(&mut doomed) {
        println!("\nload failed: {e}\nstate is now {}", doomed.state());
    }

    println!("\n{}", controller.pool().stats().summary());
    session.shutdown()?;
    Ok(())
}
