// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `mldev-test device` command: print device capabilities.

use mldev::{MlDevice, SimulatedDevice};

pub async fn execute(device_id: u16, json: bool) -> anyhow::Result<()> {
    let info = SimulatedDevice::new(device_id).info();

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("╔══════════════════════════════════════════════════════╗");
    println!("║             mldev-test · Device Info                ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();
    println!("   Device id:      {}", info.device_id);
    println!("   Driver:         {}", info.driver_name);
    println!("   Max models:     {}", info.max_models);
    println!("   Max queues:     {}", info.max_queue_pairs);
    println!("   Min alignment:  {} B", info.min_align_size);
    match info.socket_id {
        Some(socket) => println!("   Socket:         {socket}"),
        None => println!("   Socket:         any"),
    }
    println!();

    Ok(())
}
