// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// FrameConst Sandbox
// Headless binary driving the frame constants for a number of frames.
//
// FRAMECONST_BACKEND   memory (default) | wgpu
// FRAMECONST_FRAMES    number of frames to run (default 300)
// FRAMECONST_SETTINGS  path to a JSON UniformSettings file

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use frameconst_core::renderer::{GraphicsDevice, MemoryDevice};
use frameconst_core::uniform::{
    wgsl_declarations, FrameState, UniformBlockKind, UniformConstants, UniformSettings,
};
use frameconst_infra::graphics::wgpu::PowerPreference;
use frameconst_infra::{WgpuDevice, WgpuGraphicsContext};

const DEFAULT_FRAMES: u64 = 300;

fn load_settings() -> Result<UniformSettings> {
    match std::env::var("FRAMECONST_SETTINGS") {
        Ok(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings file '{path}'"))?;
            UniformSettings::from_json(&json)
                .with_context(|| format!("Failed to parse settings file '{path}'"))
        }
        Err(_) => Ok(UniformSettings::default()),
    }
}

fn frame_count() -> Result<u64> {
    match std::env::var("FRAMECONST_FRAMES") {
        Ok(value) => value
            .parse()
            .with_context(|| format!("FRAMECONST_FRAMES is not a number: '{value}'")),
        Err(_) => Ok(DEFAULT_FRAMES),
    }
}

fn create_device() -> Result<Box<dyn GraphicsDevice>> {
    let backend = std::env::var("FRAMECONST_BACKEND").unwrap_or_else(|_| "memory".to_string());
    match backend.as_str() {
        "memory" => Ok(Box::new(MemoryDevice::default())),
        "wgpu" => {
            let context =
                WgpuGraphicsContext::new_headless_blocking(PowerPreference::HighPerformance)?;
            Ok(Box::new(WgpuDevice::new(Arc::new(Mutex::new(context)))))
        }
        other => Err(anyhow!(
            "Unknown FRAMECONST_BACKEND '{other}', expected 'memory' or 'wgpu'"
        )),
    }
}

fn run(device: &dyn GraphicsDevice, settings: UniformSettings, frames: u64) -> Result<()> {
    let adapter = device.get_adapter_info();
    log::info!(
        "Running {frames} frames on \"{}\" ({:?})",
        adapter.name,
        adapter.backend_type
    );

    let mut constants = UniformConstants::new(settings);
    constants.init(device)?;
    if !constants.supported(device) {
        log::warn!("Frame constants are unsupported on this device, nothing to do.");
        return Ok(());
    }
    log::debug!("Shader declarations:\n{}", wgsl_declarations(0));

    let mut state = FrameState::new(0x5eed);
    for _ in 0..frames {
        constants.update(device, &mut state)?;
        constants.bind(device, &state)?;

        if state.draw_frame % 60 == 0 {
            if let Some(binding) = constants.binding_for(UniformBlockKind::Matrices, state.draw_frame)
            {
                log::info!(
                    "Frame {}: matrices at offset {} ({} bytes)",
                    state.draw_frame,
                    binding.offset,
                    binding.size
                );
            }
        }
        state.advance();
    }

    constants.kill(device);
    log::info!("Done after {frames} frames.");
    Ok(())
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("wgpu_hal", log::LevelFilter::Error)
        .init();

    let settings = load_settings()?;
    let frames = frame_count()?;
    let device = create_device()?;
    run(device.as_ref(), settings, frames)
}
