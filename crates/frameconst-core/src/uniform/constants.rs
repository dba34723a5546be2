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

use super::blocks::{MatrixBlock, ParamsBlock, UniformBlockKind};
use super::ring::UniformRing;
use super::settings::UniformSettings;
use super::source::FrameSource;
use super::{MATRIX_BLOCK_BINDING, PARAMS_BLOCK_BINDING};
use crate::renderer::api::{BufferBinding, DeviceFeatures, MapMode};
use crate::renderer::error::{RenderError, ResourceError};
use crate::renderer::traits::GraphicsDevice;
use std::cell::OnceCell;

/// The features a device must report for the uniform blocks to be used at all.
pub const REQUIRED_FEATURES: DeviceFeatures = DeviceFeatures::UNIFORM_BUFFERS
    .union(DeviceFeatures::EXPLICIT_BINDING);

/// Number of frames the GPU may take to finish reading a slot.
///
/// With three slots, the slot written on frame `f` was last bound on frame `f - 3`.
/// Nothing fences the ring: callers must not let the GPU fall more than this many
/// frames behind the CPU.
pub const FRAMES_IN_FLIGHT_BUDGET: u64 = 2;

/// Aligned per-slot sizes of both rings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSizes {
    /// Bytes per slot of the matrix ring.
    pub matrices: u64,
    /// Bytes per slot of the params ring.
    pub params: u64,
}

#[derive(Debug)]
struct Rings {
    matrices: UniformRing<MatrixBlock>,
    params: UniformRing<ParamsBlock>,
}

impl Rings {
    // Both slots are mapped before either is written.
    fn write(
        &mut self,
        device: &dyn GraphicsDevice,
        frame: u64,
        matrices: &MatrixBlock,
        params: &ParamsBlock,
    ) -> Result<(), ResourceError> {
        let matrix_slot = self.matrices.map_slot(device, frame)?;
        let params_slot = match self.params.map_slot(device, frame) {
            Ok(slot) => slot,
            Err(e) => {
                if let Err(discard) = matrix_slot.discard(device) {
                    log::warn!("UniformConstants: Failed to release the matrix slot: {discard}");
                }
                return Err(e);
            }
        };

        let matrices_written = matrix_slot.write(device, matrices);
        let params_written = params_slot.write(device, params);
        matrices_written.and(params_written)
    }
}

/// Uploads the per-frame shared constants into two triple-buffered uniform rings.
///
/// Call [`init`](Self::init) once, then [`update`](Self::update) followed by
/// [`bind`](Self::bind) on every frame, and [`kill`](Self::kill) on shutdown. When the
/// device lacks [`REQUIRED_FEATURES`] every call is a no-op and `init` logs why.
///
/// The component owns its rings exclusively and is meant to be driven from the
/// rendering thread only. See [`FRAMES_IN_FLIGHT_BUDGET`] for the GPU-side contract.
#[derive(Debug, Default)]
pub struct UniformConstants {
    settings: UniformSettings,
    features: OnceCell<DeviceFeatures>,
    alignment: OnceCell<u64>,
    rings: Option<Rings>,
}

impl UniformConstants {
    /// Creates an uninitialized component.
    pub fn new(settings: UniformSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    /// The settings the component was created with.
    pub fn settings(&self) -> &UniformSettings {
        &self.settings
    }

    fn features(&self, device: &dyn GraphicsDevice) -> DeviceFeatures {
        *self.features.get_or_init(|| device.features())
    }

    fn alignment(&self, device: &dyn GraphicsDevice) -> u64 {
        *self
            .alignment
            .get_or_init(|| device.min_uniform_buffer_offset_alignment())
    }

    /// Returns `true` if the device exposes uniform buffers and explicit binding indices.
    ///
    /// The device is queried on the first call only.
    pub fn supported(&self, device: &dyn GraphicsDevice) -> bool {
        self.features(device).contains(REQUIRED_FEATURES)
    }

    /// Like [`supported`](Self::supported), but names the missing features.
    pub fn check_support(&self, device: &dyn GraphicsDevice) -> Result<(), RenderError> {
        let missing = REQUIRED_FEATURES.difference(self.features(device));
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RenderError::FeatureNotSupported(missing.to_string()))
        }
    }

    /// Returns `true` between a successful [`init`](Self::init) and [`kill`](Self::kill).
    pub fn is_initialized(&self) -> bool {
        self.rings.is_some()
    }

    /// Allocates both rings and selects the write strategy.
    ///
    /// Does nothing on an unsupported device, or if the component is already initialized.
    pub fn init(&mut self, device: &dyn GraphicsDevice) -> Result<(), RenderError> {
        if let Err(e) = self.check_support(device) {
            log::error!(
                "UniformConstants: Device '{}' cannot use frame constants. {e}",
                device.get_adapter_info().name
            );
            return Ok(());
        }
        if self.rings.is_some() {
            log::warn!("UniformConstants: init called twice, keeping the existing rings.");
            return Ok(());
        }

        let alignment = self.alignment(device);
        let persistent = self.settings.allow_persistent_mapping
            && self.features(device).contains(DeviceFeatures::PERSISTENT_MAPPING);
        let label = self.settings.label.as_str();

        let matrices = UniformRing::allocate(device, alignment, persistent, label)?;
        let params = match UniformRing::allocate(device, alignment, persistent, label) {
            Ok(params) => params,
            Err(e) => {
                if let Err(release) = matrices.release(device) {
                    log::warn!("UniformConstants: Failed to release matrix ring: {release}");
                }
                return Err(e.into());
            }
        };

        log::info!(
            "UniformConstants: Initialized with alignment {} ({} + {} bytes per frame, {:?} mapping).",
            alignment,
            matrices.slot_size(),
            params.slot_size(),
            matrices.mapping().mode()
        );
        self.rings = Some(Rings { matrices, params });
        Ok(())
    }

    /// Detaches both binding points, releases any persistent mapping and destroys the rings.
    ///
    /// Teardown failures are logged and do not stop the remaining steps.
    pub fn kill(&mut self, device: &dyn GraphicsDevice) {
        if !self.supported(device) {
            return;
        }
        let Some(rings) = self.rings.take() else {
            return;
        };

        let clears = [
            (MATRIX_BLOCK_BINDING, rings.matrices.ring_size()),
            (PARAMS_BLOCK_BINDING, rings.params.ring_size()),
        ];
        for (index, size) in clears {
            if let Err(e) = device.clear_uniform_range(index, size) {
                log::warn!("UniformConstants: Failed to clear binding {index}: {e}");
            }
        }
        if let Err(e) = rings.matrices.release(device) {
            log::warn!("UniformConstants: Failed to release matrix ring: {e}");
        }
        if let Err(e) = rings.params.release(device) {
            log::warn!("UniformConstants: Failed to release params ring: {e}");
        }
        log::info!("UniformConstants: Released.");
    }

    /// Writes this frame's blocks into the slot selected by `source.draw_frame()`.
    ///
    /// # Errors
    ///
    /// * `RenderError::NotInitialized` - If called before [`init`](Self::init) on a
    ///   supported device.
    /// * `RenderError::ResourceError(ResourceError::MappingFailed { .. })` - If the driver
    ///   could not map a slot. Nothing is written for either block.
    pub fn update<S: FrameSource + ?Sized>(
        &mut self,
        device: &dyn GraphicsDevice,
        source: &mut S,
    ) -> Result<(), RenderError> {
        if !self.supported(device) {
            return Ok(());
        }
        let rings = self.rings.as_mut().ok_or(RenderError::NotInitialized)?;

        let frame = source.draw_frame();
        let matrices = MatrixBlock::from_source(&*source);
        let params = ParamsBlock::from_source(source);

        rings
            .write(device, frame, &matrices, &params)
            .map_err(|e| {
                if let ResourceError::MappingFailed { .. } = e {
                    log::error!(
                        "UniformConstants: Frame {frame}: the driver could not map the uniform ring ({e}). \
                         The buffer or the driver state is corrupt."
                    );
                } else {
                    log::error!("UniformConstants: Frame {frame}: update failed: {e}");
                }
                RenderError::from(e)
            })?;

        log::trace!("UniformConstants: Updated frame {frame}.");
        Ok(())
    }

    /// Attaches this frame's slots to binding points 0 (matrices) and 1 (params).
    ///
    /// Calling it more than once per frame binds the same ranges again.
    pub fn bind<S: FrameSource + ?Sized>(
        &self,
        device: &dyn GraphicsDevice,
        source: &S,
    ) -> Result<(), RenderError> {
        if !self.supported(device) {
            return Ok(());
        }
        let rings = self.rings.as_ref().ok_or(RenderError::NotInitialized)?;

        let frame = source.draw_frame();
        device.bind_uniform_range(MATRIX_BLOCK_BINDING, rings.matrices.binding(frame))?;
        device.bind_uniform_range(PARAMS_BLOCK_BINDING, rings.params.binding(frame))?;
        Ok(())
    }

    /// The range `bind` attaches for `block` on render frame `frame`.
    pub fn binding_for(&self, block: UniformBlockKind, frame: u64) -> Option<BufferBinding> {
        let rings = self.rings.as_ref()?;
        Some(match block {
            UniformBlockKind::Matrices => rings.matrices.binding(frame),
            UniformBlockKind::Params => rings.params.binding(frame),
        })
    }

    /// The map mode used by the active write strategy.
    pub fn mapping_mode(&self) -> Option<MapMode> {
        self.rings
            .as_ref()
            .map(|rings| rings.matrices.mapping().mode())
    }

    /// Aligned slot sizes of both rings.
    pub fn slot_sizes(&self) -> Option<SlotSizes> {
        self.rings.as_ref().map(|rings| SlotSizes {
            matrices: rings.matrices.slot_size(),
            params: rings.params.slot_size(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::MemoryDevice;
    use crate::uniform::FrameState;

    #[test]
    fn capability_is_queried_once() {
        let device = MemoryDevice::default();
        let constants = UniformConstants::default();
        assert!(constants.supported(&device));
        assert!(constants.supported(&device));
        assert_eq!(device.stats().feature_queries, 1);
    }

    #[test]
    fn check_support_names_missing_features() {
        let device = MemoryDevice::new(DeviceFeatures::UNIFORM_BUFFERS, 256);
        let constants = UniformConstants::default();
        assert_eq!(
            constants.check_support(&device),
            Err(RenderError::FeatureNotSupported("explicit_binding".to_string()))
        );
        assert!(UniformConstants::default()
            .check_support(&MemoryDevice::default())
            .is_ok());
    }

    #[test]
    fn update_before_init_is_an_error() {
        let device = MemoryDevice::default();
        let mut constants = UniformConstants::default();
        let mut state = FrameState::default();
        assert!(matches!(
            constants.update(&device, &mut state),
            Err(RenderError::NotInitialized)
        ));
        assert!(matches!(
            constants.bind(&device, &state),
            Err(RenderError::NotInitialized)
        ));
    }

    #[test]
    fn double_init_keeps_rings() {
        let device = MemoryDevice::default();
        let mut constants = UniformConstants::default();
        constants.init(&device).unwrap();
        constants.init(&device).unwrap();
        assert_eq!(device.stats().buffers_created, 2);
        assert_eq!(device.stats().alignment_queries, 1);
    }

    #[test]
    fn reinit_after_kill() {
        let device = MemoryDevice::default();
        let mut constants = UniformConstants::default();
        constants.init(&device).unwrap();
        constants.kill(&device);
        assert!(!constants.is_initialized());
        assert_eq!(device.live_buffers(), 0);

        constants.init(&device).unwrap();
        assert!(constants.is_initialized());
        assert_eq!(device.live_buffers(), 2);
        assert_eq!(device.stats().alignment_queries, 1);
    }

    #[test]
    fn settings_disable_persistent_mapping() {
        let device = MemoryDevice::default();
        let mut constants = UniformConstants::new(UniformSettings {
            allow_persistent_mapping: false,
            ..Default::default()
        });
        constants.init(&device).unwrap();
        assert_eq!(constants.mapping_mode(), Some(MapMode::Transient));
    }
}
