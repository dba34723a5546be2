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

//! Triple-buffered upload of the per-frame shared shader constants.
//!
//! Two fixed-layout blocks, [`MatrixBlock`] and [`ParamsBlock`], are rewritten once per
//! frame into their own three-slot [`UniformRing`] and exposed to shaders at binding
//! points [`MATRIX_BLOCK_BINDING`] and [`PARAMS_BLOCK_BINDING`]. The CPU writes slot
//! `frame % 3` while the GPU may still be reading the other two, so no fence is needed
//! as long as the GPU stays within [`FRAMES_IN_FLIGHT_BUDGET`] frames.
//!
//! [`UniformConstants`] drives the whole protocol.

mod alignment;
mod blocks;
mod constants;
mod frame_state;
mod ring;
mod settings;
mod shader;
mod source;

/// Shader binding index of the [`MatrixBlock`].
pub const MATRIX_BLOCK_BINDING: u32 = 0;
/// Shader binding index of the [`ParamsBlock`].
pub const PARAMS_BLOCK_BINDING: u32 = 1;

pub use self::alignment::{round_up_to_alignment, slot_index, slot_offset, RING_SLOTS};
pub use self::blocks::{MatrixBlock, ParamsBlock, UniformBlock, UniformBlockKind};
pub use self::constants::{
    SlotSizes, UniformConstants, FRAMES_IN_FLIGHT_BUDGET, REQUIRED_FEATURES,
};
pub use self::frame_state::FrameState;
pub use self::ring::{MappedSlot, SlotMapping, UniformRing};
pub use self::settings::UniformSettings;
pub use self::shader::{wgsl_declarations, MATRIX_BLOCK_VAR, PARAMS_BLOCK_VAR};
pub use self::source::{
    CameraMatrices, FrameSource, MapDimensions, ScreenMatrices, ShadowMatrices, SimulationTime,
    Viewport,
};
