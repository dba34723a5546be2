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

//! The values the uniform blocks are built from.
//!
//! Camera, shadow, viewport and simulation bookkeeping live outside this crate. They are
//! pulled through [`FrameSource`] once per `update` and `bind`.

use crate::math::{Mat4, Vec3};

/// Screen-space matrices, used for overlays drawn in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenMatrices {
    /// Screen view matrix.
    pub view: Mat4,
    /// Screen projection matrix.
    pub proj: Mat4,
}

/// Matrices of the player camera.
///
/// Every field is supplied by the camera owner, inverses included.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CameraMatrices {
    /// World to view.
    pub view: Mat4,
    /// View to clip.
    pub proj: Mat4,
    /// World to clip, `proj * view`.
    pub view_proj: Mat4,
    /// Rotation that turns a quad to face the camera.
    pub billboard: Mat4,
    /// Inverse of `view`.
    pub view_inv: Mat4,
    /// Inverse of `proj`.
    pub proj_inv: Mat4,
    /// Inverse of `view_proj`.
    pub view_proj_inv: Mat4,
}

/// View and projection of the shadow drawing pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShadowMatrices {
    /// Light view matrix.
    pub view: Mat4,
    /// Light projection matrix.
    pub proj: Mat4,
}

/// Simulation clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationTime {
    /// Number of simulation ticks since the start of the session.
    pub frame: u32,
    /// Simulation ticks per second of game time.
    pub ticks_per_second: f32,
    /// Fraction of a tick elapsed since the last simulation frame, in `[0, 1)`.
    pub time_offset: f32,
}

impl Default for SimulationTime {
    fn default() -> Self {
        Self {
            frame: 0,
            ticks_per_second: 30.0,
            time_offset: 0.0,
        }
    }
}

/// Size and position of the viewport, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    /// Width.
    pub size_x: u32,
    /// Height.
    pub size_y: u32,
    /// Horizontal position of the lower-left corner.
    pub pos_x: i32,
    /// Vertical position of the lower-left corner.
    pub pos_y: i32,
}

/// Dimensions of the world map.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MapDimensions {
    /// Map width in squares.
    pub size_x: u32,
    /// Map depth in squares.
    pub size_y: u32,
    /// `size_x` padded to the next power of two.
    pub pow2_x: u32,
    /// `size_y` padded to the next power of two.
    pub pow2_y: u32,
    /// World units per map square.
    pub square_size: f32,
}

impl MapDimensions {
    /// Builds dimensions for a `size_x` x `size_y` map, padding both sides to powers of two.
    pub fn new(size_x: u32, size_y: u32, square_size: f32) -> Self {
        Self {
            size_x,
            size_y,
            pow2_x: size_x.next_power_of_two(),
            pow2_y: size_y.next_power_of_two(),
            square_size,
        }
    }
}

/// The collaborators a frame's uniform blocks are computed from.
///
/// Every getter is read synchronously while `update` or `bind` runs, so implementations
/// should return values for the frame being rendered.
pub trait FrameSource {
    /// Render frame counter. Selects the ring slot.
    fn draw_frame(&self) -> u64;

    /// Screen-space matrices.
    fn screen(&self) -> ScreenMatrices;

    /// Player camera matrices, inverses and billboard rotation.
    fn player_camera(&self) -> CameraMatrices;

    /// Shadow pass view and projection.
    fn shadow_camera(&self) -> ShadowMatrices;

    /// Simulation clock.
    fn simulation(&self) -> SimulationTime;

    /// Viewport size and position.
    fn viewport(&self) -> Viewport;

    /// Map dimensions and world unit size.
    fn map(&self) -> MapDimensions;

    /// Draws a fresh pseudo-random vector.
    fn random_vector(&mut self) -> Vec3;
}
