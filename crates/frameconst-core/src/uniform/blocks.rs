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

//! GPU layouts of the two per-frame uniform blocks.

use super::source::FrameSource;
use super::{MATRIX_BLOCK_BINDING, PARAMS_BLOCK_BINDING};
use crate::math::{Mat4, Vec4};
use bytemuck::{Pod, Zeroable};

/// A `#[repr(C)]` block uploaded once per frame into its own uniform ring.
pub trait UniformBlock: Pod {
    /// Which of the two blocks this is.
    const KIND: UniformBlockKind;
    /// Name of the block's struct in shader source.
    const SHADER_NAME: &'static str;
    /// Shader field names and WGSL types, in declaration order.
    const FIELDS: &'static [(&'static str, &'static str)];

    /// Natural (unaligned) size of the block in bytes.
    const SIZE: u64 = std::mem::size_of::<Self>() as u64;
}

/// Identifies one of the two uniform blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformBlockKind {
    /// The [`MatrixBlock`].
    Matrices,
    /// The [`ParamsBlock`].
    Params,
}

impl UniformBlockKind {
    /// The fixed shader binding index of the block.
    pub const fn binding(self) -> u32 {
        match self {
            UniformBlockKind::Matrices => MATRIX_BLOCK_BINDING,
            UniformBlockKind::Params => PARAMS_BLOCK_BINDING,
        }
    }

    /// A short name for labels and logs.
    pub const fn label(self) -> &'static str {
        match self {
            UniformBlockKind::Matrices => "Matrices",
            UniformBlockKind::Params => "Params",
        }
    }
}

/// Camera, screen and shadow matrices for one frame.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MatrixBlock {
    /// Screen view.
    pub screen_view: Mat4,
    /// Screen projection.
    pub screen_proj: Mat4,
    /// Screen `proj * view`.
    pub screen_view_proj: Mat4,

    /// Player camera view.
    pub camera_view: Mat4,
    /// Player camera projection.
    pub camera_proj: Mat4,
    /// Player camera view-projection.
    pub camera_view_proj: Mat4,
    /// Player camera `view * billboard`.
    pub camera_billboard_view: Mat4,

    /// Inverse of `camera_view`.
    pub camera_view_inv: Mat4,
    /// Inverse of `camera_proj`.
    pub camera_proj_inv: Mat4,
    /// Inverse of `camera_view_proj`.
    pub camera_view_proj_inv: Mat4,

    /// Shadow pass view.
    pub shadow_view: Mat4,
    /// Shadow pass projection.
    pub shadow_proj: Mat4,
    /// Shadow pass `proj * view`.
    pub shadow_view_proj: Mat4,
}

const MAT4: &str = "mat4x4<f32>";
const VEC4: &str = "vec4<f32>";

impl UniformBlock for MatrixBlock {
    const KIND: UniformBlockKind = UniformBlockKind::Matrices;
    const SHADER_NAME: &'static str = "FrameMatrices";
    const FIELDS: &'static [(&'static str, &'static str)] = &[
        ("screen_view", MAT4),
        ("screen_proj", MAT4),
        ("screen_view_proj", MAT4),
        ("camera_view", MAT4),
        ("camera_proj", MAT4),
        ("camera_view_proj", MAT4),
        ("camera_billboard_view", MAT4),
        ("camera_view_inv", MAT4),
        ("camera_proj_inv", MAT4),
        ("camera_view_proj_inv", MAT4),
        ("shadow_view", MAT4),
        ("shadow_proj", MAT4),
        ("shadow_view_proj", MAT4),
    ];
}

impl MatrixBlock {
    /// Computes every matrix of the block from the current frame's collaborators.
    pub fn from_source<S: FrameSource + ?Sized>(source: &S) -> Self {
        let screen = source.screen();
        let camera = source.player_camera();
        let shadow = source.shadow_camera();

        Self {
            screen_view: screen.view,
            screen_proj: screen.proj,
            screen_view_proj: screen.proj * screen.view,

            camera_view: camera.view,
            camera_proj: camera.proj,
            camera_view_proj: camera.view_proj,
            camera_billboard_view: camera.view * camera.billboard,

            camera_view_inv: camera.view_inv,
            camera_proj_inv: camera.proj_inv,
            camera_view_proj_inv: camera.view_proj_inv,

            shadow_view: shadow.view,
            shadow_proj: shadow.proj,
            shadow_view_proj: shadow.proj * shadow.view,
        }
    }
}

/// Timing, viewport, map and random parameters for one frame.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ParamsBlock {
    /// `(simulation frame, simulation seconds, render frame, sub-tick offset)`.
    pub time_info: Vec4,
    /// `(viewport width, viewport height, viewport x, viewport y)`.
    pub view_geometry: Vec4,
    /// `(map x, map z, padded map x, padded map z)`, in world units.
    pub map_size: Vec4,
    /// `(x, y, z, 0.0)`, a fresh random vector.
    pub random: Vec4,
}

impl UniformBlock for ParamsBlock {
    const KIND: UniformBlockKind = UniformBlockKind::Params;
    const SHADER_NAME: &'static str = "FrameParams";
    const FIELDS: &'static [(&'static str, &'static str)] = &[
        ("time_info", VEC4),
        ("view_geometry", VEC4),
        ("map_size", VEC4),
        ("random", VEC4),
    ];
}

impl ParamsBlock {
    /// Computes the block from the current frame's collaborators.
    ///
    /// Draws exactly one vector from the source's random generator.
    pub fn from_source<S: FrameSource + ?Sized>(source: &mut S) -> Self {
        let sim = source.simulation();
        let viewport = source.viewport();
        let map = source.map();
        let random = source.random_vector();

        let sim_seconds = if sim.ticks_per_second > 0.0 {
            sim.frame as f32 / sim.ticks_per_second
        } else {
            0.0
        };

        Self {
            time_info: Vec4::new(
                sim.frame as f32,
                sim_seconds,
                source.draw_frame() as f32,
                sim.time_offset,
            ),
            view_geometry: Vec4::new(
                viewport.size_x as f32,
                viewport.size_y as f32,
                viewport.pos_x as f32,
                viewport.pos_y as f32,
            ),
            map_size: Vec4::new(
                map.size_x as f32,
                map.size_y as f32,
                map.pow2_x as f32,
                map.pow2_y as f32,
            ) * map.square_size,
            random: random.extend(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uniform::source::*;
    use crate::math::Vec3;
    use approx::assert_relative_eq;

    struct FixedSource {
        draws: u32,
    }

    impl FrameSource for FixedSource {
        fn draw_frame(&self) -> u64 {
            42
        }
        fn screen(&self) -> ScreenMatrices {
            ScreenMatrices {
                view: Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)),
                proj: Mat4::from_scale(Vec3::new(2.0, 2.0, 2.0)),
            }
        }
        fn player_camera(&self) -> CameraMatrices {
            let view = Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0));
            let proj = Mat4::from_scale(Vec3::new(0.5, 0.5, 0.5));
            CameraMatrices {
                view,
                proj,
                view_proj: proj * view,
                billboard: Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0)),
                view_inv: Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0)),
                proj_inv: Mat4::from_scale(Vec3::new(2.0, 2.0, 2.0)),
                view_proj_inv: Mat4::IDENTITY,
            }
        }
        fn shadow_camera(&self) -> ShadowMatrices {
            ShadowMatrices {
                view: Mat4::from_translation(Vec3::new(-3.0, -9.0, 0.0)),
                proj: Mat4::from_scale(Vec3::new(3.0, 3.0, 3.0)),
            }
        }
        fn simulation(&self) -> SimulationTime {
            SimulationTime {
                frame: 90,
                ticks_per_second: 30.0,
                time_offset: 0.25,
            }
        }
        fn viewport(&self) -> Viewport {
            Viewport {
                size_x: 1920,
                size_y: 1080,
                pos_x: 10,
                pos_y: 20,
            }
        }
        fn map(&self) -> MapDimensions {
            MapDimensions::new(12, 8, 8.0)
        }
        fn random_vector(&mut self) -> Vec3 {
            self.draws += 1;
            Vec3::new(0.6, 0.0, 0.8)
        }
    }

    #[test]
    fn block_sizes_match_shader_layout() {
        assert_eq!(MatrixBlock::SIZE, 832);
        assert_eq!(ParamsBlock::SIZE, 64);
        assert_eq!(MatrixBlock::FIELDS.len() * 64, 832);
        assert_eq!(ParamsBlock::FIELDS.len() * 16, 64);
    }

    #[test]
    fn matrix_block_products() {
        let source = FixedSource { draws: 0 };
        let block = MatrixBlock::from_source(&source);
        let screen = source.screen();
        let shadow = source.shadow_camera();
        let camera = source.player_camera();

        assert_eq!(block.screen_view_proj, screen.proj * screen.view);
        assert_eq!(block.shadow_view_proj, shadow.proj * shadow.view);
        assert_eq!(block.camera_view_proj, camera.proj * camera.view);
        assert_eq!(block.camera_billboard_view, camera.view * camera.billboard);
        assert_eq!(block.camera_view_inv, camera.view_inv);
        assert_eq!(block.camera_proj_inv, camera.proj_inv);
        assert_eq!(block.camera_view_proj_inv, camera.view_proj_inv);
    }

    #[test]
    fn params_block_values() {
        let mut source = FixedSource { draws: 0 };
        let block = ParamsBlock::from_source(&mut source);

        assert_eq!(source.draws, 1);
        assert_relative_eq!(block.time_info.x, 90.0);
        assert_relative_eq!(block.time_info.y, 3.0);
        assert_relative_eq!(block.time_info.z, 42.0);
        assert_relative_eq!(block.time_info.w, 0.25);
        assert_eq!(block.view_geometry, Vec4::new(1920.0, 1080.0, 10.0, 20.0));
        assert_eq!(block.map_size, Vec4::new(96.0, 64.0, 128.0, 64.0));
        assert_eq!(block.random, Vec4::new(0.6, 0.0, 0.8, 0.0));
    }

    #[test]
    fn block_kinds_use_fixed_bindings() {
        assert_eq!(MatrixBlock::KIND.binding(), 0);
        assert_eq!(ParamsBlock::KIND.binding(), 1);
    }
}
