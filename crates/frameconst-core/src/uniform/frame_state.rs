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

use super::source::*;
use crate::math::{Mat4, Vec3};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// A plain-data [`FrameSource`].
///
/// Holds the values of the current frame in public fields and draws random vectors from
/// a seeded PCG generator, so two states built with the same seed produce the same
/// sequence of blocks.
#[derive(Debug, Clone)]
pub struct FrameState {
    /// Render frame counter.
    pub draw_frame: u64,
    /// Screen-space matrices.
    pub screen: ScreenMatrices,
    /// Player camera.
    pub camera: CameraMatrices,
    /// Shadow pass camera.
    pub shadow: ShadowMatrices,
    /// Simulation clock.
    pub simulation: SimulationTime,
    /// Viewport rectangle.
    pub viewport: Viewport,
    /// Map dimensions.
    pub map: MapDimensions,
    rng: Pcg32,
}

/// A camera at `eye` looking down -Z, with a box projection that maps `extent` onto
/// clip space.
///
/// There is no rotation, so the billboard is the identity and every inverse is built from
/// the inverse translation and scale.
fn box_camera(eye: Vec3, extent: Vec3) -> CameraMatrices {
    let view = Mat4::from_translation(eye.negated());
    let proj = Mat4::from_scale(extent.recip());
    let view_inv = Mat4::from_translation(eye);
    let proj_inv = Mat4::from_scale(extent);
    CameraMatrices {
        view,
        proj,
        view_proj: proj * view,
        billboard: Mat4::IDENTITY,
        view_inv,
        proj_inv,
        view_proj_inv: view_inv * proj_inv,
    }
}

impl FrameState {
    /// Creates a 1920x1080 scene above the center of a 512x512 map.
    pub fn new(seed: u64) -> Self {
        let viewport = Viewport {
            size_x: 1920,
            size_y: 1080,
            pos_x: 0,
            pos_y: 0,
        };
        let map = MapDimensions::new(512, 512, 8.0);
        let half_x = map.size_x as f32 * map.square_size * 0.5;
        let half_z = map.size_y as f32 * map.square_size * 0.5;

        let aspect = viewport.size_x as f32 / viewport.size_y as f32;
        let camera = box_camera(
            Vec3::new(half_x, 1500.0, half_z + 1500.0),
            Vec3::new(1000.0 * aspect, 1000.0, 10_000.0),
        );
        let shadow = box_camera(
            Vec3::new(half_x, 3000.0, half_z),
            Vec3::new(half_x * 1.5, half_z * 1.5, 8_000.0),
        );

        // Pixels to clip space, origin at the lower-left corner.
        let screen_proj = Mat4::from_translation(Vec3::new(-1.0, -1.0, 0.0))
            * Mat4::from_scale(Vec3::new(
                2.0 / viewport.size_x as f32,
                2.0 / viewport.size_y as f32,
                1.0,
            ));

        Self {
            draw_frame: 0,
            screen: ScreenMatrices {
                view: Mat4::IDENTITY,
                proj: screen_proj,
            },
            camera,
            shadow: ShadowMatrices {
                view: shadow.view,
                proj: shadow.proj,
            },
            simulation: SimulationTime::default(),
            viewport,
            map,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Moves to the next render frame, ticking the simulation every other frame.
    pub fn advance(&mut self) {
        self.draw_frame += 1;
        if self.draw_frame % 2 == 0 {
            self.simulation.frame += 1;
            self.simulation.time_offset = 0.0;
        } else {
            self.simulation.time_offset = 0.5;
        }
    }
}

impl Default for FrameState {
    fn default() -> Self {
        Self::new(0)
    }
}

impl FrameSource for FrameState {
    fn draw_frame(&self) -> u64 {
        self.draw_frame
    }

    fn screen(&self) -> ScreenMatrices {
        self.screen
    }

    fn player_camera(&self) -> CameraMatrices {
        self.camera
    }

    fn shadow_camera(&self) -> ShadowMatrices {
        self.shadow
    }

    fn simulation(&self) -> SimulationTime {
        self.simulation
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn map(&self) -> MapDimensions {
        self.map
    }

    /// Returns a vector drawn uniformly from the unit ball.
    fn random_vector(&mut self) -> Vec3 {
        loop {
            let v = Vec3::new(
                self.rng.random_range(-1.0..=1.0),
                self.rng.random_range(-1.0..=1.0),
                self.rng.random_range(-1.0..=1.0),
            );
            if v.length_squared() <= 1.0 {
                return v;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec4;
    use approx::assert_relative_eq;

    fn assert_identity(m: Mat4) {
        for (c, col) in m.cols.iter().enumerate() {
            let expected = Mat4::IDENTITY.cols[c];
            assert_relative_eq!(col.x, expected.x, epsilon = 1e-5);
            assert_relative_eq!(col.y, expected.y, epsilon = 1e-5);
            assert_relative_eq!(col.z, expected.z, epsilon = 1e-5);
            assert_relative_eq!(col.w, expected.w, epsilon = 1e-5);
        }
    }

    #[test]
    fn random_vectors_stay_in_unit_ball() {
        let mut state = FrameState::new(1234);
        let draws: Vec<Vec3> = (0..256).map(|_| state.random_vector()).collect();
        assert!(draws.iter().all(|v| v.length_squared() <= 1.0));
        // Not normalized: lengths vary.
        assert!(draws.iter().any(|v| v.length_squared() < 0.5));
    }

    #[test]
    fn camera_inverses_cancel() {
        let camera = FrameState::default().camera;
        assert_identity(camera.view * camera.view_inv);
        assert_identity(camera.proj * camera.proj_inv);
        assert_identity(camera.view_proj * camera.view_proj_inv);
        assert_eq!(camera.billboard, Mat4::IDENTITY);
    }

    #[test]
    fn screen_maps_viewport_corners_to_clip_space() {
        let state = FrameState::default();
        let proj = state.screen.proj;
        let low = proj * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let high = proj * Vec4::new(1920.0, 1080.0, 0.0, 1.0);
        assert_relative_eq!(low.x, -1.0);
        assert_relative_eq!(low.y, -1.0);
        assert_relative_eq!(high.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(high.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = FrameState::new(99);
        let mut b = FrameState::new(99);
        for _ in 0..16 {
            assert_eq!(a.random_vector(), b.random_vector());
        }
    }

    #[test]
    fn advance_ticks_frames() {
        let mut state = FrameState::default();
        state.advance();
        assert_eq!(state.draw_frame, 1);
        assert_eq!(state.simulation.frame, 0);
        assert_relative_eq!(state.simulation.time_offset, 0.5);
        state.advance();
        assert_eq!(state.draw_frame, 2);
        assert_eq!(state.simulation.frame, 1);
        assert_relative_eq!(state.simulation.time_offset, 0.0);
    }
}
