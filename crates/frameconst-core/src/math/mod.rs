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


//! Plain-data vector and matrix types for the uniform blocks.
//!
//! Everything here is `#[repr(C)]` and [`bytemuck::Pod`], so a block can be copied into
//! mapped memory byte for byte. Matrices are column-major like WGSL's `mat4x4<f32>`.
//! Deriving camera or shadow transforms is left to the frame source.

pub mod matrix;
pub mod vector;

pub use self::matrix::Mat4;
pub use self::vector::{Vec3, Vec4};
