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


use super::{Vec3, Vec4};
use bytemuck::{Pod, Zeroable};
use std::ops::Mul;

/// A column-major 4x4 matrix, 64 bytes.
///
/// Only composition is provided. Matrices are produced by the frame source and the
/// blocks store them as given, apart from the products the block defines.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Mat4 {
    /// `cols[c]` is column `c`.
    pub cols: [Vec4; 4],
}

impl Mat4 {
    /// Identity.
    pub const IDENTITY: Self = Self::from_diagonal(Vec4::new(1.0, 1.0, 1.0, 1.0));

    const fn from_diagonal(d: Vec4) -> Self {
        Self {
            cols: [
                Vec4::new(d.x, 0.0, 0.0, 0.0),
                Vec4::new(0.0, d.y, 0.0, 0.0),
                Vec4::new(0.0, 0.0, d.z, 0.0),
                Vec4::new(0.0, 0.0, 0.0, d.w),
            ],
        }
    }

    /// Translation by `t`.
    pub fn from_translation(t: Vec3) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[3] = t.extend(1.0);
        m
    }

    /// Non-uniform scale by `s`.
    pub fn from_scale(s: Vec3) -> Self {
        Self::from_diagonal(s.extend(1.0))
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<Vec4> for Mat4 {
    type Output = Vec4;

    fn mul(self, v: Vec4) -> Vec4 {
        let [a, b, c, d] = self.cols;
        Vec4::new(
            a.x * v.x + b.x * v.y + c.x * v.z + d.x * v.w,
            a.y * v.x + b.y * v.y + c.y * v.z + d.y * v.w,
            a.z * v.x + b.z * v.y + c.z * v.z + d.z * v.w,
            a.w * v.x + b.w * v.y + c.w * v.z + d.w * v.w,
        )
    }
}

impl Mul for Mat4 {
    type Output = Self;

    /// `self * rhs` applies `rhs` first.
    fn mul(self, rhs: Self) -> Self {
        Self {
            cols: rhs.cols.map(|col| self * col),
        }
    }
}
