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

//! Device feature flags and adapter information.

use std::fmt;

/// Flags describing optional capabilities of a graphics device.
///
/// These are static for the lifetime of a device; callers query them once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceFeatures {
    bits: u32,
}

impl DeviceFeatures {
    /// No optional features.
    pub const NONE: Self = Self { bits: 0 };
    /// Uniform buffer objects can be created and bound by range.
    pub const UNIFORM_BUFFERS: Self = Self { bits: 1 << 0 };
    /// Shaders can declare explicit binding indices (`layout(binding = N)` /
    /// `@binding(N)`), so the host can rely on fixed binding points.
    pub const EXPLICIT_BINDING: Self = Self { bits: 1 << 1 };
    /// Buffers can stay mapped while the GPU reads them.
    pub const PERSISTENT_MAPPING: Self = Self { bits: 1 << 2 };
    /// Everything a device can report.
    pub const ALL: Self = Self {
        bits: Self::UNIFORM_BUFFERS.bits
            | Self::EXPLICIT_BINDING.bits
            | Self::PERSISTENT_MAPPING.bits,
    };

    /// Returns the raw bits.
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Combines two sets of flags.
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Returns these flags with every flag of `other` cleared.
    pub const fn difference(self, other: Self) -> Self {
        Self {
            bits: self.bits & !other.bits,
        }
    }

    /// Checks if these flags contain every flag of `other`.
    pub const fn contains(&self, other: Self) -> bool {
        (self.bits & other.bits) == other.bits
    }

    /// Checks if no flag is set.
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

impl std::ops::BitOr for DeviceFeatures {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl fmt::Display for DeviceFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::UNIFORM_BUFFERS, "uniform_buffers"),
            (Self::EXPLICIT_BINDING, "explicit_binding"),
            (Self::PERSISTENT_MAPPING, "persistent_mapping"),
        ];
        let mut first = true;
        for (flag, name) in names {
            if self.contains(flag) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        if first {
            f.write_str("none")?;
        }
        Ok(())
    }
}

/// A backend-agnostic representation of a graphics API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GraphicsBackendType {
    /// Vulkan API.
    Vulkan,
    /// Apple's Metal API.
    Metal,
    /// Microsoft's DirectX 12 API.
    Dx12,
    /// OpenGL API.
    OpenGL,
    /// WebGPU API (for web builds).
    WebGpu,
    /// Plain CPU memory, used for headless runs and tests.
    Memory,
    /// An unknown or unsupported API.
    #[default]
    Unknown,
}

/// Provides standardized, backend-agnostic information about a graphics adapter.
#[derive(Debug, Clone, Default)]
pub struct GraphicsAdapterInfo {
    /// The name of the adapter (e.g., "NVIDIA GeForce RTX 4090").
    pub name: String,
    /// The graphics API backend this adapter is associated with.
    pub backend_type: GraphicsBackendType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn features_contain_and_difference() {
        let all = DeviceFeatures::ALL;
        assert!(all.contains(DeviceFeatures::UNIFORM_BUFFERS | DeviceFeatures::EXPLICIT_BINDING));
        let reduced = all.difference(DeviceFeatures::PERSISTENT_MAPPING);
        assert!(!reduced.contains(DeviceFeatures::PERSISTENT_MAPPING));
        assert!(reduced.contains(DeviceFeatures::UNIFORM_BUFFERS));
        assert!(DeviceFeatures::NONE.is_empty());
    }

    #[test]
    fn features_display() {
        assert_eq!(DeviceFeatures::NONE.to_string(), "none");
        assert_eq!(
            (DeviceFeatures::UNIFORM_BUFFERS | DeviceFeatures::PERSISTENT_MAPPING).to_string(),
            "uniform_buffers | persistent_mapping"
        );
    }
}
