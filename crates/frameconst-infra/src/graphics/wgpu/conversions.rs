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

use frameconst_core::renderer::api::{BufferUsage, GraphicsBackendType};

/// A local extension trait to convert our types into WGPU-compatible types.
/// This avoids Rust's orphan rules while keeping an idiomatic `.into_wgpu()` syntax.
pub trait IntoWgpu<T> {
    /// Consumes self and converts it into a WGPU-compatible type.
    fn into_wgpu(self) -> T;
}

impl IntoWgpu<wgpu::BufferUsages> for BufferUsage {
    fn into_wgpu(self) -> wgpu::BufferUsages {
        let mut usages = wgpu::BufferUsages::empty();
        // Uniform buffers cannot be MAP_WRITE in WebGPU. Mapping is emulated with a CPU
        // copy that is uploaded on unmap, so the buffer only needs to be a copy target.
        if self.contains(BufferUsage::MAP_WRITE) || self.contains(BufferUsage::COPY_DST) {
            usages |= wgpu::BufferUsages::COPY_DST;
        }
        if self.contains(BufferUsage::UNIFORM) {
            usages |= wgpu::BufferUsages::UNIFORM;
        }
        usages
    }
}

/// Converts a WGPU backend into our backend-agnostic type.
pub fn from_wgpu_backend(backend: wgpu::Backend) -> GraphicsBackendType {
    match backend {
        wgpu::Backend::Vulkan => GraphicsBackendType::Vulkan,
        wgpu::Backend::Metal => GraphicsBackendType::Metal,
        wgpu::Backend::Dx12 => GraphicsBackendType::Dx12,
        wgpu::Backend::Gl => GraphicsBackendType::OpenGL,
        wgpu::Backend::BrowserWebGpu => GraphicsBackendType::WebGpu,
        wgpu::Backend::Noop => GraphicsBackendType::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_write_becomes_copy_dst() {
        let usages = (BufferUsage::UNIFORM | BufferUsage::MAP_WRITE).into_wgpu();
        assert_eq!(
            usages,
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST
        );
        assert!(!usages.contains(wgpu::BufferUsages::MAP_WRITE));
    }

    #[test]
    fn backend_names() {
        assert_eq!(
            from_wgpu_backend(wgpu::Backend::Vulkan),
            GraphicsBackendType::Vulkan
        );
        assert_eq!(
            from_wgpu_backend(wgpu::Backend::Gl),
            GraphicsBackendType::OpenGL
        );
    }
}
