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

use crate::renderer::api::*;
use crate::renderer::error::ResourceError;
use std::fmt::Debug;

/// The buffer-level contract a graphics backend implements.
///
/// The model follows the classic bind-to-edit API shape: a buffer is bound before it is
/// mapped or unmapped, and uniform ranges are attached to numbered binding points that
/// shaders reference with explicit binding indices.
pub trait GraphicsDevice: Send + Sync + Debug + 'static {
    /// Returns the optional features this device exposes.
    /// The result is static for the lifetime of the device.
    fn features(&self) -> DeviceFeatures;

    /// Returns the minimum byte alignment required for the offset of a bound uniform range.
    fn min_uniform_buffer_offset_alignment(&self) -> u64;

    /// Creates a new GPU buffer.
    /// ## Arguments
    /// * `descriptor` - A reference to a `BufferDescriptor` containing the buffer configuration.
    /// ## Returns
    /// A `Result` containing the ID of the created buffer or an error if the creation fails.
    /// The contents of a new buffer are undefined.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError>;

    /// Destroys a GPU buffer.
    /// ## Arguments
    /// * `id` - The ID of the buffer to be destroyed.
    /// ## Returns
    /// A `Result` indicating success or failure of the operation.
    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    /// Makes `id` the current buffer for subsequent map and unmap calls.
    fn bind_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    /// Releases the current-buffer binding established by [`bind_buffer`](Self::bind_buffer).
    fn unbind_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    /// Maps `size` bytes starting at `offset` for CPU writes.
    /// ## Arguments
    /// * `id` - The ID of the bound buffer to map.
    /// * `offset` - The byte offset of the range.
    /// * `size` - The byte length of the range.
    /// * `mode` - Whether the mapping outlives the current frame.
    /// ## Errors
    /// * `ResourceError::MappingFailed` - If the driver returned a null pointer.
    /// * `ResourceError::AlreadyMapped` - If the buffer already has a live mapping.
    fn map_buffer_range(
        &self,
        id: BufferId,
        offset: u64,
        size: u64,
        mode: MapMode,
    ) -> Result<MappedRegion, ResourceError>;

    /// Unmaps the live mapping of a bound buffer, making the written bytes visible to the GPU.
    fn unmap_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    /// Attaches a buffer range to the uniform binding point `index`.
    fn bind_uniform_range(&self, index: u32, binding: BufferBinding) -> Result<(), ResourceError>;

    /// Detaches whatever range of up to `size` bytes is attached to the uniform binding
    /// point `index`.
    fn clear_uniform_range(&self, index: u32, size: u64) -> Result<(), ResourceError>;

    /// Get the adapter information of the device.
    fn get_adapter_info(&self) -> GraphicsAdapterInfo;
}
