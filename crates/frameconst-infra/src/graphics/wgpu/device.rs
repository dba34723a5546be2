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

use super::context::WgpuGraphicsContext;
use super::conversions::{from_wgpu_backend, IntoWgpu};
use frameconst_core::renderer::api::*;
use frameconst_core::renderer::error::ResourceError;
use frameconst_core::renderer::traits::GraphicsDevice;
use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug)]
pub(crate) struct WgpuBufferEntry {
    pub(crate) wgpu_buffer: Arc<wgpu::Buffer>,
    /// CPU copy handed out by `map_buffer_range`. Never reallocated.
    shadow: Box<[u8]>,
    bound: bool,
    mapping: Option<(u64, u64)>,
}

/// The internal, non-clonable state of the WgpuDevice.
/// This struct holds all the GPU resources and state, protected by an Arc.
#[derive(Debug)]
pub struct WgpuDeviceInternal {
    context: Arc<Mutex<WgpuGraphicsContext>>,
    buffers: Mutex<HashMap<BufferId, WgpuBufferEntry>>,
    uniform_bindings: Mutex<HashMap<u32, BufferBinding>>,
    next_buffer_id: AtomicUsize,
}

/// A clonable, thread-safe handle to the WGPU graphics device.
///
/// WebGPU has no way to keep a uniform buffer mapped while the GPU reads it, so the
/// device never reports [`DeviceFeatures::PERSISTENT_MAPPING`]. A transient map hands
/// out a CPU copy of the range, and `unmap_buffer` uploads it with `Queue::write_buffer`.
#[derive(Clone, Debug)]
pub struct WgpuDevice {
    internal: Arc<WgpuDeviceInternal>,
}

impl WgpuDevice {
    pub fn new(context: Arc<Mutex<WgpuGraphicsContext>>) -> Self {
        Self {
            internal: Arc::new(WgpuDeviceInternal {
                context,
                buffers: Mutex::new(HashMap::new()),
                uniform_bindings: Mutex::new(HashMap::new()),
                next_buffer_id: AtomicUsize::new(0),
            }),
        }
    }

    fn generate_buffer_id(&self) -> BufferId {
        BufferId(self.internal.next_buffer_id.fetch_add(1, Ordering::Relaxed))
    }

    fn lock_context(&self) -> Result<MutexGuard<'_, WgpuGraphicsContext>, ResourceError> {
        self.internal.context.lock().map_err(|e| {
            ResourceError::BackendError(format!("Failed to lock WgpuGraphicsContext: {e}"))
        })
    }

    fn lock_buffers(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<BufferId, WgpuBufferEntry>>, ResourceError> {
        self.internal.buffers.lock().map_err(|e| {
            ResourceError::BackendError(format!("WgpuDevice: buffer table poisoned: {e}"))
        })
    }

    /// Retrieves a reference-counted pointer to the internal WGPU buffer.
    /// Returns `None` if the ID is invalid.
    pub fn get_wgpu_buffer(&self, id: BufferId) -> Option<Arc<wgpu::Buffer>> {
        let buffers = self.internal.buffers.lock().ok()?;
        buffers.get(&id).map(|entry| Arc::clone(&entry.wgpu_buffer))
    }

    /// Returns the WGPU buffer and range attached to uniform binding point `index`.
    ///
    /// A render pass uses the offset as the dynamic offset of a bind group built with
    /// [`uniform_layout_entry`](Self::uniform_layout_entry).
    pub fn bound_buffer_binding(&self, index: u32) -> Option<(Arc<wgpu::Buffer>, BufferBinding)> {
        let binding = *self.internal.uniform_bindings.lock().ok()?.get(&index)?;
        let buffer = self.get_wgpu_buffer(binding.buffer)?;
        Some((buffer, binding))
    }

    /// A bind group layout entry for one ring slot of `size` bytes at `index`, with a
    /// dynamic offset so a single bind group serves all slots.
    pub fn uniform_layout_entry(index: u32, size: u64) -> wgpu::BindGroupLayoutEntry {
        wgpu::BindGroupLayoutEntry {
            binding: index,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT | wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: NonZeroU64::new(size),
            },
            count: None,
        }
    }

    /// Copies bytes out of the CPU copy of a buffer, i.e. the last data handed to the queue.
    pub fn read_shadow(&self, id: BufferId, offset: u64, size: u64) -> Result<Vec<u8>, ResourceError> {
        let buffers = self.lock_buffers()?;
        let entry = buffers.get(&id).ok_or(ResourceError::NotFound(id))?;
        let range = Self::checked_range(entry, offset, size)?;
        Ok(entry.shadow[range].to_vec())
    }

    /// Polls the underlying wgpu::Device in a blocking manner.
    /// Used on shutdown so queued writes complete before buffers are released.
    pub fn poll_device_blocking(&self) {
        if let Ok(context_guard) = self.internal.context.lock() {
            if let Err(e) = context_guard.device.poll(wgpu::PollType::Wait) {
                log::warn!("Failed to poll device during shutdown: {:?}", e);
            }
        } else {
            log::error!("WgpuDevice context mutex was poisoned during shutdown poll.");
        }
    }

    fn checked_range(
        entry: &WgpuBufferEntry,
        offset: u64,
        size: u64,
    ) -> Result<std::ops::Range<usize>, ResourceError> {
        let len = entry.shadow.len() as u64;
        let end = offset.saturating_add(size);
        if end > len {
            return Err(ResourceError::OutOfBounds { end, size: len });
        }
        Ok(offset as usize..end as usize)
    }
}

impl GraphicsDevice for WgpuDevice {
    fn features(&self) -> DeviceFeatures {
        DeviceFeatures::UNIFORM_BUFFERS | DeviceFeatures::EXPLICIT_BINDING
    }

    fn min_uniform_buffer_offset_alignment(&self) -> u64 {
        match self.lock_context() {
            Ok(context) => context.device_limits.min_uniform_buffer_offset_alignment as u64,
            Err(e) => {
                log::error!("WgpuDevice: {e}. Falling back to the WebGPU default alignment.");
                wgpu::Limits::default().min_uniform_buffer_offset_alignment as u64
            }
        }
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let shadow_len = usize::try_from(descriptor.size).map_err(|_| {
            ResourceError::BackendError(format!(
                "WgpuDevice: buffer size {} does not fit in host memory",
                descriptor.size
            ))
        })?;

        let wgpu_buffer = {
            let context = self.lock_context()?;
            context.device.create_buffer(&wgpu::BufferDescriptor {
                label: descriptor.label.as_deref(),
                size: descriptor.size,
                usage: descriptor.usage.into_wgpu(),
                mapped_at_creation: false,
            })
        };
        let id = self.generate_buffer_id();

        self.lock_buffers()?.insert(
            id,
            WgpuBufferEntry {
                wgpu_buffer: Arc::new(wgpu_buffer),
                shadow: vec![0u8; shadow_len].into_boxed_slice(),
                bound: false,
                mapping: None,
            },
        );

        log::info!(
            "WgpuDevice: Created buffer '{:?}' with ID: {:?}, size: {} bytes",
            descriptor
                .label
                .as_ref()
                .map(|s| s.as_ref())
                .unwrap_or_default(),
            id,
            descriptor.size
        );
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        let mut buffers = self.lock_buffers()?;
        if let Some(entry) = buffers.remove(&id) {
            entry.wgpu_buffer.destroy();
            log::debug!("WgpuDevice: Destroyed buffer with ID: {id:?}");
            Ok(())
        } else {
            Err(ResourceError::NotFound(id))
        }
    }

    fn bind_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        let mut buffers = self.lock_buffers()?;
        let entry = buffers.get_mut(&id).ok_or(ResourceError::NotFound(id))?;
        entry.bound = true;
        Ok(())
    }

    fn unbind_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        let mut buffers = self.lock_buffers()?;
        let entry = buffers.get_mut(&id).ok_or(ResourceError::NotFound(id))?;
        entry.bound = false;
        Ok(())
    }

    fn map_buffer_range(
        &self,
        id: BufferId,
        offset: u64,
        size: u64,
        mode: MapMode,
    ) -> Result<MappedRegion, ResourceError> {
        if mode == MapMode::Persistent {
            return Err(ResourceError::BackendError(
                "WgpuDevice: persistent mapping is not supported".to_string(),
            ));
        }

        let mut buffers = self.lock_buffers()?;
        let entry = buffers.get_mut(&id).ok_or(ResourceError::NotFound(id))?;
        if !entry.bound {
            return Err(ResourceError::BackendError(format!(
                "WgpuDevice: buffer {id:?} must be bound before it is mapped"
            )));
        }
        if entry.mapping.is_some() {
            return Err(ResourceError::AlreadyMapped(id));
        }
        let range = Self::checked_range(entry, offset, size)?;
        let ptr = entry.shadow[range].as_mut_ptr();

        // SAFETY: the shadow copy is a boxed slice that is never reallocated; it lives
        // until `destroy_buffer`, and `AlreadyMapped` guarantees a single live region.
        let region = unsafe { MappedRegion::from_raw_parts(ptr, size as usize) }.ok_or(
            ResourceError::MappingFailed {
                buffer: id,
                offset,
                size,
            },
        )?;
        entry.mapping = Some((offset, size));
        Ok(region)
    }

    fn unmap_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        let mut buffers = self.lock_buffers()?;
        let entry = buffers.get_mut(&id).ok_or(ResourceError::NotFound(id))?;
        if !entry.bound {
            return Err(ResourceError::BackendError(format!(
                "WgpuDevice: buffer {id:?} must be bound before it is unmapped"
            )));
        }
        let (offset, size) = entry.mapping.take().ok_or(ResourceError::NotMapped(id))?;
        let range = Self::checked_range(entry, offset, size)?;

        let context = self.lock_context()?;
        context
            .queue
            .write_buffer(&entry.wgpu_buffer, offset, &entry.shadow[range]);

        log::trace!("WgpuDevice: Uploaded {size} bytes to buffer {id:?} at offset {offset}");
        Ok(())
    }

    fn bind_uniform_range(&self, index: u32, binding: BufferBinding) -> Result<(), ResourceError> {
        {
            let buffers = self.lock_buffers()?;
            let entry = buffers
                .get(&binding.buffer)
                .ok_or(ResourceError::NotFound(binding.buffer))?;
            Self::checked_range(entry, binding.offset, binding.size)?;
        }
        let alignment = self.min_uniform_buffer_offset_alignment();
        if alignment > 0 && binding.offset % alignment != 0 {
            return Err(ResourceError::BackendError(format!(
                "WgpuDevice: offset {} is not a multiple of the uniform alignment {}",
                binding.offset, alignment
            )));
        }
        self.internal
            .uniform_bindings
            .lock()
            .map_err(|e| ResourceError::BackendError(format!("WgpuDevice: {e}")))?
            .insert(index, binding);
        Ok(())
    }

    fn clear_uniform_range(&self, index: u32, _size: u64) -> Result<(), ResourceError> {
        self.internal
            .uniform_bindings
            .lock()
            .map_err(|e| ResourceError::BackendError(format!("WgpuDevice: {e}")))?
            .remove(&index);
        Ok(())
    }

    fn get_adapter_info(&self) -> GraphicsAdapterInfo {
        match self.lock_context() {
            Ok(context_guard) => GraphicsAdapterInfo {
                name: context_guard.adapter_name.clone(),
                backend_type: from_wgpu_backend(context_guard.adapter_backend),
            },
            Err(_) => GraphicsAdapterInfo::default(),
        }
    }
}
