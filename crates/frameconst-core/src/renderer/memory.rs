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

//! A [`GraphicsDevice`] backed by plain CPU memory.
//!
//! [`MemoryDevice`] behaves like a strict driver: buffers must be bound before they are
//! mapped, a buffer holds at most one mapping, uniform ranges must respect the offset
//! alignment, and persistent mappings are refused unless the feature is reported. Every
//! call is counted in [`MemoryDeviceStats`], which makes it the reference backend for
//! headless runs and for tests that need to observe exactly which calls were made.

use crate::renderer::api::*;
use crate::renderer::error::ResourceError;
use crate::renderer::traits::GraphicsDevice;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// The default uniform offset alignment reported by [`MemoryDevice::default`].
/// Most desktop drivers report 256.
pub const DEFAULT_UNIFORM_ALIGNMENT: u64 = 256;

/// A snapshot of the calls a [`MemoryDevice`] has served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryDeviceStats {
    /// Calls to `features`.
    pub feature_queries: usize,
    /// Calls to `min_uniform_buffer_offset_alignment`.
    pub alignment_queries: usize,
    /// Buffers created.
    pub buffers_created: usize,
    /// Buffers destroyed.
    pub buffers_destroyed: usize,
    /// Calls to `bind_buffer`.
    pub buffer_binds: usize,
    /// Calls to `unbind_buffer`.
    pub buffer_unbinds: usize,
    /// Map requests, successful or not.
    pub maps: usize,
    /// Map requests made with [`MapMode::Persistent`].
    pub persistent_maps: usize,
    /// Calls to `unmap_buffer`.
    pub unmaps: usize,
    /// Calls to `bind_uniform_range`.
    pub range_binds: usize,
    /// Calls to `clear_uniform_range`.
    pub range_clears: usize,
}

impl MemoryDeviceStats {
    /// Number of calls that touched GPU resources, i.e. everything except queries.
    pub fn resource_calls(&self) -> usize {
        self.buffers_created
            + self.buffers_destroyed
            + self.buffer_binds
            + self.buffer_unbinds
            + self.maps
            + self.unmaps
            + self.range_binds
            + self.range_clears
    }
}

#[derive(Debug, Default)]
struct Counters {
    feature_queries: AtomicUsize,
    alignment_queries: AtomicUsize,
    buffers_created: AtomicUsize,
    buffers_destroyed: AtomicUsize,
    buffer_binds: AtomicUsize,
    buffer_unbinds: AtomicUsize,
    maps: AtomicUsize,
    persistent_maps: AtomicUsize,
    unmaps: AtomicUsize,
    range_binds: AtomicUsize,
    range_clears: AtomicUsize,
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Clone, Copy)]
struct LiveMapping {
    offset: u64,
    size: u64,
    mode: MapMode,
}

#[derive(Debug)]
struct MemoryBufferEntry {
    // Never reallocated, so mapped pointers stay valid until the entry is removed.
    storage: Box<[u8]>,
    label: Option<String>,
    usage: BufferUsage,
    bound: bool,
    fail_maps: bool,
    mapping: Option<LiveMapping>,
}

/// A graphics device whose buffers live in host memory.
#[derive(Debug)]
pub struct MemoryDevice {
    features: DeviceFeatures,
    alignment: u64,
    buffers: Mutex<HashMap<BufferId, MemoryBufferEntry>>,
    uniform_bindings: Mutex<HashMap<u32, BufferBinding>>,
    cleared_ranges: Mutex<HashMap<u32, u64>>,
    next_buffer_id: AtomicUsize,
    fail_maps: AtomicBool,
    counters: Counters,
}

impl Default for MemoryDevice {
    /// A device reporting every feature and a 256-byte uniform alignment.
    fn default() -> Self {
        Self::new(DeviceFeatures::ALL, DEFAULT_UNIFORM_ALIGNMENT)
    }
}

impl MemoryDevice {
    /// Creates a device reporting `features` and the given uniform offset alignment.
    pub fn new(features: DeviceFeatures, alignment: u64) -> Self {
        Self {
            features,
            alignment,
            buffers: Mutex::new(HashMap::new()),
            uniform_bindings: Mutex::new(HashMap::new()),
            cleared_ranges: Mutex::new(HashMap::new()),
            next_buffer_id: AtomicUsize::new(0),
            fail_maps: AtomicBool::new(false),
            counters: Counters::default(),
        }
    }

    /// When set, every following map request behaves like a driver returning a null pointer.
    pub fn set_fail_maps(&self, fail: bool) {
        self.fail_maps.store(fail, Ordering::Relaxed);
    }

    /// Like [`set_fail_maps`](Self::set_fail_maps), for a single buffer.
    pub fn set_fail_maps_for(&self, id: BufferId, fail: bool) -> Result<(), ResourceError> {
        let mut buffers = self.lock_buffers()?;
        let entry = buffers.get_mut(&id).ok_or(ResourceError::NotFound(id))?;
        entry.fail_maps = fail;
        Ok(())
    }

    /// Returns a snapshot of the call counters.
    pub fn stats(&self) -> MemoryDeviceStats {
        let c = &self.counters;
        let load = |counter: &AtomicUsize| counter.load(Ordering::Relaxed);
        MemoryDeviceStats {
            feature_queries: load(&c.feature_queries),
            alignment_queries: load(&c.alignment_queries),
            buffers_created: load(&c.buffers_created),
            buffers_destroyed: load(&c.buffers_destroyed),
            buffer_binds: load(&c.buffer_binds),
            buffer_unbinds: load(&c.buffer_unbinds),
            maps: load(&c.maps),
            persistent_maps: load(&c.persistent_maps),
            unmaps: load(&c.unmaps),
            range_binds: load(&c.range_binds),
            range_clears: load(&c.range_clears),
        }
    }

    /// Copies `size` bytes starting at `offset` out of a buffer.
    pub fn read_buffer(
        &self,
        id: BufferId,
        offset: u64,
        size: u64,
    ) -> Result<Vec<u8>, ResourceError> {
        let buffers = self.lock_buffers()?;
        let entry = buffers.get(&id).ok_or(ResourceError::NotFound(id))?;
        let range = Self::checked_range(entry, offset, size)?;
        Ok(entry.storage[range].to_vec())
    }

    /// Returns the range attached to uniform binding point `index`, if any.
    pub fn bound_range(&self, index: u32) -> Option<BufferBinding> {
        self.uniform_bindings
            .lock()
            .ok()
            .and_then(|bindings| bindings.get(&index).copied())
    }

    /// Returns the size passed to the last `clear_uniform_range` call for `index`.
    pub fn cleared_range(&self, index: u32) -> Option<u64> {
        self.cleared_ranges
            .lock()
            .ok()
            .and_then(|cleared| cleared.get(&index).copied())
    }

    /// Returns the size of a live buffer.
    pub fn buffer_size(&self, id: BufferId) -> Option<u64> {
        let buffers = self.buffers.lock().ok()?;
        buffers.get(&id).map(|entry| entry.storage.len() as u64)
    }

    /// Returns the debug label a buffer was created with.
    pub fn buffer_label(&self, id: BufferId) -> Option<String> {
        let buffers = self.buffers.lock().ok()?;
        buffers.get(&id).and_then(|entry| entry.label.clone())
    }

    /// Returns `true` if the buffer is currently bound for map/unmap calls.
    pub fn is_bound(&self, id: BufferId) -> bool {
        self.buffers
            .lock()
            .ok()
            .and_then(|buffers| buffers.get(&id).map(|entry| entry.bound))
            .unwrap_or(false)
    }

    /// Returns `true` if the buffer has a live mapping.
    pub fn is_mapped(&self, id: BufferId) -> bool {
        self.buffers
            .lock()
            .ok()
            .and_then(|buffers| buffers.get(&id).map(|entry| entry.mapping.is_some()))
            .unwrap_or(false)
    }

    /// Returns the number of buffers that have been created and not destroyed.
    pub fn live_buffers(&self) -> usize {
        self.buffers.lock().map(|buffers| buffers.len()).unwrap_or(0)
    }

    fn lock_buffers(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<BufferId, MemoryBufferEntry>>, ResourceError> {
        self.buffers.lock().map_err(|e| {
            ResourceError::BackendError(format!("MemoryDevice: buffer table poisoned: {e}"))
        })
    }

    fn lock_bindings(&self) -> Result<MutexGuard<'_, HashMap<u32, BufferBinding>>, ResourceError> {
        self.uniform_bindings.lock().map_err(|e| {
            ResourceError::BackendError(format!("MemoryDevice: binding table poisoned: {e}"))
        })
    }

    fn checked_range(
        entry: &MemoryBufferEntry,
        offset: u64,
        size: u64,
    ) -> Result<std::ops::Range<usize>, ResourceError> {
        let len = entry.storage.len() as u64;
        let end = offset.saturating_add(size);
        if end > len {
            return Err(ResourceError::OutOfBounds { end, size: len });
        }
        Ok(offset as usize..end as usize)
    }
}

impl GraphicsDevice for MemoryDevice {
    fn features(&self) -> DeviceFeatures {
        bump(&self.counters.feature_queries);
        self.features
    }

    fn min_uniform_buffer_offset_alignment(&self) -> u64 {
        bump(&self.counters.alignment_queries);
        self.alignment
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let size = usize::try_from(descriptor.size).map_err(|_| {
            ResourceError::BackendError(format!(
                "MemoryDevice: buffer size {} does not fit in host memory",
                descriptor.size
            ))
        })?;
        let id = BufferId(self.next_buffer_id.fetch_add(1, Ordering::Relaxed));
        let entry = MemoryBufferEntry {
            storage: vec![0u8; size].into_boxed_slice(),
            label: descriptor.label.as_ref().map(|l| l.to_string()),
            usage: descriptor.usage,
            bound: false,
            fail_maps: false,
            mapping: None,
        };
        self.lock_buffers()?.insert(id, entry);
        bump(&self.counters.buffers_created);

        log::trace!(
            "MemoryDevice: Created buffer {:?} ({} bytes, label: {:?})",
            id,
            descriptor.size,
            descriptor.label
        );
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        bump(&self.counters.buffers_destroyed);
        let entry = self
            .lock_buffers()?
            .remove(&id)
            .ok_or(ResourceError::NotFound(id))?;
        if entry.mapping.is_some() {
            log::debug!("MemoryDevice: Buffer {id:?} destroyed while mapped");
        }
        Ok(())
    }

    fn bind_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        bump(&self.counters.buffer_binds);
        let mut buffers = self.lock_buffers()?;
        let entry = buffers.get_mut(&id).ok_or(ResourceError::NotFound(id))?;
        entry.bound = true;
        Ok(())
    }

    fn unbind_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        bump(&self.counters.buffer_unbinds);
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
        bump(&self.counters.maps);
        if mode == MapMode::Persistent {
            bump(&self.counters.persistent_maps);
            if !self.features.contains(DeviceFeatures::PERSISTENT_MAPPING) {
                return Err(ResourceError::BackendError(
                    "MemoryDevice: persistent mapping is not supported".to_string(),
                ));
            }
        }

        let mut buffers = self.lock_buffers()?;
        let entry = buffers.get_mut(&id).ok_or(ResourceError::NotFound(id))?;
        if !entry.usage.contains(BufferUsage::MAP_WRITE) {
            return Err(ResourceError::BackendError(format!(
                "MemoryDevice: buffer {id:?} was not created with MAP_WRITE"
            )));
        }
        if !entry.bound {
            return Err(ResourceError::BackendError(format!(
                "MemoryDevice: buffer {id:?} must be bound before it is mapped"
            )));
        }
        if entry.mapping.is_some() {
            return Err(ResourceError::AlreadyMapped(id));
        }
        let range = Self::checked_range(entry, offset, size)?;

        let ptr = if entry.fail_maps || self.fail_maps.load(Ordering::Relaxed) {
            std::ptr::null_mut()
        } else {
            entry.storage[range].as_mut_ptr()
        };
        // SAFETY: `ptr` is either null or points at `size` bytes of a boxed slice that is
        // never reallocated and outlives the mapping (it is only freed by `destroy_buffer`).
        let region = unsafe { MappedRegion::from_raw_parts(ptr, size as usize) }.ok_or(
            ResourceError::MappingFailed {
                buffer: id,
                offset,
                size,
            },
        )?;
        entry.mapping = Some(LiveMapping { offset, size, mode });

        log::trace!("MemoryDevice: Mapped {size} bytes at {offset} of {id:?} ({mode:?})");
        Ok(region)
    }

    fn unmap_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        bump(&self.counters.unmaps);
        let mut buffers = self.lock_buffers()?;
        let entry = buffers.get_mut(&id).ok_or(ResourceError::NotFound(id))?;
        if !entry.bound {
            return Err(ResourceError::BackendError(format!(
                "MemoryDevice: buffer {id:?} must be bound before it is unmapped"
            )));
        }
        let mapping = entry.mapping.take().ok_or(ResourceError::NotMapped(id))?;
        log::trace!(
            "MemoryDevice: Unmapped {} bytes at {} of {:?} ({:?})",
            mapping.size,
            mapping.offset,
            id,
            mapping.mode
        );
        Ok(())
    }

    fn bind_uniform_range(&self, index: u32, binding: BufferBinding) -> Result<(), ResourceError> {
        bump(&self.counters.range_binds);
        {
            let buffers = self.lock_buffers()?;
            let entry = buffers
                .get(&binding.buffer)
                .ok_or(ResourceError::NotFound(binding.buffer))?;
            if !entry.usage.contains(BufferUsage::UNIFORM) {
                return Err(ResourceError::BackendError(format!(
                    "MemoryDevice: buffer {:?} was not created with UNIFORM",
                    binding.buffer
                )));
            }
            Self::checked_range(entry, binding.offset, binding.size)?;
        }
        if self.alignment > 0 && binding.offset % self.alignment != 0 {
            return Err(ResourceError::BackendError(format!(
                "MemoryDevice: offset {} is not a multiple of the uniform alignment {}",
                binding.offset, self.alignment
            )));
        }
        self.lock_bindings()?.insert(index, binding);
        Ok(())
    }

    fn clear_uniform_range(&self, index: u32, size: u64) -> Result<(), ResourceError> {
        bump(&self.counters.range_clears);
        self.lock_bindings()?.remove(&index);
        self.cleared_ranges
            .lock()
            .map_err(|e| {
                ResourceError::BackendError(format!("MemoryDevice: clear table poisoned: {e}"))
            })?
            .insert(index, size);
        log::trace!("MemoryDevice: Cleared uniform binding {index} ({size} bytes)");
        Ok(())
    }

    fn get_adapter_info(&self) -> GraphicsAdapterInfo {
        GraphicsAdapterInfo {
            name: "Host memory".to_string(),
            backend_type: GraphicsBackendType::Memory,
        }
    }
}
