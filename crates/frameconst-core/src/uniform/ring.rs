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

//! A three-slot ring holding one uniform block per frame in flight.
//!
//! # Architecture
//!
//! ```text
//! buffer:  [ slot 0 | slot 1 | slot 2 ]   each slot = round_up(size_of::<T>, alignment)
//! frame 3k   writes and binds slot 0
//! frame 3k+1 writes and binds slot 1      the GPU may still read slots 0 and 2
//! frame 3k+2 writes and binds slot 2
//! ```
//!
//! The ring is a single buffer allocated once. Only its contents change.

use super::alignment::{round_up_to_alignment, slot_offset, RING_SLOTS};
use super::blocks::UniformBlock;
use crate::renderer::api::*;
use crate::renderer::error::ResourceError;
use crate::renderer::traits::GraphicsDevice;
use std::borrow::Cow;
use std::marker::PhantomData;

/// How CPU writes reach a ring slot. Chosen once when the ring is allocated.
#[derive(Debug)]
pub enum SlotMapping {
    /// Bind, map the slot, write, unmap and unbind on every frame.
    Remap,
    /// Map the whole ring once on the first write and keep it mapped.
    Persistent {
        /// The live mapping of the whole ring, set by the first write.
        region: Option<MappedRegion>,
        /// Whether the buffer is still bound from the initial map.
        bound: bool,
    },
}

impl SlotMapping {
    /// The [`MapMode`] this strategy maps with.
    pub fn mode(&self) -> MapMode {
        match self {
            SlotMapping::Remap => MapMode::Transient,
            SlotMapping::Persistent { .. } => MapMode::Persistent,
        }
    }
}

/// A GPU buffer split into [`RING_SLOTS`] aligned slots of one `T` each.
#[derive(Debug)]
pub struct UniformRing<T: UniformBlock> {
    buffer: BufferId,
    rounded: u64,
    mapping: SlotMapping,
    _marker: PhantomData<T>,
}

impl<T: UniformBlock> UniformRing<T> {
    /// Allocates the ring buffer.
    ///
    /// The buffer is bound and immediately unbound. Its contents are undefined until the
    /// first [`write`](Self::write).
    ///
    /// # Arguments
    ///
    /// * `device` - The device to allocate on.
    /// * `alignment` - The device's minimum uniform offset alignment.
    /// * `persistent` - Selects [`SlotMapping::Persistent`] over [`SlotMapping::Remap`].
    /// * `label` - Prefix of the buffer's debug label.
    pub fn allocate(
        device: &dyn GraphicsDevice,
        alignment: u64,
        persistent: bool,
        label: &str,
    ) -> Result<Self, ResourceError> {
        let rounded = round_up_to_alignment(T::SIZE, alignment);
        let buffer = device.create_buffer(&BufferDescriptor {
            label: Some(Cow::Owned(format!("{label} {}", T::KIND.label()))),
            size: rounded * RING_SLOTS,
            usage: BufferUsage::UNIFORM | BufferUsage::MAP_WRITE,
            update_frequency: UpdateFrequency::Dynamic,
        })?;

        let bound = device
            .bind_buffer(buffer)
            .and_then(|_| device.unbind_buffer(buffer));
        if let Err(e) = bound {
            let _ = device.destroy_buffer(buffer);
            return Err(e);
        }

        let mapping = if persistent {
            SlotMapping::Persistent {
                region: None,
                bound: false,
            }
        } else {
            SlotMapping::Remap
        };

        log::debug!(
            "UniformRing<{}>: {} bytes per slot, {} total ({:?})",
            T::SHADER_NAME,
            rounded,
            rounded * RING_SLOTS,
            mapping.mode()
        );

        Ok(Self {
            buffer,
            rounded,
            mapping,
            _marker: PhantomData,
        })
    }

    /// The buffer backing the ring.
    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    /// The aligned size of one slot.
    pub fn slot_size(&self) -> u64 {
        self.rounded
    }

    /// The size of the whole ring buffer.
    pub fn ring_size(&self) -> u64 {
        self.rounded * RING_SLOTS
    }

    /// The active write strategy.
    pub fn mapping(&self) -> &SlotMapping {
        &self.mapping
    }

    /// The range the binder exposes on render frame `frame`.
    pub fn binding(&self, frame: u64) -> BufferBinding {
        BufferBinding {
            buffer: self.buffer,
            offset: slot_offset(frame, self.rounded),
            size: self.rounded,
        }
    }

    /// Maps the slot of render frame `frame` for writing.
    ///
    /// The re-map strategy binds and maps the slot. The persistent strategy maps the whole
    /// ring on the first call and reuses that mapping afterwards. On a mapping failure the
    /// buffer is left unbound.
    pub fn map_slot(
        &mut self,
        device: &dyn GraphicsDevice,
        frame: u64,
    ) -> Result<MappedSlot<'_, T>, ResourceError> {
        let offset = slot_offset(frame, self.rounded);
        let ring_size = self.ring_size();
        let buffer = self.buffer;

        let transient = match &mut self.mapping {
            SlotMapping::Remap => {
                device.bind_buffer(buffer)?;
                match device.map_buffer_range(buffer, offset, self.rounded, MapMode::Transient) {
                    Ok(region) => Some(region),
                    Err(e) => {
                        let _ = device.unbind_buffer(buffer);
                        return Err(e);
                    }
                }
            }
            SlotMapping::Persistent { region, bound } => {
                if region.is_none() {
                    device.bind_buffer(buffer)?;
                    *bound = true;
                    match device.map_buffer_range(buffer, 0, ring_size, MapMode::Persistent) {
                        Ok(mapped) => *region = Some(mapped),
                        Err(e) => {
                            *bound = false;
                            let _ = device.unbind_buffer(buffer);
                            return Err(e);
                        }
                    }
                }
                None
            }
        };

        Ok(MappedSlot {
            ring: self,
            transient,
            offset: offset as usize,
        })
    }

    /// Writes `value` into the slot of render frame `frame`.
    ///
    /// On a mapping failure nothing is written and the buffer is left unbound.
    pub fn write(
        &mut self,
        device: &dyn GraphicsDevice,
        frame: u64,
        value: &T,
    ) -> Result<(), ResourceError> {
        self.map_slot(device, frame)?.write(device, value)
    }

    /// Releases any persistent mapping and destroys the buffer.
    pub fn release(self, device: &dyn GraphicsDevice) -> Result<(), ResourceError> {
        if let SlotMapping::Persistent {
            region: Some(region),
            bound,
        } = self.mapping
        {
            drop(region);
            if !bound {
                device.bind_buffer(self.buffer)?;
            }
            device.unmap_buffer(self.buffer)?;
            device.unbind_buffer(self.buffer)?;
        }
        device.destroy_buffer(self.buffer)
    }
}

/// A ring slot mapped by [`UniformRing::map_slot`], waiting for its value.
///
/// Must be finished with [`write`](Self::write) or [`discard`](Self::discard), which
/// unmap and unbind as the ring's strategy requires.
#[derive(Debug)]
pub struct MappedSlot<'r, T: UniformBlock> {
    ring: &'r mut UniformRing<T>,
    // Set by the re-map strategy only. The persistent region stays on the ring.
    transient: Option<MappedRegion>,
    offset: usize,
}

impl<T: UniformBlock> MappedSlot<'_, T> {
    /// Copies `value` into the slot and finishes it.
    pub fn write(mut self, device: &dyn GraphicsDevice, value: &T) -> Result<(), ResourceError> {
        let buffer = self.ring.buffer;
        let written = match (&mut self.transient, &mut self.ring.mapping) {
            (Some(region), _) => region.typed_at::<T>(0).map(|mut slot| slot.write(value)),
            (
                None,
                SlotMapping::Persistent {
                    region: Some(mapped),
                    ..
                },
            ) => mapped
                .typed_at::<T>(self.offset)
                .map(|mut slot| slot.write(value)),
            (None, _) => Err(ResourceError::NotMapped(buffer)),
        };
        let finished = self.finish(device);
        written.and(finished)
    }

    /// Finishes the slot without writing to it.
    pub fn discard(self, device: &dyn GraphicsDevice) -> Result<(), ResourceError> {
        self.finish(device)
    }

    fn finish(self, device: &dyn GraphicsDevice) -> Result<(), ResourceError> {
        let buffer = self.ring.buffer;
        if let Some(region) = self.transient {
            drop(region);
            device.unmap_buffer(buffer)?;
            return device.unbind_buffer(buffer);
        }
        if let SlotMapping::Persistent { bound, .. } = &mut self.ring.mapping {
            if *bound {
                *bound = false;
                device.unbind_buffer(buffer)?;
            }
        }
        Ok(())
    }
}
