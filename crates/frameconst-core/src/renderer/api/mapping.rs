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

//! CPU-visible views into mapped GPU memory.
//!
//! A backend hands out a [`MappedRegion`] when a buffer range is mapped. The region is
//! the only place raw pointers appear: everything above it writes through bounds-checked
//! byte slices or through a [`TypedRegion`], which accepts exactly one `T: Pod` value.

use crate::renderer::error::ResourceError;
use bytemuck::Pod;
use std::marker::PhantomData;
use std::ptr::NonNull;

/// How long a mapping is expected to stay alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapMode {
    /// The range is unmapped again before the frame is submitted.
    Transient,
    /// The range stays mapped while the GPU reads other parts of the buffer.
    /// Only valid on devices reporting
    /// [`DeviceFeatures::PERSISTENT_MAPPING`](crate::renderer::DeviceFeatures::PERSISTENT_MAPPING).
    Persistent,
}

/// A writable, CPU-visible byte range of a mapped buffer.
#[derive(Debug)]
pub struct MappedRegion {
    ptr: NonNull<u8>,
    len: usize,
}

// SAFETY: the region is the unique writer of its range; the backend guarantees the
// memory is not reclaimed while the mapping is live, regardless of the calling thread.
unsafe impl Send for MappedRegion {}

impl MappedRegion {
    /// Wraps a pointer returned by a driver map call.
    ///
    /// Returns `None` for a null pointer, which is how drivers report a failed map.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for writes of `len` bytes until the buffer is unmapped or
    /// destroyed, and no other live reference may alias that memory.
    pub unsafe fn from_raw_parts(ptr: *mut u8, len: usize) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr, len })
    }

    /// Returns the size of the region in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the region spans zero bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the start address of the region.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Borrows `[offset, offset + len)` of the region as a byte slice.
    pub fn slice_mut(&mut self, offset: usize, len: usize) -> Result<&mut [u8], ResourceError> {
        offset
            .checked_add(len)
            .filter(|end| *end <= self.len)
            .ok_or(ResourceError::OutOfBounds {
                end: (offset as u64).saturating_add(len as u64),
                size: self.len as u64,
            })?;
        // SAFETY: the range was checked against the mapped length above, and the
        // exclusive borrow of `self` prevents a second live slice over the same bytes.
        Ok(unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr().add(offset), len) })
    }

    /// Borrows a strongly-typed slot for a `T` starting at `offset`.
    pub fn typed_at<T: Pod>(&mut self, offset: usize) -> Result<TypedRegion<'_, T>, ResourceError> {
        let bytes = self.slice_mut(offset, std::mem::size_of::<T>())?;
        Ok(TypedRegion {
            bytes,
            _marker: PhantomData,
        })
    }
}

/// A mapped range sized for exactly one `T`.
#[derive(Debug)]
pub struct TypedRegion<'a, T: Pod> {
    bytes: &'a mut [u8],
    _marker: PhantomData<T>,
}

impl<T: Pod> TypedRegion<'_, T> {
    /// Overwrites the whole slot with `value`.
    #[inline]
    pub fn write(&mut self, value: &T) {
        self.bytes.copy_from_slice(bytemuck::bytes_of(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_pointer_is_rejected() {
        let region = unsafe { MappedRegion::from_raw_parts(std::ptr::null_mut(), 64) };
        assert!(region.is_none());
    }

    #[test]
    fn slice_is_bounds_checked() {
        let mut backing = vec![0u8; 32];
        let mut region =
            unsafe { MappedRegion::from_raw_parts(backing.as_mut_ptr(), backing.len()) }
                .expect("non-null");
        assert!(region.slice_mut(16, 16).is_ok());
        assert_eq!(
            region.slice_mut(16, 17).unwrap_err(),
            ResourceError::OutOfBounds { end: 33, size: 32 }
        );
        assert!(region.slice_mut(usize::MAX, 2).is_err());
    }

    #[test]
    fn typed_slot_writes_value_bytes() {
        let mut backing = vec![0u8; 16];
        {
            let mut region =
                unsafe { MappedRegion::from_raw_parts(backing.as_mut_ptr(), backing.len()) }
                    .expect("non-null");
            region
                .typed_at::<[u32; 2]>(8)
                .expect("fits")
                .write(&[0xAABB_CCDD, 0x1122_3344]);
        }
        assert_eq!(&backing[..8], &[0u8; 8]);
        assert_eq!(
            &backing[8..],
            bytemuck::bytes_of(&[0xAABB_CCDDu32, 0x1122_3344u32])
        );
    }

    #[test]
    fn typed_slot_must_fit() {
        let mut backing = vec![0u8; 8];
        let mut region =
            unsafe { MappedRegion::from_raw_parts(backing.as_mut_ptr(), backing.len()) }
                .expect("non-null");
        assert!(region.typed_at::<[u32; 4]>(0).is_err());
    }
}
