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

//! Defines data structures related to GPU buffer resources.

use std::borrow::Cow;

/// A set of flags describing the allowed usages of a [`BufferId`].
///
/// The graphics driver uses them to place the buffer in the most suitable memory
/// type and to validate that the buffer is used correctly at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferUsage {
    bits: u32,
}

impl BufferUsage {
    /// No usage.
    pub const NONE: Self = Self { bits: 0 };
    /// The buffer can be mapped for writing on the CPU.
    pub const MAP_WRITE: Self = Self { bits: 1 << 1 };
    /// The buffer can be used as the destination of a copy operation.
    pub const COPY_DST: Self = Self { bits: 1 << 3 };
    /// The buffer can be bound as a uniform buffer.
    pub const UNIFORM: Self = Self { bits: 1 << 6 };

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

    /// Checks if these flags contain every flag of `other`.
    pub const fn contains(&self, other: Self) -> bool {
        (self.bits & other.bits) == other.bits
    }
}

impl std::ops::BitOr for BufferUsage {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

/// How often the contents of a buffer are expected to change.
///
/// Backends that expose usage hints (such as OpenGL's `GL_DYNAMIC_DRAW`) use it to
/// pick a memory placement; others ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UpdateFrequency {
    /// Written once, read many times.
    Static,
    /// Rewritten roughly once per frame.
    #[default]
    Dynamic,
    /// Rewritten several times per frame.
    Stream,
}

/// A descriptor used to create a [`BufferId`].
#[derive(Debug, Clone)]
pub struct BufferDescriptor<'a> {
    /// An optional debug label for the buffer.
    pub label: Option<Cow<'a, str>>,
    /// The total size of the buffer in bytes.
    pub size: u64,
    /// A bitmask of [`BufferUsage`] flags describing how the buffer will be used.
    pub usage: BufferUsage,
    /// Expected rewrite frequency of the contents.
    pub update_frequency: UpdateFrequency,
}

/// An opaque handle to a GPU buffer resource.
///
/// This ID is returned by [`GraphicsDevice::create_buffer`](crate::renderer::GraphicsDevice::create_buffer)
/// and is used to reference the buffer in all subsequent operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub usize);

/// A sub-range of a buffer attached to a uniform binding index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferBinding {
    /// The buffer providing the data.
    pub buffer: BufferId,
    /// The byte offset of the range. Must be a multiple of the device's
    /// minimum uniform-buffer offset alignment.
    pub offset: u64,
    /// The byte length of the range.
    pub size: u64,
}

impl BufferBinding {
    /// The first byte past the end of the range.
    #[inline]
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_flags_combine() {
        let usage = BufferUsage::UNIFORM | BufferUsage::MAP_WRITE;
        assert!(usage.contains(BufferUsage::UNIFORM));
        assert!(usage.contains(BufferUsage::MAP_WRITE));
        assert!(!usage.contains(BufferUsage::COPY_DST));
        assert!(usage.contains(BufferUsage::NONE));
    }

    #[test]
    fn binding_end() {
        let binding = BufferBinding {
            buffer: BufferId(0),
            offset: 2048,
            size: 1024,
        };
        assert_eq!(binding.end(), 3072);
    }
}
