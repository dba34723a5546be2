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

//! Defines the hierarchy of error types for the rendering subsystem.

use crate::renderer::api::buffer::BufferId;
use std::fmt;

/// An error related to the creation, mapping or binding of a GPU buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// The buffer ID does not refer to a live buffer.
    NotFound(BufferId),
    /// The driver returned a null pointer for a map request. The buffer or the
    /// driver state is corrupt and nothing was written.
    MappingFailed {
        /// The buffer that could not be mapped.
        buffer: BufferId,
        /// The byte offset of the requested range.
        offset: u64,
        /// The byte length of the requested range.
        size: u64,
    },
    /// A map was requested on a buffer that already has a live mapping.
    AlreadyMapped(BufferId),
    /// An unmap was requested on a buffer that has no live mapping.
    NotMapped(BufferId),
    /// An attempt was made to access a resource out of its bounds.
    OutOfBounds {
        /// The first byte past the requested range.
        end: u64,
        /// The size of the resource.
        size: u64,
    },
    /// An error originating from the specific graphics backend implementation.
    BackendError(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::NotFound(id) => write!(f, "Buffer not found for ID: {id:?}"),
            ResourceError::MappingFailed {
                buffer,
                offset,
                size,
            } => write!(
                f,
                "Mapping {size} bytes at offset {offset} of buffer {buffer:?} returned a null pointer"
            ),
            ResourceError::AlreadyMapped(id) => write!(f, "Buffer {id:?} is already mapped"),
            ResourceError::NotMapped(id) => write!(f, "Buffer {id:?} is not mapped"),
            ResourceError::OutOfBounds { end, size } => write!(
                f,
                "Resource access out of bounds: range ends at {end}, resource holds {size} bytes"
            ),
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// A high-level error raised by the frame constants component or a graphics device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// An operation was attempted before the component was initialized.
    NotInitialized,
    /// A required graphics feature is not supported by the device.
    FeatureNotSupported(String),
    /// An error occurred while managing a GPU resource.
    ResourceError(ResourceError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::NotInitialized => {
                write!(f, "The frame constants are not initialized.")
            }
            RenderError::FeatureNotSupported(msg) => write!(f, "Feature not supported: {msg}"),
            RenderError::ResourceError(err) => {
                write!(f, "Graphics resource operation failed: {err}")
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::ResourceError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::ResourceError(err)
    }
}
