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

//! Integration tests for the frame constants lifecycle on the in-memory device.

use frameconst_core::renderer::{
    DeviceFeatures, GraphicsDevice, MapMode, MemoryDevice, RenderError, ResourceError,
};
use frameconst_core::uniform::{
    FrameSource, FrameState, MatrixBlock, ParamsBlock, SlotSizes, UniformBlockKind,
    UniformConstants, UniformSettings, MATRIX_BLOCK_BINDING, PARAMS_BLOCK_BINDING,
};

fn remap_device() -> MemoryDevice {
    MemoryDevice::new(
        DeviceFeatures::UNIFORM_BUFFERS | DeviceFeatures::EXPLICIT_BINDING,
        256,
    )
}

fn persistent_device() -> MemoryDevice {
    MemoryDevice::new(DeviceFeatures::ALL, 256)
}

/// Runs `update` then `bind` for the current frame and checks that the bound ranges
/// hold exactly the blocks computed for it.
fn check_frame(device: &MemoryDevice, constants: &mut UniformConstants, state: &mut FrameState) {
    let matrices = MatrixBlock::from_source(&*state);
    // `update` draws one random vector, so compute the expected params on a clone.
    let params = ParamsBlock::from_source(&mut state.clone());

    constants.update(device, state).expect("update");
    constants.bind(device, &*state).expect("bind");

    let matrix_range = device.bound_range(MATRIX_BLOCK_BINDING).expect("matrix bound");
    let params_range = device.bound_range(PARAMS_BLOCK_BINDING).expect("params bound");

    let bytes = device
        .read_buffer(matrix_range.buffer, matrix_range.offset, 832)
        .unwrap();
    assert_eq!(bytes, bytemuck::bytes_of(&matrices));
    let bytes = device
        .read_buffer(params_range.buffer, params_range.offset, 64)
        .unwrap();
    assert_eq!(bytes, bytemuck::bytes_of(&params));
}

#[test]
fn test_sizes_and_offsets_with_256_alignment() {
    let device = remap_device();
    let mut constants = UniformConstants::default();
    constants.init(&device).unwrap();

    assert_eq!(
        constants.slot_sizes(),
        Some(SlotSizes {
            matrices: 1024,
            params: 256
        })
    );

    let frame5 = constants.binding_for(UniformBlockKind::Matrices, 5).unwrap();
    assert_eq!(frame5.offset, 2048);
    assert_eq!(frame5.size, 1024);
    assert_eq!(device.buffer_size(frame5.buffer), Some(3072));

    let frame8 = constants.binding_for(UniformBlockKind::Matrices, 8).unwrap();
    assert_eq!(frame8, frame5);

    let params = constants.binding_for(UniformBlockKind::Params, 5).unwrap();
    assert_eq!(params.offset, 512);
    assert_eq!(device.buffer_size(params.buffer), Some(768));
}

#[test]
fn test_unsupported_device_makes_no_calls() {
    let device = MemoryDevice::new(DeviceFeatures::UNIFORM_BUFFERS, 256);
    let mut constants = UniformConstants::default();
    let mut state = FrameState::new(3);

    assert!(!constants.supported(&device));
    constants.init(&device).unwrap();
    for _ in 0..5 {
        constants.update(&device, &mut state).unwrap();
        constants.bind(&device, &state).unwrap();
        state.advance();
    }
    constants.kill(&device);

    assert!(!constants.is_initialized());
    assert_eq!(device.stats().resource_calls(), 0);
    assert_eq!(device.stats().feature_queries, 1);
}

#[test]
fn test_remap_writes_match_bound_range() {
    let device = remap_device();
    let mut constants = UniformConstants::default();
    let mut state = FrameState::new(11);
    constants.init(&device).unwrap();
    assert_eq!(constants.mapping_mode(), Some(MapMode::Transient));

    for _ in 0..7 {
        check_frame(&device, &mut constants, &mut state);
        state.advance();
    }

    // One map and one unmap per block per frame.
    let stats = device.stats();
    assert_eq!(stats.maps, 14);
    assert_eq!(stats.unmaps, 14);
    assert_eq!(stats.persistent_maps, 0);
}

#[test]
fn test_persistent_writes_match_bound_range() {
    let device = persistent_device();
    let mut constants = UniformConstants::default();
    let mut state = FrameState::new(12);
    constants.init(&device).unwrap();
    assert_eq!(constants.mapping_mode(), Some(MapMode::Persistent));

    for _ in 0..7 {
        check_frame(&device, &mut constants, &mut state);
        state.advance();
    }
}

#[test]
fn test_persistent_maps_whole_ring_once() {
    let device = persistent_device();
    let mut constants = UniformConstants::default();
    let mut state = FrameState::new(5);
    constants.init(&device).unwrap();

    constants.update(&device, &mut state).unwrap();
    let after_first = device.stats();
    assert_eq!(after_first.maps, 2);
    assert_eq!(after_first.persistent_maps, 2);
    assert_eq!(after_first.unmaps, 0);

    for _ in 0..100 {
        state.advance();
        let expected = state.draw_frame % 3;
        constants.update(&device, &mut state).unwrap();
        constants.bind(&device, &state).unwrap();
        let range = device.bound_range(MATRIX_BLOCK_BINDING).unwrap();
        assert_eq!(range.offset, expected * 1024);

        let block = MatrixBlock::from_source(&state);
        let bytes = device.read_buffer(range.buffer, range.offset, 832).unwrap();
        assert_eq!(bytes, bytemuck::bytes_of(&block));
    }

    let stats = device.stats();
    assert_eq!(stats.maps, after_first.maps);
    assert_eq!(stats.unmaps, after_first.unmaps);
    // The buffers were bound once for the initial map and never again.
    assert_eq!(stats.buffer_binds, after_first.buffer_binds);
}

#[test]
fn test_repeated_bind_is_idempotent() {
    let device = persistent_device();
    let mut constants = UniformConstants::default();
    let mut state = FrameState::new(8);
    constants.init(&device).unwrap();
    constants.update(&device, &mut state).unwrap();

    constants.bind(&device, &state).unwrap();
    let first = (
        device.bound_range(MATRIX_BLOCK_BINDING),
        device.bound_range(PARAMS_BLOCK_BINDING),
    );
    constants.bind(&device, &state).unwrap();
    let second = (
        device.bound_range(MATRIX_BLOCK_BINDING),
        device.bound_range(PARAMS_BLOCK_BINDING),
    );
    assert_eq!(first, second);
    assert_eq!(device.stats().range_binds, 4);
}

#[test]
fn test_bind_before_update_is_allowed() {
    let device = remap_device();
    let mut constants = UniformConstants::default();
    let state = FrameState::new(1);
    constants.init(&device).unwrap();
    constants.bind(&device, &state).unwrap();
    assert!(device.bound_range(MATRIX_BLOCK_BINDING).is_some());
}

#[test]
fn test_mapping_failure_aborts_update() {
    let device = remap_device();
    let mut constants = UniformConstants::default();
    let mut state = FrameState::new(2);
    constants.init(&device).unwrap();

    device.set_fail_maps(true);
    let err = constants.update(&device, &mut state).unwrap_err();
    assert!(matches!(
        err,
        RenderError::ResourceError(ResourceError::MappingFailed { .. })
    ));

    let range = constants
        .binding_for(UniformBlockKind::Matrices, state.draw_frame())
        .unwrap();
    let bytes = device.read_buffer(range.buffer, range.offset, 832).unwrap();
    assert!(bytes.iter().all(|b| *b == 0), "nothing may be written");
    // Only the matrix ring was attempted.
    assert_eq!(device.stats().maps, 1);
    assert!(!device.is_bound(range.buffer));
}

fn assert_frame_unwritten(device: &MemoryDevice, constants: &UniformConstants, frame: u64) {
    for (block, size) in [(UniformBlockKind::Matrices, 832), (UniformBlockKind::Params, 64)] {
        let range = constants.binding_for(block, frame).unwrap();
        let bytes = device.read_buffer(range.buffer, range.offset, size).unwrap();
        assert!(bytes.iter().all(|b| *b == 0), "{block:?} slot was written");
        assert!(!device.is_bound(range.buffer));
    }
}

#[test]
fn test_params_mapping_failure_leaves_matrices_untouched() {
    let device = remap_device();
    let mut constants = UniformConstants::default();
    let mut state = FrameState::new(6);
    constants.init(&device).unwrap();
    let params_buffer = constants
        .binding_for(UniformBlockKind::Params, 0)
        .unwrap()
        .buffer;

    device.set_fail_maps_for(params_buffer, true).unwrap();
    let err = constants.update(&device, &mut state).unwrap_err();
    assert!(matches!(
        err,
        RenderError::ResourceError(ResourceError::MappingFailed { .. })
    ));
    assert_frame_unwritten(&device, &constants, state.draw_frame());
    let matrix_buffer = constants
        .binding_for(UniformBlockKind::Matrices, 0)
        .unwrap()
        .buffer;
    assert!(!device.is_mapped(matrix_buffer));
    let stats = device.stats();
    assert_eq!(stats.maps, 2);
    assert_eq!(stats.unmaps, 1);

    device.set_fail_maps_for(params_buffer, false).unwrap();
    check_frame(&device, &mut constants, &mut state);
}

#[test]
fn test_persistent_params_mapping_failure_leaves_matrices_untouched() {
    let device = persistent_device();
    let mut constants = UniformConstants::default();
    let mut state = FrameState::new(7);
    constants.init(&device).unwrap();
    let matrix_buffer = constants
        .binding_for(UniformBlockKind::Matrices, 0)
        .unwrap()
        .buffer;
    let params_buffer = constants
        .binding_for(UniformBlockKind::Params, 0)
        .unwrap()
        .buffer;

    device.set_fail_maps_for(params_buffer, true).unwrap();
    assert!(constants.update(&device, &mut state).is_err());
    assert_frame_unwritten(&device, &constants, state.draw_frame());
    assert!(device.is_mapped(matrix_buffer));

    device.set_fail_maps_for(params_buffer, false).unwrap();
    check_frame(&device, &mut constants, &mut state);
    // The matrix ring kept its first mapping.
    assert_eq!(device.stats().persistent_maps, 3);
}

#[test]
fn test_kill_clears_bindings_and_buffers() {
    let device = persistent_device();
    let mut constants = UniformConstants::default();
    let mut state = FrameState::new(4);
    constants.init(&device).unwrap();
    constants.update(&device, &mut state).unwrap();
    constants.bind(&device, &state).unwrap();

    constants.kill(&device);

    assert_eq!(device.bound_range(MATRIX_BLOCK_BINDING), None);
    assert_eq!(device.bound_range(PARAMS_BLOCK_BINDING), None);
    assert_eq!(device.live_buffers(), 0);
    let stats = device.stats();
    assert_eq!(stats.range_clears, 2);
    // The whole ring is detached, not only the last bound slot.
    assert_eq!(device.cleared_range(MATRIX_BLOCK_BINDING), Some(3072));
    assert_eq!(device.cleared_range(PARAMS_BLOCK_BINDING), Some(768));
    assert_eq!(stats.unmaps, 2);
    assert_eq!(stats.buffers_destroyed, 2);

    // A killed component is back to the uninitialized state.
    assert!(matches!(
        constants.update(&device, &mut state),
        Err(RenderError::NotInitialized)
    ));
}

#[test]
fn test_labels_use_settings_prefix() {
    let device = remap_device();
    let mut constants = UniformConstants::new(UniformSettings {
        label: "Overlay".to_string(),
        ..Default::default()
    });
    constants.init(&device).unwrap();
    let matrices = constants.binding_for(UniformBlockKind::Matrices, 0).unwrap();
    assert_eq!(
        device.buffer_label(matrices.buffer).as_deref(),
        Some("Overlay Matrices")
    );
    assert_eq!(device.get_adapter_info().name, "Host memory");
}

#[test]
fn test_odd_alignment_rounds_both_blocks() {
    let device = MemoryDevice::new(DeviceFeatures::ALL, 48);
    let mut constants = UniformConstants::default();
    constants.init(&device).unwrap();
    assert_eq!(
        constants.slot_sizes(),
        Some(SlotSizes {
            matrices: 864,
            params: 96
        })
    );
}
