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

//! Alignment and slot arithmetic for the uniform rings.
//!
//! Both functions are pure. The updater and the binder call [`slot_offset`] with the
//! same arguments, which is what keeps the written range and the bound range identical.

/// Number of slots in each uniform ring.
pub const RING_SLOTS: u64 = 3;

/// Rounds `size` up to the smallest multiple of `alignment` that is `>= size`.
///
/// Computed as `size + ((alignment - size % alignment) % alignment)`, so an already
/// aligned size is returned unchanged. An alignment of zero is treated as one.
///
/// # Examples
///
/// ```
/// use frameconst_core::uniform::round_up_to_alignment;
/// assert_eq!(round_up_to_alignment(832, 256), 1024);
/// assert_eq!(round_up_to_alignment(64, 256), 256);
/// assert_eq!(round_up_to_alignment(512, 256), 512);
/// ```
#[inline]
pub const fn round_up_to_alignment(size: u64, alignment: u64) -> u64 {
    let alignment = if alignment == 0 { 1 } else { alignment };
    size + ((alignment - size % alignment) % alignment)
}

/// Returns the ring slot used on render frame `frame`.
#[inline]
pub const fn slot_index(frame: u64) -> u64 {
    frame % RING_SLOTS
}

/// Returns the byte offset of the slot used on render frame `frame`, for a ring whose
/// slots are `rounded` bytes apart.
#[inline]
pub const fn slot_offset(frame: u64, rounded: u64) -> u64 {
    slot_index(frame) * rounded
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    #[test]
    fn rounding_matches_known_values() {
        assert_eq!(round_up_to_alignment(832, 256), 1024);
        assert_eq!(round_up_to_alignment(64, 256), 256);
        assert_eq!(round_up_to_alignment(1024, 256), 1024);
        assert_eq!(round_up_to_alignment(0, 256), 0);
        assert_eq!(round_up_to_alignment(832, 1), 832);
        assert_eq!(round_up_to_alignment(832, 0), 832);
    }

    #[test]
    fn rounding_properties_hold() {
        let mut rng = Pcg32::seed_from_u64(0x5eed);
        for _ in 0..10_000 {
            let size = rng.random_range(0..1_000_000u64);
            let alignment = rng.random_range(1..4097u64);
            let rounded = round_up_to_alignment(size, alignment);
            assert_eq!(rounded % alignment, 0, "{size} / {alignment}");
            assert!(rounded >= size);
            assert!(rounded < size + alignment);
        }
    }

    #[test]
    fn slots_repeat_every_three_frames() {
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..1_000 {
            let frame = rng.random_range(0..u64::MAX - RING_SLOTS);
            let rounded = rng.random_range(1..65_536u64) * 256;
            assert_eq!(slot_offset(frame, rounded), slot_offset(frame + 3, rounded));
            assert_eq!(slot_offset(frame, rounded), (frame % 3) * rounded);
        }
    }

    #[test]
    fn frame_five_and_eight_share_slot_two() {
        assert_eq!(slot_index(5), 2);
        assert_eq!(slot_offset(5, 1024), 2048);
        assert_eq!(slot_index(8), 2);
        assert_eq!(slot_offset(8, 1024), 2048);
        assert_eq!(slot_offset(0, 1024), 0);
    }
}
