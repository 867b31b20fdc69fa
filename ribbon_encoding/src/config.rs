// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

use super::{
    bits_for_range, CompositeIndexLayout, DrawDirection, IndirectDrawArgs, RibbonAccumulation,
    RibbonPoint, RibbonRange, TessellationParams, UvChannelUniform, Vec3,
};

/// Width of the groups sorted by `sort_bubble`, and the initial run length of the merge.
pub const SORT_GROUP_WIDTH: u32 = 64;
pub const SORT_MERGE_WG: u32 = 64;
pub const REDUCTION_WG: u32 = 64;
pub const FINALIZE_WG: u32 = 64;
pub const UV_PARAMS_WG: u32 = 64;
pub const INDEX_GEN_WG: u32 = 64;

/// Particle attributes as uploaded to the compute stages.
///
/// Missing attributes are filled with their defaults on upload. `order` holds the
/// encoded link order key, see [`crate::order_key_from_f32`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
#[repr(C)]
pub struct GpuParticle {
    pub position: Vec3,
    pub normalized_age: f32,
    pub width: f32,
    pub twist: f32,
    pub ribbon_id: i32,
    pub acquire_tag: i32,
    pub order: u32,
    pub pad0: u32,
    pub pad1: u32,
    pub pad2: u32,
}

/// Uniform configuration shared by the sort, reduction and UV stages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
#[repr(C)]
pub struct ConfigUniform {
    pub num_particles: u32,
    /// Bit set of `RIBBON_FLAGS_*`.
    pub flags: u32,
    pub min_segment_length: f32,
    pub curve_tension: f32,
    pub uv0: UvChannelUniform,
    pub uv1: UvChannelUniform,
}

/// Per pass uniform of `sort_merge`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct SortUniform {
    pub num_keys: u32,
    pub flags: u32,
    /// Length of the sorted runs being merged.
    pub run_size: u32,
    pub pad0: u32,
}

/// Per pass uniform of `reduction_step`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct ScanUniform {
    pub num_particles: u32,
    pub stride: u32,
    pub pad0: u32,
    pub pad1: u32,
}

/// Uniform of `index_params` and `index_gen`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
#[repr(C)]
pub struct IndexGenUniform {
    pub tessellation: TessellationParams,
    /// Squared distance from the view to the ribbon bounds.
    pub view_distance: f32,
    pub lod_distance_factor: f32,
    pub layout: CompositeIndexLayout,
    pub triangles_per_segment: u32,
    pub adjacency_len: u32,
    pub flip_index: u32,
    /// Upper bound of the sub-segment count the index buffer was sized for.
    pub sub_segment_cap: u32,
    pub view_direction: Vec3,
    /// One of the `DRAW_ORDER_*` values.
    pub draw_order: u32,
}

/// Segments are emitted in sorted order.
pub const DRAW_ORDER_SORTED: u32 = 0;
/// Each ribbon is emitted back to front along the view direction.
pub const DRAW_ORDER_BACK_TO_FRONT: u32 = 1;
pub const DRAW_ORDER_FRONT_TO_BACK: u32 = 2;

impl IndexGenUniform {
    /// Orders the segments of each ribbon along `view_direction`, for translucent
    /// multi-ribbons.
    pub fn set_translucent(&mut self, direction: DrawDirection, view_direction: Vec3) {
        self.view_direction = view_direction;
        self.draw_order = match direction {
            DrawDirection::BackToFront => DRAW_ORDER_BACK_TO_FRONT,
            DrawDirection::FrontToBack => DRAW_ORDER_FRONT_TO_BACK,
        };
    }

    /// Draw and view direction when segments are reordered per ribbon.
    pub fn translucent(&self) -> Option<(DrawDirection, Vec3)> {
        let direction = match self.draw_order {
            DRAW_ORDER_BACK_TO_FRONT => DrawDirection::BackToFront,
            DRAW_ORDER_FRONT_TO_BACK => DrawDirection::FrontToBack,
            _ => return None,
        };
        Some((direction, self.view_direction))
    }
}

const_assert_eq!(std::mem::size_of::<GpuParticle>(), 48);
const_assert_eq!(std::mem::size_of::<ConfigUniform>(), 64);
const_assert_eq!(std::mem::size_of::<IndexGenUniform>(), 80);

/// Type alias for a workgroup size.
pub type WorkgroupSize = (u32, u32, u32);

/// Computed sizes for all direct dispatches.
///
/// `uv_params` and `index_gen` are sized on the device through indirect arguments.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkgroupCounts {
    pub sort_bubble: WorkgroupSize,
    pub sort_merge: WorkgroupSize,
    /// Number of merge passes needed to join all bubble sorted groups.
    pub sort_merge_passes: u32,
    pub reduction: WorkgroupSize,
    pub reduction_finalize: WorkgroupSize,
    pub index_params: WorkgroupSize,
}

impl WorkgroupCounts {
    pub fn new(num_particles: u32, multi_ribbon: bool) -> Self {
        let sort_groups = div_ceil(num_particles, SORT_GROUP_WIDTH);
        let reduction_wgs = div_ceil(num_particles, REDUCTION_WG);
        let reduction_finalize = if multi_ribbon {
            (div_ceil(num_particles, FINALIZE_WG), 1, 1)
        } else {
            (1, 1, 1)
        };
        Self {
            sort_bubble: (sort_groups, 1, 1),
            sort_merge: (div_ceil(num_particles, SORT_MERGE_WG), 1, 1),
            sort_merge_passes: bits_for_range(sort_groups),
            reduction: (reduction_wgs, 1, 1),
            reduction_finalize,
            index_params: (1, 1, 1),
        }
    }

    /// Number of Hillis-Steele passes over `num_particles` elements.
    pub fn scan_passes(num_particles: u32) -> u32 {
        bits_for_range(num_particles)
    }
}

/// Typed buffer size primitive.
#[derive(Copy, Clone, Eq, Default, Debug)]
pub struct BufferSize<T: Sized> {
    len: u32,
    _phantom: std::marker::PhantomData<T>,
}

impl<T: Sized> BufferSize<T> {
    /// Creates a new buffer size from number of elements.
    pub const fn new(len: u32) -> Self {
        Self {
            // Every binding holds at least one element.
            len: if len > 0 { len } else { 1 },
            _phantom: std::marker::PhantomData,
        }
    }

    /// Returns the number of elements.
    #[expect(clippy::len_without_is_empty, reason = "The buffer can never be empty")]
    pub const fn len(self) -> u32 {
        self.len
    }

    /// Returns the size in bytes.
    pub const fn size_in_bytes(self) -> u32 {
        std::mem::size_of::<T>() as u32 * self.len
    }
}

impl<T: Sized> PartialEq for BufferSize<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len
    }
}

/// Sizes of the scratch buffers of one generation pass.
///
/// The vertex support buffers and the index buffer outlive a frame and are sized by
/// their own caches instead.
#[derive(Copy, Clone, Debug, Default)]
pub struct BufferSizes {
    pub sort_keys: BufferSize<u32>,
    pub points: BufferSize<RibbonPoint>,
    pub accumulation: BufferSize<RibbonAccumulation>,
    /// Worst case of every particle being its own ribbon.
    pub ranges: BufferSize<RibbonRange>,
    pub indirect_draw: BufferSize<IndirectDrawArgs>,
}

impl BufferSizes {
    pub fn new(num_particles: u32) -> Self {
        let n = num_particles;
        Self {
            sort_keys: BufferSize::new(n),
            points: BufferSize::new(n),
            accumulation: BufferSize::new(n),
            ranges: BufferSize::new(n),
            indirect_draw: BufferSize::new(1),
        }
    }
}

pub const fn align_up(len: u32, alignment: u32) -> u32 {
    len + (len.wrapping_neg() & (alignment - 1))
}

const fn div_ceil(n: u32, d: u32) -> u32 {
    (n + d - 1) / d
}
