// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

use super::{TessellationSmoothingState, TessellationStats, UvParams, Vec3};

/// Tangent of a retained point and the arc length from the start of its ribbon.
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
#[repr(C)]
pub struct TangentAndDistance {
    pub tangent: Vec3,
    pub distance: f32,
}

/// Packed per-ribbon entry of the UV lookup table consumed by the vertex stage.
///
/// Degenerate ribbons keep an all-zero entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
#[repr(C)]
pub struct RibbonLookupEntry {
    /// Index of the first retained point in the sorted output.
    pub first_particle_id: u32,
    /// Index of the last retained point in the sorted output.
    pub last_particle_id: u32,
    pub base_segment_data_index: u32,
    pub num_segment_data_indices: u32,
    pub u0: UvParams,
    pub u1: UvParams,
}

/// World positions of the first and last sorted particle of a ribbon.
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
#[repr(C)]
pub struct RibbonExtents {
    pub start: Vec3,
    pub end: Vec3,
}

/// Storage of indirect dispatch size values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct IndirectCount {
    pub count_x: u32,
    pub count_y: u32,
    pub count_z: u32,
}

impl IndirectCount {
    pub fn linear(count: u32) -> Self {
        Self {
            count_x: count,
            count_y: 1,
            count_z: 1,
        }
    }
}

/// Arguments of an indexed indirect draw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct DrawIndexedArgs {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub first_instance: u32,
}

/// Persistent state written by `reduction_finalize`.
///
/// The smoothing state survives across frames; the rest is rewritten every frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
#[repr(C)]
pub struct CommandBuffer {
    /// Dispatch size of the UV parameter stage.
    pub uv_dispatch: IndirectCount,
    pub num_segments: u32,
    pub num_ribbons: u32,
    pub smoothing: TessellationSmoothingState,
    pub stats: TessellationStats,
}

/// Arguments written by `index_params` for the index generation dispatch and the draw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
#[repr(C)]
pub struct IndirectDrawArgs {
    pub index_gen_dispatch: IndirectCount,
    pub draw: DrawIndexedArgs,
    pub stereo_draw: DrawIndexedArgs,
    pub tessellation_factor: u32,
    pub num_segments: u32,
    pub num_sub_segments: u32,
    pub one_over_sub_segment_count: f32,
}

impl IndirectDrawArgs {
    /// Draw arguments for `num_segments` segments of `sub_segments` each.
    pub fn new(
        num_segments: u32,
        sub_segments: u32,
        triangles_per_segment: u32,
        index_gen_workgroups: u32,
    ) -> Self {
        let index_count = num_segments * sub_segments * triangles_per_segment * 3;
        let draw = DrawIndexedArgs {
            index_count,
            instance_count: 1,
            ..Default::default()
        };
        Self {
            index_gen_dispatch: IndirectCount::linear(index_gen_workgroups),
            draw,
            stereo_draw: DrawIndexedArgs {
                instance_count: 2,
                ..draw
            },
            tessellation_factor: sub_segments,
            num_segments,
            num_sub_segments: sub_segments,
            one_over_sub_segment_count: if sub_segments > 0 {
                1.0 / sub_segments as f32
            } else {
                0.0
            },
        }
    }
}

/// Reflects the first and last tangent of one ribbon around their neighbors so the
/// curvature stays continuous at both ends.
///
/// `tangents` covers the retained points of a single ribbon. Ribbons with a single
/// segment are left alone.
pub fn reflect_end_tangents(tangents: &mut [TangentAndDistance]) {
    let len = tangents.len();
    if len < 3 {
        return;
    }
    tangents[0].tangent = tangents[0].tangent.reflect_continuity(tangents[1].tangent);
    tangents[len - 1].tangent = tangents[len - 1]
        .tangent
        .reflect_continuity(tangents[len - 2].tangent);
}

const_assert_eq!(std::mem::size_of::<TangentAndDistance>(), 16);
const_assert_eq!(std::mem::size_of::<RibbonLookupEntry>(), 40);
const_assert_eq!(std::mem::size_of::<CommandBuffer>(), 60);
const_assert_eq!(std::mem::size_of::<IndirectDrawArgs>(), 68);

#[cfg(test)]
mod tests {
    use super::*;

    fn td(x: f32, y: f32) -> TangentAndDistance {
        TangentAndDistance {
            tangent: Vec3::new(x, y, 0.0),
            distance: 0.0,
        }
    }

    #[test]
    fn end_tangents_reflect_around_neighbors() {
        let mut tangents = [td(1.0, 0.0), td(0.0, 1.0), td(0.0, 1.0)];
        reflect_end_tangents(&mut tangents);
        // dot is zero for the first pair, so only the neighbor is subtracted.
        assert_eq!(tangents[0].tangent, Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(tangents[2].tangent, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn single_segment_keeps_tangents() {
        let mut tangents = [td(1.0, 0.0), td(0.0, 1.0)];
        reflect_end_tangents(&mut tangents);
        assert_eq!(tangents[0].tangent, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn draw_args_count_indices() {
        let args = IndirectDrawArgs::new(4, 2, 2, 1);
        assert_eq!(args.draw.index_count, 48);
        assert_eq!(args.stereo_draw.instance_count, 2);
        assert_eq!(args.one_over_sub_segment_count, 0.5);
    }
}
