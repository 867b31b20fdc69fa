// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use ribbon_encoding::{
    write_sub_segment_indices, IndexGenUniform, IndirectDrawArgs, RibbonExtents,
    RibbonLookupEntry, INDEX_GEN_WG,
};

use super::{util::invocations, CpuBinding};

/// One invocation per `(segment, sub_segment)` pair, each writing the triangles of one
/// sub-segment of the shape.
///
/// For translucent multi-ribbons the output slots of a ribbon whose extents point the
/// wrong way along the view take its segments in reverse.
#[expect(clippy::too_many_arguments, reason = "Mirrors the stage bindings")]
fn index_gen_main(
    n_wg: u32,
    uniform: &IndexGenUniform,
    draw_args: &IndirectDrawArgs,
    segments: &[u32],
    adjacency: &[u32],
    multi_ribbon_indices: &[u32],
    lookup: &[RibbonLookupEntry],
    extents: &[RibbonExtents],
    indices: &mut [u32],
) {
    let sub_count = draw_args.num_sub_segments;
    if sub_count == 0 {
        return;
    }
    let adjacency = &adjacency[..uniform.adjacency_len as usize];
    let per_sub_segment = adjacency.len() * 3;
    let total = draw_args.num_segments * sub_count;
    let translucent = uniform.translucent();
    for t in 0..invocations(n_wg, INDEX_GEN_WG, total) {
        let slot = t / sub_count as usize;
        let segment = match translucent {
            Some((direction, view_direction)) => {
                let ribbon = multi_ribbon_indices[segments[slot] as usize] as usize;
                let entry = &lookup[ribbon];
                if direction.inverts(&extents[ribbon], view_direction) {
                    let base = entry.base_segment_data_index as usize;
                    let last = base + entry.num_segment_data_indices as usize - 1;
                    segments[base + last - slot]
                } else {
                    segments[slot]
                }
            }
            None => segments[slot],
        };
        let sub_segment = t as u32 % sub_count;
        let out = &mut indices[t * per_sub_segment..(t + 1) * per_sub_segment];
        write_sub_segment_indices(
            &uniform.layout,
            adjacency,
            uniform.flip_index as usize,
            segment,
            sub_segment,
            sub_count,
            out,
        );
    }
}

pub fn index_gen(n_wg: u32, resources: &[CpuBinding<'_>]) {
    let uniform = resources[0].as_typed();
    let draw_args = resources[1].as_typed();
    let segments = resources[2].as_slice();
    let adjacency = resources[3].as_slice();
    let multi_ribbon_indices = resources[4].as_slice();
    let lookup = resources[5].as_slice();
    let extents = resources[6].as_slice();
    let mut indices = resources[7].as_slice_mut();
    index_gen_main(
        n_wg,
        &uniform,
        &draw_args,
        &segments,
        &adjacency,
        &multi_ribbon_indices,
        &lookup,
        &extents,
        &mut indices,
    );
}
