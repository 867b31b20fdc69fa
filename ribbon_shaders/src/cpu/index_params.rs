// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use ribbon_encoding::{
    tessellation_factor, CommandBuffer, IndexGenUniform, IndirectDrawArgs, INDEX_GEN_WG,
};

use super::{util::div_ceil, CpuBinding};

fn index_params_main(
    uniform: &IndexGenUniform,
    command: &CommandBuffer,
    draw_args: &mut IndirectDrawArgs,
) {
    let factor = tessellation_factor(
        &uniform.tessellation,
        &command.smoothing,
        uniform.view_distance,
        uniform.lod_distance_factor,
    );
    // The index buffer was sized for at most `sub_segment_cap` sub-segments.
    let sub_segments = factor.min(uniform.sub_segment_cap).max(1);
    let num_segments = command.num_segments;
    *draw_args = IndirectDrawArgs::new(
        num_segments,
        sub_segments,
        uniform.triangles_per_segment,
        div_ceil(num_segments * sub_segments, INDEX_GEN_WG),
    );
}

pub fn index_params(_n_wg: u32, resources: &[CpuBinding<'_>]) {
    let uniform = resources[0].as_typed();
    let command = resources[1].as_typed();
    let mut draw_args = resources[2].as_typed_mut();
    index_params_main(&uniform, &command, &mut draw_args);
}
