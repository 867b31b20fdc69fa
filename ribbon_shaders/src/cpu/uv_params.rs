// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use ribbon_encoding::{
    reflect_end_tangents, solve_uv_params, CommandBuffer, ConfigUniform, GpuParticle,
    RibbonLookupEntry, TangentAndDistance, UvParams, UvRibbonSpan, RIBBON_FLAGS_CUSTOM_U0,
    RIBBON_FLAGS_CUSTOM_U1, UV_PARAMS_WG,
};

use super::{util::invocations, CpuBinding};

fn uv_params_main(
    n_wg: u32,
    config: &ConfigUniform,
    particles: &[GpuParticle],
    command: &CommandBuffer,
    sorted_indices: &[u32],
    tangents: &mut [TangentAndDistance],
    lookup: &mut [RibbonLookupEntry],
) {
    for r in 0..invocations(n_wg, UV_PARAMS_WG, command.num_ribbons) {
        let mut entry = lookup[r];
        if entry.num_segment_data_indices == 0 {
            continue;
        }
        let first = entry.first_particle_id as usize;
        let last = entry.last_particle_id as usize;
        let ribbon = &mut tangents[first..=last];
        reflect_end_tangents(ribbon);

        let span = UvRibbonSpan::new(ribbon, |k| {
            particles[sorted_indices[first + k] as usize].normalized_age
        });
        entry.u0 = if config.flags & RIBBON_FLAGS_CUSTOM_U0 != 0 {
            UvParams::CUSTOM
        } else {
            solve_uv_params(&config.uv0, &span)
        };
        entry.u1 = if config.flags & RIBBON_FLAGS_CUSTOM_U1 != 0 {
            UvParams::CUSTOM
        } else {
            solve_uv_params(&config.uv1, &span)
        };
        lookup[r] = entry;
    }
}

pub fn uv_params(n_wg: u32, resources: &[CpuBinding<'_>]) {
    let config = resources[0].as_typed();
    let particles = resources[1].as_slice();
    let command = resources[2].as_typed();
    let sorted_indices = resources[3].as_slice();
    let mut tangents = resources[4].as_slice_mut();
    let mut lookup = resources[5].as_slice_mut();
    uv_params_main(
        n_wg,
        &config,
        &particles,
        &command,
        &sorted_indices,
        &mut tangents,
        &mut lookup,
    );
}
