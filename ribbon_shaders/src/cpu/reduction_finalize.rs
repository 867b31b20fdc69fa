// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use ribbon_encoding::{
    CommandBuffer, ConfigUniform, GpuParticle, IndirectCount, PipelineVariant,
    RibbonAccumulation, RibbonExtents, RibbonLookupEntry, RibbonRange, TessellationStats,
    FINALIZE_WG, UV_PARAMS_WG,
};

use super::{
    util::{div_ceil, invocations},
    CpuBinding,
};

/// Turns the scan into per-ribbon lookup entries, then writes the command buffer.
#[expect(clippy::too_many_arguments, reason = "Mirrors the stage bindings")]
fn reduction_finalize_main(
    n_wg: u32,
    config: &ConfigUniform,
    particles: &[GpuParticle],
    sorted_keys: &[u32],
    scanned: &[RibbonAccumulation],
    ranges: &[RibbonRange],
    lookup: &mut [RibbonLookupEntry],
    extents: &mut [RibbonExtents],
    command: &mut CommandBuffer,
) {
    let n = config.num_particles as usize;
    if n == 0 {
        return;
    }
    let total = scanned[n - 1];
    for r in 0..invocations(n_wg, FINALIZE_WG, total.ribbons) {
        let range = ranges[r];
        let end = scanned[range.last as usize];
        let before = if range.first == 0 {
            RibbonAccumulation::default()
        } else {
            scanned[range.first as usize - 1]
        };
        let kept = end.kept - before.kept;
        let num_segments = kept.saturating_sub(1);
        if num_segments == 0 {
            lookup[r] = RibbonLookupEntry::default();
            extents[r] = RibbonExtents::default();
            continue;
        }
        lookup[r] = RibbonLookupEntry {
            first_particle_id: before.kept,
            last_particle_id: end.kept - 1,
            base_segment_data_index: before.segments(),
            num_segment_data_indices: num_segments,
            ..Default::default()
        };
        extents[r] = RibbonExtents {
            start: particles[sorted_keys[range.first as usize] as usize].position,
            end: particles[sorted_keys[range.last as usize] as usize].position,
        };
    }

    // Written by the first invocation once all ribbons are known.
    let variant = PipelineVariant::from_flags(config.flags);
    let stats = if variant.wants_tessellation_stats() {
        TessellationStats::from_sums(
            total.total_length,
            total.length_sq,
            total.angle,
            total.twist,
            total.width,
        )
    } else {
        TessellationStats::from_sums(total.total_length, 0.0, 0.0, 0.0, 0.0)
    };
    command.uv_dispatch = IndirectCount::linear(div_ceil(total.ribbons, UV_PARAMS_WG));
    command.num_segments = total.segments();
    command.num_ribbons = total.ribbons;
    command.stats = stats;
    command.smoothing.update(&stats, variant.has_twist);
}

pub fn reduction_finalize(n_wg: u32, resources: &[CpuBinding<'_>]) {
    let config = resources[0].as_typed();
    let particles = resources[1].as_slice();
    let sorted_keys = resources[2].as_slice();
    let scanned = resources[3].as_slice();
    let ranges = resources[4].as_slice();
    let mut lookup = resources[5].as_slice_mut();
    let mut extents = resources[6].as_slice_mut();
    let mut command = resources[7].as_typed_mut();
    reduction_finalize_main(
        n_wg,
        &config,
        &particles,
        &sorted_keys,
        &scanned,
        &ranges,
        &mut lookup,
        &mut extents,
        &mut command,
    );
}
