// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use ribbon_encoding::{
    ConfigUniform, RibbonAccumulation, RibbonPoint, RibbonRange, TangentAndDistance,
    POINT_FLAG_KEPT, POINT_FLAG_RIBBON_END, POINT_FLAG_RIBBON_START, REDUCTION_WG,
    RIBBON_FLAGS_MULTI_RIBBON,
};

use super::{util::invocations, CpuBinding};

/// Scatters retained points into the compacted outputs, using the inclusive scan.
#[expect(clippy::too_many_arguments, reason = "Mirrors the stage bindings")]
fn reduction_apply_main(
    n_wg: u32,
    config: &ConfigUniform,
    points: &[RibbonPoint],
    scanned: &[RibbonAccumulation],
    sorted_indices: &mut [u32],
    tangents: &mut [TangentAndDistance],
    multi_ribbon_indices: &mut [u32],
    segments: &mut [u32],
    ranges: &mut [RibbonRange],
) {
    let multi = config.flags & RIBBON_FLAGS_MULTI_RIBBON != 0;
    for i in 0..invocations(n_wg, REDUCTION_WG, config.num_particles) {
        let point = &points[i];
        let a = &scanned[i];
        let ribbon_ix = (a.ribbons - 1) as usize;
        if point.flags & POINT_FLAG_RIBBON_START != 0 {
            ranges[ribbon_ix].first = i as u32;
        }
        if point.flags & POINT_FLAG_RIBBON_END != 0 {
            ranges[ribbon_ix].last = i as u32;
        }
        if point.flags & POINT_FLAG_KEPT == 0 {
            continue;
        }
        let slot = a.kept - 1;
        sorted_indices[slot as usize] = point.particle;
        tangents[slot as usize] = TangentAndDistance {
            tangent: point.tangent,
            distance: a.seg_distance,
        };
        if multi {
            multi_ribbon_indices[slot as usize] = ribbon_ix as u32;
        }
        // Every retained point after the first of its ribbon closes a segment that
        // starts at the previous slot.
        if a.seg_kept >= 2 {
            segments[(a.segments() - 1) as usize] = slot - 1;
        }
    }
}

pub fn reduction_apply(n_wg: u32, resources: &[CpuBinding<'_>]) {
    let config = resources[0].as_typed();
    let points = resources[1].as_slice();
    let scanned = resources[2].as_slice();
    let mut sorted_indices = resources[3].as_slice_mut();
    let mut tangents = resources[4].as_slice_mut();
    let mut multi_ribbon_indices = resources[5].as_slice_mut();
    let mut segments = resources[6].as_slice_mut();
    let mut ranges = resources[7].as_slice_mut();
    reduction_apply_main(
        n_wg,
        &config,
        &points,
        &scanned,
        &mut sorted_indices,
        &mut tangents,
        &mut multi_ribbon_indices,
        &mut segments,
        &mut ranges,
    );
}
